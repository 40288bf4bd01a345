use crate::{
    errors::EcShardCLIError,
    utils::{ConsoleProgress, file_name_of, format_bytes, metadata_path_of, prepare_random_directory_name},
};
use ecshard_lib::{CodecConfig, SplitPipeline};
use std::{fs::File, io::BufReader, path::PathBuf};

pub fn handle_split_command(
    input_path: &PathBuf,
    opt_fragments_dir: &Option<PathBuf>,
    opt_metadata_path: &Option<PathBuf>,
    opt_name: &Option<String>,
    config: CodecConfig,
) -> Result<(), EcShardCLIError> {
    let open_input = || {
        File::open(input_path).map_err(|source| EcShardCLIError::Open {
            path: input_path.clone(),
            source,
        })
    };

    let input_name = file_name_of(input_path)?;
    let input_digest = blake3::Hasher::new()
        .update_reader(open_input()?)
        .map_err(|source| EcShardCLIError::Open {
            path: input_path.clone(),
            source,
        })?
        .finalize();

    let fragments_dir = match opt_fragments_dir {
        Some(path) => path.clone(),
        None => prepare_random_directory_name(&input_name, &mut rand::rng()),
    };
    let metadata_path = metadata_path_of(&fragments_dir, opt_metadata_path);
    let name = opt_name.clone().unwrap_or(input_name);

    println!("Read {:?}", input_path);
    println!("BLAKE3 Digest: {}", input_digest);
    println!(
        "Codec: {} data + {} parity shards of {} per stripe",
        config.data_shards(),
        config.parity_shards(),
        format_bytes(config.shard_size() as u64)
    );

    let pipeline = SplitPipeline::new(config)?;
    let mut progress = ConsoleProgress::new("Splitting");
    let summary = pipeline.split(&mut BufReader::new(open_input()?), &fragments_dir, &metadata_path, &name, &mut progress)?;

    println!("Size {}", format_bytes(summary.metadata.get_total_size()));
    println!("Number of stripes: {}", summary.num_stripes);
    println!("Number of shard files: {}", summary.num_shard_files);
    println!("Shard files placed in {:?}", fragments_dir);
    println!("Object metadata written to {:?}", metadata_path);

    Ok(())
}
