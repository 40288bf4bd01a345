use crate::{
    errors::EcShardCLIError,
    utils::{ConsoleProgress, HashingWriter, ensure_directory, format_bytes, metadata_path_of, prepare_random_directory_name},
};
use ecshard_lib::{CodecConfig, ObjectMetadata, RestorePipeline};
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};
use tracing::warn;

const FALLBACK_OBJECT_FILE_NAME: &str = "restored.data";

pub fn handle_restore_command(
    fragments_dir: &PathBuf,
    opt_metadata_path: &Option<PathBuf>,
    opt_target_dir: &Option<PathBuf>,
    config: CodecConfig,
) -> Result<(), EcShardCLIError> {
    if !fragments_dir.is_dir() {
        return Err(EcShardCLIError::NotADirectory(fragments_dir.clone()));
    }

    let metadata_path = metadata_path_of(fragments_dir, opt_metadata_path);
    println!("Looking for object metadata file {:?}...", metadata_path);

    let pipeline = RestorePipeline::new(config)?;
    let metadata = pipeline.load_metadata(&metadata_path)?;
    super::print_object_metadata(&metadata);

    let target_dir = match opt_target_dir {
        Some(path) => path.clone(),
        None => prepare_random_directory_name("restored", &mut rand::rng()),
    };
    ensure_directory(&target_dir)?;

    let object_path = target_dir.join(object_file_name(&metadata));
    let partial_path = target_dir.join(format!("{}.partial", object_file_name(&metadata)));
    println!("Restoring object into {:?}...", object_path);

    let file = File::create(&partial_path).map_err(|source| EcShardCLIError::Create {
        path: partial_path.clone(),
        source,
    })?;
    let mut sink = HashingWriter::new(BufWriter::new(file));
    let mut progress = ConsoleProgress::new("Restoring");

    let summary = match pipeline.restore_object(fragments_dir, &metadata, &mut sink, &mut progress) {
        Ok(summary) => summary,
        Err(e) => {
            drop(sink);
            if let Err(remove_err) = fs::remove_file(&partial_path) {
                warn!(?partial_path, %remove_err, "failed to remove partially restored object");
            }
            return Err(e.into());
        }
    };

    let (writer, digest) = sink.finalize();
    drop(writer);

    fs::rename(&partial_path, &object_path).map_err(|source| EcShardCLIError::Finalize {
        from: partial_path.clone(),
        to: object_path.clone(),
        source,
    })?;

    if summary.num_degraded_stripes > 0 {
        println!(
            "{}/{} stripes were restored from degraded shard sets",
            summary.num_degraded_stripes, summary.num_stripes
        );
    }
    println!("Restored {} @ {:?}", format_bytes(metadata.get_total_size()), object_path);
    println!("BLAKE3 Digest of {:?}: {}", object_path, digest);

    Ok(())
}

/// Last path component of the recorded object name.
fn object_file_name(metadata: &ObjectMetadata) -> String {
    Path::new(metadata.get_name())
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| FALLBACK_OBJECT_FILE_NAME.to_string())
}
