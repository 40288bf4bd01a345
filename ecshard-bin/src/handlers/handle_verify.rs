use crate::{errors::EcShardCLIError, utils::metadata_path_of};
use ecshard_lib::{CodecConfig, RestorePipeline, ShardStatus, StripeReport, shard_path};
use std::path::{Path, PathBuf};

pub fn handle_verify_command(fragments_dir: &PathBuf, opt_metadata_path: &Option<PathBuf>, config: CodecConfig) -> Result<(), EcShardCLIError> {
    if !fragments_dir.is_dir() {
        return Err(EcShardCLIError::NotADirectory(fragments_dir.clone()));
    }

    let metadata_path = metadata_path_of(fragments_dir, opt_metadata_path);
    println!("Looking for object metadata file {:?}...", metadata_path);

    let pipeline = RestorePipeline::new(config)?;
    let metadata = pipeline.load_metadata(&metadata_path)?;
    super::print_object_metadata(&metadata);

    println!("Verifying shard files...\n");
    let reports = pipeline.inspect(fragments_dir, &metadata)?;

    report_shard_health(fragments_dir, &reports);

    let unrecoverable = reports
        .iter()
        .filter(|report| !report.is_recoverable())
        .map(StripeReport::get_stripe_index)
        .collect::<Vec<u32>>();

    if unrecoverable.is_empty() { Ok(()) } else { Err(EcShardCLIError::Unrecoverable(unrecoverable)) }
}

fn report_shard_health(fragments_dir: &Path, reports: &[StripeReport]) {
    let mut total_num_valid_shards = 0;
    let mut total_num_shards = 0;

    println!("{}", fragments_dir.display());

    for report in reports {
        let statuses = report.get_shard_statuses();
        let marker = if !report.is_recoverable() {
            "🚫"
        } else if report.is_degraded() {
            "⚠️"
        } else {
            "✅"
        };

        println!(
            "\t- stripe {}\t({}/{})\t{}",
            report.get_stripe_index(),
            report.get_num_valid(),
            statuses.len(),
            marker
        );

        for (shard_index, status) in statuses.iter().enumerate() {
            let shard_file = shard_path(fragments_dir, report.get_stripe_index(), shard_index as u32);
            let shard_file_name = shard_file.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();

            match status {
                ShardStatus::Valid => println!("\t\t- {}\t✅", shard_file_name),
                status => println!("\t\t- {}\t🚫\tError: {}", shard_file_name, status),
            }
        }

        total_num_valid_shards += report.get_num_valid();
        total_num_shards += statuses.len();
    }

    println!(
        "\nFound {}/{} valid shard files in {:?}.",
        total_num_valid_shards, total_num_shards, fragments_dir
    );
}
