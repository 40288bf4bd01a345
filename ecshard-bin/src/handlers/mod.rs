mod handle_restore;
mod handle_split;
mod handle_verify;

pub use handle_restore::handle_restore_command;
pub use handle_split::handle_split_command;
pub use handle_verify::handle_verify_command;

use crate::utils::format_bytes;
use ecshard_lib::ObjectMetadata;

fn format_timestamp(unix_seconds: i64) -> String {
    match chrono::DateTime::from_timestamp(unix_seconds, 0) {
        Some(datetime) => datetime.to_rfc3339(),
        None => format!("{} (out of range)", unix_seconds),
    }
}

fn print_object_metadata(metadata: &ObjectMetadata) {
    println!("Object name: {}", metadata.get_name());
    println!("Object size: {}", format_bytes(metadata.get_total_size()));
    println!("Created at: {}", format_timestamp(metadata.get_created_at()));
    println!("Updated at: {}", format_timestamp(metadata.get_updated_at()));

    match metadata.get_codec() {
        Some(codec) => println!(
            "Codec: {} data + {} parity shards of {} per stripe",
            codec.get_data_shards(),
            codec.get_parity_shards(),
            format_bytes(codec.get_shard_size() as u64)
        ),
        None => println!("Codec: not recorded (legacy metadata)"),
    }
}
