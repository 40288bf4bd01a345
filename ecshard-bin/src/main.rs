mod errors;
mod handlers;
mod utils;

use clap::{Parser, Subcommand};
use std::{path::PathBuf, process::exit};
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "ecshard", version, about, long_about = None)]
struct EcShardCLI {
    /// Log level, `RUST_LOG` takes precedence when set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    /// 32-byte BLAKE3 key, as 64 hex characters, guarding every shard payload
    #[arg(long, global = true, env = "ECSHARD_HASH_KEY", hide_env_values = true, value_parser = utils::parse_hash_key)]
    hash_key: Option<[u8; 32]>,
    #[command(subcommand)]
    command: EcShardCommand,
}

#[derive(Subcommand)]
enum EcShardCommand {
    /// Splits given file into erasure-coded, integrity-checked shard files
    Split {
        /// Path of source file
        #[arg(short, long)]
        input: PathBuf,
        /// Optional directory to put shard files in
        #[arg(short = 'o', long)]
        fragments_dir: Option<PathBuf>,
        /// Optional path of object metadata file, defaults to `<fragments dir>/object.meta`
        #[arg(short, long)]
        metadata: Option<PathBuf>,
        /// Optional object name, defaults to source file name
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Reconstructs original file from whichever shard files are still intact
    Restore {
        /// Directory path to shard files
        #[arg(short, long)]
        fragments_dir: PathBuf,
        /// Optional path of object metadata file, defaults to `<fragments dir>/object.meta`
        #[arg(short, long)]
        metadata: Option<PathBuf>,
        /// Optional target directory to put restored file in
        #[arg(short = 'o', long)]
        target_dir: Option<PathBuf>,
    },
    /// Checks every shard file and reports per stripe health
    Verify {
        /// Directory path to shard files
        fragments_dir: PathBuf,
        /// Optional path of object metadata file, defaults to `<fragments dir>/object.meta`
        #[arg(short, long)]
        metadata: Option<PathBuf>,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = EcShardCLI::parse();
    init_logging(&cli.log_level);

    let config = utils::codec_config(cli.hash_key);
    let result = match &cli.command {
        EcShardCommand::Split {
            input,
            fragments_dir,
            metadata,
            name,
        } => handlers::handle_split_command(input, fragments_dir, metadata, name, config),
        EcShardCommand::Restore {
            fragments_dir,
            metadata,
            target_dir,
        } => handlers::handle_restore_command(fragments_dir, metadata, target_dir, config),
        EcShardCommand::Verify { fragments_dir, metadata } => handlers::handle_verify_command(fragments_dir, metadata, config),
    };

    if let Err(e) = result {
        error!("{}", e);
        exit(1);
    }
}
