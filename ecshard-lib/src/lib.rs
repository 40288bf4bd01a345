//! # ecshard-lib: Erasure-Coded Shard Files
//!
//! `ecshard-lib` splits an arbitrary byte stream into fixed-size stripes, erasure-codes every stripe into
//! `k` data shards and `m` parity shards using a systematic Reed-Solomon code, and persists each shard as an
//! independent file guarded by a BLAKE3 digest. The original stream can be restored as long as any `k` shards
//! of every stripe are still intact, missing or corrupted shard files are simply skipped.
//!
//! By default a stripe is 6MB, encoded as 6 data shards + 2 parity shards of 1MB each.
//!
//! ## How to Use
//!
//! ### 1. Split a byte stream
//!
//! ```rust
//! use ecshard_lib::{CodecConfig, SilentProgress, SplitPipeline};
//! use std::io::Cursor;
//!
//! let dir = std::env::temp_dir().join("ecshard-doc-split");
//! let data = (0..(1usize << 16)).map(|i| (i % 251) as u8).collect::<Vec<u8>>();
//!
//! let config = CodecConfig::new(4, 2, 4096).expect("Failed to build codec config");
//! let pipeline = SplitPipeline::new(config).expect("Failed to build split pipeline");
//! let summary = pipeline
//!     .split(&mut Cursor::new(data), &dir.join("fragments"), &dir.join("object.meta"), "blob.bin", &mut SilentProgress)
//!     .expect("Failed to split");
//!
//! println!("Wrote {} shard files for {} stripes", summary.num_shard_files, summary.num_stripes);
//! # std::fs::remove_dir_all(&dir).ok();
//! ```
//!
//! ### 2. Restore it, even with shard files gone
//!
//! ```rust
//! use ecshard_lib::{CodecConfig, RestorePipeline, SilentProgress, SplitPipeline, shard_path};
//! use std::io::Cursor;
//!
//! let dir = std::env::temp_dir().join("ecshard-doc-restore");
//! let fragments = dir.join("fragments");
//! let meta = dir.join("object.meta");
//! let data = (0..100_000usize).map(|i| (i % 253) as u8).collect::<Vec<u8>>();
//!
//! let config = CodecConfig::new(4, 2, 4096).expect("Failed to build codec config");
//! SplitPipeline::new(config.clone())
//!     .and_then(|pipeline| pipeline.split(&mut Cursor::new(data.clone()), &fragments, &meta, "blob.bin", &mut SilentProgress))
//!     .expect("Failed to split");
//!
//! // Lose up to `m` shard files of any stripe.
//! std::fs::remove_file(shard_path(&fragments, 0, 1)).unwrap();
//! std::fs::remove_file(shard_path(&fragments, 0, 4)).unwrap();
//!
//! let mut restored = Vec::new();
//! let mut report_progress = |done: u64, total: u64| println!("{}/{} bytes restored", done, total);
//! RestorePipeline::new(config)
//!     .and_then(|pipeline| pipeline.restore(&fragments, &meta, &mut restored, &mut report_progress))
//!     .expect("Failed to restore");
//!
//! assert_eq!(restored, data);
//! # std::fs::remove_dir_all(&dir).ok();
//! ```

mod config;
mod consts;
mod erasure;
mod errors;
mod metadata;
mod progress;
mod restore;
mod shard;
mod split;
mod stripe;


pub use config::CodecConfig;
pub use consts::{ECSHARD_NUM_DATA_SHARDS, ECSHARD_NUM_PARITY_SHARDS, ECSHARD_SHARD_SIZE};
pub use erasure::ErasureCodec;
pub use errors::{EcShardError, Result, ShardCorruption};
pub use metadata::{CodecParameters, ObjectMetadata, read_metadata, read_metadata_file, write_metadata, write_metadata_file};
pub use progress::{ProgressReporter, SilentProgress};
pub use restore::{RestorePipeline, RestoreSummary, ShardStatus, StripeReport};
pub use shard::{HashAlgorithm, ShardCodec, ShardFile, ShardFooter, ShardHeader, shard_path};
pub use split::{SplitPipeline, SplitSummary};
pub use stripe::{Stripe, StripePlanner, num_stripes};
