use ecshard_lib::EcShardError;
use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EcShardCLIError {
    #[error("{0:?} is not a directory")]
    NotADirectory(PathBuf),
    #[error("{0:?} has no file name to derive defaults from")]
    NoFileName(PathBuf),
    #[error("failed to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to create {path:?}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to move {from:?} into place at {to:?}: {source}")]
    Finalize {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("stripes {0:?} don't have enough valid shard files to be restored")]
    Unrecoverable(Vec<u32>),
    #[error(transparent)]
    EcShard(#[from] EcShardError),
}
