use thiserror::Error;

pub type Result<T> = std::result::Result<T, EcShardError>;

/// Reasons for which a single shard file is considered corrupt. These never abort a restore on their
/// own, the affected shard is simply treated as unavailable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShardCorruption {
    #[error("payload hash mismatch")]
    HashMismatch,

    #[error("unsupported hash algorithm: {0}")]
    UnsupportedHashAlgorithm(u8),

    #[error("header {field} mismatch: expected {expected}, found {found}")]
    HeaderMismatch { field: &'static str, expected: u64, found: u64 },

    #[error("unexpected bytes after footer")]
    TrailingBytes,
}

#[derive(Error, Debug)]
pub enum EcShardError {
    #[error("invalid codec configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid number of shards: {found}, expected: {expected}")]
    InvalidShardCount { expected: usize, found: usize },

    #[error("invalid shard length: {found}B, expected: {expected}B")]
    InvalidShardLength { expected: usize, found: usize },

    #[error("too many stripes for a {total_size}B object: {num_stripes}")]
    TooManyStripes { total_size: u64, num_stripes: u64 },

    #[error("reed-solomon codec failure: {0}")]
    Codec(#[from] reed_solomon_erasure::Error),

    #[error("not enough shards to reconstruct: have {available}, need {required}")]
    NotEnoughShards { available: usize, required: usize },

    #[error("failed to serialize {what}: {reason}")]
    Serialization { what: &'static str, reason: String },

    #[error("shard file is truncated")]
    Truncated,

    #[error("failed to read shard file: {0}")]
    ShardRead(#[source] std::io::Error),

    #[error("shard file is corrupt: {0}")]
    Corruption(#[from] ShardCorruption),

    #[error("failed to read stripe {stripe} from source: {source}")]
    SourceRead { stripe: u32, source: std::io::Error },

    #[error("failed to write shard file {stripe}_{shard}: {source}")]
    ShardWrite { stripe: u32, shard: u32, source: std::io::Error },

    #[error("failed to write stripe {stripe} to output: {source}")]
    OutputWrite { stripe: u32, source: std::io::Error },

    #[error("failed to create directory {path:?}: {source}")]
    CreateDir { path: std::path::PathBuf, source: std::io::Error },

    #[error("metadata I/O failure: {0}")]
    MetadataIo(std::io::Error),

    #[error("corrupt object metadata: {0}")]
    CorruptMetadata(String),

    #[error("codec parameters differ: recorded k={found_data}, m={found_parity}, shard size={found_shard_size}B; configured k={data}, m={parity}, shard size={shard_size}B")]
    CodecParameterMismatch {
        data: usize,
        parity: usize,
        shard_size: usize,
        found_data: usize,
        found_parity: usize,
        found_shard_size: usize,
    },

    #[error("stripe {stripe} is unrecoverable: {available}/{required} usable shards, unavailable shards {unavailable:?}")]
    InsufficientShards {
        stripe: u32,
        available: usize,
        required: usize,
        unavailable: Vec<u32>,
    },

    #[error("no shard files found for stripe {stripe} while {remaining}B remain to be restored")]
    IncompleteRestore { stripe: u32, remaining: u64 },
}
