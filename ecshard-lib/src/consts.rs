use bincode::config::{BigEndian, Configuration, Fixint};

/// Fixed configuration for `bincode` serialization and deserialization of on-disk records.
/// Every multi-byte integer is written big-endian with its full fixed width.
pub const ECSHARD_BINCODE_CONFIG: Configuration<BigEndian, Fixint> = bincode::config::standard().with_big_endian().with_fixed_int_encoding();

/// Default number of data shards (k) in each stripe.
pub const ECSHARD_NUM_DATA_SHARDS: usize = 6;

/// Default number of parity shards (m) in each stripe.
pub const ECSHARD_NUM_PARITY_SHARDS: usize = 2;

/// Default byte length of every shard payload (1MB = 2^20 bytes).
pub const ECSHARD_SHARD_SIZE: usize = 1usize << 20;

/// Byte length of the encoded shard file header.
pub const SHARD_HEADER_BYTE_LEN: usize = 12;

/// Byte length of the encoded shard file footer.
pub const SHARD_FOOTER_BYTE_LEN: usize = 33;

/// Byte length of the content hash carried in a shard footer.
pub const SHARD_HASH_BYTE_LEN: usize = 32;

/// Byte length of the fixed part of an object metadata record, excluding the name.
pub const METADATA_FIXED_BYTE_LEN: usize = 34;

/// Byte length of the codec parameter block trailing the object name.
pub const METADATA_CODEC_BYTE_LEN: usize = 12;

/// Metadata version tag without a codec parameter block.
pub const METADATA_VERSION_LEGACY: [u8; 6] = *b"v0.0.0";

/// Metadata version tag carrying the codec parameter block. Always written by this crate.
pub const METADATA_VERSION_CURRENT: [u8; 6] = *b"v0.1.0";
