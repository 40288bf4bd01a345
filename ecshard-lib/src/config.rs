use crate::{
    consts::{ECSHARD_NUM_DATA_SHARDS, ECSHARD_NUM_PARITY_SHARDS, ECSHARD_SHARD_SIZE},
    errors::{EcShardError, Result},
};

/// Reed-Solomon over GF(2^8) can't address more than this many shards per stripe.
const MAX_TOTAL_SHARDS: usize = 256;

/// Immutable codec parameters, shared between the split that produces shard files and the restore
/// consuming them. `data_shards`, `parity_shards` and `shard_size` are also persisted in the object
/// metadata record, so that a restore run with a different configuration is detected up front.
///
/// `hash_key` keys the BLAKE3 hash guarding every shard payload. The default all-zero key detects
/// corruption only, it doesn't authenticate anything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodecConfig {
    data_shards: usize,
    parity_shards: usize,
    shard_size: usize,
    hash_key: [u8; 32],
}

impl CodecConfig {
    /// Creates a validated codec configuration.
    ///
    /// # Arguments
    ///
    /// * `data_shards` - Number of data shards (k) per stripe.
    /// * `parity_shards` - Number of parity shards (m) per stripe.
    /// * `shard_size` - Byte length of every shard payload.
    ///
    /// # Returns
    ///
    /// Returns a `Result` which is:
    /// - `Ok(CodecConfig)` with an all-zero hash key.
    /// - `Err(EcShardError::InvalidConfig)` if any parameter is zero, `k + m` exceeds 256, or a stripe
    ///   wouldn't fit in a 32-bit valid length.
    pub fn new(data_shards: usize, parity_shards: usize, shard_size: usize) -> Result<Self> {
        if data_shards == 0 {
            return Err(EcShardError::InvalidConfig("data_shards must be greater than 0".to_string()));
        }
        if parity_shards == 0 {
            return Err(EcShardError::InvalidConfig("parity_shards must be greater than 0".to_string()));
        }
        if data_shards + parity_shards > MAX_TOTAL_SHARDS {
            return Err(EcShardError::InvalidConfig(format!(
                "data_shards + parity_shards must not exceed {}, got {}",
                MAX_TOTAL_SHARDS,
                data_shards + parity_shards
            )));
        }
        if shard_size == 0 {
            return Err(EcShardError::InvalidConfig("shard_size must be greater than 0".to_string()));
        }

        let fits_u32 = data_shards.checked_mul(shard_size).is_some_and(|capacity| capacity <= u32::MAX as usize);
        if !fits_u32 {
            return Err(EcShardError::InvalidConfig(format!(
                "stripe capacity {} x {}B doesn't fit in a 32-bit valid length",
                data_shards, shard_size
            )));
        }

        Ok(CodecConfig {
            data_shards,
            parity_shards,
            shard_size,
            hash_key: [0u8; 32],
        })
    }

    /// Replaces the key used for hashing shard payloads.
    pub fn with_hash_key(mut self, hash_key: [u8; 32]) -> Self {
        self.hash_key = hash_key;
        self
    }

    pub fn data_shards(&self) -> usize {
        self.data_shards
    }

    pub fn parity_shards(&self) -> usize {
        self.parity_shards
    }

    pub fn total_shards(&self) -> usize {
        self.data_shards + self.parity_shards
    }

    pub fn shard_size(&self) -> usize {
        self.shard_size
    }

    pub fn hash_key(&self) -> &[u8; 32] {
        &self.hash_key
    }

    /// Number of original bytes carried by one stripe, i.e. `k × shard_size`.
    pub fn stripe_capacity(&self) -> usize {
        self.data_shards * self.shard_size
    }
}

impl Default for CodecConfig {
    /// 6 data shards + 2 parity shards of 1MB each, with an all-zero hash key.
    fn default() -> Self {
        CodecConfig {
            data_shards: ECSHARD_NUM_DATA_SHARDS,
            parity_shards: ECSHARD_NUM_PARITY_SHARDS,
            shard_size: ECSHARD_SHARD_SIZE,
            hash_key: [0u8; 32],
        }
    }
}
