use crate::{
    config::CodecConfig,
    errors::{EcShardError, Result},
};
use reed_solomon_erasure::galois_8::ReedSolomon;
use tracing::debug;

/// Systematic Reed-Solomon erasure code over GF(2^8), working on `k` data shards and `m` parity shards,
/// each exactly `shard_size` bytes wide. Data shards are never transformed, so shards `0..k` of a stripe
/// are verbatim slices of the stripe.
pub struct ErasureCodec {
    rs: ReedSolomon,
    data_shards: usize,
    parity_shards: usize,
    shard_size: usize,
}

impl ErasureCodec {
    /// Builds the encoding matrix for the given configuration.
    ///
    /// # Returns
    ///
    /// Returns a `Result` which is:
    /// - `Ok(ErasureCodec)` if the Reed-Solomon codec could be constructed.
    /// - `Err(EcShardError::Codec)` if the underlying library rejects the shard counts.
    pub fn new(config: &CodecConfig) -> Result<Self> {
        let rs = ReedSolomon::new(config.data_shards(), config.parity_shards())?;

        Ok(ErasureCodec {
            rs,
            data_shards: config.data_shards(),
            parity_shards: config.parity_shards(),
            shard_size: config.shard_size(),
        })
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

    /// Computes `m` parity shards from `k` data shards. Deterministic in the codec parameters and input bytes.
    ///
    /// # Arguments
    ///
    /// * `data_shards` - Exactly `k` buffers, each `shard_size` bytes long.
    ///
    /// # Returns
    ///
    /// Returns a `Result` which is:
    /// - `Ok(Vec<Vec<u8>>)` holding the `m` parity shards, in shard index order.
    /// - `Err(EcShardError::InvalidShardCount)` if the number of data shards isn't `k`.
    /// - `Err(EcShardError::InvalidShardLength)` if any data shard isn't `shard_size` bytes.
    pub fn encode<T: AsRef<[u8]>>(&self, data_shards: &[T]) -> Result<Vec<Vec<u8>>> {
        if data_shards.len() != self.data_shards {
            return Err(EcShardError::InvalidShardCount {
                expected: self.data_shards,
                found: data_shards.len(),
            });
        }
        if let Some(shard) = data_shards.iter().find(|shard| shard.as_ref().len() != self.shard_size) {
            return Err(EcShardError::InvalidShardLength {
                expected: self.shard_size,
                found: shard.as_ref().len(),
            });
        }

        let mut parity_shards = vec![vec![0u8; self.shard_size]; self.parity_shards];
        self.rs.encode_sep(data_shards, &mut parity_shards[..])?;

        Ok(parity_shards)
    }

    /// Recovers every missing shard of a stripe, given at least `k` present ones. Present shards must already
    /// be verified by the caller, the codec can't tell a corrupt shard from a valid one.
    ///
    /// # Arguments
    ///
    /// * `shards` - Exactly `k + m` slots in shard index order, `None` for an unavailable shard.
    ///
    /// # Returns
    ///
    /// Returns a `Result` which is:
    /// - `Ok(Vec<Vec<u8>>)` holding all `k + m` shards, data shards fully recovered.
    /// - `Err(EcShardError::NotEnoughShards)` if fewer than `k` slots are present.
    /// - `Err(EcShardError::InvalidShardCount)` or `Err(EcShardError::InvalidShardLength)` on malformed input.
    pub fn reconstruct(&self, mut shards: Vec<Option<Vec<u8>>>) -> Result<Vec<Vec<u8>>> {
        if shards.len() != self.total_shards() {
            return Err(EcShardError::InvalidShardCount {
                expected: self.total_shards(),
                found: shards.len(),
            });
        }
        if let Some(shard) = shards.iter().flatten().find(|shard| shard.len() != self.shard_size) {
            return Err(EcShardError::InvalidShardLength {
                expected: self.shard_size,
                found: shard.len(),
            });
        }

        let available = shards.iter().filter(|shard| shard.is_some()).count();
        if available < self.data_shards {
            return Err(EcShardError::NotEnoughShards {
                available,
                required: self.data_shards,
            });
        }

        if available < self.total_shards() {
            self.rs.reconstruct(&mut shards[..])?;
            debug!("reconstructed {} missing shards from {}/{}", self.total_shards() - available, available, self.total_shards());
        }

        shards
            .into_iter()
            .map(|shard| shard.ok_or(EcShardError::NotEnoughShards { available, required: self.data_shards }))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::ErasureCodec;
    use crate::{config::CodecConfig, errors::EcShardError};
    use rand::{Rng, seq::index};

    const SHARD_SIZE: usize = 4096;

    fn random_data_shards<R: Rng + ?Sized>(rng: &mut R, config: &CodecConfig) -> Vec<Vec<u8>> {
        (0..config.data_shards())
            .map(|_| {
                let mut shard = vec![0u8; config.shard_size()];
                rng.fill(&mut shard[..]);
                shard
            })
            .collect()
    }

    #[test]
    fn encoding_is_deterministic() {
        let config = CodecConfig::new(6, 2, SHARD_SIZE).unwrap();
        let codec = ErasureCodec::new(&config).expect("Must be able to build codec");
        let mut rng = rand::rng();

        let data = random_data_shards(&mut rng, &config);
        let parity_a = codec.encode(&data).expect("Must be able to encode");
        let parity_b = codec.encode(&data).expect("Must be able to encode");

        assert_eq!(parity_a.len(), 2);
        assert!(parity_a.iter().all(|shard| shard.len() == SHARD_SIZE));
        assert_eq!(parity_a, parity_b);
    }

    #[test]
    fn prop_test_reconstruction_from_any_k_shards_works() {
        const NUM_TEST_ITERATIONS: usize = 32;

        let config = CodecConfig::new(6, 2, SHARD_SIZE).unwrap();
        let codec = ErasureCodec::new(&config).expect("Must be able to build codec");
        let mut rng = rand::rng();

        (0..NUM_TEST_ITERATIONS).for_each(|_| {
            let data = random_data_shards(&mut rng, &config);
            let parity = codec.encode(&data).expect("Must be able to encode");
            let all = data.iter().chain(parity.iter()).cloned().collect::<Vec<Vec<u8>>>();

            let num_erased = rng.random_range(0..=config.parity_shards());
            let mut slots = all.iter().cloned().map(Some).collect::<Vec<Option<Vec<u8>>>>();
            for idx in index::sample(&mut rng, config.total_shards(), num_erased).iter() {
                slots[idx] = None;
            }

            let recovered = codec.reconstruct(slots).expect("Must be able to reconstruct");
            assert_eq!(recovered, all);
        });
    }

    #[test]
    fn reconstruction_fails_below_k_shards() {
        let config = CodecConfig::new(6, 2, SHARD_SIZE).unwrap();
        let codec = ErasureCodec::new(&config).expect("Must be able to build codec");
        let mut rng = rand::rng();

        let data = random_data_shards(&mut rng, &config);
        let parity = codec.encode(&data).expect("Must be able to encode");

        let mut slots = data.into_iter().chain(parity).map(Some).collect::<Vec<Option<Vec<u8>>>>();
        slots[0] = None;
        slots[3] = None;
        slots[7] = None;

        assert!(matches!(
            codec.reconstruct(slots),
            Err(EcShardError::NotEnoughShards { available: 5, required: 6 })
        ));
    }

    #[test]
    fn rejects_malformed_shards() {
        let config = CodecConfig::new(4, 2, SHARD_SIZE).unwrap();
        let codec = ErasureCodec::new(&config).expect("Must be able to build codec");

        let too_few = vec![vec![0u8; SHARD_SIZE]; 3];
        assert!(matches!(
            codec.encode(&too_few),
            Err(EcShardError::InvalidShardCount { expected: 4, found: 3 })
        ));

        let mut short = vec![vec![0u8; SHARD_SIZE]; 4];
        short[2].truncate(SHARD_SIZE - 1);
        assert!(matches!(codec.encode(&short), Err(EcShardError::InvalidShardLength { .. })));

        let slots = vec![Some(vec![0u8; SHARD_SIZE]); 5];
        assert!(matches!(
            codec.reconstruct(slots),
            Err(EcShardError::InvalidShardCount { expected: 6, found: 5 })
        ));
    }
}
