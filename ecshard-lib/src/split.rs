use crate::{
    config::CodecConfig,
    erasure::ErasureCodec,
    errors::{EcShardError, Result},
    metadata::{ObjectMetadata, write_metadata_file},
    progress::ProgressReporter,
    shard::{ShardCodec, ShardHeader, shard_path},
    stripe::{Stripe, StripePlanner},
};
use std::{
    fs,
    io::{self, Read, Seek, SeekFrom},
    path::Path,
};
use tracing::{debug, info, instrument};

/// Outcome of a successful split.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitSummary {
    pub metadata: ObjectMetadata,
    pub num_stripes: u32,
    pub num_shard_files: usize,
}

enum SplitState {
    ReadStripe,
    Encode(Stripe),
    WriteShards(Stripe, Vec<Vec<u8>>),
    Done,
}

/// Turns a byte stream into `k + m` shard files per stripe plus one object metadata file.
pub struct SplitPipeline {
    config: CodecConfig,
    erasure: ErasureCodec,
    shards: ShardCodec,
}

impl SplitPipeline {
    pub fn new(config: CodecConfig) -> Result<Self> {
        Ok(SplitPipeline {
            erasure: ErasureCodec::new(&config)?,
            shards: ShardCodec::new(&config),
            config,
        })
    }

    pub fn get_config(&self) -> &CodecConfig {
        &self.config
    }

    /// Splits everything from the current position of `source` to its end.
    ///
    /// Stripes are read, encoded and written one after another. Each stripe's shard files land in
    /// `fragments_dir` (created if absent) as `<stripe>_<shard>`, and the metadata record is written to
    /// `metadata_path` once every stripe is on disk. Any I/O failure aborts the split; shard files of
    /// earlier stripes are left behind.
    ///
    /// # Arguments
    ///
    /// * `source` - Seekable byte source, its remaining length is the object size.
    /// * `fragments_dir` - Directory receiving the shard files.
    /// * `metadata_path` - Location of the object metadata file.
    /// * `name` - Object name recorded in the metadata.
    /// * `reporter` - Receives cumulative bytes split after every stripe.
    ///
    /// # Returns
    ///
    /// Returns a `Result` which is:
    /// - `Ok(SplitSummary)` describing what was written.
    /// - `Err(EcShardError::SourceRead)`, `Err(EcShardError::ShardWrite)`, `Err(EcShardError::CreateDir)` or
    ///   `Err(EcShardError::MetadataIo)` on I/O failure.
    #[instrument(skip_all, fields(name = %name, fragments_dir = ?fragments_dir))]
    pub fn split<R, P>(&self, source: &mut R, fragments_dir: &Path, metadata_path: &Path, name: &str, reporter: &mut P) -> Result<SplitSummary>
    where
        R: Read + Seek,
        P: ProgressReporter + ?Sized,
    {
        let total_len = remaining_len(source).map_err(|source| EcShardError::SourceRead { stripe: 0, source })?;

        fs::DirBuilder::new()
            .recursive(true)
            .create(fragments_dir)
            .map_err(|source| EcShardError::CreateDir {
                path: fragments_dir.to_path_buf(),
                source,
            })?;

        let mut planner = StripePlanner::new(source, total_len, self.config.stripe_capacity())?;
        let num_stripes = planner.get_num_stripes();
        info!(total_len, num_stripes, "splitting object");

        let mut processed = 0u64;
        let mut state = SplitState::ReadStripe;

        loop {
            state = match state {
                SplitState::ReadStripe => match planner.next() {
                    Some(stripe) => SplitState::Encode(stripe?),
                    None => SplitState::Done,
                },
                SplitState::Encode(stripe) => {
                    let parity = self.erasure.encode(&stripe.data_shards(self.config.shard_size()))?;
                    SplitState::WriteShards(stripe, parity)
                }
                SplitState::WriteShards(stripe, parity) => {
                    self.write_stripe(fragments_dir, &stripe, &parity)?;

                    processed += stripe.get_valid_length() as u64;
                    reporter.report(processed, total_len);
                    debug!(stripe = stripe.get_index(), valid_length = stripe.get_valid_length(), "stripe written");

                    SplitState::ReadStripe
                }
                SplitState::Done => break,
            };
        }

        let metadata = ObjectMetadata::new(name, total_len, chrono::Utc::now().timestamp(), &self.config);
        write_metadata_file(metadata_path, &metadata)?;

        let num_shard_files = num_stripes as usize * self.config.total_shards();
        info!(num_stripes, num_shard_files, "object split");

        Ok(SplitSummary {
            metadata,
            num_stripes,
            num_shard_files,
        })
    }

    fn write_stripe(&self, fragments_dir: &Path, stripe: &Stripe, parity: &[Vec<u8>]) -> Result<()> {
        let data = stripe.data_shards(self.config.shard_size());
        let payloads = data.into_iter().chain(parity.iter().map(Vec::as_slice));

        for (shard_index, payload) in payloads.enumerate() {
            let header = ShardHeader::new(stripe.get_valid_length(), stripe.get_index(), shard_index as u32);
            let path = shard_path(fragments_dir, stripe.get_index(), shard_index as u32);

            self.shards.write_shard_file(&path, &header, payload)?;
        }

        Ok(())
    }
}

fn remaining_len<S: Seek>(source: &mut S) -> io::Result<u64> {
    let current = source.stream_position()?;
    let end = source.seek(SeekFrom::End(0))?;
    source.seek(SeekFrom::Start(current))?;

    Ok(end.saturating_sub(current))
}
