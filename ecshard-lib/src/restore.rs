use crate::{
    config::CodecConfig,
    erasure::ErasureCodec,
    errors::{EcShardError, Result, ShardCorruption},
    metadata::{ObjectMetadata, read_metadata_file},
    progress::ProgressReporter,
    shard::{ShardCodec, ShardFile, ShardHeader, shard_path},
};
use rayon::prelude::*;
use std::{
    fmt,
    io::{self, Write},
    path::Path,
};
use tracing::{debug, info, instrument, warn};

/// Health of a single shard file, as seen by a restore.
#[derive(Clone, Debug, PartialEq)]
pub enum ShardStatus {
    Valid,
    Missing,
    Unreadable(String),
    Truncated,
    Corrupt(ShardCorruption),
}

impl ShardStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, ShardStatus::Valid)
    }

    /// Whether a file exists for this shard at all, usable or not.
    pub fn is_present(&self) -> bool {
        !matches!(self, ShardStatus::Missing)
    }
}

impl fmt::Display for ShardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShardStatus::Valid => write!(f, "valid"),
            ShardStatus::Missing => write!(f, "missing"),
            ShardStatus::Unreadable(err) => write!(f, "unreadable: {}", err),
            ShardStatus::Truncated => write!(f, "truncated"),
            ShardStatus::Corrupt(reason) => write!(f, "corrupt: {}", reason),
        }
    }
}

/// Per-shard health of one stripe.
#[derive(Clone, Debug, PartialEq)]
pub struct StripeReport {
    stripe: u32,
    valid_length: u32,
    required: usize,
    shards: Vec<ShardStatus>,
}

impl StripeReport {
    pub fn get_stripe_index(&self) -> u32 {
        self.stripe
    }

    pub fn get_valid_length(&self) -> u32 {
        self.valid_length
    }

    /// Status of every shard, in shard index order.
    pub fn get_shard_statuses(&self) -> &[ShardStatus] {
        &self.shards
    }

    pub fn get_num_valid(&self) -> usize {
        self.shards.iter().filter(|status| status.is_valid()).count()
    }

    pub fn is_recoverable(&self) -> bool {
        self.get_num_valid() >= self.required
    }

    pub fn is_degraded(&self) -> bool {
        self.get_num_valid() < self.shards.len()
    }

    pub fn get_unavailable_shards(&self) -> Vec<u32> {
        self.shards
            .iter()
            .enumerate()
            .filter(|(_, status)| !status.is_valid())
            .map(|(shard_index, _)| shard_index as u32)
            .collect()
    }
}

/// Outcome of a successful restore.
#[derive(Clone, Debug, PartialEq)]
pub struct RestoreSummary {
    pub metadata: ObjectMetadata,
    pub num_stripes: u32,
    pub num_degraded_stripes: u32,
}

struct VerifiedStripe {
    report: StripeReport,
    payloads: Vec<Option<Vec<u8>>>,
}

enum RestoreState {
    ReadStripeShards(u32),
    VerifyShards(u32, Vec<Result<ShardFile>>),
    Reconstruct(VerifiedStripe),
    WriteOutput(u32, Vec<Vec<u8>>),
    Done,
}

/// Rebuilds an object from its metadata file and whichever shard files are still usable.
pub struct RestorePipeline {
    config: CodecConfig,
    erasure: ErasureCodec,
    shards: ShardCodec,
}

impl RestorePipeline {
    pub fn new(config: CodecConfig) -> Result<Self> {
        Ok(RestorePipeline {
            erasure: ErasureCodec::new(&config)?,
            shards: ShardCodec::new(&config),
            config,
        })
    }

    pub fn get_config(&self) -> &CodecConfig {
        &self.config
    }

    /// Reads the object metadata record and checks that the recorded codec parameters match this pipeline's.
    /// Legacy records carry no parameters, for those the configured ones are assumed. Only the legacy record is
    /// understood, its shard files still have to be in this crate's shard format to verify.
    ///
    /// # Returns
    ///
    /// Returns a `Result` which is:
    /// - `Ok(ObjectMetadata)` if the record is well-formed and compatible.
    /// - `Err(EcShardError::MetadataIo)` if the file can't be read.
    /// - `Err(EcShardError::CorruptMetadata)` if the record is malformed.
    /// - `Err(EcShardError::CodecParameterMismatch)` if shards were produced with other parameters.
    pub fn load_metadata(&self, metadata_path: &Path) -> Result<ObjectMetadata> {
        let metadata = read_metadata_file(metadata_path)?;

        match metadata.get_codec() {
            Some(codec) => codec.ensure_matches(&self.config)?,
            None => warn!(?metadata_path, "metadata record carries no codec parameters, assuming configured ones"),
        }

        Ok(metadata)
    }

    /// Restores the object described by `metadata_path` into `sink`.
    ///
    /// Metadata is read and checked before any stripe is touched. Stripes are then processed strictly in order:
    /// their shard files are read and verified, missing data shards are reconstructed, and exactly the stripe's
    /// valid bytes are written to `sink`. On failure, bytes of already restored stripes remain in `sink`.
    ///
    /// # Arguments
    ///
    /// * `fragments_dir` - Directory holding `<stripe>_<shard>` shard files.
    /// * `metadata_path` - Location of the object metadata file.
    /// * `sink` - Receives the restored bytes.
    /// * `reporter` - Receives cumulative bytes restored after every stripe.
    ///
    /// # Returns
    ///
    /// Returns a `Result` which is:
    /// - `Ok(RestoreSummary)` once all `total_size` bytes were written and flushed.
    /// - `Err(EcShardError::InsufficientShards)` if a stripe has fewer than `k` usable shards.
    /// - `Err(EcShardError::IncompleteRestore)` if no shard file of a needed stripe exists.
    /// - `Err(EcShardError::OutputWrite)` if `sink` fails.
    /// - Any error of [`RestorePipeline::load_metadata`].
    #[instrument(skip_all, fields(fragments_dir = ?fragments_dir))]
    pub fn restore<W, P>(&self, fragments_dir: &Path, metadata_path: &Path, sink: &mut W, reporter: &mut P) -> Result<RestoreSummary>
    where
        W: Write + ?Sized,
        P: ProgressReporter + ?Sized,
    {
        let metadata = self.load_metadata(metadata_path)?;
        self.restore_object(fragments_dir, &metadata, sink, reporter)
    }

    /// Same as [`RestorePipeline::restore`], with already loaded metadata.
    pub fn restore_object<W, P>(&self, fragments_dir: &Path, metadata: &ObjectMetadata, sink: &mut W, reporter: &mut P) -> Result<RestoreSummary>
    where
        W: Write + ?Sized,
        P: ProgressReporter + ?Sized,
    {
        let total_size = metadata.get_total_size();
        let num_stripes = self.num_stripes(metadata)?;
        info!(name = metadata.get_name(), total_size, num_stripes, "restoring object");

        let mut remaining = total_size;
        let mut num_degraded_stripes = 0u32;
        let mut state = if remaining == 0 { RestoreState::Done } else { RestoreState::ReadStripeShards(0) };

        loop {
            state = match state {
                RestoreState::ReadStripeShards(stripe) => RestoreState::VerifyShards(stripe, self.read_stripe_shards(fragments_dir, stripe)),
                RestoreState::VerifyShards(stripe, files) => {
                    let valid_length = metadata.get_stripe_valid_length(stripe as u64, self.config.stripe_capacity()) as u32;
                    RestoreState::Reconstruct(self.verify_stripe_shards(stripe, valid_length, files))
                }
                RestoreState::Reconstruct(verified) => {
                    let report = &verified.report;
                    let stripe = report.get_stripe_index();

                    if !report.get_shard_statuses().iter().any(ShardStatus::is_present) {
                        return Err(EcShardError::IncompleteRestore { stripe, remaining });
                    }
                    if !report.is_recoverable() {
                        return Err(EcShardError::InsufficientShards {
                            stripe,
                            available: report.get_num_valid(),
                            required: self.config.data_shards(),
                            unavailable: report.get_unavailable_shards(),
                        });
                    }
                    if report.is_degraded() {
                        num_degraded_stripes += 1;
                    }

                    RestoreState::WriteOutput(stripe, self.erasure.reconstruct(verified.payloads)?)
                }
                RestoreState::WriteOutput(stripe, shards) => {
                    let valid_length = metadata.get_stripe_valid_length(stripe as u64, self.config.stripe_capacity());
                    write_stripe(sink, &shards[..self.config.data_shards()], valid_length as usize)
                        .map_err(|source| EcShardError::OutputWrite { stripe, source })?;

                    remaining -= valid_length;
                    reporter.report(total_size - remaining, total_size);
                    debug!(stripe, valid_length, remaining, "stripe restored");

                    if remaining == 0 { RestoreState::Done } else { RestoreState::ReadStripeShards(stripe + 1) }
                }
                RestoreState::Done => break,
            };
        }

        sink.flush().map_err(|source| EcShardError::OutputWrite {
            stripe: num_stripes.saturating_sub(1),
            source,
        })?;
        info!(num_stripes, num_degraded_stripes, "object restored");

        Ok(RestoreSummary {
            metadata: metadata.clone(),
            num_stripes,
            num_degraded_stripes,
        })
    }

    /// Reads and verifies every shard file of every stripe of the object, without reconstructing anything.
    pub fn inspect(&self, fragments_dir: &Path, metadata: &ObjectMetadata) -> Result<Vec<StripeReport>> {
        let num_stripes = self.num_stripes(metadata)?;

        Ok((0..num_stripes)
            .map(|stripe| {
                let valid_length = metadata.get_stripe_valid_length(stripe as u64, self.config.stripe_capacity()) as u32;
                let files = self.read_stripe_shards(fragments_dir, stripe);

                self.verify_stripe_shards(stripe, valid_length, files).report
            })
            .collect())
    }

    fn num_stripes(&self, metadata: &ObjectMetadata) -> Result<u32> {
        let num_stripes = metadata.get_num_stripes(self.config.stripe_capacity());
        u32::try_from(num_stripes).map_err(|_| EcShardError::TooManyStripes {
            total_size: metadata.get_total_size(),
            num_stripes,
        })
    }

    fn read_stripe_shards(&self, fragments_dir: &Path, stripe: u32) -> Vec<Result<ShardFile>> {
        let codec = &self.shards;
        (0..self.config.total_shards() as u32)
            .into_par_iter()
            .map(|shard| codec.read_shard_file(&shard_path(fragments_dir, stripe, shard)))
            .collect()
    }

    fn verify_stripe_shards(&self, stripe: u32, valid_length: u32, files: Vec<Result<ShardFile>>) -> VerifiedStripe {
        let codec = &self.shards;
        let (statuses, payloads): (Vec<ShardStatus>, Vec<Option<Vec<u8>>>) = files
            .into_par_iter()
            .enumerate()
            .map(|(shard, file)| {
                let expected = ShardHeader::new(valid_length, stripe, shard as u32);
                classify_shard(codec, &expected, file)
            })
            .unzip();

        for (shard, status) in statuses.iter().enumerate() {
            if !status.is_valid() {
                warn!(stripe, shard, %status, "shard unavailable");
            }
        }

        VerifiedStripe {
            report: StripeReport {
                stripe,
                valid_length,
                required: self.config.data_shards(),
                shards: statuses,
            },
            payloads,
        }
    }
}

/// Turns the outcome of reading one shard file into its status, keeping the payload only if it verifies.
fn classify_shard(codec: &ShardCodec, expected: &ShardHeader, file: Result<ShardFile>) -> (ShardStatus, Option<Vec<u8>>) {
    let file = match file {
        Ok(file) => file,
        Err(EcShardError::ShardRead(err)) if err.kind() == io::ErrorKind::NotFound => return (ShardStatus::Missing, None),
        Err(EcShardError::Truncated) => return (ShardStatus::Truncated, None),
        Err(EcShardError::Corruption(reason)) => return (ShardStatus::Corrupt(reason), None),
        Err(err) => return (ShardStatus::Unreadable(err.to_string()), None),
    };

    let verdict = file
        .header
        .check_against(expected)
        .and_then(|_| codec.verify_shard(&file.payload, &file.footer));

    match verdict {
        Ok(()) => (ShardStatus::Valid, Some(file.payload)),
        Err(reason) => (ShardStatus::Corrupt(reason), None),
    }
}

fn write_stripe<W: Write + ?Sized>(sink: &mut W, data_shards: &[Vec<u8>], valid_length: usize) -> io::Result<()> {
    let mut left = valid_length;

    for shard in data_shards {
        if left == 0 {
            break;
        }

        let n = left.min(shard.len());
        sink.write_all(&shard[..n])?;
        left -= n;
    }

    Ok(())
}
