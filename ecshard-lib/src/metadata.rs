use crate::{
    config::CodecConfig,
    consts::{ECSHARD_BINCODE_CONFIG, METADATA_CODEC_BYTE_LEN, METADATA_FIXED_BYTE_LEN, METADATA_VERSION_CURRENT, METADATA_VERSION_LEGACY},
    errors::{EcShardError, Result},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{self, Read, Write},
    path::Path,
};

/// Fixed-width leading part of a metadata record, the object name follows it.
#[derive(Serialize, Deserialize, Debug)]
struct MetadataRecord {
    version: [u8; 6],
    name_length: u32,
    total_size: u64,
    created_at: i64,
    updated_at: i64,
}

/// Erasure code parameters a set of shard files was produced with.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct CodecParameters {
    data_shards: u32,
    parity_shards: u32,
    shard_size: u32,
}

impl CodecParameters {
    pub fn get_data_shards(&self) -> usize {
        self.data_shards as usize
    }

    pub fn get_parity_shards(&self) -> usize {
        self.parity_shards as usize
    }

    pub fn get_shard_size(&self) -> usize {
        self.shard_size as usize
    }

    /// Fails with `EcShardError::CodecParameterMismatch` unless `config` uses the same k, m and shard size.
    pub fn ensure_matches(&self, config: &CodecConfig) -> Result<()> {
        if self.get_data_shards() == config.data_shards()
            && self.get_parity_shards() == config.parity_shards()
            && self.get_shard_size() == config.shard_size()
        {
            Ok(())
        } else {
            Err(EcShardError::CodecParameterMismatch {
                data: config.data_shards(),
                parity: config.parity_shards(),
                shard_size: config.shard_size(),
                found_data: self.get_data_shards(),
                found_parity: self.get_parity_shards(),
                found_shard_size: self.get_shard_size(),
            })
        }
    }
}

impl From<&CodecConfig> for CodecParameters {
    fn from(config: &CodecConfig) -> Self {
        // `CodecConfig::new` bounds k + m by 256 and k × shard size by u32::MAX.
        CodecParameters {
            data_shards: config.data_shards() as u32,
            parity_shards: config.parity_shards() as u32,
            shard_size: config.shard_size() as u32,
        }
    }
}

/// Describes the object a set of shard files reconstructs to. Written once at the end of a split, read once at the
/// start of a restore.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectMetadata {
    name: String,
    total_size: u64,
    created_at: i64,
    updated_at: i64,
    codec: Option<CodecParameters>,
}

impl ObjectMetadata {
    /// Metadata for a freshly split object. `updated_at` starts out equal to `created_at`.
    pub fn new(name: impl Into<String>, total_size: u64, created_at: i64, config: &CodecConfig) -> Self {
        ObjectMetadata {
            name: name.into(),
            total_size,
            created_at,
            updated_at: created_at,
            codec: Some(CodecParameters::from(config)),
        }
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_total_size(&self) -> u64 {
        self.total_size
    }

    /// Creation time, in seconds since the Unix epoch.
    pub fn get_created_at(&self) -> i64 {
        self.created_at
    }

    pub fn get_updated_at(&self) -> i64 {
        self.updated_at
    }

    /// Codec parameters recorded alongside the object, `None` for legacy records.
    pub fn get_codec(&self) -> Option<CodecParameters> {
        self.codec
    }

    /// Number of stripes the object spans, for a given stripe capacity.
    pub fn get_num_stripes(&self, stripe_capacity: usize) -> u64 {
        self.total_size.div_ceil(stripe_capacity as u64)
    }

    /// Number of original bytes carried by stripe `stripe_index`, zero past the end of the object.
    pub fn get_stripe_valid_length(&self, stripe_index: u64, stripe_capacity: usize) -> u64 {
        let capacity = stripe_capacity as u64;
        self.total_size.saturating_sub(stripe_index.saturating_mul(capacity)).min(capacity)
    }

    /// Encodes the record: the 34-byte fixed part, the name bytes and, when codec parameters are known,
    /// the 12-byte codec parameter block.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let name_length = u32::try_from(self.name.len()).map_err(|_| EcShardError::Serialization {
            what: "object metadata",
            reason: format!("object name of {}B is too long", self.name.len()),
        })?;

        let record = MetadataRecord {
            version: if self.codec.is_some() { METADATA_VERSION_CURRENT } else { METADATA_VERSION_LEGACY },
            name_length,
            total_size: self.total_size,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };

        let to_err = |err: bincode::error::EncodeError| EcShardError::Serialization {
            what: "object metadata",
            reason: err.to_string(),
        };

        let mut bytes = bincode::serde::encode_to_vec(&record, ECSHARD_BINCODE_CONFIG).map_err(to_err)?;
        bytes.extend_from_slice(self.name.as_bytes());
        if let Some(codec) = &self.codec {
            bytes.extend(bincode::serde::encode_to_vec(codec, ECSHARD_BINCODE_CONFIG).map_err(to_err)?);
        }

        Ok(bytes)
    }

    /// Decodes a complete metadata record.
    ///
    /// Legacy `v0.0.0` records are accepted as records only: they carry no codec parameters, and shard files
    /// written alongside them by older producers don't follow this crate's shard format, so they won't verify.
    ///
    /// # Returns
    ///
    /// Returns a `Result` which is:
    /// - `Ok(ObjectMetadata)` if `bytes` holds exactly one well-formed record.
    /// - `Err(EcShardError::CorruptMetadata)` on a short record, an unknown version tag, a non UTF-8 name or
    ///   trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (record, codec_block_len) = decode_fixed_part(bytes)?;

        let name_end = METADATA_FIXED_BYTE_LEN + record.name_length as usize;
        let expected_len = name_end + codec_block_len;
        if bytes.len() != expected_len {
            return Err(EcShardError::CorruptMetadata(format!(
                "record is {}B, expected {}B for a {}B name",
                bytes.len(),
                expected_len,
                record.name_length
            )));
        }

        let name = String::from_utf8(bytes[METADATA_FIXED_BYTE_LEN..name_end].to_vec())
            .map_err(|_| EcShardError::CorruptMetadata("object name is not valid UTF-8".to_string()))?;

        let codec = if codec_block_len > 0 {
            let (codec, _) = bincode::serde::decode_from_slice::<CodecParameters, _>(&bytes[name_end..], ECSHARD_BINCODE_CONFIG)
                .map_err(|err| EcShardError::CorruptMetadata(err.to_string()))?;
            Some(codec)
        } else {
            None
        };

        Ok(ObjectMetadata {
            name,
            total_size: record.total_size,
            created_at: record.created_at,
            updated_at: record.updated_at,
            codec,
        })
    }
}

/// Writes the whole record in a single write. There's no recovery from a partial write.
pub fn write_metadata<W: Write>(destination: &mut W, metadata: &ObjectMetadata) -> Result<()> {
    let bytes = metadata.to_bytes()?;
    destination.write_all(&bytes).map_err(EcShardError::MetadataIo)?;
    destination.flush().map_err(EcShardError::MetadataIo)
}

/// Reads one record. Only as many bytes as the fixed part announces are consumed, plus one to detect trailing bytes.
pub fn read_metadata<R: Read>(source: &mut R) -> Result<ObjectMetadata> {
    let mut bytes = vec![0u8; METADATA_FIXED_BYTE_LEN];
    source.read_exact(&mut bytes).map_err(|err| match err.kind() {
        io::ErrorKind::UnexpectedEof => {
            EcShardError::CorruptMetadata(format!("record is shorter than its {}B fixed part", METADATA_FIXED_BYTE_LEN))
        }
        _ => EcShardError::MetadataIo(err),
    })?;

    let (record, codec_block_len) = decode_fixed_part(&bytes)?;
    let tail_len = record.name_length as u64 + codec_block_len as u64;

    source
        .by_ref()
        .take(tail_len + 1)
        .read_to_end(&mut bytes)
        .map_err(EcShardError::MetadataIo)?;

    ObjectMetadata::from_bytes(&bytes)
}

/// Decodes the fixed part at the start of `bytes`, returning it with the length of the codec block its version
/// tag calls for.
fn decode_fixed_part(bytes: &[u8]) -> Result<(MetadataRecord, usize)> {
    if bytes.len() < METADATA_FIXED_BYTE_LEN {
        return Err(EcShardError::CorruptMetadata(format!(
            "record is {}B, shorter than its {}B fixed part",
            bytes.len(),
            METADATA_FIXED_BYTE_LEN
        )));
    }

    let (record, _) = bincode::serde::decode_from_slice::<MetadataRecord, _>(&bytes[..METADATA_FIXED_BYTE_LEN], ECSHARD_BINCODE_CONFIG)
        .map_err(|err| EcShardError::CorruptMetadata(err.to_string()))?;

    let codec_block_len = match record.version {
        METADATA_VERSION_CURRENT => METADATA_CODEC_BYTE_LEN,
        METADATA_VERSION_LEGACY => 0,
        unknown => {
            return Err(EcShardError::CorruptMetadata(format!(
                "unknown version tag {:?}",
                String::from_utf8_lossy(&unknown)
            )));
        }
    };

    Ok((record, codec_block_len))
}

pub fn write_metadata_file(path: &Path, metadata: &ObjectMetadata) -> Result<()> {
    let mut fd = fs::File::create(path).map_err(EcShardError::MetadataIo)?;
    write_metadata(&mut fd, metadata)
}

pub fn read_metadata_file(path: &Path) -> Result<ObjectMetadata> {
    let mut fd = fs::File::open(path).map_err(EcShardError::MetadataIo)?;
    read_metadata(&mut fd)
}
