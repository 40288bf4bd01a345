use crate::{
    config::CodecConfig,
    consts::{ECSHARD_BINCODE_CONFIG, SHARD_FOOTER_BYTE_LEN, SHARD_HASH_BYTE_LEN, SHARD_HEADER_BYTE_LEN},
    errors::{EcShardError, Result, ShardCorruption},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{self, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

/// Hash algorithms a shard footer may name. Only keyed BLAKE3-256 is defined, any other value fails verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum HashAlgorithm {
    KeyedBlake3 = 0,
}

impl TryFrom<u8> for HashAlgorithm {
    type Error = ShardCorruption;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(HashAlgorithm::KeyedBlake3),
            other => Err(ShardCorruption::UnsupportedHashAlgorithm(other)),
        }
    }
}

/// Leading 12 bytes of every shard file.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ShardHeader {
    valid_length: u32,
    stripe_index: u32,
    shard_index: u32,
}

impl ShardHeader {
    pub fn new(valid_length: u32, stripe_index: u32, shard_index: u32) -> Self {
        ShardHeader {
            valid_length,
            stripe_index,
            shard_index,
        }
    }

    /// Number of original bytes carried by the stripe this shard belongs to. Identical across all shards of a stripe.
    pub fn get_valid_length(&self) -> u32 {
        self.valid_length
    }

    pub fn get_stripe_index(&self) -> u32 {
        self.stripe_index
    }

    pub fn get_shard_index(&self) -> u32 {
        self.shard_index
    }

    /// Checks this header, as read from disk, against the one expected for the file's position.
    ///
    /// # Returns
    ///
    /// Returns `Err(ShardCorruption::HeaderMismatch)` naming the first field that disagrees.
    pub fn check_against(&self, expected: &ShardHeader) -> std::result::Result<(), ShardCorruption> {
        let fields = [
            ("stripe index", expected.stripe_index, self.stripe_index),
            ("shard index", expected.shard_index, self.shard_index),
            ("valid length", expected.valid_length, self.valid_length),
        ];

        match fields.into_iter().find(|(_, expected, found)| expected != found) {
            Some((field, expected, found)) => Err(ShardCorruption::HeaderMismatch {
                field,
                expected: expected as u64,
                found: found as u64,
            }),
            None => Ok(()),
        }
    }
}

/// Trailing 33 bytes of every shard file: hash algorithm tag and the payload digest.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ShardFooter {
    hash_algorithm: u8,
    hash: [u8; SHARD_HASH_BYTE_LEN],
}

impl ShardFooter {
    pub fn new(hash_algorithm: u8, hash: [u8; SHARD_HASH_BYTE_LEN]) -> Self {
        ShardFooter { hash_algorithm, hash }
    }

    pub fn get_hash_algorithm(&self) -> u8 {
        self.hash_algorithm
    }

    pub fn get_hash(&self) -> &[u8; SHARD_HASH_BYTE_LEN] {
        &self.hash
    }
}

/// A shard file as read from disk, not yet verified.
#[derive(Clone, Debug, PartialEq)]
pub struct ShardFile {
    pub header: ShardHeader,
    pub payload: Vec<u8>,
    pub footer: ShardFooter,
}

/// Serializes and deserializes individual shard files, and verifies payload integrity.
#[derive(Clone, Debug)]
pub struct ShardCodec {
    shard_size: usize,
    hash_key: [u8; 32],
}

impl ShardCodec {
    pub fn new(config: &CodecConfig) -> Self {
        ShardCodec {
            shard_size: config.shard_size(),
            hash_key: *config.hash_key(),
        }
    }

    pub fn get_shard_size(&self) -> usize {
        self.shard_size
    }

    /// On-disk byte length of every shard file produced by this codec.
    pub fn get_shard_file_size(&self) -> usize {
        SHARD_HEADER_BYTE_LEN + self.shard_size + SHARD_FOOTER_BYTE_LEN
    }

    /// Computes the footer guarding `payload`.
    pub fn seal(&self, payload: &[u8]) -> ShardFooter {
        let hash = blake3::keyed_hash(&self.hash_key, payload);
        ShardFooter::new(HashAlgorithm::KeyedBlake3 as u8, *hash.as_bytes())
    }

    /// Writes header, then payload, then a footer whose hash is computed over the payload.
    ///
    /// # Arguments
    ///
    /// * `destination` - Sink receiving the encoded shard file.
    /// * `header` - Header of the shard, its indices are carried by write errors.
    /// * `payload` - Exactly `shard_size` bytes.
    ///
    /// # Returns
    ///
    /// Returns a `Result` which is:
    /// - `Ok(ShardFooter)` holding the footer that was written.
    /// - `Err(EcShardError::InvalidShardLength)` if `payload` isn't `shard_size` bytes.
    /// - `Err(EcShardError::ShardWrite)` if the sink fails.
    pub fn write_shard<W: Write>(&self, destination: &mut W, header: &ShardHeader, payload: &[u8]) -> Result<ShardFooter> {
        if payload.len() != self.shard_size {
            return Err(EcShardError::InvalidShardLength {
                expected: self.shard_size,
                found: payload.len(),
            });
        }

        let footer = self.seal(payload);
        let header_bytes = encode_record(header, "shard header")?;
        let footer_bytes = encode_record(&footer, "shard footer")?;

        let to_shard_write = |source: io::Error| EcShardError::ShardWrite {
            stripe: header.stripe_index,
            shard: header.shard_index,
            source,
        };

        destination.write_all(&header_bytes).map_err(to_shard_write)?;
        destination.write_all(payload).map_err(to_shard_write)?;
        destination.write_all(&footer_bytes).map_err(to_shard_write)?;

        Ok(footer)
    }

    /// Creates the shard file at `path` and writes it completely.
    pub fn write_shard_file(&self, path: &Path, header: &ShardHeader, payload: &[u8]) -> Result<ShardFooter> {
        let to_shard_write = |source: io::Error| EcShardError::ShardWrite {
            stripe: header.stripe_index,
            shard: header.shard_index,
            source,
        };

        let mut writer = BufWriter::new(fs::File::create(path).map_err(to_shard_write)?);
        let footer = self.write_shard(&mut writer, header, payload)?;
        writer.flush().map_err(to_shard_write)?;

        Ok(footer)
    }

    /// Reads one shard file: header, `shard_size` payload bytes and footer. Nothing is verified here.
    ///
    /// # Returns
    ///
    /// Returns a `Result` which is:
    /// - `Ok(ShardFile)` if the source holds exactly one complete shard file.
    /// - `Err(EcShardError::Truncated)` if the source ends early.
    /// - `Err(EcShardError::Corruption)` with `ShardCorruption::TrailingBytes` if bytes follow the footer.
    /// - `Err(EcShardError::ShardRead)` for any other read failure.
    pub fn read_shard<R: Read>(&self, source: &mut R) -> Result<ShardFile> {
        let mut header_bytes = [0u8; SHARD_HEADER_BYTE_LEN];
        read_exactly(source, &mut header_bytes)?;
        let header = decode_record::<ShardHeader>(&header_bytes, "shard header")?;

        let mut payload = vec![0u8; self.shard_size];
        read_exactly(source, &mut payload)?;

        let mut footer_bytes = [0u8; SHARD_FOOTER_BYTE_LEN];
        read_exactly(source, &mut footer_bytes)?;
        let footer = decode_record::<ShardFooter>(&footer_bytes, "shard footer")?;

        let mut probe = [0u8; 1];
        loop {
            match source.read(&mut probe) {
                Ok(0) => break,
                Ok(_) => return Err(ShardCorruption::TrailingBytes.into()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(EcShardError::ShardRead(e)),
            }
        }

        Ok(ShardFile { header, payload, footer })
    }

    /// Opens and reads the shard file at `path`.
    pub fn read_shard_file(&self, path: &Path) -> Result<ShardFile> {
        let fd = fs::File::open(path).map_err(EcShardError::ShardRead)?;
        self.read_shard(&mut BufReader::new(fd))
    }

    /// Recomputes the payload hash and compares it against the footer. An unsupported hash algorithm is a
    /// verification failure of its own.
    pub fn verify_shard(&self, payload: &[u8], footer: &ShardFooter) -> std::result::Result<(), ShardCorruption> {
        match HashAlgorithm::try_from(footer.hash_algorithm)? {
            HashAlgorithm::KeyedBlake3 => {
                let computed = blake3::keyed_hash(&self.hash_key, payload);
                if computed == blake3::Hash::from_bytes(footer.hash) {
                    Ok(())
                } else {
                    Err(ShardCorruption::HashMismatch)
                }
            }
        }
    }
}

/// Location of shard `shard` of stripe `stripe`, i.e. `<fragments_dir>/<stripe>_<shard>`.
pub fn shard_path(fragments_dir: &Path, stripe: u32, shard: u32) -> PathBuf {
    fragments_dir.join(format!("{}_{}", stripe, shard))
}

fn read_exactly<R: Read>(source: &mut R, buf: &mut [u8]) -> Result<()> {
    source.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => EcShardError::Truncated,
        _ => EcShardError::ShardRead(e),
    })
}

fn encode_record<T: Serialize>(record: &T, what: &'static str) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(record, ECSHARD_BINCODE_CONFIG).map_err(|err| EcShardError::Serialization {
        what,
        reason: err.to_string(),
    })
}

fn decode_record<T: for<'de> Deserialize<'de>>(bytes: &[u8], what: &'static str) -> Result<T> {
    bincode::serde::decode_from_slice::<T, _>(bytes, ECSHARD_BINCODE_CONFIG)
        .map(|(record, _)| record)
        .map_err(|err| EcShardError::Serialization {
            what,
            reason: err.to_string(),
        })
}
