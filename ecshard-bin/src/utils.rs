use crate::errors::EcShardCLIError;
use ecshard_lib::{CodecConfig, ProgressReporter};
use rand::Rng;
use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing::debug;

pub const DEFAULT_METADATA_FILE_NAME: &str = "object.meta";

pub fn format_bytes(bytes: u64) -> String {
    let suffixes = ["B", "KB", "MB", "GB", "TB"];
    let mut index = 0;
    let mut size = bytes as f64;

    while size >= 1024.0 && index < suffixes.len() - 1 {
        size /= 1024.0;
        index += 1;
    }

    format!("{:.1}{}", size, suffixes[index])
}

/// Parses a 32-byte BLAKE3 key given as 64 hex characters, with or without `0x` prefix.
pub fn parse_hash_key(hex_key: &str) -> Result<[u8; 32], String> {
    let hex_key = hex_key.strip_prefix("0x").unwrap_or(hex_key);
    const_hex::decode_to_array::<_, 32>(hex_key).map_err(|e| format!("hash key must be 64 hex characters: {}", e))
}

pub fn codec_config(hash_key: Option<[u8; 32]>) -> CodecConfig {
    match hash_key {
        Some(key) => CodecConfig::default().with_hash_key(key),
        None => CodecConfig::default(),
    }
}

pub fn file_name_of(path: &Path) -> Result<String, EcShardCLIError> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| EcShardCLIError::NoFileName(path.to_path_buf()))
}

pub fn metadata_path_of(fragments_dir: &Path, opt_metadata_path: &Option<PathBuf>) -> PathBuf {
    match opt_metadata_path {
        Some(path) => path.clone(),
        None => fragments_dir.join(DEFAULT_METADATA_FILE_NAME),
    }
}

pub fn prepare_random_directory_name<R: Rng + ?Sized>(prefix: &str, rng: &mut R) -> PathBuf {
    let mut rand_suffix = [0u8; 4];
    rng.fill_bytes(&mut rand_suffix);

    PathBuf::from(format!("{}-{}", prefix, const_hex::encode(rand_suffix)))
}

pub fn ensure_directory(path: &Path) -> Result<(), EcShardCLIError> {
    std::fs::DirBuilder::new()
        .recursive(true)
        .create(path)
        .map_err(|source| EcShardCLIError::Create {
            path: path.to_path_buf(),
            source,
        })
}

/// Prints a single, continuously rewritten progress line, to stdout unless another sink is given.
pub struct ConsoleProgress<W: Write = io::Stdout> {
    label: &'static str,
    last_percent: Option<u64>,
    out: W,
}

impl ConsoleProgress {
    pub fn new(label: &'static str) -> Self {
        ConsoleProgress::with_writer(label, io::stdout())
    }
}

impl<W: Write> ConsoleProgress<W> {
    pub fn with_writer(label: &'static str, out: W) -> Self {
        ConsoleProgress {
            label,
            last_percent: None,
            out,
        }
    }

    fn print_line(&mut self, percent: u64, processed: u64, total: u64) -> io::Result<()> {
        write!(self.out, "\r{} {:>3}% ({} / {})", self.label, percent, format_bytes(processed), format_bytes(total))?;
        if processed >= total {
            writeln!(self.out)?;
        }
        self.out.flush()
    }
}

impl<W: Write> ProgressReporter for ConsoleProgress<W> {
    fn report(&mut self, processed: u64, total: u64) {
        let percent = if total == 0 { 100 } else { processed * 100 / total };
        if self.last_percent == Some(percent) {
            return;
        }
        self.last_percent = Some(percent);

        // Progress output is best-effort, a broken console must not abort the pipeline.
        if let Err(e) = self.print_line(percent, processed, total) {
            debug!(%e, "failed to print progress line");
        }
    }
}

/// Forwards writes to `inner` while hashing every byte that went through.
pub struct HashingWriter<W: Write> {
    inner: W,
    hasher: blake3::Hasher,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        HashingWriter {
            inner,
            hasher: blake3::Hasher::new(),
        }
    }

    pub fn finalize(self) -> (W, blake3::Hash) {
        let digest = self.hasher.finalize();
        (self.inner, digest)
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::{ConsoleProgress, HashingWriter, format_bytes, parse_hash_key, prepare_random_directory_name};
    use ecshard_lib::ProgressReporter;
    use std::io::{self, Write};

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn formats_byte_counts() {
        assert_eq!(format_bytes(0), "0.0B");
        assert_eq!(format_bytes(1536), "1.5KB");
        assert_eq!(format_bytes(7_340_032), "7.0MB");
    }

    #[test]
    fn parses_hex_hash_keys() {
        let hex_key = "42".repeat(32);
        assert_eq!(parse_hash_key(&hex_key), Ok([0x42u8; 32]));
        assert_eq!(parse_hash_key(&format!("0x{}", hex_key)), Ok([0x42u8; 32]));

        assert!(parse_hash_key("42").is_err());
        assert!(parse_hash_key(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn random_directory_names_keep_prefix() {
        let path = prepare_random_directory_name("input.bin", &mut rand::rng());
        let name = path.to_string_lossy();

        assert!(name.starts_with("input.bin-"));
        assert_eq!(name.len(), "input.bin-".len() + 8);
    }

    #[test]
    fn hashing_writer_matches_blake3() {
        let mut writer = HashingWriter::new(Vec::new());
        writer.write_all(b"hello ").unwrap();
        writer.write_all(b"world").unwrap();

        let (bytes, digest) = writer.finalize();
        assert_eq!(bytes, b"hello world");
        assert_eq!(digest, blake3::hash(b"hello world"));
    }

    #[test]
    fn console_progress_prints_each_percent_once() {
        let mut progress = ConsoleProgress::with_writer("Restoring", Vec::new());
        progress.report(512, 1024);
        progress.report(512, 1024);
        progress.report(1024, 1024);

        let printed = String::from_utf8(progress.out).unwrap();
        assert_eq!(printed, "\rRestoring  50% (512.0B / 1.0KB)\rRestoring 100% (1.0KB / 1.0KB)\n");
    }

    #[test]
    fn console_progress_survives_failing_output() {
        let mut progress = ConsoleProgress::with_writer("Splitting", BrokenPipe);
        progress.report(1, 2);
        progress.report(2, 2);

        assert_eq!(progress.last_percent, Some(100));
    }
}
