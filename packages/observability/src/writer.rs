//! Append-only log file sink.
//!
//! Several processes may share one file, so every write is flushed
//! immediately and lines are never interleaved within a single process.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

const LOG_DIR: &str = ".unbound";
const WRITE_BUFFER: usize = 8192;

/// Default log file for `service`: `~/.unbound/logs/<service>.jsonl`.
///
/// Falls back to the system temp directory when no home directory is known.
pub fn default_log_path(service: &str) -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(LOG_DIR)
        .join("logs")
        .join(format!("{service}.jsonl"))
}

/// Shared handle to an append-mode log file.
#[derive(Clone)]
pub struct LogFile {
    path: PathBuf,
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl LogFile {
    /// Open `path` for appending, creating parent directories as needed.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            inner: Arc::new(Mutex::new(BufWriter::with_capacity(WRITE_BUFFER, file))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Write for LogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.inner.lock();
        let written = guard.write(buf)?;
        guard.flush()?;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogFile;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("logs").join("sync.jsonl");

        let file = LogFile::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(file.path(), path.as_path());
    }

    #[test]
    fn test_writes_are_appended_and_flushed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sync.jsonl");

        let mut first = LogFile::open(&path).unwrap();
        first.write_all(b"{\"n\":1}\n").unwrap();

        // A second handle appends rather than truncating.
        let mut second = LogFile::open(&path).unwrap();
        second.write_all(b"{\"n\":2}\n").unwrap();

        let mut content = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "{\"n\":1}\n{\"n\":2}\n");
    }

    #[test]
    fn test_default_path_uses_service_name() {
        let path = default_log_path("session-sync-demo");
        assert!(path.ends_with("logs/session-sync-demo.jsonl"));
    }
}
