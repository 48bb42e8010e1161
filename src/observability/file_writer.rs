//! Size-rotated file writing for logs and trace export.
//!
//! The exit runs inside somebody else's long-lived process, so anything it
//! writes to disk has to be bounded. [`RotatingWriter`] appends to one file
//! and, when the file passes the size threshold, renames it with a timestamp
//! suffix and starts fresh, keeping a fixed number of backups. The same
//! writer serves both the log layer (via [`LogSink`]) and the span exporter.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// Rotation threshold.
const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Backups kept after rotation.
const KEEP_BACKUPS: usize = 3;

/// Thread-safe appending writer with size-based rotation.
///
/// The file opens lazily on first write, so construction never fails; a path
/// that turns out to be unwritable surfaces as an error on the write instead.
pub struct RotatingWriter {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl RotatingWriter {
    /// Creates a writer for the given path without touching the filesystem.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self {
            path,
            file: Mutex::new(None),
        }
    }

    /// Appends one line, rotating first when the file is over the threshold.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be opened, renamed, or written.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        self.append(&buf)
    }

    /// Appends raw bytes, rotating first when the file is over the threshold.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be opened, renamed, or written.
    pub fn append(&self, bytes: &[u8]) -> io::Result<()> {
        let mut slot = self
            .file
            .lock()
            .map_err(|e| io::Error::other(format!("writer lock poisoned: {e}")))?;

        if self.needs_rotation() {
            *slot = None;
            self.rotate()?;
        }
        if slot.is_none() {
            *slot = Some(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)?,
            );
        }
        let file = slot
            .as_mut()
            .ok_or_else(|| io::Error::other("no file handle"))?;
        file.write_all(bytes)?;
        file.flush()
    }

    fn needs_rotation(&self) -> bool {
        fs::metadata(&self.path).is_ok_and(|m| m.len() > MAX_FILE_BYTES)
    }

    fn rotate(&self) -> io::Result<()> {
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        let mut backup = self.path.as_os_str().to_owned();
        backup.push(format!(".{stamp}"));
        if self.path.exists() {
            fs::rename(&self.path, PathBuf::from(backup))?;
        }
        self.prune_backups();
        Ok(())
    }

    /// Deletes the oldest backups beyond the retention count. Individual
    /// deletion failures are ignored so one stuck file cannot stop rotation.
    fn prune_backups(&self) {
        let Some(dir) = self.path.parent() else {
            return;
        };
        let Some(base) = self.path.file_name().and_then(|n| n.to_str()) else {
            return;
        };
        let prefix = format!("{base}.");
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        let mut backups: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix))
            })
            .collect();
        backups.sort_by_key(|p| {
            std::cmp::Reverse(fs::metadata(p).and_then(|m| m.modified()).ok())
        });
        for stale in backups.iter().skip(KEEP_BACKUPS) {
            let _ = fs::remove_file(stale);
        }
    }
}

impl std::fmt::Debug for RotatingWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatingWriter")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// `MakeWriter` adapter so the log layer can write through a shared
/// [`RotatingWriter`].
#[derive(Debug, Clone)]
pub struct LogSink(pub Arc<RotatingWriter>);

/// Per-event writer handed out by [`LogSink`].
#[derive(Debug)]
pub struct LogSinkHandle(Arc<RotatingWriter>);

impl io::Write for LogSinkHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.append(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = LogSinkHandle;

    fn make_writer(&'a self) -> Self::Writer {
        LogSinkHandle(Arc::clone(&self.0))
    }
}
