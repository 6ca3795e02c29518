//! File-backed diagnostics: response dumps and append-only line logs.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::{Error, Result, TRACING_TARGET_FILES};

/// Writes the raw body of the most recent response to a fixed path.
///
/// Each write overwrites the previous dump. Concurrent callers sharing the
/// same path race, and the last writer wins. Failures are logged and
/// swallowed unless the dump is marked as required.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticDump {
    path: Option<PathBuf>,
    required: bool,
}

impl DiagnosticDump {
    /// Creates a best-effort dump writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            required: false,
        }
    }

    /// Creates a dump that never writes anything.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Creates a dump from an optional path.
    pub fn from_path(path: Option<PathBuf>) -> Self {
        path.map(Self::new).unwrap_or_default()
    }

    /// Makes write failures fatal to the caller.
    #[must_use]
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Returns the target path, if enabled.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns true if write failures are reported to the caller.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Persists `contents`, replacing any previous dump.
    pub async fn write(&self, contents: &[u8]) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        match tokio::fs::write(path, contents).await {
            Ok(()) => {
                tracing::trace!(
                    target: TRACING_TARGET_FILES,
                    path = %path.display(),
                    size = contents.len(),
                    "Diagnostic dump written"
                );
                Ok(())
            }
            Err(err) if self.required => Err(Error::file_access()
                .with_message(format!("failed to write {}", path.display()))
                .with_source(err)),
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET_FILES,
                    path = %path.display(),
                    error = %err,
                    "Failed to write diagnostic dump"
                );
                Ok(())
            }
        }
    }
}

/// An append-only text log shared between concurrent writers.
///
/// Every entry is a single open, append, close cycle performed while holding
/// an internal lock, so lines from different tasks never interleave.
#[derive(Debug)]
pub struct AppendLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl AppendLog {
    /// Creates a log appending to `path`. The file is created lazily.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `line` followed by a newline.
    pub async fn append(&self, line: &str) -> Result<()> {
        let mut buffer = String::with_capacity(line.len() + 1);
        buffer.push_str(line);
        buffer.push('\n');

        let _guard = self.lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.file_error("open", e))?;

        file.write_all(buffer.as_bytes())
            .await
            .map_err(|e| self.file_error("write", e))?;
        file.flush().await.map_err(|e| self.file_error("flush", e))?;

        Ok(())
    }

    /// Appends `line` prefixed with the current local time in RFC 3339 form,
    /// as in `[2025-03-14T09:26:53+03:00] line`.
    pub async fn append_stamped(&self, line: &str) -> Result<()> {
        self.append(&format!("[{}] {line}", rfc3339_now())).await
    }

    fn file_error(&self, action: &str, err: std::io::Error) -> Error {
        Error::file_access()
            .with_message(format!("failed to {action} {}", self.path.display()))
            .with_source(err)
    }
}

/// Returns the current local time formatted as RFC 3339 with a numeric offset.
pub fn rfc3339_now() -> String {
    jiff::Zoned::now()
        .strftime("%Y-%m-%dT%H:%M:%S%:z")
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_dump_overwrites_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api_response.json");
        let dump = DiagnosticDump::new(&path);

        dump.write(b"first").await.unwrap();
        dump.write(b"second").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    }

    #[tokio::test]
    async fn test_best_effort_dump_swallows_failures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("dump.json");

        let dump = DiagnosticDump::new(&path);
        assert!(dump.write(b"{}").await.is_ok());

        let dump = DiagnosticDump::new(&path).with_required(true);
        let error = dump.write(b"{}").await.unwrap_err();
        assert_eq!(error.kind(), crate::ErrorKind::FileAccess);
    }

    #[tokio::test]
    async fn test_disabled_dump_is_noop() {
        let dump = DiagnosticDump::from_path(None);
        assert!(dump.path().is_none());
        assert!(dump.write(b"ignored").await.is_ok());
    }

    #[tokio::test]
    async fn test_stamped_lines_carry_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let log = AppendLog::new(dir.path().join("proxy_check.log"));

        log.append_stamped("Proxy: false").await.unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let line = contents.trim_end();
        assert!(line.starts_with('['));
        assert!(line.ends_with("] Proxy: false"));
        let stamp = &line[1..line.find(']').unwrap()];
        assert!(stamp.parse::<jiff::Timestamp>().is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_appends_do_not_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(AppendLog::new(dir.path().join("timing.log")));

        let mut handles = Vec::new();
        for i in 0..16 {
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                let line = format!("entry {i:02} {}", "x".repeat(512));
                log.append(&line).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 16);
        for line in lines {
            assert!(line.starts_with("entry "));
            assert_eq!(line.len(), "entry 00 ".len() + 512);
        }
    }
}
