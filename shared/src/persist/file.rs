//! Rotating JSON-lines file log.

use super::queue::LogSink;
use super::PersistError;
use crate::models::LogEntry;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Base name of the file log written by the server and the CLI.
pub const FILE_LOG_NAME: &str = "tenantlog";

/// Appends one JSON object per line to `<dir>/<name>.log`.
///
/// When the next line would push the file past `max_bytes`, the file is
/// rotated: `<name>.log` becomes `<name>.log.1`, `<name>.log.1` becomes
/// `<name>.log.2`, and so on, keeping at most `max_files` rotated files.
#[derive(Debug)]
pub struct RotatingFileSink {
    dir: PathBuf,
    name: String,
    max_bytes: u64,
    max_files: usize,
    writer: Option<BufWriter<File>>,
    size: u64,
}

impl RotatingFileSink {
    /// Opens (or creates) the active log file.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub fn open(
        dir: impl Into<PathBuf>,
        name: impl Into<String>,
        max_bytes: u64,
        max_files: usize,
    ) -> Result<Self, PersistError> {
        let mut sink = Self {
            dir: dir.into(),
            name: name.into(),
            max_bytes: max_bytes.max(1),
            max_files,
            writer: None,
            size: 0,
        };
        sink.reopen()?;
        Ok(sink)
    }

    /// Path of the file currently written to.
    #[must_use]
    pub fn active_path(&self) -> PathBuf {
        active_path(&self.dir, &self.name)
    }

    fn reopen(&mut self) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.active_path();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        self.size = file.metadata()?.len();
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    fn rotate(&mut self) -> Result<(), PersistError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        let active = self.active_path();
        if self.max_files == 0 {
            fs::remove_file(&active)?;
        } else {
            let oldest = rotated_path(&self.dir, &self.name, self.max_files);
            if oldest.exists() {
                fs::remove_file(&oldest)?;
            }
            for index in (1..self.max_files).rev() {
                let from = rotated_path(&self.dir, &self.name, index);
                if from.exists() {
                    fs::rename(&from, rotated_path(&self.dir, &self.name, index + 1))?;
                }
            }
            fs::rename(&active, rotated_path(&self.dir, &self.name, 1))?;
        }

        tracing::debug!(file = %active.display(), "Rotated log file");
        self.reopen()
    }
}

impl LogSink for RotatingFileSink {
    fn write_batch(&mut self, entries: &[LogEntry]) -> Result<(), PersistError> {
        for entry in entries {
            let mut line = serde_json::to_vec(entry)?;
            line.push(b'\n');
            let len = line.len() as u64;

            if self.size > 0 && self.size + len > self.max_bytes {
                self.rotate()?;
            }
            if self.writer.is_none() {
                self.reopen()?;
            }
            if let Some(writer) = self.writer.as_mut() {
                writer.write_all(&line)?;
                self.size += len;
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), PersistError> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for RotatingFileSink {
    fn drop(&mut self) {
        let _ = LogSink::flush(self);
    }
}

/// Reads back every entry of a file log, oldest rotated file first.
///
/// Lines that are not valid entries are skipped.
///
/// # Errors
///
/// Returns an error if an existing file cannot be read.
pub fn read_file_log(dir: &Path, name: &str) -> Result<Vec<LogEntry>, PersistError> {
    let mut rotated: Vec<(usize, PathBuf)> = Vec::new();
    if dir.exists() {
        let prefix = format!("{name}.log.");
        for dir_entry in fs::read_dir(dir)? {
            let file_name = dir_entry?.file_name();
            let file_name = file_name.to_string_lossy();
            if let Some(index) = file_name
                .strip_prefix(&prefix)
                .and_then(|suffix| suffix.parse::<usize>().ok())
            {
                rotated.push((index, dir.join(&*file_name)));
            }
        }
    }
    rotated.sort_by(|a, b| b.0.cmp(&a.0));

    let mut files: Vec<PathBuf> = rotated.into_iter().map(|(_, path)| path).collect();
    let active = active_path(dir, name);
    if active.exists() {
        files.push(active);
    }

    let mut entries = Vec::new();
    for path in files {
        let reader = BufReader::new(File::open(&path)?);
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LogEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::debug!(file = %path.display(), error = %e, "Skipping malformed log line");
                }
            }
        }
    }
    Ok(entries)
}

fn active_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.log"))
}

fn rotated_path(dir: &Path, name: &str, index: usize) -> PathBuf {
    dir.join(format!("{name}.log.{index}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LogLevel;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    // Fixed timestamp and hostname keep every line the same length.
    fn entry(message: &str) -> LogEntry {
        LogEntry::new(LogLevel::Info, message, "file-test")
            .with_tenant("bot-1")
            .with_hostname("host")
            .with_timestamp(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())
    }

    fn line_len(message: &str) -> u64 {
        serde_json::to_vec(&entry(message)).unwrap().len() as u64 + 1
    }

    #[test]
    fn test_writes_json_lines() {
        let dir = TempDir::new().unwrap();
        let mut sink = RotatingFileSink::open(dir.path(), "app", 1024 * 1024, 3).unwrap();

        sink.write_batch(&[entry("one"), entry("two")]).unwrap();
        sink.flush().unwrap();

        let content = fs::read_to_string(sink.active_path()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["message"], "one");
        assert_eq!(first["tenantId"], "bot-1");
    }

    #[test]
    fn test_rotates_when_max_bytes_exceeded() {
        let dir = TempDir::new().unwrap();
        // Room for two lines per file.
        let max_bytes = line_len("msg-0") * 2;
        let mut sink = RotatingFileSink::open(dir.path(), "app", max_bytes, 2).unwrap();

        for i in 0..5 {
            sink.write_batch(&[entry(&format!("msg-{i}"))]).unwrap();
        }
        sink.flush().unwrap();

        assert!(dir.path().join("app.log").exists());
        assert!(dir.path().join("app.log.1").exists());
        assert!(dir.path().join("app.log.2").exists());
        assert!(!dir.path().join("app.log.3").exists());

        let messages: Vec<_> = read_file_log(dir.path(), "app")
            .unwrap()
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, vec!["msg-0", "msg-1", "msg-2", "msg-3", "msg-4"]);
    }

    #[test]
    fn test_keeps_at_most_max_files() {
        let dir = TempDir::new().unwrap();
        let max_bytes = line_len("msg-0");
        let mut sink = RotatingFileSink::open(dir.path(), "app", max_bytes, 1).unwrap();

        for i in 0..4 {
            sink.write_batch(&[entry(&format!("msg-{i}"))]).unwrap();
        }
        sink.flush().unwrap();

        let messages: Vec<_> = read_file_log(dir.path(), "app")
            .unwrap()
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, vec!["msg-2", "msg-3"]);
    }

    #[test]
    fn test_reopen_appends_to_existing_file() {
        let dir = TempDir::new().unwrap();
        {
            let mut sink = RotatingFileSink::open(dir.path(), "app", 1024 * 1024, 3).unwrap();
            sink.write_batch(&[entry("first run")]).unwrap();
        }
        let mut sink = RotatingFileSink::open(dir.path(), "app", 1024 * 1024, 3).unwrap();
        sink.write_batch(&[entry("second run")]).unwrap();
        sink.flush().unwrap();

        assert_eq!(read_file_log(dir.path(), "app").unwrap().len(), 2);
    }

    #[test]
    fn test_read_missing_log_is_empty() {
        let dir = TempDir::new().unwrap();
        let entries = read_file_log(&dir.path().join("nope"), "app").unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_read_skips_malformed_lines() {
        let dir = TempDir::new().unwrap();
        let line = serde_json::to_string(&entry("good")).unwrap();
        fs::write(dir.path().join("app.log"), format!("not json\n{line}\n")).unwrap();

        let entries = read_file_log(dir.path(), "app").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "good");
    }
}
