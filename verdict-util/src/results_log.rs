use anyhow::{Context, Result};
use fd_lock::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

/// An append-only JSON Lines file holding one record per line.
///
/// Every append takes an exclusive advisory lock on the file, so records written by
/// concurrent harness processes never interleave.
#[derive(Clone, Debug)]
pub struct ResultsLog {
    path: PathBuf,
}

impl ResultsLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `records`, one JSON document per line.
    pub fn append<T: Serialize>(&self, records: &[T]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut buf = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }

        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open results log {}", self.path.display()))?;
        let mut lock = RwLock::new(file);
        let mut guard = lock
            .write()
            .with_context(|| format!("failed to lock results log {}", self.path.display()))?;
        guard.write_all(&buf)?;
        guard.flush()?;
        tracing::debug!(
            "appended {} record(s) to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Read every record back, oldest first. A missing log reads as empty.
    pub fn read<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(ix, line)| {
                serde_json::from_str(line).with_context(|| {
                    format!("malformed record {} in {}", ix + 1, self.path.display())
                })
            })
            .collect()
    }
}
