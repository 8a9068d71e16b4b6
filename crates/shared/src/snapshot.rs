//! JSON snapshots of external API responses.
//!
//! Every response received from AniList or OpenAI is written out as a
//! pretty-printed, timestamped JSON file so a run can be inspected after
//! the fact.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Writes `<timestamp>-<prefix>.json` files under one output directory
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Pretty-print a raw JSON body and write it under `prefix`.
    ///
    /// Fails if the body is not valid JSON.
    pub fn write_raw(&self, prefix: &str, body: &[u8]) -> Result<PathBuf> {
        let value: serde_json::Value =
            serde_json::from_slice(body).context("Snapshot body is not valid JSON")?;
        self.write_value(prefix, &value)
    }

    /// Serialize `value` as pretty JSON and write it under `prefix`
    pub fn write_value<T: Serialize>(&self, prefix: &str, value: &T) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create snapshot directory: {}", self.dir.display()))?;

        let pretty =
            serde_json::to_vec_pretty(value).context("Failed to serialize snapshot value")?;

        let timestamp = chrono::Local::now().format("%Y-%m-%dT%H-%M-%S");
        let filename = format!("{}-{}.json", timestamp, prefix);
        let path = self.dir.join(filename);

        std::fs::write(&path, pretty)
            .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;

        tracing::debug!(path = %path.display(), "Snapshot written");

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_raw_pretty_prints() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let writer = SnapshotWriter::new(temp_dir.path().join("snapshots"));

        let path = writer.write_raw("aniList", br#"{"data":{"Media":{"id":1}}}"#)?;

        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with("-aniList.json"));

        let contents = std::fs::read_to_string(&path)?;
        // Pretty printing puts nested keys on their own lines
        assert!(contents.contains("\"Media\""));
        assert!(contents.lines().count() > 1);

        Ok(())
    }

    #[test]
    fn test_write_raw_rejects_non_json() {
        let temp_dir = TempDir::new().unwrap();
        let writer = SnapshotWriter::new(temp_dir.path());

        assert!(writer.write_raw("bad", b"not json at all").is_err());
    }

    #[test]
    fn test_write_value() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let writer = SnapshotWriter::new(temp_dir.path());

        let path = writer.write_value("combined", &serde_json::json!({"edges": []}))?;
        assert!(path.exists());

        Ok(())
    }
}
