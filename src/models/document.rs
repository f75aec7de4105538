// file: src/models/document.rs
// description: source document model produced by the directory scanner
// reference: internal data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// One document found on disk. Rebuilt on every run, never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Path relative to the scan root with `/` separators; the sync key.
    pub filename: String,
    pub path: PathBuf,
    pub content: String,
    pub derived_text: String,
    pub modified_at: DateTime<Utc>,
    pub size: u64,
    /// Front-matter override, falls back to the configured default trigger.
    pub trigger: Option<String>,
    /// Front-matter override, falls back to the filename stem.
    pub label: Option<String>,
}

impl SourceRecord {
    pub fn new(filename: impl Into<String>, content: impl Into<String>, modified_at: DateTime<Utc>) -> Self {
        let filename = filename.into();
        let content = content.into();
        let size = content.len() as u64;

        Self {
            path: PathBuf::from(&filename),
            filename,
            derived_text: content.clone(),
            content,
            modified_at,
            size,
            trigger: None,
            label: None,
        }
    }

    pub fn with_derived_text(mut self, derived_text: impl Into<String>) -> Self {
        self.derived_text = derived_text.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn content_hash(&self) -> String {
        compute_hash(&self.content)
    }

    /// Filename with the extension stripped, directories kept.
    pub fn stem(&self) -> String {
        strip_extension(&self.filename)
    }
}

pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn strip_extension(filename: &str) -> String {
    Path::new(filename)
        .with_extension("")
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_source_record_creation() {
        let modified = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let record = SourceRecord::new("a.md", "# Purpose\nDo X", modified);

        assert_eq!(record.filename, "a.md");
        assert_eq!(record.size, 14);
        assert_eq!(record.derived_text, record.content);
        assert_eq!(record.stem(), "a");
        assert!(record.trigger.is_none());
    }

    #[test]
    fn test_hash_consistency() {
        let content = "Test content";
        assert_eq!(compute_hash(content), compute_hash(content));
        assert_ne!(compute_hash(content), compute_hash("other"));
    }

    #[test]
    fn test_nested_stem() {
        assert_eq!(strip_extension("summarize/system.md"), "summarize/system");
        assert_eq!(strip_extension("notes"), "notes");
    }
}
