// file: src/repository/scanner.rs
// description: Directory walking and source document discovery with depth limiting
// reference: https://docs.rs/walkdir

use crate::config::SourceConfig;
use crate::error::{Result, SyncError};
use crate::models::SourceRecord;
use crate::parser::{FrontmatterParser, SectionExtractor};
use crate::utils::Validator;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

pub struct DocumentScanner {
    config: SourceConfig,
    sections: SectionExtractor,
    frontmatter: FrontmatterParser,
}

/// Documents read successfully plus one error per document that was skipped.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub records: Vec<SourceRecord>,
    pub failures: Vec<SyncError>,
}

impl DocumentScanner {
    pub fn new(config: SourceConfig) -> Self {
        let sections = SectionExtractor::new(&config.section_keywords);
        Self {
            config,
            sections,
            frontmatter: FrontmatterParser::new(),
        }
    }

    pub fn scan_configured(&self) -> Result<ScanResult> {
        self.scan(&self.config.root, self.config.max_depth)
    }

    /// Reads every matching document at depth <= `max_depth` below `root`
    /// (0 = files directly in `root`). A document that cannot be read or
    /// parsed is recorded in `failures` and the scan continues.
    pub fn scan(&self, root: &Path, max_depth: usize) -> Result<ScanResult> {
        Validator::validate_directory(root)?;
        info!("Scanning directory: {} (max depth {})", root.display(), max_depth);

        let mut result = ScanResult::default();
        let mut seen = HashSet::new();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .min_depth(1)
            .max_depth(max_depth + 1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                    warn!("Skipping unreadable entry {}: {}", path.display(), e);
                    result.failures.push(SyncError::Processing {
                        path,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.has_source_extension(entry.path()) {
                continue;
            }

            match self.read_document(root, &entry) {
                Ok(record) => {
                    if seen.insert(record.filename.clone()) {
                        debug!("Scanned {} ({} bytes)", record.filename, record.size);
                        result.records.push(record);
                    } else {
                        warn!("Ignoring second document with filename {}", record.filename);
                    }
                }
                Err(e) => {
                    warn!("Skipping document: {}", e);
                    result.failures.push(e);
                }
            }
        }

        info!(
            "Found {} documents ({} skipped)",
            result.records.len(),
            result.failures.len()
        );
        Ok(result)
    }

    fn has_source_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                self.config
                    .extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    fn read_document(&self, root: &Path, entry: &DirEntry) -> Result<SourceRecord> {
        let path = entry.path();
        let processing = |message: String| SyncError::Processing {
            path: path.to_path_buf(),
            message,
        };

        let bytes = fs::read(path).map_err(|e| processing(format!("read failed: {}", e)))?;
        let size = bytes.len() as u64;
        let content =
            String::from_utf8(bytes).map_err(|e| processing(format!("not valid UTF-8: {}", e)))?;

        let modified: DateTime<Utc> = entry
            .metadata()
            .map_err(|e| processing(format!("metadata unavailable: {}", e)))?
            .modified()
            .map_err(|e| processing(format!("modification time unavailable: {}", e)))?
            .into();

        let (frontmatter, body) = match self.frontmatter.extract(path, &content)? {
            Some((frontmatter, body)) => (Some(frontmatter), body),
            None => (None, content.as_str()),
        };

        let derived_text = self.sections.extract(body).unwrap_or_else(|| {
            debug!("No keyword sections in {}, using full content", path.display());
            content.clone()
        });

        let filename = relative_key(root, path);
        let mut record = SourceRecord::new(filename, content.clone(), modified)
            .with_derived_text(derived_text)
            .with_path(path)
            .with_size(size);

        if let Some(frontmatter) = frontmatter {
            record.trigger = frontmatter.trigger();
            record.label = frontmatter.label();
        }

        Ok(record)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

/// Path below `root` with `/` separators, stable across platforms.
fn relative_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfig;
    use std::fs;
    use tempfile::TempDir;

    fn scanner() -> DocumentScanner {
        DocumentScanner::new(SourceConfig::default())
    }

    #[test]
    fn test_scan_directory() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.md"), "# Purpose\nDo X").unwrap();
        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

        let result = scanner().scan(temp.path(), 1).unwrap();

        assert_eq!(result.records.len(), 1);
        let record = &result.records[0];
        assert_eq!(record.filename, "a.md");
        assert_eq!(record.content, "# Purpose\nDo X");
        assert_eq!(record.derived_text, "# Purpose\nDo X");
        assert_eq!(record.size, 14);
        assert!(result.failures.is_empty());
    }

    #[test]
    fn test_depth_limit() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("summarize");
        let deeper = nested.join("old");
        fs::create_dir_all(&deeper).unwrap();
        fs::write(temp.path().join("root.md"), "root").unwrap();
        fs::write(nested.join("system.md"), "nested").unwrap();
        fs::write(deeper.join("system.md"), "too deep").unwrap();

        let names = |depth| {
            scanner()
                .scan(temp.path(), depth)
                .unwrap()
                .records
                .into_iter()
                .map(|r| r.filename)
                .collect::<Vec<_>>()
        };

        assert_eq!(names(0), vec!["root.md"]);
        assert_eq!(names(1), vec!["root.md", "summarize/system.md"]);
        assert_eq!(names(2).len(), 3);
    }

    #[test]
    fn test_missing_root_is_invalid_input() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing");
        assert!(matches!(
            scanner().scan(&missing, 1),
            Err(SyncError::InvalidInput(_))
        ));

        let file = temp.path().join("file.md");
        fs::write(&file, "x").unwrap();
        assert!(matches!(
            scanner().scan(&file, 1),
            Err(SyncError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_bad_file_does_not_block_others() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.md"), "fine").unwrap();
        fs::write(temp.path().join("b.md"), [0xff, 0xfe, 0x00]).unwrap();
        fs::write(temp.path().join("c.md"), "also fine").unwrap();

        let result = scanner().scan(temp.path(), 1).unwrap();

        let names: Vec<_> = result.records.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["a.md", "c.md"]);
        assert_eq!(result.failures.len(), 1);
        assert!(matches!(result.failures[0], SyncError::Processing { .. }));
    }

    #[test]
    fn test_frontmatter_overrides_and_sections() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("sum.md"),
            "---\ntrigger: \";;sum\"\n---\n# IDENTITY\nYou summarize.\n# STEPS\n- read\n",
        )
        .unwrap();

        let result = scanner().scan(temp.path(), 0).unwrap();
        let record = &result.records[0];

        assert_eq!(record.trigger.as_deref(), Some(";;sum"));
        assert!(record.label.is_none());
        assert!(record.content.starts_with("---\n"));
        assert_eq!(
            record.derived_text,
            "# IDENTITY\nYou summarize.\n# STEPS\n- read"
        );
    }

    #[test]
    fn test_hidden_directories_are_skipped() {
        let temp = TempDir::new().unwrap();
        let hidden = temp.path().join(".obsidian");
        fs::create_dir_all(&hidden).unwrap();
        fs::write(hidden.join("workspace.md"), "x").unwrap();
        fs::write(temp.path().join("a.md"), "a").unwrap();

        let result = scanner().scan(temp.path(), 1).unwrap();
        assert_eq!(result.records.len(), 1);
    }
}
