// file: src/pipeline/detector.rs
// description: classifies scanned documents against stored records
// reference: internal change detection

use crate::error::SyncError;
use crate::models::{ChangeSet, DuplicateGroup, PointId, SourceRecord, StoredRecord};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

struct StoredEntry {
    id: PointId,
    modified_at: Option<DateTime<Utc>>,
    duplicates: Vec<PointId>,
}

#[derive(Debug, Default)]
pub struct ChangeDetector;

impl ChangeDetector {
    pub fn new() -> Self {
        Self
    }

    /// A source record is `modified` only when its timestamp is strictly
    /// newer than the stored one; equal timestamps count as unchanged.
    /// When several points share a filename the first one in store order
    /// is used and the rest are reported in `duplicates`.
    pub fn detect(&self, sources: &[SourceRecord], stored: &[StoredRecord]) -> ChangeSet {
        let mut order: Vec<String> = Vec::new();
        let mut by_filename: HashMap<String, StoredEntry> = HashMap::new();

        for record in stored {
            let Some(filename) = record.filename() else {
                warn!("Stored point {} has no filename, ignoring it", record.id);
                continue;
            };

            match by_filename.get_mut(filename) {
                Some(entry) => entry.duplicates.push(record.id.clone()),
                None => {
                    order.push(filename.to_string());
                    by_filename.insert(
                        filename.to_string(),
                        StoredEntry {
                            id: record.id.clone(),
                            modified_at: record.modified_at(),
                            duplicates: Vec::new(),
                        },
                    );
                }
            }
        }

        let mut changes = ChangeSet::default();

        for filename in &order {
            let entry = &by_filename[filename];
            if entry.duplicates.is_empty() {
                continue;
            }
            let error = SyncError::DuplicateRecord {
                filename: filename.clone(),
                count: entry.duplicates.len() + 1,
            };
            warn!("{}; using point {}", error, entry.id);
            changes.duplicates.push(DuplicateGroup {
                filename: filename.clone(),
                kept: entry.id.clone(),
                ignored: entry.duplicates.clone(),
            });
        }

        let mut scanned = HashSet::new();
        for source in sources {
            if !scanned.insert(source.filename.as_str()) {
                warn!("Document {} was scanned twice, using the first", source.filename);
                continue;
            }

            match by_filename.get(&source.filename) {
                None => {
                    debug!("New: {}", source.filename);
                    changes.new.push(source.clone());
                }
                Some(entry) => {
                    let stored_at = entry.modified_at.unwrap_or_default();
                    if source.modified_at > stored_at {
                        debug!(
                            "Modified: {} ({} > {})",
                            source.filename, source.modified_at, stored_at
                        );
                        changes
                            .stored_ids
                            .insert(source.filename.clone(), entry.id.clone());
                        changes.modified.push(source.clone());
                    }
                }
            }
        }

        for filename in order {
            if scanned.contains(filename.as_str()) {
                continue;
            }
            debug!("Deleted: {}", filename);
            let id = by_filename[&filename].id.clone();
            changes.stored_ids.insert(filename.clone(), id);
            changes.deleted.push(filename);
        }

        info!(
            "Detected {} new, {} modified, {} deleted",
            changes.new.len(),
            changes.modified.len(),
            changes.deleted.len()
        );
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawPayload;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn source(filename: &str, modified: DateTime<Utc>) -> SourceRecord {
        SourceRecord::new(filename, format!("content of {}", filename), modified)
    }

    fn stored(id: u64, filename: &str, modified: Option<DateTime<Utc>>) -> StoredRecord {
        StoredRecord {
            id: PointId::Num(id),
            vector: None,
            payload: RawPayload {
                filename: Some(filename.to_string()),
                content: Some("stored".to_string()),
                modified_at: modified.map(|m| m.to_rfc3339()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_new_file_detection() {
        let changes = ChangeDetector::new().detect(&[source("a.md", ts(0))], &[]);

        assert_eq!(changes.new_filenames(), vec!["a.md"]);
        assert!(changes.modified.is_empty());
        assert!(changes.deleted.is_empty());
    }

    #[test]
    fn test_deletion_detection() {
        let changes = ChangeDetector::new().detect(&[], &[stored(1, "b.md", Some(ts(0)))]);

        assert_eq!(changes.deleted, vec!["b.md".to_string()]);
        assert_eq!(changes.stored_id("b.md"), Some(&PointId::Num(1)));
        assert!(changes.new.is_empty());
    }

    #[test]
    fn test_equal_timestamp_is_unchanged() {
        let changes = ChangeDetector::new()
            .detect(&[source("a.md", ts(10))], &[stored(1, "a.md", Some(ts(10)))]);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_older_timestamp_is_unchanged() {
        let changes = ChangeDetector::new()
            .detect(&[source("a.md", ts(5))], &[stored(1, "a.md", Some(ts(10)))]);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_newer_timestamp_is_modified() {
        let newer = ts(10) + Duration::nanoseconds(1);
        let changes = ChangeDetector::new()
            .detect(&[source("a.md", newer)], &[stored(4, "a.md", Some(ts(10)))]);

        assert_eq!(changes.modified_filenames(), vec!["a.md"]);
        assert_eq!(changes.stored_id("a.md"), Some(&PointId::Num(4)));
    }

    #[test]
    fn test_missing_stored_timestamp_counts_as_modified() {
        let changes =
            ChangeDetector::new().detect(&[source("a.md", ts(0))], &[stored(1, "a.md", None)]);
        assert_eq!(changes.modified.len(), 1);
    }

    #[test]
    fn test_sets_are_disjoint() {
        let sources = vec![source("new.md", ts(0)), source("mod.md", ts(20)), source("same.md", ts(5))];
        let stored_records = vec![
            stored(1, "mod.md", Some(ts(10))),
            stored(2, "same.md", Some(ts(5))),
            stored(3, "gone.md", Some(ts(5))),
        ];

        let changes = ChangeDetector::new().detect(&sources, &stored_records);

        assert_eq!(changes.new_filenames(), vec!["new.md"]);
        assert_eq!(changes.modified_filenames(), vec!["mod.md"]);
        assert_eq!(changes.deleted, vec!["gone.md".to_string()]);
        assert_eq!(changes.total(), 3);
    }

    #[test]
    fn test_duplicates_first_seen_wins() {
        let stored_records = vec![
            stored(7, "a.md", Some(ts(0))),
            stored(3, "a.md", Some(ts(100))),
        ];

        let changes = ChangeDetector::new().detect(&[source("a.md", ts(50))], &stored_records);

        assert_eq!(changes.modified_filenames(), vec!["a.md"]);
        assert_eq!(changes.stored_id("a.md"), Some(&PointId::Num(7)));
        assert_eq!(
            changes.duplicates,
            vec![DuplicateGroup {
                filename: "a.md".to_string(),
                kept: PointId::Num(7),
                ignored: vec![PointId::Num(3)],
            }]
        );
    }

    #[test]
    fn test_points_without_filename_are_ignored() {
        let nameless = StoredRecord {
            id: PointId::Num(9),
            vector: None,
            payload: RawPayload::default(),
        };
        let changes = ChangeDetector::new().detect(&[], &[nameless]);
        assert!(changes.is_empty());
    }
}
