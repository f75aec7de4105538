// file: src/pipeline/synchronizer.rs
// description: applies a change set to the record store with per-record isolation
// reference: internal synchronization logic

use crate::database::{Embedder, RecordStore};
use crate::error::{Result, SyncError};
use crate::models::{ChangeSet, NewPoint, PayloadDefaults, PointId, RecordPayload, SourceRecord, StoredRecord};
use crate::pipeline::progress::SyncProgress;
use crate::utils::Validator;
use std::fmt;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    New,
    Modified,
    Deleted,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeKind::New => "new",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppliedChange {
    pub filename: String,
    pub kind: ChangeKind,
    pub id: PointId,
}

#[derive(Debug)]
pub struct SkippedRecord {
    pub filename: String,
    pub kind: ChangeKind,
    pub reason: SyncError,
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub applied: Vec<AppliedChange>,
    pub skipped_with_reason: Vec<SkippedRecord>,
}

impl SyncReport {
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.applied.iter().filter(|c| c.kind == kind).count()
    }

    pub fn skipped_filenames(&self) -> Vec<&str> {
        self.skipped_with_reason
            .iter()
            .map(|s| s.filename.as_str())
            .collect()
    }
}

/// Outcome of completing the payloads of stored points.
#[derive(Debug, Default)]
pub struct RepairReport {
    pub checked: usize,
    pub repaired: Vec<(PointId, Vec<&'static str>)>,
    pub invalid: Vec<(PointId, SyncError)>,
}

pub struct Synchronizer {
    defaults: PayloadDefaults,
    dimensions: Option<usize>,
    show_progress: bool,
    colored: bool,
}

impl Synchronizer {
    pub fn new(defaults: PayloadDefaults) -> Self {
        Self {
            defaults,
            dimensions: None,
            show_progress: false,
            colored: false,
        }
    }

    /// Vector size the store expects. Without it the embedder's own size is used.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn with_progress(mut self, show_progress: bool, colored: bool) -> Self {
        self.show_progress = show_progress;
        self.colored = colored;
        self
    }

    /// Applies new, modified and deleted records in that order. A failure on
    /// one record lands in `skipped_with_reason` and the rest carry on.
    pub async fn apply(
        &self,
        changes: &ChangeSet,
        store: &dyn RecordStore,
        embedder: &dyn Embedder,
    ) -> SyncReport {
        let mut report = SyncReport::default();
        if changes.is_empty() {
            debug!("Nothing to apply");
            return report;
        }

        let progress = SyncProgress::new(changes.total(), self.show_progress, self.colored);
        let expected = self.dimensions.unwrap_or_else(|| embedder.dimensions());

        for source in &changes.new {
            progress.set_message(format!("Adding {}", source.filename));
            let result = self
                .write_record(source, PointId::generate(), store, embedder, expected)
                .await;
            self.record(&mut report, &progress, &source.filename, ChangeKind::New, result);
        }

        for source in &changes.modified {
            progress.set_message(format!("Updating {}", source.filename));
            let result = match self.resolve_id(changes, &source.filename, store).await {
                Ok(id) => self.write_record(source, id, store, embedder, expected).await,
                Err(e) => Err(e),
            };
            self.record(&mut report, &progress, &source.filename, ChangeKind::Modified, result);
        }

        for filename in &changes.deleted {
            progress.set_message(format!("Removing {}", filename));
            let result = match self.resolve_id(changes, filename, store).await {
                Ok(id) => store
                    .delete(std::slice::from_ref(&id))
                    .await
                    .map(|_| id),
                Err(e) => Err(e),
            };
            self.record(&mut report, &progress, filename, ChangeKind::Deleted, result);
        }

        progress.finish();
        let stats = progress.get_stats();
        info!(
            "Applied {} changes, skipped {} ({:.1}% success, {} ms)",
            stats.records_applied,
            stats.records_skipped,
            stats.success_rate(),
            stats.duration_ms
        );
        report
    }

    fn record(
        &self,
        report: &mut SyncReport,
        progress: &SyncProgress,
        filename: &str,
        kind: ChangeKind,
        result: Result<PointId>,
    ) {
        match result {
            Ok(id) => {
                debug!("{} {} as point {}", kind, filename, id);
                progress.inc_applied();
                report.applied.push(AppliedChange {
                    filename: filename.to_string(),
                    kind,
                    id,
                });
            }
            Err(reason) => {
                if matches!(reason, SyncError::Validation(_)) {
                    warn!("Skipping {} record {}: {}", kind, filename, reason);
                } else {
                    error!("Failed to apply {} record {}: {}", kind, filename, reason);
                }
                progress.inc_skipped();
                report.skipped_with_reason.push(SkippedRecord {
                    filename: filename.to_string(),
                    kind,
                    reason,
                });
            }
        }
    }

    /// Id chosen by the detector, or the first point found by filename.
    async fn resolve_id(
        &self,
        changes: &ChangeSet,
        filename: &str,
        store: &dyn RecordStore,
    ) -> Result<PointId> {
        if let Some(id) = changes.stored_id(filename) {
            return Ok(id.clone());
        }

        let matches = store.find_by_filename(filename).await?;
        if matches.len() > 1 {
            warn!(
                "{}",
                SyncError::DuplicateRecord {
                    filename: filename.to_string(),
                    count: matches.len(),
                }
            );
        }
        matches
            .into_iter()
            .next()
            .map(|record| record.id)
            .ok_or_else(|| SyncError::Store(format!("no stored point for {}", filename)))
    }

    async fn write_record(
        &self,
        source: &SourceRecord,
        id: PointId,
        store: &dyn RecordStore,
        embedder: &dyn Embedder,
        expected: usize,
    ) -> Result<PointId> {
        Validator::validate_content_not_empty(&source.filename, &source.content)?;
        let payload = RecordPayload::from_source(source, &self.defaults)?;

        let vector = embedder.embed(&payload.derived_text).await?;
        Validator::validate_vector(&source.filename, &vector, expected)?;

        store
            .upsert(NewPoint {
                id: id.clone(),
                vector,
                payload,
            })
            .await?;
        Ok(id)
    }

    /// Fills missing non-critical payload fields on stored points.
    /// Points missing `filename` or `content` are reported, never rewritten.
    pub async fn repair_payloads(
        &self,
        records: &[StoredRecord],
        store: &dyn RecordStore,
    ) -> RepairReport {
        let mut report = RepairReport {
            checked: records.len(),
            ..RepairReport::default()
        };

        for record in records {
            let defaults = PayloadDefaults {
                size: record
                    .payload
                    .content
                    .as_ref()
                    .map(|c| c.len() as u64)
                    .unwrap_or(self.defaults.size),
                ..self.defaults.clone()
            };

            match record.payload.complete(&defaults) {
                Ok((_, fixed)) if fixed.is_empty() => {}
                Ok((payload, fixed)) => match store.set_payload(&record.id, &payload).await {
                    Ok(()) => {
                        info!("Repaired point {}: filled {}", record.id, fixed.join(", "));
                        report.repaired.push((record.id.clone(), fixed));
                    }
                    Err(e) => {
                        warn!("Could not repair point {}: {}", record.id, e);
                        report.invalid.push((record.id.clone(), e));
                    }
                },
                Err(e) => {
                    warn!("Point {} cannot be repaired: {}", record.id, e);
                    report.invalid.push((record.id.clone(), e));
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{HashEmbedder, InMemoryStore};
    use crate::models::RawPayload;
    use crate::pipeline::ChangeDetector;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn synchronizer() -> Synchronizer {
        Synchronizer::new(PayloadDefaults::new(";;fab"))
    }

    fn source(filename: &str, content: &str) -> SourceRecord {
        SourceRecord::new(filename, content, Utc.timestamp_opt(1_700_000_000, 0).unwrap())
    }

    struct WrongSizeEmbedder;

    #[async_trait]
    impl Embedder for WrongSizeEmbedder {
        fn dimensions(&self) -> usize {
            8
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0; 3])
        }
    }

    #[tokio::test]
    async fn test_partial_failure_isolation() {
        let store = InMemoryStore::new();
        let embedder = HashEmbedder::new(8);
        let sources = vec![source("1.md", "one"), source("2.md", ""), source("3.md", "three")];
        let changes = ChangeDetector::new().detect(&sources, &[]);

        let report = synchronizer().apply(&changes, &store, &embedder).await;

        let applied: Vec<_> = report.applied.iter().map(|c| c.filename.as_str()).collect();
        assert_eq!(applied, vec!["1.md", "3.md"]);
        assert_eq!(report.skipped_filenames(), vec!["2.md"]);
        assert!(matches!(
            report.skipped_with_reason[0].reason,
            SyncError::Validation(_)
        ));
        assert_eq!(store.point_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_is_isolated() {
        let store = InMemoryStore::new();
        store.fail_on("b.md");
        let embedder = HashEmbedder::new(8);
        let changes = ChangeDetector::new().detect(&[source("a.md", "a"), source("b.md", "b")], &[]);

        let report = synchronizer().apply(&changes, &store, &embedder).await;

        assert_eq!(report.count(ChangeKind::New), 1);
        assert!(matches!(
            report.skipped_with_reason[0].reason,
            SyncError::Store(_)
        ));
    }

    #[tokio::test]
    async fn test_modified_reuses_identifier() {
        let store = InMemoryStore::new();
        let embedder = HashEmbedder::new(8);
        let id = store.insert_raw(
            RawPayload {
                filename: Some("a.md".into()),
                content: Some("old".into()),
                modified_at: Some("2020-01-01T00:00:00Z".into()),
                ..Default::default()
            },
            Some(vec![0.0; 8]),
        );

        let changes = ChangeDetector::new().detect(&[source("a.md", "new")], &store.records());
        let report = synchronizer().apply(&changes, &store, &embedder).await;

        assert_eq!(report.applied[0].id, id);
        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload.content.as_deref(), Some("new"));
        assert_eq!(records[0].payload.trigger.as_deref(), Some(";;fab"));
    }

    #[tokio::test]
    async fn test_delete_falls_back_to_filename_lookup() {
        let store = InMemoryStore::new();
        let embedder = HashEmbedder::new(8);
        store.insert_raw(
            RawPayload {
                filename: Some("b.md".into()),
                content: Some("b".into()),
                ..Default::default()
            },
            None,
        );

        let mut changes = ChangeSet::default();
        changes.deleted.push("b.md".to_string());
        let report = synchronizer().apply(&changes, &store, &embedder).await;

        assert_eq!(report.count(ChangeKind::Deleted), 1);
        assert_eq!(store.point_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_vector_size_mismatch_is_skipped() {
        let store = InMemoryStore::new();
        let changes = ChangeDetector::new().detect(&[source("a.md", "a")], &[]);

        let report = synchronizer().apply(&changes, &store, &WrongSizeEmbedder).await;

        assert!(report.applied.is_empty());
        assert!(matches!(
            report.skipped_with_reason[0].reason,
            SyncError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_repair_fills_missing_fields() {
        let store = InMemoryStore::new();
        store.insert_raw(
            RawPayload {
                filename: Some("a.md".into()),
                content: Some("body".into()),
                ..Default::default()
            },
            None,
        );
        store.insert_raw(
            RawPayload {
                filename: Some("broken.md".into()),
                ..Default::default()
            },
            None,
        );

        let report = synchronizer()
            .repair_payloads(&store.records(), &store)
            .await;

        assert_eq!(report.checked, 2);
        assert_eq!(report.repaired.len(), 1);
        assert_eq!(report.invalid.len(), 1);

        let repaired = &store.records()[0].payload;
        assert_eq!(repaired.trigger.as_deref(), Some(";;fab"));
        assert_eq!(repaired.label.as_deref(), Some("a"));
        assert_eq!(repaired.size, Some(4));
    }
}
