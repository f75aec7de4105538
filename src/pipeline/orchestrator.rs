// file: src/pipeline/orchestrator.rs
// description: coordinates scanning, change detection, synchronization and artifact regeneration
// reference: orchestrates one sequential sync run

use crate::config::Config;
use crate::database::{Embedder, QdrantClient, RecordStore, build_embedder};
use crate::error::{Result, SyncError};
use crate::exporter::{ArtifactGenerator, ArtifactReport};
use crate::models::{ChangeSet, PayloadDefaults, StoredRecord};
use crate::pipeline::detector::ChangeDetector;
use crate::pipeline::synchronizer::{ChangeKind, RepairReport, SyncReport, Synchronizer};
use crate::repository::{DocumentScanner, ScanResult};
use crate::utils::{HealthCheck, HealthReport, OperationTimer, Validator};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct RunSummary {
    pub scanned: usize,
    pub scan_failures: Vec<SyncError>,
    pub changes: ChangeSet,
    pub report: SyncReport,
    pub artifacts: ArtifactReport,
    pub duration: Duration,
}

impl RunSummary {
    pub fn new_count(&self) -> usize {
        self.report.count(ChangeKind::New)
    }

    pub fn modified_count(&self) -> usize {
        self.report.count(ChangeKind::Modified)
    }

    pub fn deleted_count(&self) -> usize {
        self.report.count(ChangeKind::Deleted)
    }

    /// Records skipped during sync plus documents the scanner could not read.
    pub fn skipped_count(&self) -> usize {
        self.report.skipped_with_reason.len() + self.scan_failures.len()
    }

    pub fn duplicate_count(&self) -> usize {
        self.changes.duplicates.len()
    }
}

pub struct SyncRunner {
    config: Config,
    show_progress: bool,
    colored: bool,
}

impl SyncRunner {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            show_progress: false,
            colored: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool, colored: bool) -> Self {
        self.show_progress = show_progress;
        self.colored = colored;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn defaults(&self) -> PayloadDefaults {
        PayloadDefaults::new(self.config.source.default_trigger.clone())
    }

    fn generator(&self) -> ArtifactGenerator {
        ArtifactGenerator::new(self.config.output.clone(), self.defaults())
    }

    /// Fails on bad paths before anything touches the store.
    pub fn preflight(&self) -> Result<()> {
        self.generator().validate_targets()?;
        Validator::validate_directory(&self.config.source.root)
    }

    /// Connects to the configured store, runs once and releases the
    /// connection on every exit path.
    pub async fn run(&self) -> Result<RunSummary> {
        self.preflight()?;
        let embedder = build_embedder(&self.config.embedding)?;

        let store = QdrantClient::connect(self.config.store.clone()).await?;
        let result = self.run_with(&store, embedder.as_ref()).await;
        drop(store);
        debug!("Store connection released");

        result
    }

    /// Scan, detect, apply and regenerate, strictly in that order. The
    /// artifacts are regenerated even when nothing changed.
    pub async fn run_with(
        &self,
        store: &dyn RecordStore,
        embedder: &dyn Embedder,
    ) -> Result<RunSummary> {
        let started = Instant::now();
        let generator = self.generator();
        generator.validate_targets()?;

        let timer = OperationTimer::new("scan");
        let scan = self.scan().await?;
        timer.finish_with_count(scan.records.len());

        let dimensions = store.ensure_collection(embedder.dimensions()).await?;

        let timer = OperationTimer::new("detect");
        let stored = store.list_records().await?;
        let changes = ChangeDetector::new().detect(&scan.records, &stored);
        timer.finish_with_count(changes.total());

        let timer = OperationTimer::new("apply");
        let report = Synchronizer::new(self.defaults())
            .with_dimensions(dimensions)
            .with_progress(self.show_progress, self.colored)
            .apply(&changes, store, embedder)
            .await;
        timer.finish_with_count(report.applied.len());

        let timer = OperationTimer::new("regenerate");
        let artifacts = generator.regenerate(store).await?;
        timer.finish_with_count(artifacts.match_entries);

        let summary = RunSummary {
            scanned: scan.records.len(),
            scan_failures: scan.failures,
            changes,
            report,
            artifacts,
            duration: started.elapsed(),
        };

        info!(
            "Run complete: {} new, {} modified, {} deleted, {} skipped",
            summary.new_count(),
            summary.modified_count(),
            summary.deleted_count(),
            summary.skipped_count()
        );
        Ok(summary)
    }

    async fn scan(&self) -> Result<ScanResult> {
        let source = self.config.source.clone();
        let root = source.root.clone();

        tokio::task::spawn_blocking(move || DocumentScanner::new(source).scan_configured())
            .await
            .map_err(|e| SyncError::Processing {
                path: root,
                message: format!("scan task failed: {}", e),
            })?
    }

    /// Checks stored payloads and duplicate filenames. With `repair`, fills
    /// missing non-critical payload fields in place.
    pub async fn verify(
        &self,
        store: &dyn RecordStore,
        repair: bool,
    ) -> Result<(HealthReport, Option<RepairReport>)> {
        let mut checks = Vec::new();

        let started = Instant::now();
        checks.push(match self.generator().validate_targets() {
            Ok(()) => HealthCheck::healthy("output directories", started.elapsed()),
            Err(e) => HealthCheck::unhealthy("output directories", e.to_string(), started.elapsed()),
        });

        let started = Instant::now();
        let records = store.list_records().await?;
        checks.push(HealthCheck::healthy("records", started.elapsed()));

        let started = Instant::now();
        let duplicates = duplicate_filenames(&records);
        checks.push(if duplicates.is_empty() {
            HealthCheck::healthy("unique filenames", started.elapsed())
        } else {
            HealthCheck::degraded(
                "unique filenames",
                format!("shared by several points: {}", duplicates.join(", ")),
                started.elapsed(),
            )
        });

        let started = Instant::now();
        let synchronizer = Synchronizer::new(self.defaults());
        let (incomplete, invalid) = payload_problems(&records, &self.defaults());

        let repair_report = if repair && incomplete > 0 {
            let report = synchronizer.repair_payloads(&records, store).await;
            info!("Repaired {} of {} points", report.repaired.len(), report.checked);
            Some(report)
        } else {
            None
        };

        let remaining = match &repair_report {
            Some(report) => incomplete.saturating_sub(report.repaired.len()),
            None => incomplete,
        };
        checks.push(if invalid > 0 {
            HealthCheck::unhealthy(
                "payloads",
                format!("{} points lack filename or content", invalid),
                started.elapsed(),
            )
        } else if remaining > 0 {
            HealthCheck::degraded(
                "payloads",
                format!("{} points have missing fields (run verify --repair)", remaining),
                started.elapsed(),
            )
        } else {
            HealthCheck::healthy("payloads", started.elapsed())
        });

        Ok((
            HealthReport::new(checks, env!("CARGO_PKG_VERSION")),
            repair_report,
        ))
    }
}

fn duplicate_filenames(records: &[StoredRecord]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        if let Some(filename) = record.filename() {
            *counts.entry(filename).or_default() += 1;
        }
    }
    let mut duplicates: Vec<String> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(filename, _)| filename.to_string())
        .collect();
    duplicates.sort();
    duplicates
}

/// (points with defaultable gaps, points missing critical fields)
fn payload_problems(records: &[StoredRecord], defaults: &PayloadDefaults) -> (usize, usize) {
    let mut incomplete = 0;
    let mut invalid = 0;
    for record in records {
        match record.payload.complete(defaults) {
            Ok((_, fixed)) if !fixed.is_empty() => incomplete += 1,
            Ok(_) => {}
            Err(e) => {
                warn!("Point {}: {}", record.id, e);
                invalid += 1;
            }
        }
    }
    (incomplete, invalid)
}
