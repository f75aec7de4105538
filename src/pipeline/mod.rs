// file: src/pipeline/mod.rs
// description: pipeline module exports and public api
// reference: pipeline orchestration

mod detector;
mod orchestrator;
mod progress;
mod synchronizer;

pub use detector::ChangeDetector;
pub use orchestrator::{RunSummary, SyncRunner};
pub use progress::{SyncProgress, SyncStats};
pub use synchronizer::{
    AppliedChange, ChangeKind, RepairReport, SkippedRecord, SyncReport, Synchronizer,
};
