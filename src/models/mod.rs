// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod changes;
pub mod document;
pub mod record;
pub mod search_result;

pub use changes::{ChangeSet, DuplicateGroup};
pub use document::SourceRecord;
pub use record::{NewPoint, PayloadDefaults, PointId, RawPayload, RecordPayload, StoredRecord};
pub use search_result::ScoredRecord;
