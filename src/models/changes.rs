// file: src/models/changes.rs
// description: change classification produced by comparing a scan with the store
// reference: internal data structures

use crate::models::document::SourceRecord;
use crate::models::record::PointId;
use std::collections::HashMap;

/// Several stored points that share one filename. `kept` is the one the
/// detector resolved the filename to; `ignored` are left untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateGroup {
    pub filename: String,
    pub kept: PointId,
    pub ignored: Vec<PointId>,
}

#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub new: Vec<SourceRecord>,
    pub modified: Vec<SourceRecord>,
    pub deleted: Vec<String>,
    /// Stored point chosen for each modified or deleted filename.
    pub stored_ids: HashMap<String, PointId>,
    pub duplicates: Vec<DuplicateGroup>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    pub fn total(&self) -> usize {
        self.new.len() + self.modified.len() + self.deleted.len()
    }

    pub fn stored_id(&self, filename: &str) -> Option<&PointId> {
        self.stored_ids.get(filename)
    }

    pub fn new_filenames(&self) -> Vec<&str> {
        self.new.iter().map(|r| r.filename.as_str()).collect()
    }

    pub fn modified_filenames(&self) -> Vec<&str> {
        self.modified.iter().map(|r| r.filename.as_str()).collect()
    }
}
