// file: src/models/search_result.rs
// description: Search result model with similarity scores
// reference: Used for vector similarity search results

use crate::models::record::{PointId, RawPayload};

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub id: PointId,

    /// Similarity score (higher is more similar, cosine in -1.0..=1.0)
    pub score: f32,

    pub payload: RawPayload,
}

impl ScoredRecord {
    pub fn new(id: PointId, score: f32, payload: RawPayload) -> Self {
        Self { id, score, payload }
    }

    pub fn filename(&self) -> &str {
        self.payload.filename.as_deref().unwrap_or("<unnamed>")
    }

    /// First few lines of the stored content, for terminal output.
    pub fn preview(&self, max_lines: usize) -> Vec<&str> {
        self.payload
            .content
            .as_deref()
            .unwrap_or_default()
            .lines()
            .filter(|line| !line.trim().is_empty())
            .take(max_lines)
            .collect()
    }
}
