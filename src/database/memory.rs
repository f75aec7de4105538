// file: src/database/memory.rs
// description: in-memory record store used by tests and dry runs
// reference: internal data structures

use crate::database::store::RecordStore;
use crate::error::{Result, SyncError};
use crate::models::{NewPoint, PointId, RawPayload, RecordPayload, ScoredRecord, StoredRecord};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Keeps points in insertion order, like a scroll over a fresh collection.
/// Writes touching a filename registered with [`fail_on`](Self::fail_on)
/// return a store error.
pub struct InMemoryStore {
    points: RwLock<Vec<StoredRecord>>,
    dimensions: RwLock<Option<usize>>,
    failing: RwLock<HashSet<String>>,
    writes: AtomicUsize,
    next_id: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            points: RwLock::new(Vec::new()),
            dimensions: RwLock::new(None),
            failing: RwLock::new(HashSet::new()),
            writes: AtomicUsize::new(0),
            next_id: AtomicUsize::new(1),
        }
    }

    /// Seeds a point as-is, bypassing payload completion.
    pub fn insert_raw(&self, payload: RawPayload, vector: Option<Vec<f32>>) -> PointId {
        let id = PointId::Num(self.next_id.fetch_add(1, Ordering::SeqCst) as u64);
        let mut points = self.points.write().unwrap_or_else(|e| e.into_inner());
        points.push(StoredRecord {
            id: id.clone(),
            vector,
            payload,
        });
        id
    }

    pub fn records(&self) -> Vec<StoredRecord> {
        self.points.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn fail_on(&self, filename: impl Into<String>) {
        self.failing
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(filename.into());
    }

    /// Successful upsert, delete and set_payload calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_failure(&self, filename: Option<&str>) -> Result<()> {
        let failing = self.failing.read().unwrap_or_else(|e| e.into_inner());
        match filename {
            Some(name) if failing.contains(name) => Err(SyncError::Store(format!(
                "injected failure for {}",
                name
            ))),
            _ => Ok(()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn ensure_collection(&self, dimensions: usize) -> Result<usize> {
        let mut current = self.dimensions.write().unwrap_or_else(|e| e.into_inner());
        Ok(*current.get_or_insert(dimensions))
    }

    async fn list_records(&self) -> Result<Vec<StoredRecord>> {
        Ok(self.records())
    }

    async fn find_by_filename(&self, filename: &str) -> Result<Vec<StoredRecord>> {
        Ok(self
            .records()
            .into_iter()
            .filter(|r| r.filename() == Some(filename))
            .collect())
    }

    async fn upsert(&self, point: NewPoint) -> Result<()> {
        self.check_failure(Some(&point.payload.filename))?;

        let record = StoredRecord {
            id: point.id,
            vector: Some(point.vector),
            payload: RawPayload::from(point.payload),
        };

        let mut points = self.points.write().unwrap_or_else(|e| e.into_inner());
        match points.iter_mut().find(|p| p.id == record.id) {
            Some(existing) => *existing = record,
            None => points.push(record),
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, ids: &[PointId]) -> Result<()> {
        let mut points = self.points.write().unwrap_or_else(|e| e.into_inner());
        for point in points.iter().filter(|p| ids.contains(&p.id)) {
            self.check_failure(point.filename())?;
        }
        points.retain(|p| !ids.contains(&p.id));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn set_payload(&self, id: &PointId, payload: &RecordPayload) -> Result<()> {
        self.check_failure(Some(&payload.filename))?;

        let mut points = self.points.write().unwrap_or_else(|e| e.into_inner());
        let point = points
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| SyncError::Store(format!("point {} not found", id)))?;
        point.payload = RawPayload::from(payload.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn point_count(&self) -> Result<u64> {
        Ok(self.points.read().unwrap_or_else(|e| e.into_inner()).len() as u64)
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredRecord>> {
        let mut scored: Vec<ScoredRecord> = self
            .records()
            .into_iter()
            .filter_map(|r| {
                let score = cosine_sim(vector, r.vector.as_deref()?);
                Some(ScoredRecord::new(r.id, score, r.payload))
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PayloadDefaults, SourceRecord};
    use chrono::Utc;

    fn point(filename: &str, vector: Vec<f32>) -> NewPoint {
        let source = SourceRecord::new(filename, "content", Utc::now());
        NewPoint {
            id: PointId::generate(),
            vector,
            payload: RecordPayload::from_source(&source, &PayloadDefaults::new(";;fab")).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_find() {
        let store = InMemoryStore::new();
        store.upsert(point("a.md", vec![1.0, 0.0])).await.unwrap();
        store.upsert(point("b.md", vec![0.0, 1.0])).await.unwrap();

        assert_eq!(store.point_count().await.unwrap(), 2);
        assert_eq!(store.find_by_filename("b.md").await.unwrap().len(), 1);
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_id() {
        let store = InMemoryStore::new();
        let mut p = point("a.md", vec![1.0, 0.0]);
        store.upsert(p.clone()).await.unwrap();
        p.payload.content = "changed".to_string();
        store.upsert(p).await.unwrap();

        let records = store.list_records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload.content.as_deref(), Some("changed"));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = InMemoryStore::new();
        store.fail_on("a.md");

        let result = store.upsert(point("a.md", vec![1.0])).await;
        assert!(matches!(result, Err(SyncError::Store(_))));
        assert_eq!(store.point_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let store = InMemoryStore::new();
        store.upsert(point("a.md", vec![1.0, 0.0])).await.unwrap();
        store.upsert(point("b.md", vec![0.0, 1.0])).await.unwrap();

        let hits = store.search(&[0.1, 0.9], 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].filename(), "b.md");
    }

    #[tokio::test]
    async fn test_ensure_collection_keeps_first_size() {
        let store = InMemoryStore::new();
        assert_eq!(store.ensure_collection(8).await.unwrap(), 8);
        assert_eq!(store.ensure_collection(16).await.unwrap(), 8);
    }
}
