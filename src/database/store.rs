// file: src/database/store.rs
// description: record store abstraction consumed by the sync pipeline
// reference: https://docs.rs/async-trait

use crate::database::client::{QdrantClient, filename_filter};
use crate::database::schema::SchemaManager;
use crate::error::Result;
use crate::models::{NewPoint, PointId, RecordPayload, ScoredRecord, StoredRecord};
use async_trait::async_trait;

/// Storage operations needed by change detection, synchronization and
/// artifact generation.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`ensure_collection`](RecordStore::ensure_collection) | Create the collection if missing, return its vector size |
/// | [`list_records`](RecordStore::list_records) | Every stored record, in store order |
/// | [`find_by_filename`](RecordStore::find_by_filename) | Records whose payload names `filename` |
/// | [`upsert`](RecordStore::upsert) | Insert or replace one point |
/// | [`delete`](RecordStore::delete) | Remove points by id |
/// | [`set_payload`](RecordStore::set_payload) | Rewrite the payload of one point |
/// | [`point_count`](RecordStore::point_count) | Number of stored points |
/// | [`search`](RecordStore::search) | Nearest neighbours of a vector |
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn ensure_collection(&self, dimensions: usize) -> Result<usize>;

    async fn list_records(&self) -> Result<Vec<StoredRecord>>;

    async fn find_by_filename(&self, filename: &str) -> Result<Vec<StoredRecord>>;

    async fn upsert(&self, point: NewPoint) -> Result<()>;

    async fn delete(&self, ids: &[PointId]) -> Result<()>;

    async fn set_payload(&self, id: &PointId, payload: &RecordPayload) -> Result<()>;

    async fn point_count(&self) -> Result<u64>;

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredRecord>>;
}

#[async_trait]
impl RecordStore for QdrantClient {
    async fn ensure_collection(&self, dimensions: usize) -> Result<usize> {
        SchemaManager::new(self).initialize(dimensions).await
    }

    async fn list_records(&self) -> Result<Vec<StoredRecord>> {
        self.scroll_all(None).await
    }

    async fn find_by_filename(&self, filename: &str) -> Result<Vec<StoredRecord>> {
        self.scroll_all(Some(filename_filter(filename))).await
    }

    async fn upsert(&self, point: NewPoint) -> Result<()> {
        self.upsert_points(std::slice::from_ref(&point)).await
    }

    async fn delete(&self, ids: &[PointId]) -> Result<()> {
        self.delete_points(ids).await
    }

    async fn set_payload(&self, id: &PointId, payload: &RecordPayload) -> Result<()> {
        self.set_point_payload(id, payload).await
    }

    async fn point_count(&self) -> Result<u64> {
        Ok(self.collection_info().await?.points_count.unwrap_or(0))
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredRecord>> {
        self.search_points(vector, limit).await
    }
}
