// file: src/database/schema.rs
// description: collection and payload index management for the vector store
// reference: https://qdrant.tech/documentation/concepts/indexing/

use crate::database::client::QdrantClient;
use crate::error::{Result, SyncError};
use tracing::{info, warn};

/// Payload fields that get an index, with their Qdrant schema type.
pub const PAYLOAD_INDEXES: &[(&str, &str)] = &[("filename", "keyword"), ("modified_at", "datetime")];

pub struct SchemaManager<'a> {
    client: &'a QdrantClient,
}

impl<'a> SchemaManager<'a> {
    pub fn new(client: &'a QdrantClient) -> Self {
        Self { client }
    }

    /// Creates the collection and its payload indexes when missing.
    /// Returns the vector size the collection actually uses.
    pub async fn initialize(&self, dimensions: usize) -> Result<usize> {
        let name = self.client.collection_name();

        if !self.client.collection_exists().await? {
            info!("Creating collection {} ({} dimensions)", name, dimensions);
            self.client.create_collection(dimensions).await?;
            self.ensure_indexes().await?;
            return Ok(dimensions);
        }

        let info = self.client.collection_info().await?;
        let existing = info.vector_size(self.client.vector_name()).ok_or_else(|| {
            SyncError::Store(format!(
                "Collection {} has no vector configuration{}",
                name,
                self.client
                    .vector_name()
                    .map(|v| format!(" for vector '{}'", v))
                    .unwrap_or_default()
            ))
        })?;

        if existing != dimensions {
            warn!(
                "Collection {} stores {}-dimensional vectors, embedder produces {}",
                name, existing, dimensions
            );
        }
        self.ensure_indexes().await?;
        Ok(existing)
    }

    /// Index creation is idempotent, so this also backfills collections
    /// created without them.
    async fn ensure_indexes(&self) -> Result<()> {
        for (field, schema) in PAYLOAD_INDEXES {
            self.client.create_index(field, schema).await?;
        }
        Ok(())
    }

    pub async fn verify_schema(&self) -> Result<bool> {
        let name = self.client.collection_name();

        if !self.client.collection_exists().await? {
            warn!("Collection '{}' does not exist", name);
            return Ok(false);
        }

        info!("Collection '{}' exists", name);
        Ok(true)
    }

    pub async fn drop_collection(&self) -> Result<()> {
        let name = self.client.collection_name();
        warn!("Dropping collection {}", name);

        if self.client.collection_exists().await? {
            self.client.delete_collection().await?;
            info!("Dropped collection: {}", name);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use mockito::Matcher;

    fn client(url: &str) -> QdrantClient {
        QdrantClient::new(StoreConfig {
            url: url.to_string(),
            collection: "patterns".to_string(),
            ..StoreConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_initialize_creates_collection_and_indexes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/collections")
            .with_status(200)
            .with_body(r#"{"result":{"collections":[]}}"#)
            .create_async()
            .await;
        let create = server
            .mock("PUT", "/collections/patterns")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "vectors": { "size": 8, "distance": "Cosine" }
            })))
            .with_status(200)
            .with_body(r#"{"result":true}"#)
            .create_async()
            .await;
        let indexes = server
            .mock("PUT", "/collections/patterns/index")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"result":{"operation_id":1,"status":"completed"}}"#)
            .expect(2)
            .create_async()
            .await;

        let client = client(&server.url());
        let dims = SchemaManager::new(&client).initialize(8).await.unwrap();

        assert_eq!(dims, 8);
        create.assert_async().await;
        indexes.assert_async().await;
    }

    #[tokio::test]
    async fn test_initialize_reports_existing_size() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/collections")
            .with_status(200)
            .with_body(r#"{"result":{"collections":[{"name":"patterns"}]}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/collections/patterns")
            .with_status(200)
            .with_body(
                r#"{"result":{"status":"green","points_count":3,
                    "config":{"params":{"vectors":{"size":384,"distance":"Cosine"}}}}}"#,
            )
            .create_async()
            .await;
        let indexes = server
            .mock("PUT", "/collections/patterns/index")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"result":{"operation_id":2,"status":"completed"}}"#)
            .expect(2)
            .create_async()
            .await;

        let client = client(&server.url());
        let dims = SchemaManager::new(&client).initialize(8).await.unwrap();
        assert_eq!(dims, 384);
        indexes.assert_async().await;
    }

    #[tokio::test]
    async fn test_existing_collection_gets_missing_indexes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/collections")
            .with_status(200)
            .with_body(r#"{"result":{"collections":[{"name":"patterns"}]}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/collections/patterns")
            .with_status(200)
            .with_body(r#"{"result":{"config":{"params":{"vectors":{"size":8}}}}}"#)
            .create_async()
            .await;
        let filename_index = server
            .mock("PUT", "/collections/patterns/index")
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(serde_json::json!({
                "field_name": "filename",
                "field_schema": "keyword"
            })))
            .with_status(200)
            .with_body(r#"{"result":{"operation_id":3,"status":"completed"}}"#)
            .create_async()
            .await;
        let modified_index = server
            .mock("PUT", "/collections/patterns/index")
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(serde_json::json!({
                "field_name": "modified_at",
                "field_schema": "datetime"
            })))
            .with_status(200)
            .with_body(r#"{"result":{"operation_id":4,"status":"completed"}}"#)
            .create_async()
            .await;

        let client = client(&server.url());
        SchemaManager::new(&client).initialize(8).await.unwrap();

        filename_index.assert_async().await;
        modified_index.assert_async().await;
    }
}
