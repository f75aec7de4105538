// file: src/database/client.rs
// description: Qdrant REST client wrapper with connection retry
// reference: https://api.qdrant.tech/api-reference

use crate::config::StoreConfig;
use crate::error::{Result, SyncError};
use crate::models::{NewPoint, PointId, RawPayload, RecordPayload, ScoredRecord, StoredRecord};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct QdrantClient {
    http: Client,
    base_url: String,
    config: StoreConfig,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct CollectionsResult {
    collections: Vec<CollectionDescription>,
}

#[derive(Debug, Deserialize)]
struct CollectionDescription {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionInfo {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub points_count: Option<u64>,
    #[serde(default)]
    pub config: Option<Value>,
}

impl CollectionInfo {
    /// Vector size from `config.params.vectors`, which is either a single
    /// vector description or a map of named ones.
    pub fn vector_size(&self, vector_name: Option<&str>) -> Option<usize> {
        let vectors = self.config.as_ref()?.get("params")?.get("vectors")?;
        let params = match vector_name {
            Some(name) => vectors.get(name)?,
            None => vectors,
        };
        params.get("size")?.as_u64().map(|size| size as usize)
    }
}

#[derive(Debug, Deserialize)]
struct ScrollResult {
    points: Vec<RetrievedPoint>,
    next_page_offset: Option<PointId>,
}

#[derive(Debug, Deserialize)]
struct RetrievedPoint {
    id: PointId,
    #[serde(default)]
    payload: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    id: PointId,
    score: f32,
    #[serde(default)]
    payload: Option<Value>,
}

impl QdrantClient {
    /// Builds the HTTP client without touching the network.
    pub fn new(config: StoreConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|e| SyncError::Configuration(format!("Invalid store api key: {}", e)))?;
            headers.insert(HeaderName::from_static("api-key"), value);
        }

        let http = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| SyncError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            config,
        })
    }

    /// Connects with bounded retry: `max_retries + 1` attempts with a fixed
    /// delay in between. Operations after this point are never retried.
    pub async fn connect(config: StoreConfig) -> Result<Self> {
        let client = Self::new(config)?;
        let attempts = client.config.max_retries + 1;
        let mut attempt = 1;

        loop {
            match client.list_collections().await {
                Ok(collections) => {
                    info!(
                        "Connected to vector store at {} ({} collections)",
                        client.base_url,
                        collections.len()
                    );
                    return Ok(client);
                }
                Err(e) if attempt < attempts => {
                    warn!(
                        "Connection attempt {}/{} failed: {}. Retrying in {}ms",
                        attempt, attempts, e, client.config.retry_delay_ms
                    );
                    tokio::time::sleep(client.config.retry_delay()).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(SyncError::Connection(format!(
                        "Failed to connect to {} after {} attempts: {}",
                        client.base_url, attempts, e
                    )));
                }
            }
        }
    }

    pub fn collection_name(&self) -> &str {
        &self.config.collection
    }

    pub fn vector_name(&self) -> Option<&str> {
        self.config.vector_name.as_deref()
    }

    pub fn page_size(&self) -> usize {
        self.config.page_size
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!(
            "{}/collections/{}{}",
            self.base_url, self.config.collection, suffix
        )
    }

    pub async fn list_collections(&self) -> Result<Vec<String>> {
        let response = self
            .http
            .get(format!("{}/collections", self.base_url))
            .send()
            .await
            .map_err(|e| SyncError::Store(format!("Failed to list collections: {}", e)))?;

        let body: CollectionsResult = parse_result(response, "list collections").await?;
        Ok(body.collections.into_iter().map(|c| c.name).collect())
    }

    pub async fn collection_exists(&self) -> Result<bool> {
        let names = self.list_collections().await?;
        Ok(names.iter().any(|name| name == &self.config.collection))
    }

    pub async fn create_collection(&self, dimensions: usize) -> Result<()> {
        let params = json!({ "size": dimensions, "distance": "Cosine" });
        let vectors = match self.vector_name() {
            Some(name) => json!({ name: params }),
            None => params,
        };
        let body = json!({ "vectors": vectors, "on_disk_payload": true });

        let response = self
            .http
            .put(self.collection_url(""))
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::Store(format!("Failed to create collection: {}", e)))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT => {
                debug!("Collection {} already exists", self.config.collection);
                Ok(())
            }
            status => Err(SyncError::Store(format!(
                "create collection failed ({}): {}",
                status,
                response.text().await.unwrap_or_default()
            ))),
        }
    }

    /// `schema` is a Qdrant payload schema type, e.g. `keyword` or `datetime`.
    pub async fn create_index(&self, field: &str, schema: &str) -> Result<()> {
        let response = self
            .http
            .put(self.collection_url("/index"))
            .query(&[("wait", "true")])
            .json(&json!({ "field_name": field, "field_schema": schema }))
            .send()
            .await
            .map_err(|e| SyncError::Store(format!("Failed to create index on {}: {}", field, e)))?;

        let _: Value = parse_result(response, "create index").await?;
        Ok(())
    }

    pub async fn delete_collection(&self) -> Result<()> {
        let response = self
            .http
            .delete(self.collection_url(""))
            .send()
            .await
            .map_err(|e| SyncError::Store(format!("Failed to delete collection: {}", e)))?;

        let _: Value = parse_result(response, "delete collection").await?;
        Ok(())
    }

    pub async fn collection_info(&self) -> Result<CollectionInfo> {
        let response = self
            .http
            .get(self.collection_url(""))
            .send()
            .await
            .map_err(|e| SyncError::Store(format!("Failed to read collection info: {}", e)))?;

        parse_result(response, "collection info").await
    }

    /// One page of points. Vectors are not requested.
    pub async fn scroll(
        &self,
        limit: usize,
        offset: Option<&PointId>,
        filter: Option<Value>,
    ) -> Result<(Vec<StoredRecord>, Option<PointId>)> {
        let mut body = json!({
            "limit": limit,
            "with_payload": true,
            "with_vector": false,
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        if let Some(filter) = filter {
            body["filter"] = filter;
        }

        let response = self
            .http
            .post(self.collection_url("/points/scroll"))
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::Store(format!("Failed to scroll points: {}", e)))?;

        let page: ScrollResult = parse_result(response, "scroll").await?;
        let records = page
            .points
            .into_iter()
            .map(|point| {
                let payload = RawPayload::from_value(&point.id, point.payload.unwrap_or(Value::Null));
                StoredRecord {
                    id: point.id,
                    vector: None,
                    payload,
                }
            })
            .collect();

        Ok((records, page.next_page_offset))
    }

    /// Every point in the collection, following `next_page_offset`.
    pub async fn scroll_all(&self, filter: Option<Value>) -> Result<Vec<StoredRecord>> {
        let mut records = Vec::new();
        let mut offset: Option<PointId> = None;

        loop {
            let (page, next) = self
                .scroll(self.config.page_size, offset.as_ref(), filter.clone())
                .await?;
            debug!("Scrolled {} points", page.len());
            records.extend(page);

            match next {
                Some(next) if offset.as_ref() != Some(&next) => offset = Some(next),
                _ => break,
            }
        }

        Ok(records)
    }

    fn vector_value(&self, vector: &[f32]) -> Value {
        match self.vector_name() {
            Some(name) => json!({ name: vector }),
            None => json!(vector),
        }
    }

    pub async fn upsert_points(&self, points: &[NewPoint]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let points: Vec<Value> = points
            .iter()
            .map(|point| {
                Ok(json!({
                    "id": point.id,
                    "vector": self.vector_value(&point.vector),
                    "payload": point.payload.to_value()?,
                }))
            })
            .collect::<Result<_>>()?;

        let response = self
            .http
            .put(self.collection_url("/points"))
            .query(&[("wait", "true")])
            .json(&json!({ "points": points }))
            .send()
            .await
            .map_err(|e| SyncError::Store(format!("Failed to upsert points: {}", e)))?;

        let _: Value = parse_result(response, "upsert").await?;
        Ok(())
    }

    pub async fn delete_points(&self, ids: &[PointId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let response = self
            .http
            .post(self.collection_url("/points/delete"))
            .query(&[("wait", "true")])
            .json(&json!({ "points": ids }))
            .send()
            .await
            .map_err(|e| SyncError::Store(format!("Failed to delete points: {}", e)))?;

        let _: Value = parse_result(response, "delete").await?;
        Ok(())
    }

    /// Merges `payload` into the stored payload of one point.
    pub async fn set_point_payload(&self, id: &PointId, payload: &RecordPayload) -> Result<()> {
        let response = self
            .http
            .post(self.collection_url("/points/payload"))
            .query(&[("wait", "true")])
            .json(&json!({ "payload": payload.to_value()?, "points": [id] }))
            .send()
            .await
            .map_err(|e| SyncError::Store(format!("Failed to set payload: {}", e)))?;

        let _: Value = parse_result(response, "set payload").await?;
        Ok(())
    }

    pub async fn search_points(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredRecord>> {
        let query = match self.vector_name() {
            Some(name) => json!({ "name": name, "vector": vector }),
            None => json!(vector),
        };

        let response = self
            .http
            .post(self.collection_url("/points/search"))
            .json(&json!({ "vector": query, "limit": limit, "with_payload": true }))
            .send()
            .await
            .map_err(|e| SyncError::Store(format!("Failed to search points: {}", e)))?;

        let hits: Vec<ScoredPoint> = parse_result(response, "search").await?;
        Ok(hits
            .into_iter()
            .map(|hit| {
                let payload = RawPayload::from_value(&hit.id, hit.payload.unwrap_or(Value::Null));
                ScoredRecord::new(hit.id, hit.score, payload)
            })
            .collect())
    }
}

async fn parse_result<T: DeserializeOwned>(response: Response, operation: &str) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(SyncError::Store(format!(
            "{} failed ({}): {}",
            operation, status, text
        )));
    }

    let body: ApiResponse<T> = response.json().await.map_err(|e| {
        SyncError::Serialization(format!("Failed to parse {} response: {}", operation, e))
    })?;
    Ok(body.result)
}

pub fn filename_filter(filename: &str) -> Value {
    json!({
        "must": [
            { "key": "filename", "match": { "value": filename } }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn config(url: &str) -> StoreConfig {
        StoreConfig {
            url: url.to_string(),
            collection: "patterns".to_string(),
            max_retries: 2,
            retry_delay_ms: 5,
            page_size: 2,
            ..StoreConfig::default()
        }
    }

    #[tokio::test]
    async fn test_connect_succeeds() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/collections")
            .with_status(200)
            .with_body(r#"{"result":{"collections":[{"name":"patterns"}]},"status":"ok","time":0.0}"#)
            .expect(2)
            .create_async()
            .await;

        let client = QdrantClient::connect(config(&server.url())).await.unwrap();
        assert!(client.collection_exists().await.unwrap());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connect_gives_up_after_retries() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/collections")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let result = QdrantClient::connect(config(&server.url())).await;
        assert!(matches!(result, Err(SyncError::Connection(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_scroll_all_follows_offsets() {
        let mut server = mockito::Server::new_async().await;
        let first_page = r#"{"result":{"points":[
            {"id":1,"payload":{"filename":"a.md","content":"A"}},
            {"id":2,"payload":{"filename":"b.md","content":"B"}}
        ],"next_page_offset":3}}"#;
        let second_page = r#"{"result":{"points":[
            {"id":3,"payload":{"filename":"c.md","content":"C"}}
        ],"next_page_offset":null}}"#;

        let mock = server
            .mock("POST", "/collections/patterns/points/scroll")
            .match_body(Matcher::PartialJson(json!({ "limit": 2 })))
            .with_status(200)
            .with_body_from_request(move |request| {
                let body = String::from_utf8_lossy(request.body().unwrap()).to_string();
                if body.contains("\"offset\":3") {
                    second_page.into()
                } else {
                    first_page.into()
                }
            })
            .expect(2)
            .create_async()
            .await;

        let client = QdrantClient::new(config(&server.url())).unwrap();
        let records = client.scroll_all(None).await.unwrap();

        let names: Vec<_> = records.iter().filter_map(|r| r.filename()).collect();
        assert_eq!(names, vec!["a.md", "b.md", "c.md"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upsert_uses_named_vector() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/collections/patterns/points")
            .match_query(Matcher::UrlEncoded("wait".into(), "true".into()))
            .match_body(Matcher::Regex(
                r#""fast-bge-small-en":\[0\.5,0\.5\]"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"result":{"operation_id":1,"status":"completed"}}"#)
            .create_async()
            .await;

        let mut store_config = config(&server.url());
        store_config.vector_name = Some("fast-bge-small-en".to_string());
        let client = QdrantClient::new(store_config).unwrap();

        let source = crate::models::SourceRecord::new("a.md", "A", chrono::Utc::now());
        let payload =
            RecordPayload::from_source(&source, &crate::models::PayloadDefaults::new(";;fab"))
                .unwrap();
        client
            .upsert_points(&[NewPoint {
                id: PointId::Num(9),
                vector: vec![0.5, 0.5],
                payload,
            }])
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_store_errors_surface_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/collections/patterns/points/delete")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = QdrantClient::new(config(&server.url())).unwrap();
        let err = client.delete_points(&[PointId::Num(1)]).await.unwrap_err();
        assert!(matches!(err, SyncError::Store(ref msg) if msg.contains("500")));
    }

    #[test]
    fn test_filename_filter_shape() {
        let filter = filename_filter("a.md");
        assert_eq!(filter["must"][0]["match"]["value"], "a.md");
    }
}
