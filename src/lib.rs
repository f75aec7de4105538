// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod config;
pub mod database;
pub mod error;
pub mod exporter;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod repository;
pub mod utils;

pub use config::{Config, EmbeddingConfig, OutputConfig, SourceConfig, StoreConfig};
pub use database::{
    Embedder, HashEmbedder, HttpEmbeddingClient, InMemoryStore, QdrantClient, RecordStore,
    SchemaManager, build_embedder,
};
pub use error::{Result, SyncError};
pub use exporter::{ArtifactGenerator, ArtifactReport};
pub use models::{
    ChangeSet, DuplicateGroup, PayloadDefaults, PointId, RawPayload, RecordPayload, ScoredRecord,
    SourceRecord, StoredRecord,
};
pub use parser::{Frontmatter, FrontmatterParser, SectionExtractor};
pub use pipeline::{ChangeDetector, RunSummary, SyncReport, SyncRunner, Synchronizer};
pub use repository::{DocumentScanner, ScanResult};
pub use utils::{HealthCheck, HealthReport, HealthStatus, OperationTimer, Validator};
