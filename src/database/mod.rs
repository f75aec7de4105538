// file: src/database/mod.rs
// description: vector store and embedding module exports
// reference: internal module structure

pub mod client;
pub mod embeddings;
pub mod memory;
pub mod schema;
pub mod store;

pub use client::QdrantClient;
pub use embeddings::{Embedder, HashEmbedder, HttpEmbeddingClient, build_embedder};
pub use memory::InMemoryStore;
pub use schema::SchemaManager;
pub use store::RecordStore;
