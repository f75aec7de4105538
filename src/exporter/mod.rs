// file: src/exporter/mod.rs
// description: artifact generation module exports
// reference: internal module structure

pub mod generator;
pub mod match_file;
pub mod templates;

pub use generator::{ArtifactGenerator, ArtifactReport};
