// file: src/repository/mod.rs
// description: source directory operations module exports
// reference: Internal module structure

pub mod scanner;

pub use scanner::{DocumentScanner, ScanResult};
