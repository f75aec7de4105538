// file: src/utils/validation.rs
// description: data validation utilities and helpers
// reference: input validation patterns

use crate::error::{Result, SyncError};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

lazy_static! {
    static ref UNSAFE_FILE_CHARS: Regex = Regex::new(r#"[/\\:*?"<>|\x00-\x1f]+"#).unwrap();
}

pub struct Validator;

impl Validator {
    /// Scanner roots: anything but an existing directory is invalid input.
    pub fn validate_directory(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(SyncError::InvalidInput(format!(
                "Directory does not exist: {}",
                path.display()
            )));
        }

        if !path.is_dir() {
            return Err(SyncError::InvalidInput(format!(
                "Path is not a directory: {}",
                path.display()
            )));
        }

        Ok(())
    }

    /// Artifact targets are consumed by other tools and are never created
    /// on the fly.
    pub fn validate_output_directory(path: &Path, purpose: &str) -> Result<()> {
        if !path.is_dir() {
            return Err(SyncError::Configuration(format!(
                "{} directory does not exist: {}",
                purpose,
                path.display()
            )));
        }
        Ok(())
    }

    pub fn validate_content_not_empty(filename: &str, content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Err(SyncError::Validation(format!(
                "{}: content is empty",
                filename
            )));
        }
        Ok(())
    }

    pub fn validate_vector(filename: &str, vector: &[f32], expected: usize) -> Result<()> {
        if vector.len() != expected {
            return Err(SyncError::Validation(format!(
                "{}: embedding has {} dimensions, store expects {}",
                filename,
                vector.len(),
                expected
            )));
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(SyncError::Validation(format!(
                "{}: embedding contains non-finite values",
                filename
            )));
        }
        Ok(())
    }

    /// Flattens a sync key into a single file name (`a/b.md` -> `a-b.md`).
    /// Characters no common filesystem accepts become `-` as well.
    pub fn sanitize_file_name(filename: &str) -> String {
        UNSAFE_FILE_CHARS
            .replace_all(filename, "-")
            .trim_matches(|c: char| c == '-' || c.is_whitespace())
            .to_string()
    }

    pub fn truncate_text(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            text.to_string()
        } else {
            let truncated: String = text.chars().take(max_chars).collect();
            format!("{}...", truncated)
        }
    }
}
