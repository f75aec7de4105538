// file: src/models/record.rs
// description: stored record, point id and payload models for the vector store
// reference: https://qdrant.tech/documentation/concepts/points/

use crate::error::{Result, SyncError};
use crate::models::document::{SourceRecord, compute_hash};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;
use uuid::Uuid;

/// Store-assigned identifier. Qdrant accepts unsigned integers or UUIDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    Num(u64),
    Uuid(String),
}

impl PointId {
    pub fn generate() -> Self {
        PointId::Uuid(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointId::Num(n) => write!(f, "{}", n),
            PointId::Uuid(s) => f.write_str(s),
        }
    }
}

/// Payload as it comes back from the store. Older points used `purpose`,
/// `date` and `filesize`, so those names are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, alias = "purpose", skip_serializing_if = "Option::is_none")]
    pub derived_text: Option<String>,
    #[serde(default, alias = "date", skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
    #[serde(default, alias = "filesize", skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

/// Fully populated payload. Everything written to the store goes through this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPayload {
    pub filename: String,
    pub content: String,
    pub derived_text: String,
    pub modified_at: DateTime<Utc>,
    pub size: u64,
    pub trigger: String,
    pub label: String,
    pub content_hash: String,
}

/// Values used for non-critical fields that are missing.
#[derive(Debug, Clone)]
pub struct PayloadDefaults {
    pub trigger: String,
    pub size: u64,
}

impl PayloadDefaults {
    pub fn new(trigger: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            size: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: PointId,
    pub vector: Option<Vec<f32>>,
    pub payload: RawPayload,
}

/// A point ready to be upserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPoint {
    pub id: PointId,
    pub vector: Vec<f32>,
    pub payload: RecordPayload,
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl RawPayload {
    pub fn from_value(id: &PointId, value: serde_json::Value) -> Self {
        match serde_json::from_value(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Point {} has an unreadable payload: {}", id, e);
                Self::default()
            }
        }
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at.as_deref().and_then(parse_timestamp)
    }

    /// Applies defaults to non-critical fields. Returns the completed payload
    /// and the names of the fields that had to be filled in.
    pub fn complete(&self, defaults: &PayloadDefaults) -> Result<(RecordPayload, Vec<&'static str>)> {
        let filename = non_empty(&self.filename).ok_or_else(|| {
            SyncError::Validation("'filename' is required and cannot be defaulted".to_string())
        })?;
        let content = non_empty(&self.content).ok_or_else(|| {
            SyncError::Validation(format!(
                "{}: 'content' is required and cannot be defaulted",
                filename
            ))
        })?;

        let mut fixed = Vec::new();

        let derived_text = match non_empty(&self.derived_text) {
            Some(text) => text.to_string(),
            None => {
                fixed.push("derived_text");
                content.to_string()
            }
        };

        let modified_at = match self.modified_at() {
            Some(ts) => ts,
            None => {
                fixed.push("modified_at");
                DateTime::<Utc>::default()
            }
        };

        let size = self.size.unwrap_or_else(|| {
            fixed.push("size");
            defaults.size
        });

        let trigger = match non_empty(&self.trigger) {
            Some(trigger) => trigger.to_string(),
            None => {
                fixed.push("trigger");
                defaults.trigger.clone()
            }
        };

        let label = match non_empty(&self.label) {
            Some(label) => label.to_string(),
            None => {
                fixed.push("label");
                crate::models::document::strip_extension(filename)
            }
        };

        let content_hash = match non_empty(&self.content_hash) {
            Some(hash) => hash.to_string(),
            None => {
                fixed.push("content_hash");
                compute_hash(content)
            }
        };

        Ok((
            RecordPayload {
                filename: filename.to_string(),
                content: content.to_string(),
                derived_text,
                modified_at,
                size,
                trigger,
                label,
                content_hash,
            },
            fixed,
        ))
    }
}

impl RecordPayload {
    /// Builds the payload for a scanned document. Missing filename or content
    /// make the record unsynchronizable.
    pub fn from_source(source: &SourceRecord, defaults: &PayloadDefaults) -> Result<Self> {
        let raw = RawPayload {
            filename: Some(source.filename.clone()),
            content: Some(source.content.clone()),
            derived_text: Some(source.derived_text.clone()),
            modified_at: Some(source.modified_at.to_rfc3339()),
            size: Some(source.size),
            trigger: source.trigger.clone(),
            label: Some(source.label.clone().unwrap_or_else(|| source.stem())),
            content_hash: Some(source.content_hash()),
        };
        let (mut payload, _) = raw.complete(defaults)?;
        payload.modified_at = source.modified_at;
        Ok(payload)
    }

    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl From<RecordPayload> for RawPayload {
    fn from(payload: RecordPayload) -> Self {
        Self {
            filename: Some(payload.filename),
            content: Some(payload.content),
            derived_text: Some(payload.derived_text),
            modified_at: Some(payload.modified_at.to_rfc3339()),
            size: Some(payload.size),
            trigger: Some(payload.trigger),
            label: Some(payload.label),
            content_hash: Some(payload.content_hash),
        }
    }
}

impl StoredRecord {
    pub fn filename(&self) -> Option<&str> {
        non_empty(&self.payload.filename)
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.payload.modified_at()
    }
}
