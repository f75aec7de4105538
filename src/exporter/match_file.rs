// file: src/exporter/match_file.rs
// description: espanso match file rendering
// reference: https://espanso.org/docs/matches/basics/

use crate::error::{Result, SyncError};
use crate::models::RecordPayload;
use serde::Serialize;

pub const CLIPBOARD_VAR: &str = "clipb";
pub const CLIPBOARD_PLACEHOLDER: &str = "{{clipb}}";

#[derive(Debug, Serialize)]
struct MatchFile<'a> {
    matches: Vec<MatchEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct MatchEntry<'a> {
    trigger: &'a str,
    replace: String,
    label: &'a str,
    vars: Vec<MatchVar>,
}

#[derive(Debug, Serialize)]
struct MatchVar {
    name: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
}

/// `replace` text for one record: the content with the clipboard
/// placeholder on its own line.
pub fn replacement(content: &str) -> String {
    format!("{}\n{}", content, CLIPBOARD_PLACEHOLDER)
}

/// Renders `matches:` with one entry per payload, in the given order.
/// Multi-line replacements come out as literal blocks.
pub fn render(payloads: &[RecordPayload]) -> Result<String> {
    let file = MatchFile {
        matches: payloads
            .iter()
            .map(|payload| MatchEntry {
                trigger: &payload.trigger,
                replace: replacement(&payload.content),
                label: &payload.label,
                vars: vec![MatchVar {
                    name: CLIPBOARD_VAR,
                    kind: "clipboard",
                }],
            })
            .collect(),
    };

    serde_yaml::to_string(&file)
        .map_err(|e| SyncError::Serialization(format!("Failed to encode match file: {}", e)))
}
