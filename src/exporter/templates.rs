// file: src/exporter/templates.rs
// description: per-record prompt template rendering for the obsidian text generator plugin
// reference: https://github.com/nhaouari/obsidian-textgenerator-plugin

use crate::error::{Result, SyncError};
use crate::models::RecordPayload;
use crate::models::document::strip_extension;
use crate::utils::Validator;
use serde::Serialize;

pub const SELECTION_PLACEHOLDER: &str = "{{selection}}";

#[derive(Debug, Serialize)]
struct TemplateHeader<'a> {
    #[serde(rename = "PromptInfo")]
    prompt_info: PromptInfo<'a>,
    config: PromptConfig<'a>,
}

#[derive(Debug, Serialize)]
struct PromptInfo<'a> {
    #[serde(rename = "promptId")]
    prompt_id: &'a str,
    name: &'a str,
    description: &'a str,
    required_values: Option<&'a str>,
    author: &'static str,
    tags: Option<&'a str>,
    version: u32,
}

#[derive(Debug, Serialize)]
struct PromptConfig<'a> {
    mode: &'static str,
    system: &'a str,
}

/// `summarize/system.md` becomes `summarize-system.md`.
pub fn template_file_name(filename: &str) -> String {
    format!("{}.md", prompt_id(filename))
}

pub fn prompt_id(filename: &str) -> String {
    Validator::sanitize_file_name(&strip_extension(filename))
}

/// Front-matter header (description from `derived_text`, system prompt
/// from `content`) followed by the selection placeholder.
pub fn render(payload: &RecordPayload) -> Result<String> {
    let id = prompt_id(&payload.filename);
    let header = TemplateHeader {
        prompt_info: PromptInfo {
            prompt_id: &id,
            name: &id,
            description: &payload.derived_text,
            required_values: None,
            author: "fabric",
            tags: None,
            version: 1,
        },
        config: PromptConfig {
            mode: "insert",
            system: &payload.content,
        },
    };

    let yaml = serde_yaml::to_string(&header).map_err(|e| {
        SyncError::Serialization(format!("Failed to encode template {}: {}", id, e))
    })?;
    Ok(format!("---\n{}---\n\n{}\n", yaml, SELECTION_PLACEHOLDER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PayloadDefaults, SourceRecord};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use yaml_rust::{Yaml, YamlLoader};

    fn payload(filename: &str, content: &str, derived: &str) -> RecordPayload {
        let source = SourceRecord::new(filename, content, Utc::now()).with_derived_text(derived);
        RecordPayload::from_source(&source, &PayloadDefaults::new(";;fab")).unwrap()
    }

    fn front_matter(template: &str) -> Yaml {
        let inner = template
            .strip_prefix("---\n")
            .and_then(|rest| rest.split("\n---\n").next())
            .unwrap();
        YamlLoader::load_from_str(inner).unwrap().remove(0)
    }

    #[test]
    fn test_file_names() {
        assert_eq!(template_file_name("a.md"), "a.md");
        assert_eq!(template_file_name("summarize/system.md"), "summarize-system.md");
        assert_eq!(prompt_id("summarize/system.md"), "summarize-system");
    }

    #[test]
    fn test_render_layout() {
        let template = render(&payload("a.md", "# Purpose\nDo X", "# Purpose\nDo X")).unwrap();
        let doc = front_matter(&template);

        assert!(template.starts_with("---\nPromptInfo:\n"));
        assert_eq!(doc["PromptInfo"]["promptId"].as_str(), Some("a"));
        assert_eq!(doc["PromptInfo"]["name"].as_str(), Some("a"));
        assert_eq!(doc["PromptInfo"]["author"].as_str(), Some("fabric"));
        assert!(doc["PromptInfo"]["required_values"].is_null());
        assert!(doc["PromptInfo"]["tags"].is_null());
        assert_eq!(doc["config"]["mode"].as_str(), Some("insert"));
        assert!(template.contains("system: |"));
        assert!(template.ends_with("---\n\n{{selection}}\n"));
    }

    #[test]
    fn test_body_round_trip() {
        let content = "# IDENTITY\nYou summarize.\n\n# STEPS\n  - nested step\n- read";
        let template = render(&payload("sum.md", content, "# IDENTITY\nYou summarize.")).unwrap();
        let doc = front_matter(&template);

        assert_eq!(doc["config"]["system"].as_str(), Some(content));
        assert_eq!(
            doc["PromptInfo"]["description"].as_str(),
            Some("# IDENTITY\nYou summarize.")
        );
        assert_eq!(doc["PromptInfo"]["version"].as_i64(), Some(1));
    }

    #[test]
    fn test_leading_indentation_is_kept() {
        let content = "  indented start\nnext";
        let doc = front_matter(&render(&payload("i.md", content, content)).unwrap());
        assert_eq!(doc["config"]["system"].as_str(), Some(content));
    }

    #[test]
    fn test_crlf_content_round_trip() {
        let content = "# Purpose\r\nDo X\r\n";
        let doc = front_matter(&render(&payload("win.md", content, "# Purpose\r\nDo X")).unwrap());

        assert_eq!(doc["config"]["system"].as_str(), Some(content));
        assert_eq!(doc["PromptInfo"]["description"].as_str(), Some("# Purpose\r\nDo X"));
    }

    #[test]
    fn test_number_like_id_stays_string() {
        let doc = front_matter(&render(&payload("1.0.md", "body", "body")).unwrap());
        assert_eq!(doc["PromptInfo"]["promptId"].as_str(), Some("1.0"));
    }
}
