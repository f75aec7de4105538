// file: src/parser/frontmatter.rs
// description: YAML frontmatter extraction from markdown
// reference: https://docs.rs/yaml-rust

use crate::error::{Result, SyncError};
use std::collections::HashMap;
use std::path::Path;
use yaml_rust::{Yaml, YamlLoader};

pub struct FrontmatterParser;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter {
    pub fields: HashMap<String, String>,
}

impl Frontmatter {
    pub fn trigger(&self) -> Option<String> {
        self.non_empty("trigger")
    }

    pub fn label(&self) -> Option<String> {
        self.non_empty("label")
    }

    fn non_empty(&self, key: &str) -> Option<String> {
        self.fields
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

impl FrontmatterParser {
    pub fn new() -> Self {
        Self
    }

    /// Splits a leading `---` block off the document. Returns the parsed
    /// fields and the remaining body, or `None` when there is no block.
    pub fn extract<'a>(&self, path: &Path, content: &'a str) -> Result<Option<(Frontmatter, &'a str)>> {
        let Some(rest) = content
            .strip_prefix("---\n")
            .or_else(|| content.strip_prefix("---\r\n"))
        else {
            return Ok(None);
        };

        let Some((yaml_content, body)) = split_closing_delimiter(rest) else {
            return Ok(None);
        };

        let docs = YamlLoader::load_from_str(yaml_content).map_err(|e| SyncError::Processing {
            path: path.to_path_buf(),
            message: format!("front matter YAML parse error: {}", e),
        })?;

        let mut fields = HashMap::new();

        if let Some(Yaml::Hash(hash)) = docs.first() {
            for (key, value) in hash {
                let Yaml::String(k) = key else { continue };
                let rendered = match value {
                    Yaml::String(v) => v.clone(),
                    Yaml::Integer(i) => i.to_string(),
                    Yaml::Real(r) => r.clone(),
                    Yaml::Boolean(b) => b.to_string(),
                    _ => continue,
                };
                fields.insert(k.clone(), rendered);
            }
        }

        Ok(Some((Frontmatter { fields }, body)))
    }
}

fn split_closing_delimiter(rest: &str) -> Option<(&str, &str)> {
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

impl Default for FrontmatterParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frontmatter_extraction() {
        let parser = FrontmatterParser::new();
        let content = "---\ntrigger: \";;sum\"\nlabel: Summarize\n---\n\n# Purpose\nSummarize";

        let (frontmatter, body) = parser
            .extract(Path::new("a.md"), content)
            .unwrap()
            .unwrap();
        assert_eq!(frontmatter.trigger(), Some(";;sum".to_string()));
        assert_eq!(frontmatter.label(), Some("Summarize".to_string()));
        assert_eq!(body, "\n# Purpose\nSummarize");
    }

    #[test]
    fn test_no_frontmatter() {
        let parser = FrontmatterParser::new();
        let result = parser.extract(Path::new("a.md"), "# Just a heading").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_unterminated_block_is_plain_content() {
        let parser = FrontmatterParser::new();
        let result = parser
            .extract(Path::new("a.md"), "---\ntrigger: x\n# Purpose")
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_invalid_yaml_is_processing_error() {
        let parser = FrontmatterParser::new();
        let result = parser.extract(Path::new("bad.md"), "---\ntrigger: [unclosed\n---\nbody");
        assert!(matches!(result, Err(SyncError::Processing { .. })));
    }
}
