// file: src/parser/sections.rs
// description: keyword section extraction with pulldown-cmark
// reference: https://docs.rs/pulldown-cmark

use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use std::collections::BTreeSet;

/// Pulls the sections whose heading starts with one of the configured
/// keywords out of a markdown document. Each section runs from its heading to
/// the next matching heading (or end of input).
#[derive(Debug, Clone)]
pub struct SectionExtractor {
    keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    pub level: u32,
    pub text: String,
    pub offset: usize,
}

impl SectionExtractor {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        Self {
            keywords: keywords
                .iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Headings in document order with their byte offsets. Lines that only
    /// look like headings inside code blocks are not reported.
    pub fn headings(&self, content: &str) -> Vec<Heading> {
        let mut headings = Vec::new();
        let mut current: Option<Heading> = None;

        for (event, range) in Parser::new(content).into_offset_iter() {
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    current = Some(Heading {
                        level: level as u32,
                        text: String::new(),
                        offset: range.start,
                    });
                }
                Event::Text(text) | Event::Code(text) => {
                    if let Some(heading) = current.as_mut() {
                        heading.text.push_str(&text);
                    }
                }
                Event::End(TagEnd::Heading(_)) => {
                    if let Some(mut heading) = current.take() {
                        heading.text = heading.text.trim().to_string();
                        headings.push(heading);
                    }
                }
                _ => {}
            }
        }

        headings
    }

    pub fn matches(&self, heading: &str) -> bool {
        let heading = heading.trim().to_lowercase();
        self.keywords.iter().any(|k| heading.starts_with(k.as_str()))
    }

    /// Returns the unique matching sections, sorted and joined by a blank
    /// line, or `None` when no heading matches.
    pub fn extract(&self, content: &str) -> Option<String> {
        let starts: Vec<usize> = self
            .headings(content)
            .into_iter()
            .filter(|h| self.matches(&h.text))
            .map(|h| h.offset)
            .collect();

        let mut sections = BTreeSet::new();
        for (i, &start) in starts.iter().enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(content.len());
            let section = content[start..end].trim();
            if !section.is_empty() {
                sections.insert(section.to_string());
            }
        }

        if sections.is_empty() {
            None
        } else {
            Some(sections.into_iter().collect::<Vec<_>>().join("\n\n"))
        }
    }
}
