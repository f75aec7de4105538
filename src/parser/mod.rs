// file: src/parser/mod.rs
// description: markdown parsing module exports
// reference: internal module structure

pub mod frontmatter;
pub mod sections;

pub use frontmatter::{Frontmatter, FrontmatterParser};
pub use sections::{Heading, SectionExtractor};
