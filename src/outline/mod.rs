//! 大纲：原始文档与分节解析

pub mod extractor;

pub use extractor::{extract_sections, OutlineDocument, SectionTitle, SectionUnit};
