//! 大纲分节
//!
//! 章节以 `## Introduction:` / `## Step N:` / `## Conclusion:` 开头，
//! 到下一条分隔线（三个及以上 `-` 独占一行）或文末为止。不在任何章节内的文字（如开头的前言）被丢弃。

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::core::ResearchError;

/// 生成大纲步骤产出的原始文本；生成后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineDocument(String);

impl OutlineDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 章节标题
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionTitle {
    Introduction,
    Step(u64),
    Conclusion,
}

impl fmt::Display for SectionTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionTitle::Introduction => f.write_str("Introduction"),
            SectionTitle::Step(n) => write!(f, "Step {}", n),
            SectionTitle::Conclusion => f.write_str("Conclusion"),
        }
    }
}

/// 大纲中的一个章节（含标题行的完整原文）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionUnit {
    pub title: SectionTitle,
    pub raw_block: String,
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*#{2,}[ \t]+(?:(Introduction)|Step[ \t]+(\d+)|(Conclusion))[ \t]*:")
            .expect("heading pattern is valid")
    })
}

fn separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*-{3,}[ \t]*\r?$").expect("separator pattern is valid"))
}

/// 按文档顺序解析出全部章节；一个都没有时返回 NoSectionsFound
///
/// 不校验章节数量、重复标题或 Step 编号是否连续。
pub fn extract_sections(outline: &OutlineDocument) -> Result<Vec<SectionUnit>, ResearchError> {
    let text = outline.as_str();
    let mut sections = Vec::new();
    let mut cursor = 0;
    let mut dropped = 0;

    while let Some(caps) = heading_re().captures_at(text, cursor) {
        let Some(whole) = caps.get(0) else { break };
        let start = whole.start();
        dropped += text[cursor..start].trim().len();

        let end = separator_re()
            .find_at(text, whole.end())
            .map(|m| m.start())
            .unwrap_or(text.len());

        let title = if caps.get(1).is_some() {
            Some(SectionTitle::Introduction)
        } else if caps.get(3).is_some() {
            Some(SectionTitle::Conclusion)
        } else {
            caps.get(2).and_then(|n| n.as_str().parse().ok()).map(SectionTitle::Step)
        };

        match title {
            Some(title) => sections.push(SectionUnit {
                title,
                raw_block: text[start..end].trim().to_string(),
            }),
            None => {
                tracing::debug!(heading = whole.as_str(), "step number out of range, skipping");
                dropped += text[start..end].trim().len();
            }
        }

        // 跳过分隔符本身
        cursor = separator_re()
            .find_at(text, end)
            .filter(|m| m.start() == end)
            .map(|m| m.end())
            .unwrap_or(end);
        if cursor >= text.len() {
            break;
        }
    }
    if cursor < text.len() {
        dropped += text[cursor..].trim().len();
    }

    if dropped > 0 {
        tracing::debug!(dropped_bytes = dropped, "outline text outside any section was dropped");
    }
    if sections.is_empty() {
        return Err(ResearchError::NoSectionsFound);
    }
    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(sections: &[SectionUnit]) -> Vec<String> {
        sections.iter().map(|s| s.title.to_string()).collect()
    }

    const OUTLINE: &str = "\
Here is your outline.

## Introduction: Why bake sourdough
Short history.
---
## Step 1: Build a starter
Flour and water.
---
## Step 2: Shape the loaf
Stretch and fold.
---
## Conclusion: Enjoy
Slice after cooling.
---
";

    #[test]
    fn test_extracts_sections_in_document_order() {
        let sections = extract_sections(&OutlineDocument::new(OUTLINE)).unwrap();
        assert_eq!(titles(&sections), vec!["Introduction", "Step 1", "Step 2", "Conclusion"]);
        assert_eq!(
            sections[1].raw_block,
            "## Step 1: Build a starter\nFlour and water."
        );
    }

    #[test]
    fn test_preamble_is_dropped() {
        let sections = extract_sections(&OutlineDocument::new(OUTLINE)).unwrap();
        assert!(sections.iter().all(|s| !s.raw_block.contains("Here is your outline")));
    }

    #[test]
    fn test_last_section_may_end_at_end_of_document() {
        let text = "## Introduction: a\nbody\n---\n## Conclusion: b\nfinal words";
        let sections = extract_sections(&OutlineDocument::new(text)).unwrap();
        assert_eq!(titles(&sections), vec!["Introduction", "Conclusion"]);
        assert_eq!(sections[1].raw_block, "## Conclusion: b\nfinal words");
    }

    #[test]
    fn test_order_is_not_resorted() {
        let text = "## Step 3: c\n---\n## Step 1: a\n---\n## Introduction: i\n---\n";
        let sections = extract_sections(&OutlineDocument::new(text)).unwrap();
        assert_eq!(titles(&sections), vec!["Step 3", "Step 1", "Introduction"]);
    }

    #[test]
    fn test_duplicates_and_gaps_are_kept() {
        let text = "## Step 1: a\n---\n## Step 1: again\n---\n## Step 7: jump\n---\n";
        let sections = extract_sections(&OutlineDocument::new(text)).unwrap();
        assert_eq!(titles(&sections), vec!["Step 1", "Step 1", "Step 7"]);
    }

    #[test]
    fn test_span_runs_until_separator() {
        // 没有分隔符时，后续标题属于当前章节
        let text = "## Introduction: a\n## Step 1: b\n---\n## Conclusion: c\n";
        let sections = extract_sections(&OutlineDocument::new(text)).unwrap();
        assert_eq!(titles(&sections), vec!["Introduction", "Conclusion"]);
        assert!(sections[0].raw_block.contains("## Step 1: b"));
    }

    #[test]
    fn test_deeper_headings_and_indented_separators() {
        let text = "### Introduction: a\n  ---  \n#### Step 12: b\n---";
        let sections = extract_sections(&OutlineDocument::new(text)).unwrap();
        assert_eq!(titles(&sections), vec!["Introduction", "Step 12"]);
    }

    #[test]
    fn test_longer_dash_rules_end_sections() {
        let text = "## Introduction: a\nbody\n-----\n## Step 1: b\nx\n----\n## Conclusion: c\n";
        let sections = extract_sections(&OutlineDocument::new(text)).unwrap();
        assert_eq!(titles(&sections), vec!["Introduction", "Step 1", "Conclusion"]);
        assert_eq!(sections[0].raw_block, "## Introduction: a\nbody");
        assert_eq!(sections[1].raw_block, "## Step 1: b\nx");
    }

    #[test]
    fn test_inline_dashes_do_not_end_section() {
        let text = "## Step 1: mix---then rest\nmore --- text\n---\n";
        let sections = extract_sections(&OutlineDocument::new(text)).unwrap();
        assert_eq!(sections.len(), 1);
        assert!(sections[0].raw_block.ends_with("more --- text"));
    }

    #[test]
    fn test_unrecognized_labels_are_ignored() {
        let text = "## Summary: nope\n---\n## Step 2: yes\n---\n";
        let sections = extract_sections(&OutlineDocument::new(text)).unwrap();
        assert_eq!(titles(&sections), vec!["Step 2"]);
    }

    #[test]
    fn test_no_sections_is_structural_failure() {
        for text in ["", "just prose\n---\nmore prose", "# Introduction: single hash"] {
            let err = extract_sections(&OutlineDocument::new(text)).unwrap_err();
            assert!(matches!(err, ResearchError::NoSectionsFound), "input: {text:?}");
        }
    }

    #[test]
    fn test_crlf_outline() {
        let text = "## Introduction: a\r\nbody\r\n---\r\n## Conclusion: b\r\n";
        let sections = extract_sections(&OutlineDocument::new(text)).unwrap();
        assert_eq!(titles(&sections), vec!["Introduction", "Conclusion"]);
    }
}
