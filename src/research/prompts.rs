//! Prompt 组装

use crate::outline::{OutlineDocument, SectionTitle};

/// 生成大纲的 prompt：`Topic: ...` + 固定指令
pub fn outline_prompt(topic: &str, instruction: &str) -> String {
    format!("Topic: {}\n\nInstruction: {}", topic, instruction)
}

/// 单节调研的 prompt：章节标题 + 完整大纲上下文
pub fn section_prompt(title: SectionTitle, outline: &OutlineDocument) -> String {
    format!(
        "Do research on the following topic: '{}'. The full context of the article outline is as follows:\n\n---\n{}\n---",
        title,
        outline.as_str()
    )
}

/// 日志里展示的 prompt 预览（前 n 个字符）
pub fn preview(prompt: &str, n: usize) -> String {
    if prompt.chars().count() > n {
        format!("{}...", prompt.chars().take(n).collect::<String>())
    } else {
        prompt.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outline_prompt_layout() {
        let p = outline_prompt("Sourdough Bread", "Make an outline.");
        assert_eq!(p, "Topic: Sourdough Bread\n\nInstruction: Make an outline.");
    }

    #[test]
    fn test_section_prompt_embeds_full_outline() {
        let outline = OutlineDocument::new("## Step 2: Shape\n---");
        let p = section_prompt(SectionTitle::Step(2), &outline);
        assert!(p.starts_with("Do research on the following topic: 'Step 2'."));
        assert!(p.ends_with("\n\n---\n## Step 2: Shape\n---\n---"));
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("短文本", 80), "短文本");
        assert_eq!(preview("面包制作指南", 2), "面包...");
    }
}
