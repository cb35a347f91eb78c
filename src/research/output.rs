//! 调研结果文件：只追加的纯文本
//!
//! 路径：`<research_dir>/article_research_<sanitized topic>_<YYYYMMDD_HHMMSS>.txt`。
//! 每条记录写入时单独打开文件（append）并立即关闭，中途崩溃不会丢失已写入的记录。

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tokio::io::AsyncWriteExt;

use crate::core::ResearchError;
use crate::outline::SectionTitle;

/// 主题转文件名：只保留字母数字、空格、下划线，去掉尾部空白，空格替换为下划线
pub fn sanitize_topic(topic: &str) -> String {
    topic
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_')
        .collect::<String>()
        .trim_end()
        .replace(' ', "_")
}

/// 输入行转主题：只去掉行尾换行，其余空白原样交给 sanitize_topic；全空白视为未提供
pub fn topic_from_line(line: &str) -> Option<&str> {
    let topic = line.trim_end_matches(['\r', '\n']);
    if topic.trim().is_empty() {
        None
    } else {
        Some(topic)
    }
}

/// 本次运行的输出文件路径
pub fn output_path(research_dir: &Path, topic: &str, started_at: NaiveDateTime) -> PathBuf {
    research_dir.join(format!(
        "article_research_{}_{}.txt",
        sanitize_topic(topic),
        started_at.format("%Y%m%d_%H%M%S")
    ))
}

/// 记录正文
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordBody {
    Researched(String),
    /// 调研失败（会话内失败或会话外异常），附带原因
    Failed(String),
    /// 触发成功但剪贴板为空
    NothingCopied,
}

/// 每个章节恰好一条记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRecord {
    pub title: SectionTitle,
    pub body: RecordBody,
}

impl SectionRecord {
    pub fn from_result(title: SectionTitle, result: Result<String, ResearchError>) -> Self {
        let body = match result {
            Ok(text) => RecordBody::Researched(text),
            Err(ResearchError::EmptyExtraction) => RecordBody::NothingCopied,
            Err(e) => RecordBody::Failed(e.to_string()),
        };
        Self { title, body }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self.body, RecordBody::Researched(_))
    }

    /// 记录的文本形式：两个空行 + 分隔标题行 + 空行 + 正文
    pub fn render(&self) -> String {
        let bar = "=".repeat(20);
        let header = format!(
            "\n\n{} {} {}\n\n",
            bar,
            self.title.to_string().to_uppercase(),
            bar
        );
        let body = match &self.body {
            RecordBody::Researched(text) => text.clone(),
            RecordBody::Failed(details) => format!(
                "--- ERROR DURING RESEARCH FOR: {} ---\nDetails: {}\n",
                self.title, details
            ),
            RecordBody::NothingCopied => {
                format!("--- ERROR: FAILED TO COPY CONTENT FOR {} ---\n", self.title)
            }
        };
        header + &body
    }
}

/// 追加写入器
#[derive(Debug, Clone)]
pub struct ResearchWriter {
    path: PathBuf,
}

impl ResearchWriter {
    /// 确保所在目录存在
    pub async fn create(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
                tracing::info!(dir = %parent.display(), "research folder created");
            }
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 打开 → 追加一条记录 → 落盘 → 关闭
    pub async fn append(&self, record: &SectionRecord) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(record.render().as_bytes()).await?;
        file.sync_data().await?;
        Ok(())
    }
}
