//! 调研错误类型
//!
//! SurfaceError 是浏览器驱动层的原始失败（超时 / 元素不存在 / 驱动异常）；
//! ResearchError 是交互会话对外暴露的失败原因，会话边界内所有错误都归一到这里。

use std::any::Any;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// 交互会话的阶段（每个阶段都是一个可能挂起 / 失败的点）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AcquireSurface,
    EnableCapability,
    SubmitPrompt,
    AwaitCompletion,
    TriggerExtraction,
    ReadResult,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::AcquireSurface => "acquire surface",
            Stage::EnableCapability => "enable capability",
            Stage::SubmitPrompt => "submit prompt",
            Stage::AwaitCompletion => "await completion",
            Stage::TriggerExtraction => "trigger extraction",
            Stage::ReadResult => "read result",
        };
        f.write_str(s)
    }
}

/// 浏览器驱动层错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("timed out waiting for {what} after {}s", .after.as_secs())]
    Timeout { what: String, after: Duration },

    #[error("element not found: {0}")]
    NotFound(String),

    #[error("driver error: {0}")]
    Driver(String),
}

/// 单节调研 / 大纲生成的失败原因
#[derive(Error, Debug)]
pub enum ResearchError {
    /// 大纲中没有识别到任何章节（结构解析失败，仅对调研阶段致命）
    #[error("no sections found in outline, check the outline format")]
    NoSectionsFound,

    #[error("surface timeout during {stage} after {}s", .after.as_secs())]
    SurfaceTimeout { stage: Stage, after: Duration },

    #[error("no response generated within {} minutes", .after.as_secs() / 60)]
    ResponseTimeout { after: Duration },

    #[error("transfer buffer was empty after extraction")]
    EmptyExtraction,

    /// 直接点击与脚本派发点击都失败
    #[error("extraction trigger failed (primary: {primary}; fallback: {fallback})")]
    InvocationFailure { primary: String, fallback: String },

    #[error("{stage} failed: {source}")]
    Surface {
        stage: Stage,
        #[source]
        source: SurfaceError,
    },

    #[error("interaction panicked: {0}")]
    Panicked(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResearchError {
    /// 将驱动层错误归类到所在阶段：等待生成的超时是 ResponseTimeout，其余超时是 SurfaceTimeout
    pub fn at(stage: Stage, err: SurfaceError) -> Self {
        match err {
            SurfaceError::Timeout { after, .. } if stage == Stage::AwaitCompletion => {
                ResearchError::ResponseTimeout { after }
            }
            SurfaceError::Timeout { after, .. } => ResearchError::SurfaceTimeout { stage, after },
            source => ResearchError::Surface { stage, source },
        }
    }

    /// 把捕获到的 panic 负载转成 Panicked
    pub fn from_panic(panic: &(dyn Any + Send)) -> Self {
        let msg = if let Some(s) = panic.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        ResearchError::Panicked(msg)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ResearchError::SurfaceTimeout { .. } | ResearchError::ResponseTimeout { .. }
        )
    }
}

/// 单节调研 / 大纲生成的结果：Ok(text) 或 Failed(reason)
pub type ResearchResult = Result<String, ResearchError>;
