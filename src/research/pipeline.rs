//! 顶层流程：生成大纲 → 分节 → 逐节调研
//!
//! 浏览器会话由调用方持有并以引用传入。大纲失败或没有章节时跳过调研阶段（报告而非崩溃）；
//! 已写入的记录不会因后续失败丢失。

use std::path::PathBuf;

use chrono::NaiveDateTime;

use crate::browser::SurfaceProvider;
use crate::config::AppConfig;
use crate::core::ResearchError;
use crate::outline::extract_sections;
use crate::research::generate::generate_outline;
use crate::research::orchestrator::{ResearchOrchestrator, RunSummary};
use crate::research::output::{output_path, ResearchWriter};

/// 一次运行的结局
#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunSummary),
    /// 大纲生成失败，未进入调研阶段
    OutlineFailed(ResearchError),
    /// 大纲中没有可识别的章节
    NoSections,
}

#[derive(Debug)]
pub struct RunReport {
    pub output_path: PathBuf,
    pub outcome: RunOutcome,
}

/// 对主题执行完整流程；只有输出目录无法创建时返回 Err
pub async fn run_research(
    provider: &dyn SurfaceProvider,
    topic: &str,
    cfg: &AppConfig,
    started_at: NaiveDateTime,
) -> Result<RunReport, ResearchError> {
    let path = output_path(&cfg.app.research_dir, topic, started_at);
    let writer = ResearchWriter::create(&path).await?;

    let outcome = research_into(provider, topic, cfg, &writer).await;
    Ok(RunReport {
        output_path: path,
        outcome,
    })
}

async fn research_into(
    provider: &dyn SurfaceProvider,
    topic: &str,
    cfg: &AppConfig,
    writer: &ResearchWriter,
) -> RunOutcome {
    let outline = match generate_outline(provider, topic, cfg).await {
        Ok(outline) => outline,
        Err(e) => {
            tracing::warn!("could not generate an outline, research step is skipped");
            return RunOutcome::OutlineFailed(e);
        }
    };

    let sections = match extract_sections(&outline) {
        Ok(sections) => sections,
        Err(e) => {
            tracing::error!(error = %e, "research phase stopped");
            return RunOutcome::NoSections;
        }
    };

    let summary = ResearchOrchestrator::new(provider, cfg, writer)
        .run(&outline, &sections)
        .await;
    RunOutcome::Completed(summary)
}

impl RunReport {
    /// 给操作者看的总结
    pub fn describe(&self) -> String {
        let file = self.output_path.display();
        match &self.outcome {
            RunOutcome::Completed(summary) if summary.failed.is_empty() => format!(
                "All {} sections researched. Results saved in '{}'.",
                summary.total(),
                file
            ),
            RunOutcome::Completed(summary) => {
                let failed: Vec<String> = summary.failed.iter().map(|t| t.to_string()).collect();
                format!(
                    "{} of {} sections researched, failed: {}. Results saved in '{}'.",
                    summary.researched,
                    summary.total(),
                    failed.join(", "),
                    file
                )
            }
            RunOutcome::OutlineFailed(e) => {
                format!("Could not generate an outline ({}), research step was skipped.", e)
            }
            RunOutcome::NoSections => {
                "No sections found in the outline, research step was skipped.".to_string()
            }
        }
    }
}
