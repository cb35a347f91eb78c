//! 调研编排：逐节、串行地执行交互会话并追加记录
//!
//! 每节：开新页 → 会话 → 无论成败都关页 → 立即追加一条记录。
//! 某节失败只记录错误块，不影响后续章节；不跨节重试，不调整顺序。

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;

use crate::browser::SurfaceProvider;
use crate::config::AppConfig;
use crate::core::{ResearchError, ResearchResult, Stage};
use crate::outline::{OutlineDocument, SectionTitle, SectionUnit};
use crate::research::output::{ResearchWriter, SectionRecord};
use crate::research::prompts::section_prompt;
use crate::research::session::InteractionSession;

/// 一轮调研的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub researched: usize,
    pub failed: Vec<SectionTitle>,
    /// 记录写盘失败的章节（此时该节结果只存在于日志中）
    pub unwritten: Vec<SectionTitle>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.researched + self.failed.len()
    }
}

pub struct ResearchOrchestrator<'a> {
    provider: &'a dyn SurfaceProvider,
    cfg: &'a AppConfig,
    writer: &'a ResearchWriter,
}

impl<'a> ResearchOrchestrator<'a> {
    pub fn new(provider: &'a dyn SurfaceProvider, cfg: &'a AppConfig, writer: &'a ResearchWriter) -> Self {
        Self { provider, cfg, writer }
    }

    /// 按顺序调研全部章节，每节恰好写入一条记录
    pub async fn run(&self, outline: &OutlineDocument, sections: &[SectionUnit]) -> RunSummary {
        let total = sections.len();
        let titles: Vec<String> = sections.iter().map(|s| s.title.to_string()).collect();
        tracing::info!(total, sections = ?titles, "starting research for each section");

        let mut summary = RunSummary::default();
        for (index, section) in sections.iter().enumerate() {
            tracing::info!(section = %section.title, index = index + 1, total, "researching");

            // 会话之外（开页 / 关页）的 panic 也只影响本节
            let result = match AssertUnwindSafe(self.research_one(outline, section))
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(panic) => Err(ResearchError::from_panic(panic.as_ref())),
            };
            if let Err(e) = &result {
                tracing::warn!(
                    section = %section.title,
                    error = %e,
                    timed_out = e.is_timeout(),
                    "research failed"
                );
            }

            let record = SectionRecord::from_result(section.title, result);
            if record.is_failure() {
                summary.failed.push(section.title);
            } else {
                summary.researched += 1;
            }

            match self.writer.append(&record).await {
                Ok(()) => tracing::info!(
                    section = %section.title,
                    file = %self.writer.path().display(),
                    "research appended"
                ),
                Err(e) => {
                    tracing::error!(section = %section.title, error = %e, "failed to append research record");
                    summary.unwritten.push(section.title);
                }
            }
        }

        tracing::info!(
            researched = summary.researched,
            failed = summary.failed.len(),
            "all research sections have been processed"
        );
        summary
    }

    /// 单节：获取专用页面 → 会话 → 释放页面（任何路径都会释放）
    async fn research_one(&self, outline: &OutlineDocument, section: &SectionUnit) -> ResearchResult {
        let timeouts = &self.cfg.timeouts;
        let surface = self
            .provider
            .open_surface(timeouts.navigation())
            .await
            .map_err(|e| ResearchError::at(Stage::AcquireSurface, e))?;

        let prompt = section_prompt(section.title, outline);
        let result = InteractionSession::new(surface.as_ref(), timeouts).run(&prompt).await;

        match surface.close().await {
            Ok(()) => tracing::info!(section = %section.title, "page closed"),
            Err(e) => tracing::warn!(section = %section.title, error = %e, "failed to close page"),
        }
        result
    }
}
