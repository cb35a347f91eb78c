//! 大纲生成：在一个短生命周期页面上跑一次交互会话，结束后立即关页

use crate::browser::SurfaceProvider;
use crate::config::AppConfig;
use crate::core::{ResearchError, Stage};
use crate::outline::OutlineDocument;
use crate::research::prompts::{outline_prompt, preview};
use crate::research::session::InteractionSession;

/// 为主题生成内容大纲；失败时调用方应跳过整个调研阶段
pub async fn generate_outline(
    provider: &dyn SurfaceProvider,
    topic: &str,
    cfg: &AppConfig,
) -> Result<OutlineDocument, ResearchError> {
    tracing::info!(topic, "generating the content outline");
    let surface = provider
        .open_surface(cfg.timeouts.navigation())
        .await
        .map_err(|e| ResearchError::at(Stage::AcquireSurface, e))?;

    let prompt = outline_prompt(topic, &cfg.prompts.outline_instruction);
    tracing::info!(prompt = %preview(&prompt, 80), "sending prompt for outline");
    let result = InteractionSession::new(surface.as_ref(), &cfg.timeouts).run(&prompt).await;

    if let Err(e) = surface.close().await {
        tracing::warn!(error = %e, "failed to close outline page");
    }

    match result {
        Ok(text) => {
            tracing::info!(chars = text.chars().count(), "outline generated successfully");
            Ok(OutlineDocument::new(text))
        }
        Err(e) => {
            tracing::error!(error = %e, "an error occurred while generating the outline");
            Err(e)
        }
    }
}
