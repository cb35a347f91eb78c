//! 交互会话：一次完整的「提交 → 等待 → 提取」
//!
//! 阶段：开启能力开关（幂等）→ 提交 prompt → 等待完成信号 → 触发最新信号（直接点击，失败后脚本派发）→ 读取传输缓冲区。
//! 每个挂起点都有各自的上限；任何失败（含 panic）都在会话边界归一为 Err(ResearchError)，不会向上抛出。

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::time::{sleep, timeout};

use crate::browser::{most_recent, ChatSurface, SignalHandle};
use crate::config::TimeoutsSection;
use crate::core::{attempt_with_alternate, ResearchError, ResearchResult, Stage, SurfaceError, Tier};

/// 驱动层自身的超时之外，再留一点余量作为硬上限
const GUARD_GRACE: Duration = Duration::from_secs(5);

/// 绑定到单个交互页的一次会话
pub struct InteractionSession<'a> {
    surface: &'a dyn ChatSurface,
    timeouts: &'a TimeoutsSection,
}

impl<'a> InteractionSession<'a> {
    pub fn new(surface: &'a dyn ChatSurface, timeouts: &'a TimeoutsSection) -> Self {
        Self { surface, timeouts }
    }

    /// 跑完整个协议；永远返回 ResearchResult，panic 也会被捕获
    pub async fn run(&self, prompt: &str) -> ResearchResult {
        match AssertUnwindSafe(self.exchange(prompt)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(ResearchError::from_panic(panic.as_ref())),
        }
    }

    async fn exchange(&self, prompt: &str) -> ResearchResult {
        self.ensure_capability().await?;
        self.submit(prompt).await?;
        self.await_completion().await?;
        let tier = self.trigger_extraction().await?;
        tracing::info!(tier = ?tier, "response copied to transfer buffer");
        self.read_result().await
    }

    /// 能力开关只在关闭时切换，已开启则不动
    pub async fn ensure_capability(&self) -> Result<(), ResearchError> {
        let stage = Stage::EnableCapability;
        let toggle_bound = self.timeouts.toggle();

        guarded(stage, self.action_bound(), self.surface.open_capability_menu()).await?;
        let enabled = guarded(stage, toggle_bound, self.surface.capability_enabled(toggle_bound)).await?;
        if enabled {
            tracing::info!("web search capability was already enabled");
        } else {
            guarded(stage, self.action_bound(), self.surface.toggle_capability()).await?;
            tracing::info!("web search capability has been enabled");
        }

        guarded(stage, self.action_bound(), self.surface.dismiss_overlay()).await?;
        sleep(self.timeouts.overlay_settle()).await;
        Ok(())
    }

    async fn submit(&self, prompt: &str) -> Result<(), ResearchError> {
        guarded(Stage::SubmitPrompt, self.action_bound(), self.surface.submit_prompt(prompt)).await?;
        tracing::info!(
            max_minutes = self.timeouts.response().as_secs() / 60,
            "prompt sent, waiting for AI response"
        );
        Ok(())
    }

    async fn await_completion(&self) -> Result<(), ResearchError> {
        let bound = self.timeouts.response();
        guarded(Stage::AwaitCompletion, bound, self.surface.wait_for_completion(bound)).await
    }

    /// 定位最新的完成信号并触发：先直接点击（限时），失败后脚本派发一次
    async fn trigger_extraction(&self) -> Result<Tier, ResearchError> {
        let stage = Stage::TriggerExtraction;
        let attach_bound = self.timeouts.attach();

        let signals = guarded(stage, self.action_bound(), self.surface.completion_signals()).await?;
        // 刚出现时列表可能还未更新，此时等第一个挂载
        let latest = most_recent(&signals).unwrap_or(SignalHandle(0));
        guarded(stage, attach_bound, self.surface.wait_attached(latest, attach_bound)).await?;
        sleep(self.timeouts.render_settle()).await;

        tracing::info!(signal = latest.0, total = signals.len(), "clicking the copy button");
        let (_, tier) = attempt_with_alternate(
            self.timeouts.click(),
            self.surface.click(latest, self.timeouts.click()),
            || self.surface.dispatch_click(latest),
        )
        .await
        .map_err(|f| ResearchError::InvocationFailure {
            primary: f.primary,
            fallback: f.alternate,
        })?;
        Ok(tier)
    }

    async fn read_result(&self) -> ResearchResult {
        sleep(self.timeouts.read_settle()).await;
        let text = guarded(Stage::ReadResult, self.action_bound(), self.surface.read_transfer_buffer()).await?;
        if text.trim().is_empty() {
            return Err(ResearchError::EmptyExtraction);
        }
        Ok(text)
    }

    /// 没有专门上限的单步动作，用导航上限兜底
    fn action_bound(&self) -> Duration {
        self.timeouts.navigation()
    }
}

/// 以 `bound` + 余量为硬上限执行一步，并把失败归类到所在阶段
async fn guarded<T, F>(stage: Stage, bound: Duration, step: F) -> Result<T, ResearchError>
where
    F: Future<Output = Result<T, SurfaceError>>,
{
    match timeout(bound + GUARD_GRACE, step).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ResearchError::at(stage, e)),
        Err(_) => Err(ResearchError::at(
            stage,
            SurfaceError::Timeout {
                what: stage.to_string(),
                after: bound,
            },
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{MockBrowser, MockResponse, MockScript, SurfaceProvider};
    use async_trait::async_trait;

    fn fast_timeouts() -> TimeoutsSection {
        TimeoutsSection::default().without_settle_delays()
    }

    async fn run_with(browser: &MockBrowser, prompt: &str) -> ResearchResult {
        let timeouts = fast_timeouts();
        let surface = browser.open_surface(timeouts.navigation()).await.unwrap();
        let result = InteractionSession::new(surface.as_ref(), &timeouts).run(prompt).await;
        surface.close().await.unwrap();
        result
    }

    #[tokio::test]
    async fn test_success_returns_copied_text() {
        let browser = MockBrowser::new(|_| MockResponse::Text("researched".into()));
        let result = run_with(&browser, "hello").await;
        assert_eq!(result.unwrap(), "researched");

        let log = browser.log();
        assert_eq!(log.prompts, vec!["hello".to_string()]);
        assert_eq!(log.primary_clicks, 1);
        assert_eq!(log.fallback_clicks, 0);
        assert_eq!(log.overlays_dismissed, 1);
        // 直接点击把自己的上限交给驱动层
        assert_eq!(log.click_bounds, vec![fast_timeouts().click()]);
    }

    #[tokio::test]
    async fn test_capability_toggled_only_when_disabled() {
        let off = MockBrowser::new(|_| MockResponse::Text("x".into()));
        run_with(&off, "p").await.unwrap();
        assert_eq!(off.log().toggles, 1);

        let on = MockBrowser::new(|_| MockResponse::Text("x".into())).with_script(MockScript {
            capability_enabled: true,
            ..MockScript::default()
        });
        run_with(&on, "p").await.unwrap();
        assert_eq!(on.log().toggles, 0);
    }

    #[tokio::test]
    async fn test_primary_failure_falls_back_once() {
        let browser = MockBrowser::new(|_| MockResponse::Text("via fallback".into())).with_script(MockScript {
            primary_click_fails: true,
            ..MockScript::default()
        });
        let result = run_with(&browser, "p").await;
        assert_eq!(result.unwrap(), "via fallback");
        let log = browser.log();
        assert_eq!(log.primary_clicks, 1);
        assert_eq!(log.fallback_clicks, 1);
    }

    #[tokio::test]
    async fn test_both_triggers_failing_yields_invocation_failure() {
        let browser = MockBrowser::new(|_| MockResponse::Text("never".into())).with_script(MockScript {
            primary_click_fails: true,
            fallback_click_fails: true,
            ..MockScript::default()
        });
        let err = run_with(&browser, "p").await.unwrap_err();
        match err {
            ResearchError::InvocationFailure { primary, fallback } => {
                assert!(primary.contains("covered"));
                assert!(fallback.contains("dispatchEvent"));
            }
            other => panic!("Expected InvocationFailure, got {other:?}"),
        }
        assert_eq!(browser.log().fallback_clicks, 1);
    }

    #[tokio::test]
    async fn test_response_timeout() {
        let browser = MockBrowser::new(|_| MockResponse::Timeout);
        let err = run_with(&browser, "p").await.unwrap_err();
        assert!(matches!(err, ResearchError::ResponseTimeout { .. }));
        assert_eq!(browser.log().primary_clicks, 0);
    }

    #[tokio::test]
    async fn test_empty_buffer_is_empty_extraction() {
        let browser = MockBrowser::new(|_| MockResponse::Empty);
        let err = run_with(&browser, "p").await.unwrap_err();
        assert!(matches!(err, ResearchError::EmptyExtraction));
    }

    #[tokio::test]
    async fn test_acts_on_most_recent_signal() {
        // 旧回复的复制按钮复制不到本次内容
        let browser = MockBrowser::new(|_| MockResponse::Text("latest".into())).with_script(MockScript {
            signals: 3,
            ..MockScript::default()
        });
        assert_eq!(run_with(&browser, "p").await.unwrap(), "latest");
    }

    struct PanickingSurface;

    #[async_trait]
    impl ChatSurface for PanickingSurface {
        async fn open_capability_menu(&self) -> Result<(), SurfaceError> {
            panic!("menu exploded")
        }
        async fn capability_enabled(&self, _: Duration) -> Result<bool, SurfaceError> {
            Ok(true)
        }
        async fn toggle_capability(&self) -> Result<(), SurfaceError> {
            Ok(())
        }
        async fn dismiss_overlay(&self) -> Result<(), SurfaceError> {
            Ok(())
        }
        async fn submit_prompt(&self, _: &str) -> Result<(), SurfaceError> {
            Ok(())
        }
        async fn wait_for_completion(&self, _: Duration) -> Result<(), SurfaceError> {
            Ok(())
        }
        async fn completion_signals(&self) -> Result<Vec<SignalHandle>, SurfaceError> {
            Ok(vec![])
        }
        async fn wait_attached(&self, _: SignalHandle, _: Duration) -> Result<(), SurfaceError> {
            Ok(())
        }
        async fn click(&self, _: SignalHandle, _: Duration) -> Result<(), SurfaceError> {
            Ok(())
        }
        async fn dispatch_click(&self, _: SignalHandle) -> Result<(), SurfaceError> {
            Ok(())
        }
        async fn read_transfer_buffer(&self) -> Result<String, SurfaceError> {
            Ok(String::new())
        }
        async fn close(&self) -> Result<(), SurfaceError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_panic_is_caught_at_session_boundary() {
        let timeouts = fast_timeouts();
        let surface = PanickingSurface;
        let err = InteractionSession::new(&surface, &timeouts).run("p").await.unwrap_err();
        match err {
            ResearchError::Panicked(msg) => assert_eq!(msg, "menu exploded"),
            other => panic!("Expected Panicked, got {other:?}"),
        }
    }
}
