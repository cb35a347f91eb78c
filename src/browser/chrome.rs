//! Chrome 实现：使用 Headless Chrome（CDP）驱动对话式网页
//!
//! 需启用 feature "browser" 且系统已安装 Chrome/Chromium。
//! headless_chrome 为同步 API，所有调用经 spawn_blocking 执行；
//! 站点相关的选择器来自配置 [browser.selectors]。

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::browser::{ChatSurface, SignalHandle, SurfaceProvider};
use crate::config::{BrowserSection, SelectorsSection};
use crate::core::SurfaceError;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// 浏览器空闲多久后自动退出；等待回复可能长达 15 分钟，这里放宽到 1 小时
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(3600);

/// 长生命周期的浏览器会话，由顶层持有并以引用传入调研流程；Drop 时关闭浏览器
pub struct ChromeSession {
    browser: Browser,
    url: String,
    selectors: Arc<SelectorsSection>,
}

impl ChromeSession {
    /// 启动浏览器（可带持久化 Profile）
    pub fn launch(cfg: &BrowserSection) -> Result<Self, SurfaceError> {
        let args: Vec<&OsStr> = cfg.args.iter().map(OsStr::new).collect();
        let options = LaunchOptions::default_builder()
            .headless(cfg.headless)
            .user_data_dir(cfg.profile_dir.clone())
            .args(args)
            .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
            .build()
            .map_err(|e| SurfaceError::Driver(format!("Invalid launch options: {}", e)))?;
        let browser = Browser::new(options)
            .map_err(|e| SurfaceError::Driver(format!("Chrome launch failed: {}. Install Chrome/Chromium.", e)))?;

        tracing::info!(url = %cfg.url, headless = cfg.headless, "browser launched");
        Ok(Self {
            browser,
            url: cfg.url.clone(),
            selectors: Arc::new(cfg.selectors.clone()),
        })
    }
}

#[async_trait]
impl SurfaceProvider for ChromeSession {
    async fn open_surface(&self, ready_bound: Duration) -> Result<Box<dyn ChatSurface>, SurfaceError> {
        let browser = self.browser.clone();
        let tab = tokio::task::spawn_blocking(move || browser.new_tab())
            .await
            .map_err(|e| SurfaceError::Driver(format!("Task join: {}", e)))?
            .map_err(|e| SurfaceError::Driver(format!("Browser tab failed: {}", e)))?;

        let url = self.url.clone();
        let input = self.selectors.chat_input.clone();
        let surface = ChromeSurface {
            tab,
            selectors: Arc::clone(&self.selectors),
        };

        let opened = surface
            .blocking(move |tab| {
                tab.set_default_timeout(ready_bound);
                tab.navigate_to(&url)
                    .map_err(|e| SurfaceError::Driver(format!("Navigate failed: {}", e)))?;
                tab.wait_for_element_with_custom_timeout(&input, ready_bound)
                    .map_err(|_| SurfaceError::Timeout {
                        what: format!("chat input '{}'", input),
                        after: ready_bound,
                    })?;
                Ok(())
            })
            .await;

        match opened {
            Ok(()) => {
                tracing::info!(url = %self.url, "chat interface loaded");
                Ok(Box::new(surface))
            }
            Err(e) => {
                // 未就绪的页面不交给调用方，这里直接关掉
                if let Err(close_err) = surface.close().await {
                    tracing::warn!(error = %close_err, "failed to close tab that never became ready");
                }
                Err(e)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Trigger {
    /// 真实点击，驱动内部等待以所给上限为准
    Native(Duration),
    Synthetic,
}

/// 单个 Tab
pub struct ChromeSurface {
    tab: Arc<Tab>,
    selectors: Arc<SelectorsSection>,
}

impl ChromeSurface {
    async fn blocking<T, F>(&self, f: F) -> Result<T, SurfaceError>
    where
        F: FnOnce(&Tab) -> Result<T, SurfaceError> + Send + 'static,
        T: Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || f(&tab))
            .await
            .map_err(|e| SurfaceError::Driver(format!("Task join: {}", e)))?
    }

    /// 执行一段脚本并取回 JSON 值
    async fn eval(&self, js: String, await_promise: bool) -> Result<Option<serde_json::Value>, SurfaceError> {
        self.blocking(move |tab| {
            tab.evaluate(&js, await_promise)
                .map(|obj| obj.value)
                .map_err(|e| SurfaceError::Driver(format!("Evaluate failed: {}", e)))
        })
        .await
    }

    /// 在按出现顺序第 index 个完成信号上触发点击
    async fn trigger(&self, signal: SignalHandle, how: Trigger) -> Result<(), SurfaceError> {
        let selector = self.selectors.completion_signal.clone();
        self.blocking(move |tab| {
            let elements = tab
                .find_elements(&selector)
                .map_err(|e| SurfaceError::NotFound(format!("{}: {}", selector, e)))?;
            let element = elements
                .get(signal.0)
                .ok_or_else(|| SurfaceError::NotFound(format!("{} #{}", selector, signal.0)))?;
            match how {
                Trigger::Native(bound) => {
                    // 超时后 JoinHandle 被丢弃，阻塞线程里的点击不能比上限活得更久
                    tab.set_default_timeout(bound);
                    element.click().map(|_| ())
                }
                Trigger::Synthetic => element.call_js_fn(DISPATCH_CLICK_JS, vec![], false).map(|_| ()),
            }
            .map_err(|e| SurfaceError::Driver(format!("Click failed: {}", e)))
        })
        .await
    }

    /// 拦截页面写剪贴板的内容，读取时优先使用（无需剪贴板权限）
    async fn install_transfer_hook(&self) -> Result<(), SurfaceError> {
        self.eval(TRANSFER_HOOK_JS.to_string(), false).await.map(|_| ())
    }
}

const TRANSFER_HOOK_JS: &str = r#"
(function() {
    if (window.__researchBeeHooked) return true;
    window.__researchBeeHooked = true;
    window.__researchBeeTransfer = '';
    if (navigator.clipboard && navigator.clipboard.writeText) {
        const original = navigator.clipboard.writeText.bind(navigator.clipboard);
        navigator.clipboard.writeText = function(text) {
            window.__researchBeeTransfer = String(text);
            return original(text).catch(() => undefined);
        };
    }
    document.addEventListener('copy', () => {
        const selected = String(window.getSelection() || '');
        if (selected) window.__researchBeeTransfer = selected;
    }, true);
    return true;
})()
"#;

const READ_TRANSFER_JS: &str = r#"
(async function() {
    if (window.__researchBeeTransfer) return window.__researchBeeTransfer;
    try {
        return await navigator.clipboard.readText();
    } catch (e) {
        return '';
    }
})()
"#;

const DISPATCH_CLICK_JS: &str =
    "function() { this.dispatchEvent(new MouseEvent('click', { bubbles: true, cancelable: true })); }";

const STATE_UNKNOWN: &str = "unknown";

/// 只有明确的 "unchecked" 视为关闭，其余（含未知状态）都当作已开启
fn is_enabled_state(state: &str) -> bool {
    state != "unchecked"
}

/// 能力开关：标签 div 后紧邻的 button[role=checkbox]；返回其 data-state，
/// 可见但没有 data-state 时返回 STATE_UNKNOWN，不可见时返回 null
fn capability_js(label: &str, click: bool) -> String {
    let label = serde_json::to_string(label).unwrap_or_else(|_| "\"\"".to_string());
    let unknown = serde_json::Value::from(STATE_UNKNOWN);
    format!(
        r#"
        (function() {{
            const label = {label};
            for (const box of document.querySelectorAll('button[role="checkbox"]')) {{
                const prev = box.previousElementSibling;
                if (!prev || !prev.textContent.includes(label)) continue;
                if (box.offsetParent === null) continue;
                if ({click}) box.click();
                return box.getAttribute('data-state') || {unknown};
            }}
            return null;
        }})()
        "#
    )
}

#[async_trait]
impl ChatSurface for ChromeSurface {
    async fn open_capability_menu(&self) -> Result<(), SurfaceError> {
        let text = serde_json::to_string(&self.selectors.tools_button_text)
            .map_err(|e| SurfaceError::Driver(e.to_string()))?;
        let js = format!(
            r#"
            (function() {{
                const buttons = Array.from(document.querySelectorAll('button'))
                    .filter(b => b.textContent.includes({text}));
                if (buttons.length === 0) return false;
                buttons[buttons.length - 1].click();
                return true;
            }})()
            "#
        );
        match self.eval(js, false).await? {
            Some(serde_json::Value::Bool(true)) => Ok(()),
            _ => Err(SurfaceError::NotFound(format!(
                "button '{}'",
                self.selectors.tools_button_text
            ))),
        }
    }

    async fn capability_enabled(&self, bound: Duration) -> Result<bool, SurfaceError> {
        let js = capability_js(&self.selectors.capability_label, false);
        let label = self.selectors.capability_label.clone();
        self.blocking(move |tab| {
            let deadline = Instant::now() + bound;
            loop {
                let state = tab
                    .evaluate(&js, false)
                    .map_err(|e| SurfaceError::Driver(format!("Evaluate failed: {}", e)))?
                    .value;
                if let Some(serde_json::Value::String(state)) = state {
                    return Ok(is_enabled_state(&state));
                }
                if Instant::now() >= deadline {
                    return Err(SurfaceError::Timeout {
                        what: format!("'{}' toggle", label),
                        after: bound,
                    });
                }
                std::thread::sleep(POLL_INTERVAL);
            }
        })
        .await
    }

    async fn toggle_capability(&self) -> Result<(), SurfaceError> {
        let js = capability_js(&self.selectors.capability_label, true);
        match self.eval(js, false).await? {
            Some(serde_json::Value::String(_)) => Ok(()),
            _ => Err(SurfaceError::NotFound(format!(
                "'{}' toggle",
                self.selectors.capability_label
            ))),
        }
    }

    async fn dismiss_overlay(&self) -> Result<(), SurfaceError> {
        self.blocking(|tab| {
            tab.find_element("body")
                .and_then(|body| body.click().map(|_| ()))
                .map_err(|e| SurfaceError::Driver(format!("Body click failed: {}", e)))
        })
        .await
    }

    async fn submit_prompt(&self, prompt: &str) -> Result<(), SurfaceError> {
        let input = self.selectors.chat_input.clone();
        let prompt = prompt.to_string();
        self.blocking(move |tab| {
            let element = tab
                .find_element(&input)
                .map_err(|e| SurfaceError::NotFound(format!("{}: {}", input, e)))?;
            element
                .click()
                .map_err(|e| SurfaceError::Driver(format!("Focus input failed: {}", e)))?;
            tab.send_character(&prompt)
                .map_err(|e| SurfaceError::Driver(format!("Type failed: {}", e)))?;
            tab.press_key("Enter")
                .map_err(|e| SurfaceError::Driver(format!("Submit failed: {}", e)))?;
            Ok(())
        })
        .await
    }

    async fn wait_for_completion(&self, bound: Duration) -> Result<(), SurfaceError> {
        let selector = self.selectors.completion_signal.clone();
        self.blocking(move |tab| {
            tab.wait_for_element_with_custom_timeout(&selector, bound)
                .map(|_| ())
                .map_err(|_| SurfaceError::Timeout {
                    what: format!("completion signal '{}'", selector),
                    after: bound,
                })
        })
        .await
    }

    async fn completion_signals(&self) -> Result<Vec<SignalHandle>, SurfaceError> {
        let selector = self.selectors.completion_signal.clone();
        self.blocking(move |tab| {
            let count = tab
                .find_elements(&selector)
                .map(|elements| elements.len())
                .unwrap_or(0);
            Ok((0..count).map(SignalHandle).collect())
        })
        .await
    }

    async fn wait_attached(&self, signal: SignalHandle, bound: Duration) -> Result<(), SurfaceError> {
        let selector = self.selectors.completion_signal.clone();
        self.blocking(move |tab| {
            let deadline = Instant::now() + bound;
            loop {
                let count = tab
                    .find_elements(&selector)
                    .map(|elements| elements.len())
                    .unwrap_or(0);
                if count > signal.0 {
                    return Ok(());
                }
                if Instant::now() >= deadline {
                    return Err(SurfaceError::Timeout {
                        what: format!("{} #{} to attach", selector, signal.0),
                        after: bound,
                    });
                }
                std::thread::sleep(POLL_INTERVAL);
            }
        })
        .await
    }

    async fn click(&self, signal: SignalHandle, bound: Duration) -> Result<(), SurfaceError> {
        self.install_transfer_hook().await?;
        self.trigger(signal, Trigger::Native(bound)).await
    }

    async fn dispatch_click(&self, signal: SignalHandle) -> Result<(), SurfaceError> {
        self.install_transfer_hook().await?;
        self.trigger(signal, Trigger::Synthetic).await
    }

    async fn read_transfer_buffer(&self) -> Result<String, SurfaceError> {
        match self.eval(READ_TRANSFER_JS.to_string(), true).await? {
            Some(serde_json::Value::String(text)) => Ok(text),
            _ => Ok(String::new()),
        }
    }

    async fn close(&self) -> Result<(), SurfaceError> {
        self.blocking(|tab| {
            tab.close(true)
                .map(|_| ())
                .map_err(|e| SurfaceError::Driver(format!("Close tab failed: {}", e)))
        })
        .await
    }
}
