//! Mock 浏览器（用于测试，无需 Chrome）
//!
//! 按提交的 prompt 决定回复：正文 / 空剪贴板 / 生成超时；
//! 记录开页、关页、开关切换、主点击与备用点击次数，便于断言交互协议。

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::browser::{ChatSurface, SignalHandle, SurfaceProvider};
use crate::core::SurfaceError;

/// 某个 prompt 对应的回复行为
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    Text(String),
    /// 触发成功但剪贴板为空
    Empty,
    /// 超过等待上限仍未生成
    Timeout,
}

/// 交互页的行为脚本
#[derive(Debug, Clone)]
pub struct MockScript {
    pub capability_enabled: bool,
    pub primary_click_fails: bool,
    pub fallback_click_fails: bool,
    /// 完成后页面上的复制按钮数量（只有最后一个携带本次回复）
    pub signals: usize,
}

impl Default for MockScript {
    fn default() -> Self {
        Self {
            capability_enabled: false,
            primary_click_fails: false,
            fallback_click_fails: false,
            signals: 1,
        }
    }
}

/// 所有交互页共享的调用记录
#[derive(Debug, Default, Clone)]
pub struct MockLog {
    pub opened: usize,
    pub closed: usize,
    pub toggles: usize,
    pub overlays_dismissed: usize,
    pub primary_clicks: usize,
    pub fallback_clicks: usize,
    /// 每次直接点击收到的上限
    pub click_bounds: Vec<Duration>,
    pub prompts: Vec<String>,
}

type Responder = dyn Fn(&str) -> MockResponse + Send + Sync;

/// Mock 会话：每次 open_surface 产出一个按脚本运行的 MockSurface
pub struct MockBrowser {
    script: MockScript,
    responder: Arc<Responder>,
    /// 第 n 次（从 0 起）开页直接失败
    fail_open_at: Vec<usize>,
    log: Arc<Mutex<MockLog>>,
}

impl MockBrowser {
    pub fn new(responder: impl Fn(&str) -> MockResponse + Send + Sync + 'static) -> Self {
        Self {
            script: MockScript::default(),
            responder: Arc::new(responder),
            fail_open_at: Vec::new(),
            log: Arc::new(Mutex::new(MockLog::default())),
        }
    }

    pub fn with_script(mut self, script: MockScript) -> Self {
        self.script = script;
        self
    }

    pub fn fail_open_at(mut self, attempt: usize) -> Self {
        self.fail_open_at.push(attempt);
        self
    }

    /// 当前调用记录的快照
    pub fn log(&self) -> MockLog {
        lock(&self.log).clone()
    }
}

#[async_trait]
impl SurfaceProvider for MockBrowser {
    async fn open_surface(&self, _ready_bound: Duration) -> Result<Box<dyn ChatSurface>, SurfaceError> {
        let attempt = {
            let mut log = lock(&self.log);
            let attempt = log.opened;
            log.opened += 1;
            attempt
        };
        if self.fail_open_at.contains(&attempt) {
            return Err(SurfaceError::Driver(format!("mock tab {} failed to open", attempt)));
        }
        Ok(Box::new(MockSurface {
            script: self.script.clone(),
            responder: Arc::clone(&self.responder),
            state: Mutex::new(SurfaceState {
                capability_enabled: self.script.capability_enabled,
                ..SurfaceState::default()
            }),
            log: Arc::clone(&self.log),
        }))
    }
}

#[derive(Debug, Default)]
struct SurfaceState {
    capability_enabled: bool,
    response: Option<MockResponse>,
    clipboard: String,
}

/// 按脚本运行的单个交互页
pub struct MockSurface {
    script: MockScript,
    responder: Arc<Responder>,
    state: Mutex<SurfaceState>,
    log: Arc<Mutex<MockLog>>,
}

impl MockSurface {
    fn copy_from(&self, signal: SignalHandle) -> Result<(), SurfaceError> {
        let mut state = lock(&self.state);
        // 只有最新的复制按钮对应本次回复，旧按钮复制的是空内容
        let latest = self.script.signals.checked_sub(1).map(SignalHandle);
        let copied = match (&state.response, latest == Some(signal)) {
            (Some(MockResponse::Text(text)), true) => text.clone(),
            _ => String::new(),
        };
        state.clipboard = copied;
        Ok(())
    }
}

#[async_trait]
impl ChatSurface for MockSurface {
    async fn open_capability_menu(&self) -> Result<(), SurfaceError> {
        Ok(())
    }

    async fn capability_enabled(&self, _bound: Duration) -> Result<bool, SurfaceError> {
        Ok(lock(&self.state).capability_enabled)
    }

    async fn toggle_capability(&self) -> Result<(), SurfaceError> {
        let mut state = lock(&self.state);
        state.capability_enabled = !state.capability_enabled;
        lock(&self.log).toggles += 1;
        Ok(())
    }

    async fn dismiss_overlay(&self) -> Result<(), SurfaceError> {
        lock(&self.log).overlays_dismissed += 1;
        Ok(())
    }

    async fn submit_prompt(&self, prompt: &str) -> Result<(), SurfaceError> {
        let response = (self.responder)(prompt);
        lock(&self.state).response = Some(response);
        lock(&self.log).prompts.push(prompt.to_string());
        Ok(())
    }

    async fn wait_for_completion(&self, bound: Duration) -> Result<(), SurfaceError> {
        match lock(&self.state).response {
            Some(MockResponse::Timeout) => Err(SurfaceError::Timeout {
                what: "completion signal".into(),
                after: bound,
            }),
            Some(_) => Ok(()),
            None => Err(SurfaceError::NotFound("no prompt submitted".into())),
        }
    }

    async fn completion_signals(&self) -> Result<Vec<SignalHandle>, SurfaceError> {
        Ok((0..self.script.signals).map(SignalHandle).collect())
    }

    async fn wait_attached(&self, signal: SignalHandle, bound: Duration) -> Result<(), SurfaceError> {
        if signal.0 < self.script.signals {
            Ok(())
        } else {
            Err(SurfaceError::Timeout {
                what: format!("signal {} to attach", signal.0),
                after: bound,
            })
        }
    }

    async fn click(&self, signal: SignalHandle, bound: Duration) -> Result<(), SurfaceError> {
        {
            let mut log = lock(&self.log);
            log.primary_clicks += 1;
            log.click_bounds.push(bound);
        }
        if self.script.primary_click_fails {
            return Err(SurfaceError::Driver("element is covered by another element".into()));
        }
        self.copy_from(signal)
    }

    async fn dispatch_click(&self, signal: SignalHandle) -> Result<(), SurfaceError> {
        lock(&self.log).fallback_clicks += 1;
        if self.script.fallback_click_fails {
            return Err(SurfaceError::Driver("dispatchEvent rejected".into()));
        }
        self.copy_from(signal)
    }

    async fn read_transfer_buffer(&self) -> Result<String, SurfaceError> {
        Ok(lock(&self.state).clipboard.clone())
    }

    async fn close(&self) -> Result<(), SurfaceError> {
        lock(&self.log).closed += 1;
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
