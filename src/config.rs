//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `RESEARCH_BEE__*` 覆盖（双下划线表示嵌套，如 `RESEARCH_BEE__BROWSER__HEADLESS=true`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub browser: BrowserSection,
    pub timeouts: TimeoutsSection,
    pub prompts: PromptsSection,
}

/// [app] 段：调研结果输出目录
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    #[serde(default = "default_research_dir")]
    pub research_dir: PathBuf,
}

fn default_research_dir() -> PathBuf {
    PathBuf::from("article_research")
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            research_dir: default_research_dir(),
        }
    }
}

/// [browser] 段：目标站点、持久化用户目录、启动参数
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSection {
    #[serde(default = "default_url")]
    pub url: String,
    /// 持久化 Profile 目录（保留登录状态）；未设置时使用临时目录
    pub profile_dir: Option<PathBuf>,
    #[serde(default)]
    pub headless: bool,
    #[serde(default = "default_browser_args")]
    pub args: Vec<String>,
    #[serde(default)]
    pub selectors: SelectorsSection,
}

fn default_url() -> String {
    "https://chat.z.ai/".to_string()
}

fn default_browser_args() -> Vec<String> {
    vec!["--disable-blink-features=AutomationControlled".into()]
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            url: default_url(),
            profile_dir: None,
            headless: false,
            args: default_browser_args(),
            selectors: SelectorsSection::default(),
        }
    }
}

/// [browser.selectors] 段：目标站点的 DOM 约定
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorsSection {
    #[serde(default = "default_chat_input")]
    pub chat_input: String,
    /// 打开工具菜单的按钮文字
    #[serde(default = "default_tools_button_text")]
    pub tools_button_text: String,
    /// 需要开启的能力开关旁的标签文字
    #[serde(default = "default_capability_label")]
    pub capability_label: String,
    /// 回复完成后出现的复制按钮
    #[serde(default = "default_completion_signal")]
    pub completion_signal: String,
}

fn default_chat_input() -> String {
    "textarea#chat-input".to_string()
}

fn default_tools_button_text() -> String {
    "Tools".to_string()
}

fn default_capability_label() -> String {
    "Web Search".to_string()
}

fn default_completion_signal() -> String {
    "button.copy-response-button".to_string()
}

impl Default for SelectorsSection {
    fn default() -> Self {
        Self {
            chat_input: default_chat_input(),
            tools_button_text: default_tools_button_text(),
            capability_label: default_capability_label(),
            completion_signal: default_completion_signal(),
        }
    }
}

/// [timeouts] 段：每个挂起点各自的上限，以及渲染稳定等待
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutsSection {
    #[serde(default = "default_navigation_secs")]
    pub navigation_secs: u64,
    #[serde(default = "default_toggle_secs")]
    pub toggle_secs: u64,
    /// 等待 AI 生成回复（毫秒），默认 15 分钟
    #[serde(default = "default_response_ms")]
    pub response_ms: u64,
    #[serde(default = "default_attach_secs")]
    pub attach_secs: u64,
    #[serde(default = "default_click_secs")]
    pub click_secs: u64,
    #[serde(default = "default_render_settle_ms")]
    pub render_settle_ms: u64,
    #[serde(default = "default_read_settle_ms")]
    pub read_settle_ms: u64,
    #[serde(default = "default_overlay_settle_ms")]
    pub overlay_settle_ms: u64,
}

fn default_navigation_secs() -> u64 {
    60
}

fn default_toggle_secs() -> u64 {
    10
}

fn default_response_ms() -> u64 {
    900_000
}

fn default_attach_secs() -> u64 {
    60
}

fn default_click_secs() -> u64 {
    15
}

fn default_render_settle_ms() -> u64 {
    2000
}

fn default_read_settle_ms() -> u64 {
    1000
}

fn default_overlay_settle_ms() -> u64 {
    500
}

impl Default for TimeoutsSection {
    fn default() -> Self {
        Self {
            navigation_secs: default_navigation_secs(),
            toggle_secs: default_toggle_secs(),
            response_ms: default_response_ms(),
            attach_secs: default_attach_secs(),
            click_secs: default_click_secs(),
            render_settle_ms: default_render_settle_ms(),
            read_settle_ms: default_read_settle_ms(),
            overlay_settle_ms: default_overlay_settle_ms(),
        }
    }
}

impl TimeoutsSection {
    pub fn navigation(&self) -> Duration {
        Duration::from_secs(self.navigation_secs)
    }

    pub fn toggle(&self) -> Duration {
        Duration::from_secs(self.toggle_secs)
    }

    pub fn response(&self) -> Duration {
        Duration::from_millis(self.response_ms)
    }

    pub fn attach(&self) -> Duration {
        Duration::from_secs(self.attach_secs)
    }

    pub fn click(&self) -> Duration {
        Duration::from_secs(self.click_secs)
    }

    pub fn render_settle(&self) -> Duration {
        Duration::from_millis(self.render_settle_ms)
    }

    pub fn read_settle(&self) -> Duration {
        Duration::from_millis(self.read_settle_ms)
    }

    pub fn overlay_settle(&self) -> Duration {
        Duration::from_millis(self.overlay_settle_ms)
    }

    /// 所有稳定等待置零（测试用）
    pub fn without_settle_delays(mut self) -> Self {
        self.render_settle_ms = 0;
        self.read_settle_ms = 0;
        self.overlay_settle_ms = 0;
        self
    }
}

/// [prompts] 段：大纲生成的固定指令
#[derive(Debug, Clone, Deserialize)]
pub struct PromptsSection {
    #[serde(default = "default_outline_instruction")]
    pub outline_instruction: String,
}

fn default_outline_instruction() -> String {
    "Search the web for the latest and most comprehensive guides on this topic. Then, generate a detailed, step-by-step content outline with an Introduction, multiple Steps, and a Conclusion. Structure it clearly with '---' separators between sections.".to_string()
}

impl Default for PromptsSection {
    fn default() -> Self {
        Self {
            outline_instruction: default_outline_instruction(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 RESEARCH_BEE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 RESEARCH_BEE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("RESEARCH_BEE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
