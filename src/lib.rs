//! Research Bee - 驱动对话式网页的文章调研机器人
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误分类、主/备两级尝试
//! - **browser**: 交互页能力接口与 Chrome / Mock 实现
//! - **outline**: 大纲文档与分节解析
//! - **research**: 交互会话、大纲生成、逐节编排、结果文件
//! - **observability**: 日志初始化

pub mod browser;
pub mod config;
pub mod core;
pub mod observability;
pub mod outline;
pub mod research;

pub use research::{run_research, RunOutcome, RunReport};
