//! 对话式网页的能力接口
//!
//! 调研核心只依赖这里的 trait：SurfaceProvider 负责开出新的交互页（Tab），
//! ChatSurface 暴露一次请求/回复所需的全部动作。Chrome 与 Mock 两种实现。

use std::time::Duration;

use async_trait::async_trait;

use crate::core::SurfaceError;

/// 回复完成信号（复制按钮）的句柄：按出现顺序编号，越大越新
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SignalHandle(pub usize);

/// 从按页面顺序排列的信号中取最新的一个
pub fn most_recent(signals: &[SignalHandle]) -> Option<SignalHandle> {
    signals.iter().copied().max()
}

/// 共享浏览器会话：顺序地开出互相隔离的交互页
#[async_trait]
pub trait SurfaceProvider: Send + Sync {
    /// 新建交互页并导航到目标站点，在 `ready_bound` 内等到输入框可见
    async fn open_surface(&self, ready_bound: Duration) -> Result<Box<dyn ChatSurface>, SurfaceError>;
}

/// 单个交互页
#[async_trait]
pub trait ChatSurface: Send + Sync {
    /// 打开能力菜单（如 Tools 按钮）
    async fn open_capability_menu(&self) -> Result<(), SurfaceError>;

    /// 在 `bound` 内等到能力开关可见，返回当前是否已开启
    async fn capability_enabled(&self, bound: Duration) -> Result<bool, SurfaceError>;

    async fn toggle_capability(&self) -> Result<(), SurfaceError>;

    /// 点击页面空白处关闭浮层
    async fn dismiss_overlay(&self) -> Result<(), SurfaceError>;

    /// 一次性输入整段文字并回车提交
    async fn submit_prompt(&self, prompt: &str) -> Result<(), SurfaceError>;

    /// 阻塞直到出现完成信号，超过 `bound` 返回 Timeout
    async fn wait_for_completion(&self, bound: Duration) -> Result<(), SurfaceError>;

    /// 当前页面上所有完成信号，按出现顺序
    async fn completion_signals(&self) -> Result<Vec<SignalHandle>, SurfaceError>;

    async fn wait_attached(&self, signal: SignalHandle, bound: Duration) -> Result<(), SurfaceError>;

    /// 模拟真实点击；驱动层自身的等待不超过 `bound`
    async fn click(&self, signal: SignalHandle, bound: Duration) -> Result<(), SurfaceError>;

    /// 脚本派发 click 事件（直接点击失败后的备用方式）
    async fn dispatch_click(&self, signal: SignalHandle) -> Result<(), SurfaceError>;

    /// 读取被触发内容写入的传输缓冲区（剪贴板）
    async fn read_transfer_buffer(&self) -> Result<String, SurfaceError>;

    async fn close(&self) -> Result<(), SurfaceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_recent_picks_last_signal() {
        let signals = vec![SignalHandle(0), SignalHandle(1), SignalHandle(2)];
        assert_eq!(most_recent(&signals), Some(SignalHandle(2)));
        assert_eq!(most_recent(&[]), None);
    }
}
