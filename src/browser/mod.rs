//! 浏览器层：调研核心消费的能力接口，以及 Chrome / Mock 两种实现

pub mod mock;
pub mod traits;

#[cfg(feature = "browser")]
pub mod chrome;

pub use mock::{MockBrowser, MockLog, MockResponse, MockScript, MockSurface};
pub use traits::{most_recent, ChatSurface, SignalHandle, SurfaceProvider};

#[cfg(feature = "browser")]
pub use chrome::{ChromeSession, ChromeSurface};
