//! 核心：错误分类与两级尝试

pub mod error;
pub mod fallback;

pub use error::{ResearchError, ResearchResult, Stage, SurfaceError};
pub use fallback::{attempt_with_alternate, AlternateFailure, Tier};
