//! 主动作 + 备用动作的两级尝试
//!
//! 主动作在限定时间内执行；失败或超时后，结构上不同的备用动作恰好尝试一次；
//! 两者都失败才返回错误（携带两边的原因）。

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

/// 最终生效的是哪一级
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Primary,
    Alternate,
}

/// 两级都失败时的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternateFailure {
    pub primary: String,
    pub alternate: String,
}

/// 先在 `primary_bound` 内执行 primary；失败则调用一次 alternate
pub async fn attempt_with_alternate<T, E, P, A, AF>(
    primary_bound: Duration,
    primary: P,
    alternate: A,
) -> Result<(T, Tier), AlternateFailure>
where
    E: Display,
    P: Future<Output = Result<T, E>>,
    A: FnOnce() -> AF,
    AF: Future<Output = Result<T, E>>,
{
    let primary_reason = match timeout(primary_bound, primary).await {
        Ok(Ok(value)) => return Ok((value, Tier::Primary)),
        Ok(Err(e)) => e.to_string(),
        Err(_) => format!("timed out after {}s", primary_bound.as_secs()),
    };
    tracing::warn!(reason = %primary_reason, "primary attempt failed, trying alternate");

    match alternate().await {
        Ok(value) => Ok((value, Tier::Alternate)),
        Err(e) => Err(AlternateFailure {
            primary: primary_reason,
            alternate: e.to_string(),
        }),
    }
}
