//! 重试策略 - 基础设施层
//!
//! 指数退避 + 抖动。退避等待只发生在当前查询自己的任务里，
//! 不持有任何全局锁

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ProviderError, RetryError};

/// 能区分"临时 / 致命"的错误
pub trait Retryable {
    fn is_transient(&self) -> bool;
}

impl Retryable for ProviderError {
    fn is_transient(&self) -> bool {
        ProviderError::is_transient(self)
    }
}

/// 重试策略
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// 首次请求之外最多重试的次数
    pub max_retries: u32,
    /// 第 n 次失败后等待 `backoff_factor^n` 秒（n 从 0 开始）
    pub backoff_factor: f64,
    /// 抖动在 `[0, jitter_ratio × backoff]` 内均匀取值
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_factor: 2.0,
            jitter_ratio: 0.1,
        }
    }
}

/// 单个查询的重试状态，查询结束后丢弃
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryState {
    /// 已经发起的尝试次数
    pub attempts: u32,
    /// 每次重试前实际等待的时长
    pub waits: Vec<Duration>,
}

impl RetryState {
    pub fn total_wait(&self) -> Duration {
        self.waits.iter().sum()
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_factor: config.backoff_factor,
            jitter_ratio: config.jitter_ratio,
        }
    }

    /// 最多尝试次数（首次 + 重试）
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// 第 `attempt` 次失败（从 0 开始）后的退避下限，不含抖动
    pub fn backoff_floor(&self, attempt: u32) -> Duration {
        let secs = self.backoff_factor.powi(attempt.min(i32::MAX as u32) as i32);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// 退避下限 + 随机抖动
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let floor = self.backoff_floor(attempt);
        let max_jitter = floor.as_secs_f64() * self.jitter_ratio;
        if max_jitter <= 0.0 || !max_jitter.is_finite() {
            return floor;
        }
        let jitter = rand::thread_rng().gen_range(0.0..=max_jitter);
        floor.saturating_add(Duration::try_from_secs_f64(jitter).unwrap_or(Duration::MAX))
    }

    /// 执行带重试的操作
    pub async fn run<T, E, F, Fut>(&self, attempt_fn: F) -> Result<T, RetryError<E>>
    where
        E: Retryable + Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_traced(attempt_fn).await.0
    }

    /// 执行带重试的操作，同时返回重试状态
    ///
    /// `attempt_fn` 收到的参数是本次尝试的序号（从 0 开始）
    pub async fn run_traced<T, E, F, Fut>(
        &self,
        mut attempt_fn: F,
    ) -> (Result<T, RetryError<E>>, RetryState)
    where
        E: Retryable + Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut state = RetryState::default();
        let max_attempts = self.max_attempts();

        loop {
            let attempt = state.attempts;
            state.attempts += 1;

            let err = match attempt_fn(attempt).await {
                Ok(value) => return (Ok(value), state),
                Err(err) => err,
            };

            if !err.is_transient() {
                debug!("尝试 {}/{} 遇到致命错误，不再重试: {}", state.attempts, max_attempts, err);
                return (Err(RetryError::Fatal(err)), state);
            }

            if state.attempts >= max_attempts {
                warn!("已尝试 {} 次仍失败，放弃: {}", state.attempts, err);
                let waited = state.total_wait();
                return (
                    Err(RetryError::Exhausted {
                        attempts: state.attempts,
                        last: err,
                        waited,
                    }),
                    state,
                );
            }

            let delay = self.backoff_delay(attempt);
            warn!(
                "请求被限流或超时 (尝试 {}/{}), 等待 {:.2}s 后重试: {}",
                state.attempts,
                max_attempts,
                delay.as_secs_f64(),
                err
            );
            state.waits.push(delay);
            sleep(delay).await;
        }
    }
}
