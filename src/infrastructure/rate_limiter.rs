//! 限流器 - 基础设施层
//!
//! 持有整个进程唯一的共享可变状态：并发槽位 + 上一次放行的时间

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::config::Config;

/// 限流器已关闭（整批取消）
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("限流器已关闭")]
pub struct RateLimiterClosed;

/// 限流器
///
/// 放行条件：
/// - 当前持有槽位的请求数 < `max_concurrent`
/// - 距离上一次放行至少过去了 `min_interval`（全局）
///
/// 等待队列基于 tokio 的公平信号量和互斥锁，近似 FIFO
pub struct RateLimiter {
    slots: Arc<Semaphore>,
    max_concurrent: usize,
    min_interval: Duration,
    last_admission: Mutex<Option<Instant>>,
    admitted_total: AtomicU64,
    peak_in_flight: AtomicUsize,
}

impl RateLimiter {
    pub fn new(max_concurrent: usize, min_interval: Duration) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            slots: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            min_interval,
            last_admission: Mutex::new(None),
            admitted_total: AtomicU64::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_concurrent_requests, config.min_request_interval())
    }

    /// 等待槽位和请求间隔，返回释放句柄
    ///
    /// 句柄 drop 或调用 [`RatePermit::release`] 时归还槽位
    pub async fn acquire(&self) -> Result<RatePermit, RateLimiterClosed> {
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| RateLimiterClosed)?;

        let in_flight = self.in_flight();
        self.peak_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        self.pace().await;
        self.admitted_total.fetch_add(1, Ordering::SeqCst);

        Ok(RatePermit { _permit: permit })
    }

    /// 只做请求间隔控制，不占用新的槽位
    ///
    /// 已经持有槽位的查询在重试前调用，保证每个发出的请求都满足全局间隔
    pub async fn pace(&self) {
        let mut last = self.last_admission.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!("请求间隔不足，等待 {:?}", wait);
                sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// 关闭限流器，所有等待中的和后续的 `acquire` 立即失败
    pub fn close(&self) {
        self.slots.close();
    }

    /// 当前持有槽位的请求数
    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.slots.available_permits()
    }

    /// 历史上同时持有槽位的最大请求数
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// 累计放行次数
    pub fn admitted_total(&self) -> u64 {
        self.admitted_total.load(Ordering::SeqCst)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// 限流槽位的释放句柄
#[derive(Debug)]
pub struct RatePermit {
    _permit: OwnedSemaphorePermit,
}

impl RatePermit {
    /// 显式归还槽位
    pub fn release(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;

    #[tokio::test(start_paused = true)]
    async fn test_never_exceeds_max_concurrent() {
        let limiter = Arc::new(RateLimiter::new(3, Duration::from_millis(1)));
        let current = Arc::new(AtomicUsize::new(0));
        let observed_max = Arc::new(AtomicUsize::new(0));

        let tasks = (0..20).map(|_| {
            let limiter = limiter.clone();
            let current = current.clone();
            let observed_max = observed_max.clone();
            tokio::spawn(async move {
                let permit = limiter.acquire().await.unwrap();
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                observed_max.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(50)).await;
                current.fetch_sub(1, Ordering::SeqCst);
                permit.release();
            })
        });
        for handle in join_all(tasks).await {
            handle.unwrap();
        }

        assert!(observed_max.load(Ordering::SeqCst) <= 3);
        assert!(limiter.peak_in_flight() <= 3);
        assert_eq!(limiter.in_flight(), 0);
        assert_eq!(limiter.admitted_total(), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_admissions_are_spaced() {
        let limiter = Arc::new(RateLimiter::new(10, Duration::from_millis(100)));
        let start = Instant::now();

        let tasks = (0..5).map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                let _permit = limiter.acquire().await.unwrap();
                Instant::now()
            })
        });
        let mut admitted: Vec<Instant> = join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        admitted.sort();

        for pair in admitted.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(100));
        }
        assert!(start.elapsed() >= Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_permit_released_on_drop() {
        let limiter = RateLimiter::new(1, Duration::ZERO);
        {
            let _permit = limiter.acquire().await.unwrap();
            assert_eq!(limiter.in_flight(), 1);
        }
        assert_eq!(limiter.in_flight(), 0);

        let permit = limiter.acquire().await.unwrap();
        permit.release();
        assert_eq!(limiter.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_close_fails_acquire() {
        let limiter = RateLimiter::new(1, Duration::ZERO);
        limiter.close();
        assert_eq!(limiter.acquire().await.unwrap_err(), RateLimiterClosed);
    }

    #[test]
    fn test_from_config_defaults() {
        let limiter = RateLimiter::from_config(&Config::default());
        assert_eq!(limiter.max_concurrent(), 50);
        assert_eq!(limiter.min_interval(), Duration::from_millis(100));
    }
}
