//! 单个店铺的电话查询流程 - 流程层
//!
//! 流程顺序：
//! 1. 等待限流器放行（RATE_LIMITED）
//! 2. 发起请求（IN_FLIGHT），429 / 超时则退避后重试（RETRY_WAIT）
//! 3. 解析响应 → 电话 / 未找到（SUCCESS），或重试耗尽 / 致命错误（EXHAUSTED）

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clients::{PlacesTransport, RawResponse};
use crate::config::Config;
use crate::error::{LookupFailure, ProviderError, TransportError};
use crate::infrastructure::{RateLimiter, RetryPolicy, RetryState};
use crate::models::lookup::{LookupPhase, LookupQuery, LookupResult, PlacesResponse};
use crate::utils::logging::truncate_text;

/// 限流槽位的占用方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotHolding {
    /// 槽位覆盖整个查询，包括所有重试和退避等待
    #[default]
    WholeQuery,
    /// 每次尝试单独占用槽位，退避等待前归还
    PerAttempt,
}

impl SlotHolding {
    pub fn from_config(config: &Config) -> Self {
        if config.hold_slot_during_backoff {
            SlotHolding::WholeQuery
        } else {
            SlotHolding::PerAttempt
        }
    }
}

/// 店铺电话查询客户端
///
/// - 持有注入的限流器（可在多个客户端 / 测试之间隔离）
/// - 每次查询的失败都会落在 `LookupResult::Error` 中，不会向上抛出
pub struct PlaceLookupClient {
    transport: Arc<dyn PlacesTransport>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    slot_holding: SlotHolding,
}

impl PlaceLookupClient {
    pub fn new(
        transport: Arc<dyn PlacesTransport>,
        limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            limiter,
            retry,
            slot_holding: SlotHolding::default(),
        }
    }

    pub fn from_config(config: &Config, transport: Arc<dyn PlacesTransport>) -> Self {
        Self::new(
            transport,
            Arc::new(RateLimiter::from_config(config)),
            RetryPolicy::from_config(config),
        )
        .with_slot_holding(SlotHolding::from_config(config))
    }

    pub fn with_slot_holding(mut self, slot_holding: SlotHolding) -> Self {
        self.slot_holding = slot_holding;
        self
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// 查询店铺电话
    pub async fn lookup(&self, query: &LookupQuery) -> LookupResult {
        self.lookup_traced(query).await.0
    }

    /// 查询店铺电话，同时返回重试状态
    pub async fn lookup_traced(&self, query: &LookupQuery) -> (LookupResult, RetryState) {
        let text_query = query.text_query();
        debug!("[{}] {}", text_query, LookupPhase::Init);

        let held = match self.slot_holding {
            SlotHolding::WholeQuery => {
                debug!("[{}] {}", text_query, LookupPhase::RateLimited);
                match self.limiter.acquire().await {
                    Ok(permit) => Some(permit),
                    Err(e) => {
                        warn!("[{}] 无法获取限流槽位: {}", text_query, e);
                        return (
                            LookupResult::Error(LookupFailure::TaskAborted(e.to_string())),
                            RetryState::default(),
                        );
                    }
                }
            }
            SlotHolding::PerAttempt => None,
        };

        let (outcome, state) = self
            .retry
            .run_traced(|attempt| self.attempt(&text_query, attempt))
            .await;

        if let Some(permit) = held {
            permit.release();
        }

        let result = match outcome {
            Ok(result) => {
                debug!("[{}] {} ({} 次尝试)", text_query, LookupPhase::Success, state.attempts);
                result
            }
            Err(err) => {
                let failure = LookupFailure::from(err);
                warn!("[{}] {}: {}", text_query, LookupPhase::Exhausted, failure);
                LookupResult::Error(failure)
            }
        };

        (result, state)
    }

    /// 单次尝试
    async fn attempt(&self, text_query: &str, attempt: u32) -> Result<LookupResult, ProviderError> {
        let _permit = match self.slot_holding {
            SlotHolding::PerAttempt => {
                debug!("[{}] {}", text_query, LookupPhase::RateLimited);
                let permit = self
                    .limiter
                    .acquire()
                    .await
                    .map_err(|e| ProviderError::Aborted(e.to_string()))?;
                Some(permit)
            }
            SlotHolding::WholeQuery => {
                if attempt > 0 {
                    debug!("[{}] {}", text_query, LookupPhase::RetryWait(attempt));
                    self.limiter.pace().await;
                }
                None
            }
        };

        debug!("[{}] {}", text_query, LookupPhase::InFlight(attempt + 1));
        let response = self.transport.search_text(text_query).await;
        classify_response(text_query, response)
    }
}

/// 把一次原始响应分类为：结果 / 临时错误 / 致命错误
///
/// - 2xx：解析 places 数组，格式不对按未找到处理
/// - 429 或超时：临时错误
/// - 其他状态码或网络错误：致命错误
pub fn classify_response(
    text_query: &str,
    response: Result<RawResponse, TransportError>,
) -> Result<LookupResult, ProviderError> {
    let response = match response {
        Ok(response) => response,
        Err(TransportError::Timeout) => {
            return Err(ProviderError::Transient {
                status: None,
                reason: TransportError::Timeout.to_string(),
            })
        }
        Err(err @ TransportError::Network(_)) => {
            return Err(ProviderError::Fatal {
                status: None,
                reason: err.to_string(),
            })
        }
    };

    let status = response.status;
    if (200..300).contains(&status) {
        return Ok(parse_places_body(text_query, &response.body));
    }

    let reason = format!("HTTP {}: {}", status, truncate_text(&response.body, 200));
    if status == 429 {
        Err(ProviderError::Transient {
            status: Some(status),
            reason,
        })
    } else {
        Err(ProviderError::Fatal {
            status: Some(status),
            reason,
        })
    }
}

fn parse_places_body(text_query: &str, body: &str) -> LookupResult {
    match serde_json::from_str::<PlacesResponse>(body) {
        Ok(parsed) => {
            let result = parsed.into_result();
            match &result {
                LookupResult::PhoneFound(phone) => {
                    info!("📞 [{}] 查到电话: {}", text_query, phone)
                }
                _ => info!("[{}] 未找到店铺", text_query),
            }
            result
        }
        Err(e) => {
            warn!(
                "⚠️ [{}] 响应格式异常，按未找到处理: {} ({})",
                text_query,
                e,
                truncate_text(body, 200)
            );
            LookupResult::NotFound
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    /// 按顺序返回预设响应，用完后重复最后一个
    struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
        last: Result<RawResponse, TransportError>,
        calls: AtomicU32,
        limiter: Option<Arc<RateLimiter>>,
        in_flight_seen: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<Result<RawResponse, TransportError>>) -> Self {
            let last = replies
                .last()
                .cloned()
                .unwrap_or_else(|| Ok(RawResponse::new(200, "{}")));
            Self {
                replies: Mutex::new(replies.into()),
                last,
                calls: AtomicU32::new(0),
                limiter: None,
                in_flight_seen: AtomicUsize::new(0),
            }
        }

        fn watching(mut self, limiter: Arc<RateLimiter>) -> Self {
            self.limiter = Some(limiter);
            self
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PlacesTransport for ScriptedTransport {
        async fn search_text(&self, _text_query: &str) -> Result<RawResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(limiter) = &self.limiter {
                self.in_flight_seen
                    .fetch_max(limiter.in_flight(), Ordering::SeqCst);
            }
            let next = self.replies.lock().unwrap().pop_front();
            next.unwrap_or_else(|| self.last.clone())
        }
    }

    fn too_many() -> Result<RawResponse, TransportError> {
        Ok(RawResponse::new(429, r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#))
    }

    fn phone(number: &str) -> Result<RawResponse, TransportError> {
        Ok(RawResponse::new(
            200,
            format!(r#"{{"places":[{{"internationalPhoneNumber":"{}"}}]}}"#, number),
        ))
    }

    fn client_with(transport: Arc<ScriptedTransport>, limiter: Arc<RateLimiter>) -> PlaceLookupClient {
        PlaceLookupClient::new(transport, limiter, RetryPolicy::default())
    }

    fn query() -> LookupQuery {
        LookupQuery::new("Grill bites", "195 Hollyhedge Rd")
    }

    #[tokio::test]
    async fn test_phone_found() {
        let transport = Arc::new(ScriptedTransport::new(vec![phone("+44 161 000 0000")]));
        let limiter = Arc::new(RateLimiter::new(5, Duration::ZERO));
        let client = client_with(transport.clone(), limiter.clone());

        let result = client.lookup(&query()).await;

        assert_eq!(result, LookupResult::PhoneFound("+44 161 000 0000".to_string()));
        assert_eq!(transport.calls(), 1);
        assert_eq!(limiter.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_fatal_status_is_not_retried() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(RawResponse::new(500, "boom"))]));
        let client = client_with(transport.clone(), Arc::new(RateLimiter::new(5, Duration::ZERO)));

        let result = client.lookup(&query()).await;

        assert!(matches!(
            result,
            LookupResult::Error(LookupFailure::Fatal { status: Some(500), .. })
        ));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_429_until_success() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            too_many(),
            too_many(),
            phone("+1-555-0100"),
        ]));
        let client = client_with(transport.clone(), Arc::new(RateLimiter::new(5, Duration::ZERO)));

        let (result, state) = client.lookup_traced(&query()).await;

        assert_eq!(result, LookupResult::PhoneFound("+1-555-0100".to_string()));
        assert_eq!(transport.calls(), 3);
        assert_eq!(state.attempts, 3);
        assert!(state.waits[0] <= state.waits[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_retried() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Err(TransportError::Timeout),
            phone("+1-555-0101"),
        ]));
        let client = client_with(transport.clone(), Arc::new(RateLimiter::new(5, Duration::ZERO)));

        let result = client.lookup(&query()).await;

        assert_eq!(result, LookupResult::PhoneFound("+1-555-0101".to_string()));
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_network_error_is_fatal() {
        let transport = Arc::new(ScriptedTransport::new(vec![Err(TransportError::Network(
            "connection refused".to_string(),
        ))]));
        let client = client_with(transport.clone(), Arc::new(RateLimiter::new(5, Duration::ZERO)));

        let result = client.lookup(&query()).await;

        assert!(matches!(
            result,
            LookupResult::Error(LookupFailure::Fatal { status: None, .. })
        ));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_429_exhausts() {
        let transport = Arc::new(ScriptedTransport::new(vec![too_many()]));
        let client = client_with(transport.clone(), Arc::new(RateLimiter::new(5, Duration::ZERO)));
        let start = Instant::now();

        let result = client.lookup(&query()).await;

        assert!(matches!(
            result,
            LookupResult::Error(LookupFailure::RetryExhausted { attempts: 6, .. })
        ));
        assert_eq!(transport.calls(), 6);
        assert!(start.elapsed() >= Duration::from_secs(31));
    }

    #[tokio::test]
    async fn test_malformed_body_is_not_found() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(RawResponse::new(200, "<html>"))]));
        let client = client_with(transport, Arc::new(RateLimiter::new(5, Duration::ZERO)));

        assert_eq!(client.lookup(&query()).await, LookupResult::NotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn test_whole_query_holds_slot_during_backoff() {
        let limiter = Arc::new(RateLimiter::new(1, Duration::ZERO));
        let transport = Arc::new(ScriptedTransport::new(vec![too_many(), phone("+1")]));
        let client = Arc::new(client_with(transport, limiter.clone()));

        let task = {
            let client = client.clone();
            tokio::spawn(async move { client.lookup(&query()).await })
        };

        // 第一次 429 之后进入 1s 退避
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(limiter.in_flight(), 1);

        assert_eq!(task.await.unwrap(), LookupResult::PhoneFound("+1".to_string()));
        assert_eq!(limiter.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_attempt_releases_slot_during_backoff() {
        let limiter = Arc::new(RateLimiter::new(1, Duration::ZERO));
        let transport = Arc::new(
            ScriptedTransport::new(vec![too_many(), phone("+1")]).watching(limiter.clone()),
        );
        let client = Arc::new(
            client_with(transport.clone(), limiter.clone()).with_slot_holding(SlotHolding::PerAttempt),
        );

        let task = {
            let client = client.clone();
            tokio::spawn(async move { client.lookup(&query()).await })
        };

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(limiter.in_flight(), 0);

        assert_eq!(task.await.unwrap(), LookupResult::PhoneFound("+1".to_string()));
        assert_eq!(transport.in_flight_seen.load(Ordering::SeqCst), 1);
        assert_eq!(limiter.admitted_total(), 2);
    }

    #[tokio::test]
    async fn test_closed_limiter_yields_error() {
        let limiter = Arc::new(RateLimiter::new(1, Duration::ZERO));
        limiter.close();
        let transport = Arc::new(ScriptedTransport::new(vec![phone("+1")]));
        let client = client_with(transport.clone(), limiter);

        let result = client.lookup(&query()).await;

        assert!(matches!(result, LookupResult::Error(LookupFailure::TaskAborted(_))));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_closed_limiter_yields_task_aborted_per_attempt() {
        let limiter = Arc::new(RateLimiter::new(1, Duration::ZERO));
        limiter.close();
        let transport = Arc::new(ScriptedTransport::new(vec![phone("+1")]));
        let client = client_with(transport.clone(), limiter).with_slot_holding(SlotHolding::PerAttempt);

        let (result, state) = client.lookup_traced(&LookupQuery::new("A", "1 Main St")).await;

        assert!(matches!(result, LookupResult::Error(LookupFailure::TaskAborted(_))));
        assert_eq!(transport.calls(), 0);
        assert_eq!(state.attempts, 1);
        assert!(state.waits.is_empty());
    }

    #[test]
    fn test_classify_2xx_variants() {
        assert_eq!(
            classify_response("q", Ok(RawResponse::new(200, r#"{"places":[]}"#))).unwrap(),
            LookupResult::NotFound
        );
        assert_eq!(
            classify_response("q", Ok(RawResponse::new(204, ""))).unwrap(),
            LookupResult::NotFound
        );
        let err = classify_response("q", Ok(RawResponse::new(403, "denied"))).unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_slot_holding_from_config() {
        let mut config = Config::default();
        assert_eq!(SlotHolding::from_config(&config), SlotHolding::WholeQuery);
        config.hold_slot_during_backoff = false;
        assert_eq!(SlotHolding::from_config(&config), SlotHolding::PerAttempt);
    }
}
