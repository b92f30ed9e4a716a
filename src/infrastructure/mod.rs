pub mod rate_limiter;
pub mod retry;

pub use rate_limiter::{RateLimiter, RateLimiterClosed, RatePermit};
pub use retry::{RetryPolicy, RetryState, Retryable};
