use std::time::Duration;
use thiserror::Error;

/// 应用程序错误类型
///
/// 只用于编排层与外部适配器（存储 / 表格 / 通知）。
/// 单个店铺查询的失败不会变成 `AppError`，而是落在 [`LookupFailure`] 中。
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 店铺数据存储错误
    #[error("存储错误 ({path}): {message}")]
    Store { path: String, message: String },
    /// 表格发布错误
    #[error("表格发布失败: {0}")]
    Publish(String),
    /// 通知发送错误
    #[error("通知发送失败: {0}")]
    Notify(String),
    #[error("文件错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON解析失败: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML解析失败: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("TOML序列化失败: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("CSV错误: {0}")]
    Csv(#[from] csv::Error),
    #[error("HTTP请求失败: {0}")]
    Http(#[from] reqwest::Error),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量不存在
    #[error("环境变量 {var_name} 不存在")]
    EnvVarNotFound { var_name: String },
    /// 配置值不合法
    #[error("配置项 {field} 不合法: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// 单次 HTTP 交互的传输层错误（未拿到状态码）
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// 请求超时
    #[error("请求超时")]
    Timeout,
    /// 其他网络错误（连接失败、读取响应体失败等）
    #[error("网络错误: {0}")]
    Network(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// 单次尝试的失败分类
///
/// - `Transient`：429 或超时，值得重试
/// - `Fatal`：其他非 2xx 状态码或不可恢复的网络错误，重试也不会改变结果
/// - `Aborted`：限流器已关闭，请求根本没有发出
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("临时错误: {reason}")]
    Transient { status: Option<u16>, reason: String },
    #[error("致命错误: {reason}")]
    Fatal { status: Option<u16>, reason: String },
    #[error("查询已取消: {0}")]
    Aborted(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Transient { status, .. } | ProviderError::Fatal { status, .. } => {
                *status
            }
            ProviderError::Aborted(_) => None,
        }
    }
}

/// 重试序列结束后的失败
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RetryError<E> {
    /// 遇到致命错误，立即停止
    #[error("{0}")]
    Fatal(E),
    /// 重试次数耗尽，携带最后一次的错误
    #[error("重试 {attempts} 次后仍失败: {last}")]
    Exhausted {
        attempts: u32,
        last: E,
        waited: Duration,
    },
}

/// 单个店铺查询的最终失败原因
///
/// 只会出现在 `LookupResult::Error` 中，不会中断整批处理
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupFailure {
    /// 非 2xx（且非 429）状态码，或不可重试的网络错误
    #[error("API返回错误 (status={status:?}): {reason}")]
    Fatal { status: Option<u16>, reason: String },
    /// 临时错误重试耗尽
    #[error("重试 {attempts} 次后仍失败: {reason}")]
    RetryExhausted { attempts: u32, reason: String },
    /// 查询任务本身异常退出
    #[error("查询任务异常退出: {0}")]
    TaskAborted(String),
}

impl From<RetryError<ProviderError>> for LookupFailure {
    fn from(err: RetryError<ProviderError>) -> Self {
        match err {
            RetryError::Fatal(ProviderError::Fatal { status, reason })
            | RetryError::Fatal(ProviderError::Transient { status, reason }) => {
                LookupFailure::Fatal { status, reason }
            }
            RetryError::Fatal(ProviderError::Aborted(reason)) => LookupFailure::TaskAborted(reason),
            RetryError::Exhausted { attempts, last, .. } => LookupFailure::RetryExhausted {
                attempts,
                reason: last.to_string(),
            },
        }
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建存储错误
    pub fn store(path: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Store {
            path: path.into(),
            message: message.into(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
