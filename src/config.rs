use crate::error::ConfigError;
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- Places API 配置 ---
    pub places_api_key: String,
    pub places_api_base_url: String,
    /// 每分钟允许的最大请求数（Places API (new) 为 600/分钟/方法/项目）
    pub max_requests_per_minute: u32,
    /// 同时在途的最大请求数
    pub max_concurrent_requests: usize,
    /// 单个查询的最大重试次数（不含首次请求）
    pub max_retries: u32,
    /// 指数退避的底数
    pub backoff_factor: f64,
    /// 抖动上限占退避时长的比例
    pub jitter_ratio: f64,
    /// 退避等待期间是否继续占用限流槽位
    pub hold_slot_during_backoff: bool,
    /// 单次 HTTP 请求超时（秒）
    pub request_timeout_secs: u64,
    // --- 批处理配置 ---
    /// 每批处理的店铺数量
    pub items_per_batch: usize,
    /// 店铺数据文件（TOML）
    pub store_data_file: String,
    /// 表格输出目录
    pub sheet_output_dir: String,
    // --- Slack 配置 ---
    pub slack_token: Option<String>,
    pub slack_channel_id: Option<String>,
    pub slack_api_base_url: String,
    // --- 日志配置 ---
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            places_api_key: String::new(),
            places_api_base_url: "https://places.googleapis.com".to_string(),
            max_requests_per_minute: 600,
            max_concurrent_requests: 50,
            max_retries: 5,
            backoff_factor: 2.0,
            jitter_ratio: 0.1,
            hold_slot_during_backoff: true,
            request_timeout_secs: 30,
            items_per_batch: 1000,
            store_data_file: "data/stores.toml".to_string(),
            sheet_output_dir: "output_sheets".to_string(),
            slack_token: None,
            slack_channel_id: None,
            slack_api_base_url: "https://slack.com/api".to_string(),
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            places_api_key: std::env::var("GOOGLE_PLACES_API_KEY").unwrap_or(default.places_api_key),
            places_api_base_url: std::env::var("PLACES_API_BASE_URL").unwrap_or(default.places_api_base_url),
            max_requests_per_minute: std::env::var("MAX_REQUESTS_PER_MINUTE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_requests_per_minute),
            max_concurrent_requests: std::env::var("MAX_CONCURRENT_REQUESTS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrent_requests),
            max_retries: std::env::var("MAX_RETRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_retries),
            backoff_factor: std::env::var("BACKOFF_FACTOR").ok().and_then(|v| v.parse().ok()).unwrap_or(default.backoff_factor),
            jitter_ratio: std::env::var("JITTER_RATIO").ok().and_then(|v| v.parse().ok()).unwrap_or(default.jitter_ratio),
            hold_slot_during_backoff: std::env::var("HOLD_SLOT_DURING_BACKOFF").ok().and_then(|v| v.parse().ok()).unwrap_or(default.hold_slot_during_backoff),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            items_per_batch: std::env::var("ITEMS_PER_BATCH").ok().and_then(|v| v.parse().ok()).unwrap_or(default.items_per_batch),
            store_data_file: std::env::var("STORE_DATA_FILE").unwrap_or(default.store_data_file),
            sheet_output_dir: std::env::var("SHEET_OUTPUT_DIR").unwrap_or(default.sheet_output_dir),
            slack_token: std::env::var("SLACK_TOKEN").ok().filter(|v| !v.is_empty()),
            slack_channel_id: std::env::var("SLACK_CHANNEL_ID").ok().filter(|v| !v.is_empty()),
            slack_api_base_url: std::env::var("SLACK_API_BASE_URL").unwrap_or(default.slack_api_base_url),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
        }
    }

    /// 校验运行电话补全任务所需的配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.places_api_key.trim().is_empty() {
            return Err(ConfigError::EnvVarNotFound {
                var_name: "GOOGLE_PLACES_API_KEY".to_string(),
            });
        }
        if self.max_requests_per_minute == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_requests_per_minute",
                reason: "必须大于 0".to_string(),
            });
        }
        if self.max_concurrent_requests == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_concurrent_requests",
                reason: "必须大于 0".to_string(),
            });
        }
        if !(self.backoff_factor >= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "backoff_factor",
                reason: format!("必须 >= 1.0，当前为 {}", self.backoff_factor),
            });
        }
        if !(0.0..=1.0).contains(&self.jitter_ratio) {
            return Err(ConfigError::InvalidValue {
                field: "jitter_ratio",
                reason: format!("必须位于 [0, 1]，当前为 {}", self.jitter_ratio),
            });
        }
        Ok(())
    }

    /// 两次请求之间的最小间隔：60s / 每分钟最大请求数
    pub fn min_request_interval(&self) -> Duration {
        Duration::from_secs(60) / self.max_requests_per_minute.max(1)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 是否配置了 Slack 通知
    pub fn slack_enabled(&self) -> bool {
        self.slack_token.is_some() && self.slack_channel_id.is_some()
    }
}
