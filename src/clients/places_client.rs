/// Places API 客户端
///
/// 只负责一次原始的 HTTP 交互，不做限流、重试和结果解析
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::config::Config;
use crate::error::{AppResult, TransportError};

/// 只请求电话字段，按字段计费
pub const FIELD_MASK: &str = "places.internationalPhoneNumber";

/// 原始 HTTP 响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// 文本搜索的传输层
///
/// 生产环境使用 [`PlacesClient`]，测试中替换为返回固定响应的实现
#[async_trait]
pub trait PlacesTransport: Send + Sync {
    async fn search_text(&self, text_query: &str) -> Result<RawResponse, TransportError>;
}

/// Google Places API (new) 客户端
pub struct PlacesClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl PlacesClient {
    /// 创建新的 Places 客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            api_key: config.places_api_key.clone(),
            base_url: config.places_api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn search_url(&self) -> String {
        format!("{}/v1/places:searchText", self.base_url)
    }
}

#[async_trait]
impl PlacesTransport for PlacesClient {
    async fn search_text(&self, text_query: &str) -> Result<RawResponse, TransportError> {
        debug!("调用 Places API, textQuery: {}", text_query);

        let response = self
            .http
            .post(self.search_url())
            .query(&[("textQuery", text_query)])
            .header(CONTENT_TYPE, "application/json")
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!("Places API 响应 status={} body长度={}", status, body.len());
        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_strips_trailing_slash() {
        let config = Config {
            places_api_key: "key".to_string(),
            places_api_base_url: "http://localhost:8080/".to_string(),
            ..Config::default()
        };
        let client = PlacesClient::new(&config).unwrap();
        assert_eq!(client.search_url(), "http://localhost:8080/v1/places:searchText");
    }

    #[test]
    fn test_default_search_url() {
        let client = PlacesClient::new(&Config::default()).unwrap();
        assert_eq!(
            client.search_url(),
            "https://places.googleapis.com/v1/places:searchText"
        );
    }
}
