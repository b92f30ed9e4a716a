/// Slack API 客户端
///
/// 封装 `chat.postMessage` 调用
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Slack 客户端
pub struct SlackClient {
    http: reqwest::Client,
    token: String,
    channel_id: String,
    base_url: String,
}

impl SlackClient {
    pub fn new(
        token: impl Into<String>,
        channel_id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        let base_url: String = base_url.into();

        Ok(Self {
            http,
            token: token.into(),
            channel_id: channel_id.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 从配置创建，未配置 token 或频道时返回 `None`
    pub fn from_config(config: &Config) -> AppResult<Option<Self>> {
        match (&config.slack_token, &config.slack_channel_id) {
            (Some(token), Some(channel)) => {
                Ok(Some(Self::new(token, channel, &config.slack_api_base_url)?))
            }
            _ => Ok(None),
        }
    }

    /// 发送一条消息到配置的频道
    pub async fn post_message(&self, text: &str) -> AppResult<()> {
        let url = format!("{}/chat.postMessage", self.base_url);
        debug!("发送 Slack 消息到频道 {}", self.channel_id);

        let response: PostMessageResponse = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&PostMessageRequest {
                channel: &self.channel_id,
                text,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_post_message(response)
    }
}

/// Slack 即使失败也返回 200，需要检查 `ok` 字段
fn parse_post_message(response: PostMessageResponse) -> AppResult<()> {
    if response.ok {
        Ok(())
    } else {
        Err(AppError::Notify(
            response.error.unwrap_or_else(|| "unknown_error".to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_ok_response_is_notify_error() {
        let response: PostMessageResponse =
            serde_json::from_str(r#"{"ok":false,"error":"channel_not_found"}"#).unwrap();
        match parse_post_message(response) {
            Err(AppError::Notify(reason)) => assert_eq!(reason, "channel_not_found"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_ok_response() {
        let response: PostMessageResponse = serde_json::from_str(r#"{"ok":true}"#).unwrap();
        assert!(parse_post_message(response).is_ok());
    }

    #[test]
    fn test_from_config_requires_both_fields() {
        let mut config = Config::default();
        config.slack_token = Some("xoxb".to_string());
        assert!(SlackClient::from_config(&config).unwrap().is_none());

        config.slack_channel_id = Some("C1".to_string());
        assert!(SlackClient::from_config(&config).unwrap().is_some());
    }
}
