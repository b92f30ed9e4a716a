//! 通知服务 - 业务能力层
//!
//! 只负责"把表格链接发到频道"，不保证恰好一次送达

use async_trait::async_trait;
use tracing::info;

use crate::clients::SlackClient;
use crate::error::AppResult;
use crate::models::lookup::BatchReport;

/// 频道通知
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, sheet_url: &str, report: &BatchReport) -> AppResult<()>;
}

/// 通知正文
pub fn build_message(sheet_url: &str, report: &BatchReport) -> String {
    format!(
        "📋 新一批店铺线索已生成 :tada:\n\
         查询 {} 个店铺：找到电话 {} 个，未找到 {} 个，失败 {} 个\n\
         表格链接: {}",
        report.attempted, report.found, report.not_found, report.errors, sheet_url
    )
}

/// 通过 Slack 发送通知
pub struct SlackNotifier {
    client: SlackClient,
}

impl SlackNotifier {
    pub fn new(client: SlackClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, sheet_url: &str, report: &BatchReport) -> AppResult<()> {
        self.client
            .post_message(&build_message(sheet_url, report))
            .await?;
        info!("✓ 已发送 Slack 通知");
        Ok(())
    }
}

/// 未配置 Slack 时只写日志
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, sheet_url: &str, report: &BatchReport) -> AppResult<()> {
        info!("💬 未配置 Slack，通知内容:\n{}", build_message(sheet_url, report));
        Ok(())
    }
}
