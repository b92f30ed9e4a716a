//! 店铺线索流水线 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，串起一次完整的运行：
//!
//! 1. **读取**：从店铺仓库取出一批待处理店铺
//! 2. **补全**：交给 `BatchEnricher` 并发查询电话
//! 3. **合并**：把查询结果写回店铺记录
//! 4. **发布**：生成表格
//! 5. **通知**：把表格链接发到频道（失败只记录日志）
//! 6. **收尾**：把本批店铺标记为已处理
//!
//! 读取、发布或标记失败时整个运行中止，店铺保持待处理状态，下次运行会重新查询

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::clients::{PlacesClient, SlackClient};
use crate::config::Config;
use crate::models::loaders::{StoreRepository, TomlStoreRepository};
use crate::models::lookup::BatchReport;
use crate::models::store::inject_phone_numbers;
use crate::orchestrator::BatchEnricher;
use crate::services::{CsvSheetPublisher, LogNotifier, Notifier, SheetPublisher, SlackNotifier};
use crate::utils::logging::{init_log_file, log_stage, log_startup, print_final_stats};
use crate::workflow::PlaceLookupClient;

/// 应用主结构
pub struct App {
    config: Config,
    repository: Arc<dyn StoreRepository>,
    enricher: BatchEnricher,
    publisher: Arc<dyn SheetPublisher>,
    notifier: Arc<dyn Notifier>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate()?;

        // 初始化日志文件
        init_log_file(&config.output_log_file)?;

        log_startup(
            config.max_concurrent_requests,
            config.max_requests_per_minute,
            config.items_per_batch,
        );

        let transport = Arc::new(PlacesClient::new(&config)?);
        let client = PlaceLookupClient::from_config(&config, transport);

        let repository = Arc::new(TomlStoreRepository::new(&config.store_data_file));
        let publisher = Arc::new(CsvSheetPublisher::new(&config.sheet_output_dir));

        let notifier: Arc<dyn Notifier> = match SlackClient::from_config(&config)? {
            Some(slack) => Arc::new(SlackNotifier::new(slack)),
            None => {
                info!("💡 未配置 SLACK_TOKEN / SLACK_CHANNEL_ID，通知只写入日志");
                Arc::new(LogNotifier)
            }
        };

        Ok(Self::with_parts(config, repository, client, publisher, notifier))
    }

    /// 用现成的组件组装应用
    pub fn with_parts(
        config: Config,
        repository: Arc<dyn StoreRepository>,
        client: PlaceLookupClient,
        publisher: Arc<dyn SheetPublisher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            repository,
            enricher: BatchEnricher::new(Arc::new(client)),
            publisher,
            notifier,
        }
    }

    pub fn enricher(&self) -> &BatchEnricher {
        &self.enricher
    }

    /// 运行一次完整的流水线，返回本批汇总
    pub async fn run(&self) -> Result<BatchReport> {
        let started = Instant::now();

        let stage = Instant::now();
        info!("\n📁 正在读取待处理的店铺...");
        let mut stores = self
            .repository
            .fetch_unprocessed(self.config.items_per_batch)
            .await
            .context("读取待处理店铺失败")?;
        log_stage("读取店铺", stage.elapsed());

        if stores.is_empty() {
            warn!("⚠️ 没有待处理的店铺，程序结束");
            return Ok(BatchReport::default());
        }
        info!("✓ 找到 {} 个待处理的店铺", stores.len());

        let stage = Instant::now();
        let (results, report) = self.enricher.enrich_with_report(&stores).await;
        inject_phone_numbers(&mut stores, &results);
        log_stage("查询电话", stage.elapsed());

        let stage = Instant::now();
        let sheet_url = self
            .publisher
            .publish(&stores)
            .await
            .context("生成表格失败")?;
        log_stage("生成表格", stage.elapsed());

        let stage = Instant::now();
        match self.notifier.notify(&sheet_url, &report).await {
            Ok(()) => log_stage("发送通知", stage.elapsed()),
            Err(e) => warn!("⚠️ 发送通知失败，表格已生成: {} ({})", sheet_url, e),
        }

        let stage = Instant::now();
        self.repository
            .mark_processed(&stores)
            .await
            .context("标记店铺为已处理失败")?;
        log_stage("标记已处理", stage.elapsed());

        print_final_stats(&report, started.elapsed(), &self.config.output_log_file);
        Ok(report)
    }
}
