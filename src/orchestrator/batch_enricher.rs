//! 批量电话补全 - 编排层
//!
//! ## 职责
//!
//! 把一批店铺的查询同时派发出去，并发度和请求速率全部交给限流器控制；
//! 不论完成顺序如何，返回结果都和输入一一对应。
//!
//! ## 保证
//!
//! - `results.len() == stores.len()`，`results[i]` 对应 `stores[i]`
//! - 单个店铺失败只体现在它自己的 `LookupResult::Error` 中
//! - 任务异常退出（panic / 被取消）时对应位置为 `LookupFailure::TaskAborted`

use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::error::LookupFailure;
use crate::models::lookup::{BatchReport, LookupResult};
use crate::models::store::StoreRecord;
use crate::utils::logging::{log_batch_complete, log_batch_start};
use crate::workflow::{LookupCtx, PlaceLookupClient};

/// 批量补全器
pub struct BatchEnricher {
    client: Arc<PlaceLookupClient>,
}

impl BatchEnricher {
    pub fn new(client: Arc<PlaceLookupClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<PlaceLookupClient> {
        &self.client
    }

    /// 查询整批店铺的电话
    pub async fn enrich(&self, stores: &[StoreRecord]) -> Vec<LookupResult> {
        let total = stores.len();
        if total == 0 {
            return Vec::new();
        }

        let mut tasks = JoinSet::new();
        for (idx, store) in stores.iter().enumerate() {
            let client = self.client.clone();
            let query = store.query();
            let ctx = LookupCtx::new(idx + 1, total, store.store_id.clone());

            tasks.spawn(async move {
                let result = client.lookup(&query).await;
                match &result {
                    LookupResult::PhoneFound(phone) => info!("{} 📞 {}", ctx, phone),
                    LookupResult::NotFound => info!("{} 🔍 {}", ctx, result),
                    LookupResult::Error(_) => warn!("{} ❌ {}", ctx, result),
                }
                (idx, result)
            });
        }

        let mut slots: Vec<Option<LookupResult>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, result)) => slots[idx] = Some(result),
                Err(e) => error!("查询任务执行失败: {}", e),
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(idx, slot)| {
                slot.unwrap_or_else(|| {
                    LookupResult::Error(LookupFailure::TaskAborted(format!(
                        "第 {} 个店铺的查询任务没有返回结果",
                        idx + 1
                    )))
                })
            })
            .collect()
    }

    /// 查询整批店铺，并输出汇总
    pub async fn enrich_with_report(
        &self,
        stores: &[StoreRecord],
    ) -> (Vec<LookupResult>, BatchReport) {
        log_batch_start(stores.len());
        let started = Instant::now();

        let results = self.enrich(stores).await;
        let report = BatchReport::from_results(&results);

        log_batch_complete(&report, started.elapsed());
        (results, report)
    }
}
