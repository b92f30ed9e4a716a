pub mod csv_loader;
pub mod toml_loader;

pub use csv_loader::import_stores_csv;
pub use toml_loader::TomlStoreRepository;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::store::StoreRecord;

/// 店铺记录的来源与归宿
///
/// 核心逻辑只消费 / 产出 `StoreRecord`，不关心背后是文件还是数据库
#[async_trait]
pub trait StoreRepository: Send + Sync {
    /// 按存储顺序取出最多 `limit` 条待处理记录
    async fn fetch_unprocessed(&self, limit: usize) -> AppResult<Vec<StoreRecord>>;

    /// 把记录（连同电话号码）写回并标记为已处理
    async fn mark_processed(&self, records: &[StoreRecord]) -> AppResult<()>;
}
