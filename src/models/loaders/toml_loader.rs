use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::loaders::StoreRepository;
use crate::models::store::StoreRecord;

/// TOML 店铺文件的结构：`[[stores]]` 数组
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    stores: Vec<StoreRecord>,
}

/// 基于单个 TOML 文件的店铺存储
///
/// 每次写入都会重写整个文件，后写覆盖先写
pub struct TomlStoreRepository {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TomlStoreRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取全部店铺记录
    pub async fn load_all(&self) -> AppResult<Vec<StoreRecord>> {
        Ok(self.read_file().await?.stores)
    }

    /// 追加新记录（文件不存在时创建）
    pub async fn append(&self, records: Vec<StoreRecord>) -> AppResult<usize> {
        let _guard = self.write_lock.lock().await;

        let mut file = if fs::try_exists(&self.path).await? {
            self.read_file().await?
        } else {
            StoreFile::default()
        };

        let count = records.len();
        file.stores.extend(records);
        self.write_file(&file).await?;

        info!("已追加 {} 条店铺记录到 {}", count, self.path.display());
        Ok(count)
    }

    async fn read_file(&self) -> AppResult<StoreFile> {
        if !fs::try_exists(&self.path).await? {
            return Err(AppError::store(self.path.display().to_string(), "文件不存在"));
        }

        let content = fs::read_to_string(&self.path).await?;
        let file: StoreFile = toml::from_str(&content)?;
        Ok(file)
    }

    async fn write_file(&self, file: &StoreFile) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let content = toml::to_string(file)?;
        fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl StoreRepository for TomlStoreRepository {
    async fn fetch_unprocessed(&self, limit: usize) -> AppResult<Vec<StoreRecord>> {
        let file = self.read_file().await?;
        let total = file.stores.len();

        let stores: Vec<StoreRecord> = file
            .stores
            .into_iter()
            .filter(StoreRecord::is_pending)
            .take(limit)
            .collect();

        debug!("店铺文件共 {} 条记录，取出 {} 条待处理", total, stores.len());
        Ok(stores)
    }

    async fn mark_processed(&self, records: &[StoreRecord]) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.read_file().await?;

        let now = Utc::now();
        let mut updates: HashMap<&str, &StoreRecord> = records
            .iter()
            .map(|record| (record.store_id.as_str(), record))
            .collect();

        for stored in file.stores.iter_mut() {
            if let Some(record) = updates.remove(stored.store_id.as_str()) {
                *stored = record.clone();
                stored.mark_processed(now);
            }
        }

        if !updates.is_empty() {
            warn!("⚠️ {} 条记录在店铺文件中不存在，已忽略", updates.len());
        }

        self.write_file(&file).await?;
        info!(
            "已将 {} 条店铺记录标记为 processed",
            records.len() - updates.len()
        );
        Ok(())
    }
}
