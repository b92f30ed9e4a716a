//! 爬虫导出的 CSV → 店铺记录

use serde::Deserialize;
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::store::StoreRecord;

/// 爬虫 CSV 的一行
#[derive(Debug, Deserialize)]
struct ScrapedRow {
    #[serde(rename = "store name")]
    name: String,
    #[serde(rename = "store addresses")]
    address: String,
    #[serde(rename = "store rating", default)]
    rating: Option<String>,
    #[serde(rename = "store description", default)]
    description: Option<String>,
    #[serde(rename = "store area/city", default)]
    area_city: Option<String>,
}

impl ScrapedRow {
    fn into_record(self) -> StoreRecord {
        let mut record = StoreRecord::new(Uuid::new_v4().to_string(), self.name, self.address);
        record.rating = self.rating.filter(|v| !v.is_empty());
        record.description = self.description.filter(|v| !v.is_empty());
        record.area_city = self.area_city.filter(|v| !v.is_empty());
        record
    }
}

/// 读取 CSV 文件并转换为待处理的店铺记录
///
/// 会去掉文件中的 NUL 字符；无法解析的行记录警告后跳过
pub async fn import_stores_csv(csv_path: &Path) -> AppResult<Vec<StoreRecord>> {
    let raw = fs::read_to_string(csv_path).await?;
    parse_stores_csv(&raw)
}

fn parse_stores_csv(raw: &str) -> AppResult<Vec<StoreRecord>> {
    let cleaned = raw.replace('\0', "");
    let mut reader = csv::Reader::from_reader(cleaned.as_bytes());

    let mut records = Vec::new();
    for (idx, row) in reader.deserialize::<ScrapedRow>().enumerate() {
        match row {
            Ok(row) => {
                records.push(row.into_record());
                if records.len() % 1000 == 0 {
                    info!("已读取 {} 条店铺记录", records.len());
                }
            }
            Err(e) => warn!("第 {} 行解析失败，已跳过: {}", idx + 2, e),
        }
    }

    info!("✓ CSV 读取完成，共 {} 条店铺记录", records.len());
    Ok(records)
}
