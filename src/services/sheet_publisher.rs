//! 表格发布服务 - 业务能力层
//!
//! 只负责"把一批店铺写成表格并给出链接"，不关心查询流程

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::lookup::PHONE_NOT_AVAILABLE;
use crate::models::store::{StoreRecord, SHEET_HEADERS};

/// 点击即可拨号的跳转服务
const CALL_LINK_BASE: &str = "https://call.ctrlq.org/";

/// 表格发布
#[async_trait]
pub trait SheetPublisher: Send + Sync {
    /// 发布表格，返回可以分享的链接
    async fn publish(&self, records: &[StoreRecord]) -> AppResult<String>;
}

/// 写入本地 CSV 文件的表格发布器
///
/// 电话和地图列写成 `=HYPERLINK(...)` 公式，导入 Google Sheets / Excel 后可直接点击
pub struct CsvSheetPublisher {
    output_dir: PathBuf,
    hyperlinks: bool,
}

impl CsvSheetPublisher {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            hyperlinks: true,
        }
    }

    /// 输出纯文本，不带公式
    pub fn plain(mut self) -> Self {
        self.hyperlinks = false;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// 表格标题，形如 `Store Leads - February 02, 2025`
    pub fn sheet_title() -> String {
        format!(
            "Store Leads - {}",
            chrono::Local::now().format("%B %d, %Y")
        )
    }

    /// 生成表头 + 数据行
    pub fn sheet_rows(&self, records: &[StoreRecord]) -> Vec<Vec<String>> {
        let mut rows = Vec::with_capacity(records.len() + 1);
        rows.push(SHEET_HEADERS.iter().map(|h| h.to_string()).collect());

        for record in records {
            let mut row = record.to_sheet_row();
            if self.hyperlinks {
                row[3] = phone_cell(record.phone_number.as_deref());
                row[6] = format!(r#"=HYPERLINK("{}", "Open in Maps")"#, record.google_maps_url());
            }
            rows.push(row);
        }

        rows
    }

    fn render_csv(&self, records: &[StoreRecord]) -> AppResult<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in self.sheet_rows(records) {
            writer.write_record(&row)?;
        }
        writer
            .into_inner()
            .map_err(|e| AppError::Publish(e.to_string()))
    }
}

fn phone_cell(phone: Option<&str>) -> String {
    match phone {
        Some(phone) if phone != PHONE_NOT_AVAILABLE => {
            format!(r#"=HYPERLINK("{}{}", "{}")"#, CALL_LINK_BASE, phone, phone)
        }
        Some(phone) => phone.to_string(),
        None => String::new(),
    }
}

#[async_trait]
impl SheetPublisher for CsvSheetPublisher {
    async fn publish(&self, records: &[StoreRecord]) -> AppResult<String> {
        fs::create_dir_all(&self.output_dir).await?;

        let title = Self::sheet_title();
        let path = self.output_dir.join(format!("{}.csv", title));
        let content = self.render_csv(records)?;
        fs::write(&path, content).await?;

        let absolute = fs::canonicalize(&path).await?;
        let url = format!("file://{}", absolute.display());

        debug!("表格路径: {}", url);
        info!("✓ 表格已生成: {} ({} 行)", title, records.len());
        Ok(url)
    }
}
