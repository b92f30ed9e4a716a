use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::models::lookup::{LookupQuery, LookupResult};

const GOOGLE_MAPS_SEARCH_URL: &str = "https://www.google.com/maps/search/";

/// 表格的表头，顺序与 [`StoreRecord::to_sheet_row`] 一致
pub const SHEET_HEADERS: [&str; 7] = [
    "name",
    "area/city",
    "address",
    "phone number",
    "description",
    "status",
    "Google Maps URL",
];

/// 店铺处理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreStatus {
    #[default]
    Pending,
    Processed,
}

impl StoreStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreStatus::Pending => "pending",
            StoreStatus::Processed => "processed",
        }
    }
}

/// 爬取到的店铺记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub store_id: String,
    pub name: String,
    pub address: String,
    #[serde(default, alias = "area/city", skip_serializing_if = "Option::is_none")]
    pub area_city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub status: StoreStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_processed_at: Option<DateTime<Utc>>,
}

impl StoreRecord {
    /// 创建一条待处理的店铺记录
    pub fn new(
        store_id: impl Into<String>,
        name: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            store_id: store_id.into(),
            name: name.into(),
            address: address.into(),
            area_city: None,
            description: None,
            rating: None,
            phone_number: None,
            status: StoreStatus::Pending,
            last_processed_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == StoreStatus::Pending
    }

    /// 构建查询
    pub fn query(&self) -> LookupQuery {
        LookupQuery::new(&self.name, &self.address)
    }

    /// 将查询结果写回电话号码字段
    ///
    /// 只有查到电话时才会设置，其余情况清空
    pub fn apply_lookup(&mut self, result: &LookupResult) {
        self.phone_number = result.phone_number().map(str::to_string);
    }

    /// 标记为已处理
    pub fn mark_processed(&mut self, at: DateTime<Utc>) {
        self.status = StoreStatus::Processed;
        self.last_processed_at = Some(at);
    }

    /// 手动拼接店铺在 Google Maps 上的搜索链接
    pub fn google_maps_url(&self) -> String {
        static WHITESPACE: OnceLock<Regex> = OnceLock::new();
        let re = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("静态正则表达式"));

        let query = format!("{}, {}", self.name.trim(), self.address.trim());
        format!("{}{}", GOOGLE_MAPS_SEARCH_URL, re.replace_all(&query, "+"))
    }

    /// 转换为表格中的一行，顺序与 [`SHEET_HEADERS`] 一致
    pub fn to_sheet_row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.area_city.clone().unwrap_or_default(),
            self.address.clone(),
            self.phone_number.clone().unwrap_or_default(),
            self.description.clone().unwrap_or_default(),
            self.status.as_str().to_string(),
            self.google_maps_url(),
        ]
    }
}

/// 将查询结果按顺序写回店铺列表
///
/// `results[i]` 对应 `stores[i]`；长度不一致时只处理公共前缀
pub fn inject_phone_numbers(stores: &mut [StoreRecord], results: &[LookupResult]) {
    for (store, result) in stores.iter_mut().zip(results) {
        store.apply_lookup(result);
    }
}
