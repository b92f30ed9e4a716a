//! 查询上下文
//!
//! 封装"我正在查询这批里的第几个店铺"这一信息

use std::fmt::Display;

/// 查询上下文（仅用于日志）
#[derive(Debug, Clone)]
pub struct LookupCtx {
    /// 店铺在本批中的序号（从1开始）
    pub record_index: usize,

    /// 本批店铺总数
    pub batch_size: usize,

    pub store_id: String,
}

impl LookupCtx {
    pub fn new(record_index: usize, batch_size: usize, store_id: impl Into<String>) -> Self {
        Self {
            record_index,
            batch_size,
            store_id: store_id.into(),
        }
    }
}

impl Display for LookupCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[店铺 {}/{} ID#{}]",
            self.record_index, self.batch_size, self.store_id
        )
    }
}
