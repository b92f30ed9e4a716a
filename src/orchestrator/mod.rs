//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量调度和整次运行的流程，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `pipeline` - 应用流水线
//! - 管理应用生命周期（初始化、运行）
//! - 读取店铺 → 补全电话 → 生成表格 → 发送通知 → 标记已处理
//! - 输出每个阶段的耗时和全局统计
//!
//! ### `batch_enricher` - 批量电话补全
//! - 为一批店铺并发派发查询
//! - 保证结果与输入顺序一一对应
//!
//! ## 层次关系
//!
//! ```text
//! pipeline (处理一次运行)
//!     ↓
//! batch_enricher (处理 Vec<StoreRecord>)
//!     ↓
//! workflow::PlaceLookupClient (处理单个店铺)
//!     ↓
//! infrastructure (基础设施：RateLimiter / RetryPolicy)
//! ```

pub mod batch_enricher;
pub mod pipeline;

// 重新导出主要类型
pub use batch_enricher::BatchEnricher;
pub use pipeline::App;
