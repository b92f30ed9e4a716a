//! # Store Leads
//!
//! 一个用于批量补全店铺电话号码的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有共享的限流状态，只暴露能力
//! - `RateLimiter` - 并发槽位 + 全局请求间隔
//! - `RetryPolicy` - 指数退避 + 随机抖动
//!
//! ### ② 业务能力层（Clients / Services）
//! - `clients/` - Google Places searchText、Slack chat.postMessage
//! - `services/` - 描述"我能做什么"：生成表格、发送通知
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个店铺"的完整查询流程
//! - `LookupCtx` - 上下文封装（批内序号 + 店铺ID）
//! - `PlaceLookupClient` - 限流 → 请求 → 分类 → 重试
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_enricher` - 批量查询，结果与输入一一对应
//! - `orchestrator/pipeline` - 读取 → 补全 → 表格 → 通知 → 标记已处理
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult, LookupFailure};
pub use infrastructure::{RateLimiter, RetryPolicy};
pub use models::{BatchReport, LookupQuery, LookupResult, StoreRecord};
pub use orchestrator::{App, BatchEnricher};
pub use workflow::{PlaceLookupClient, SlotHolding};
