use anyhow::Result;
/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::fs;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::models::lookup::BatchReport;

/// 初始化 tracing 日志
///
/// `RUST_LOG` 优先，其次 `LOG_LEVEL`（默认 info）；`verbose` 为 true 时默认级别提升为 debug
pub fn init(verbose: bool) {
    let default_level = std::env::var("LOG_LEVEL")
        .ok()
        .map(|level| level.to_lowercase())
        .unwrap_or_else(|| (if verbose { "debug" } else { "info" }).to_string());

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n店铺电话补全日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(max_concurrent: usize, max_requests_per_minute: u32, items_per_batch: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 店铺电话批量补全");
    info!("📊 最大并发数: {}", max_concurrent);
    info!("⏱️ 每分钟最大请求数: {}", max_requests_per_minute);
    info!("📦 每批店铺数量: {}", items_per_batch);
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
pub fn log_batch_start(total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始查询本批店铺电话，共 {} 个", total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(report: &BatchReport, elapsed: Duration) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 本批查询完成: {}", report);
    info!("⏱️ 耗时 {:.2} 秒", elapsed.as_secs_f64());
    info!("{}", "─".repeat(60));
}

/// 记录单个阶段的耗时
pub fn log_stage(stage: &str, elapsed: Duration) {
    info!("✓ {} 完成，耗时 {:.2} 秒", stage, elapsed.as_secs_f64());
}

/// 打印最终统计信息
pub fn print_final_stats(report: &BatchReport, elapsed: Duration, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 找到电话: {}/{}", report.found, report.attempted);
    info!("🔍 未找到: {}", report.not_found);
    info!("❌ 失败: {}", report.errors);
    info!("⏱️ 总耗时: {:.2} 秒", elapsed.as_secs_f64());
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
