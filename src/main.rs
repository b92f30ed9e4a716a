use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use store_leads::config::Config;
use store_leads::models::{import_stores_csv, TomlStoreRepository};
use store_leads::utils::logging;
use store_leads::App;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    logging::init(config.verbose_logging);

    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(String::as_str) == Some("import") {
        let csv_path = args.get(2).context("用法: store_leads import <csv_path>")?;
        return import(&config, Path::new(csv_path)).await;
    }

    // 初始化并运行应用
    let _report = App::initialize(config).await?.run().await?;

    Ok(())
}

/// 把爬虫导出的 CSV 追加到店铺数据文件
async fn import(config: &Config, csv_path: &Path) -> Result<()> {
    info!("📥 正在导入店铺 CSV: {}", csv_path.display());

    let records = import_stores_csv(csv_path)
        .await
        .with_context(|| format!("读取 CSV 失败: {}", csv_path.display()))?;

    let repository = TomlStoreRepository::new(&config.store_data_file);
    let count = repository.append(records).await?;

    info!("✓ 已导入 {} 个店铺到 {}", count, config.store_data_file);
    Ok(())
}
