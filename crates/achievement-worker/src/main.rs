//! 成就检查服务入口
//!
//! 装配任务队列与成就检查消费循环。队列与用户目录当前为进程内
//! 参考实现，接入真实基础设施时替换装配处的具体类型即可。

use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tokio::sync::watch;
use tracing::info;

use achievement_worker::awarder::{AchievementAwarder, LogAchievementSink};
use achievement_worker::consumer::AwardConsumer;
use comment_shared::config::AppConfig;
use comment_shared::observability;
use comment_shared::queue::InMemoryTaskQueue;
use comment_shared::test_utils::InMemoryUserDirectory;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 统一加载配置：从 config/{service_name}.toml 加载，包含可观测性配置
    let config = AppConfig::load("achievement-worker").unwrap_or_else(|e| {
        tracing::warn!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    // 2. 初始化日志
    observability::init(&config.observability)?;

    info!("Starting achievement-worker...");
    info!(environment = %config.environment, "Configuration loaded");

    // 3. 装配队列与协作方
    let queue = Arc::new(InMemoryTaskQueue::new());
    let directory = Arc::new(InMemoryUserDirectory::new());
    let sink = Arc::new(LogAchievementSink);
    let awarder = Arc::new(AchievementAwarder::new(directory, sink));

    // 4. 启动消费循环
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer = AwardConsumer::new(queue, awarder);
    let worker = tokio::spawn(consumer.run(shutdown_rx));

    // 5. 等待退出信号后优雅关闭
    signal::ctrl_c().await?;
    info!("收到退出信号，开始优雅关闭");
    shutdown_tx.send(true)?;
    worker.await?;

    info!("achievement-worker 已退出");
    Ok(())
}
