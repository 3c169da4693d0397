use silent_objsync::{Config, EventLog, ObjectStore, Result, S3Client, Syncer};
use std::sync::Arc;
use tracing::{Level, error, info, warn};
use tracing_subscriber as logger;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logger::fmt().with_max_level(Level::INFO).init();

    info!("对象同步服务启动中...");

    // 加载配置
    let config = Config::load();
    if let Err(e) = config.validate() {
        // 配置不全时不中断宿主进程，仅提示并不启动同步
        warn!("{}，同步服务未启动", e);
        return Ok(());
    }
    info!("配置加载完成: node_id={}", config.node_id);

    // 打开共享事件日志
    let log = Arc::new(EventLog::open(&config.storage.db_path)?);
    info!("事件日志已就绪: {} (现有 {} 条)", config.storage.db_path, log.count());

    // 初始化对象存储客户端
    let client = S3Client::new(&config.s3)?;
    info!("对象存储客户端已初始化: {}", client.host());
    let store: Arc<dyn ObjectStore> = Arc::new(client);

    let syncer = Arc::new(Syncer::new(&config, log.clone(), store));

    // 启动周期同步任务
    let interval = config.sync.sync_interval;
    let sync_task = {
        let syncer = syncer.clone();
        tokio::spawn(async move {
            use tokio::time::{Duration, sleep};
            loop {
                sleep(Duration::from_secs(interval)).await;
                match syncer.run_sync().await {
                    Ok(report) if report.skipped => {}
                    Ok(report) => {
                        if report.processed > 0 || report.pruned > 0 {
                            info!(
                                "✅ 同步完成: 处理 {} 条, 下载 {}, 删除 {}, 失败 {}, 清理 {}, 游标 {}",
                                report.processed,
                                report.downloaded,
                                report.deleted,
                                report.failed,
                                report.pruned,
                                report.cursor
                            );
                        }
                    }
                    Err(e) => error!("同步失败: {}", e),
                }
            }
        })
    };

    info!(
        "同步服务已启动: node_id={}, 间隔 {} 秒",
        config.node_id, interval
    );

    // 保持运行，优雅处理 SIGINT/SIGTERM（容器内常用 SIGTERM）
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        // 在容器内，优先监听 SIGTERM；避免某些环境下 ctrl_c() 立即返回导致进程退出
        let mut sigterm = signal(SignalKind::terminate()).expect("注册 SIGTERM 失败");
        sigterm.recv().await;
        info!("收到 SIGTERM 信号，正在退出...");
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("监听 Ctrl+C 失败");
        info!("收到关闭信号，正在退出...");
    }

    sync_task.abort();
    info!("同步任务已停止");

    Ok(())
}
