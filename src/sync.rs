//! 跨节点对账同步
//!
//! 每轮从事件日志读取游标之后的一批事件，按 ID 升序逐条应用到本地文件树，
//! 收尾时一次性持久化游标并清理超期事件。应用是幂等的：同一事件重放两次
//! 与一次效果相同，这使得跳过失败与崩溃后重放都安全。

use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::event_log::EventLog;
use crate::models::EventType;
use crate::s3::ObjectStore;
use chrono::Duration;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// 单轮处理的事件数上限
const BATCH_LIMIT: usize = 50;

/// 保留天数上限（100 年），配置值超过它会在时长换算中溢出
const MAX_RETENTION_DAYS: u64 = 36_500;

/// 单轮同步报告
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// 本轮读取并走完处理流程的事件数
    pub processed: usize,
    /// 成功下载的上传事件数
    pub downloaded: usize,
    /// 应用的删除事件数
    pub deleted: usize,
    /// 本节点自身产生而跳过的事件数
    pub skipped_own: usize,
    /// 路径不安全而跳过的事件数
    pub skipped_unsafe: usize,
    /// 应用失败但游标照常前进的事件数
    pub failed: usize,
    /// 本轮清理的超期事件数
    pub pruned: usize,
    /// 轮末游标值
    pub cursor: u64,
    /// 上一轮尚未结束，本轮被跳过
    pub skipped: bool,
}

/// 对账同步引擎
///
/// 依赖注入事件日志与对象存储，自身不持有全局状态；
/// `running` 互斥保证同一节点不会有两轮同步交叠执行。
pub struct Syncer {
    node_id: String,
    files_root: PathBuf,
    retention: Duration,
    log: Arc<EventLog>,
    store: Arc<dyn ObjectStore>,
    running: Mutex<()>,
}

impl Syncer {
    pub fn new(config: &Config, log: Arc<EventLog>, store: Arc<dyn ObjectStore>) -> Self {
        // 越界的保留天数按上限处理，效果上等同永不清理
        let retention_days = config.sync.event_retention_days.min(MAX_RETENTION_DAYS);
        Self {
            node_id: config.node_id.clone(),
            files_root: config.storage.files_root.clone(),
            retention: Duration::days(retention_days as i64),
            log,
            store,
            running: Mutex::new(()),
        }
    }

    /// 执行一轮同步
    ///
    /// 游标只在轮末持久化一次；中途崩溃则下一轮从上次持久化的位置重放。
    pub async fn run_sync(&self) -> Result<SyncReport> {
        let Ok(_guard) = self.running.try_lock() else {
            warn!("上一轮同步尚未结束，跳过本轮");
            return Ok(SyncReport {
                skipped: true,
                ..Default::default()
            });
        };

        let mut report = SyncReport::default();

        let cursor = self.log.load_cursor(&self.node_id)?;
        let mut pending = cursor;

        let events = self.log.read_since(cursor, BATCH_LIMIT)?;
        if !events.is_empty() {
            debug!("游标 {} 之后读取到 {} 条事件", cursor, events.len());
        }

        for event in events {
            report.processed += 1;

            if event.source_node_id == self.node_id {
                // 自身变更在发生时已落到本地，跳过但游标照常前进
                debug!("跳过本节点事件: {}", event.id);
                report.skipped_own += 1;
            } else if let Err(e) = validate_rel_path(&event.file_path) {
                // 带毒事件永不应用，也不允许它卡死队列
                warn!("事件 {} 路径不安全，跳过: {}", event.id, e);
                report.skipped_unsafe += 1;
            } else {
                match event.event_type {
                    EventType::Upload => match self.apply_upload(&event.file_path).await {
                        Ok(()) => {
                            info!("📥 已下载: {}", event.file_path);
                            report.downloaded += 1;
                        }
                        Err(e) => {
                            // 本轮吞掉失败，游标仍前进；该事件不会自动重试
                            warn!("下载失败: {} - {}", event.file_path, e);
                            report.failed += 1;
                        }
                    },
                    EventType::Delete => match self.apply_delete(&event.file_path).await {
                        Ok(()) => {
                            info!("本地副本已删除: {}", event.file_path);
                            report.deleted += 1;
                        }
                        Err(e) => {
                            warn!("删除本地副本失败: {} - {}", event.file_path, e);
                            report.failed += 1;
                        }
                    },
                }
            }

            pending = event.id;
        }

        if pending > cursor {
            self.log.store_cursor(&self.node_id, pending)?;
        }
        report.cursor = pending;

        report.pruned = self.log.prune(self.retention)?;
        if report.pruned > 0 {
            info!("已清理 {} 条超期事件", report.pruned);
        }

        Ok(report)
    }

    /// 应用上传事件：确保父目录存在，再流式下载到本地路径
    async fn apply_upload(&self, rel_path: &str) -> Result<()> {
        let dest = self.files_root.join(rel_path);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        self.store.get_to_file(rel_path, &dest).await?;
        Ok(())
    }

    /// 应用删除事件：删除本地文件，不存在视为已删除
    async fn apply_delete(&self, rel_path: &str) -> Result<()> {
        let dest = self.files_root.join(rel_path);
        match tokio::fs::remove_file(&dest).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}

/// 校验事件携带的相对路径
///
/// 拒绝：空路径、前导 `/`、内嵌 NUL、反斜杠、等于 `.` 或 `..` 的路径段。
/// 这是对路径穿越读写受管根目录之外文件的防线，除此之外不做额外限制。
pub fn validate_rel_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(SyncError::InvalidPath("路径为空".to_string()));
    }
    if path.starts_with('/') {
        return Err(SyncError::InvalidPath(format!("不允许绝对路径: {}", path)));
    }
    if path.contains('\0') {
        return Err(SyncError::InvalidPath("路径包含 NUL 字符".to_string()));
    }
    if path.contains('\\') {
        return Err(SyncError::InvalidPath(format!("不允许反斜杠: {}", path)));
    }
    for segment in path.split('/') {
        if segment == "." || segment == ".." {
            return Err(SyncError::InvalidPath(format!(
                "不允许相对路径段: {}",
                path
            )));
        }
    }
    Ok(())
}
