//! 本地变更入口
//!
//! 宿主应用在本地文件新增或删除时调用这里的钩子：
//! 先推送对象存储，成功后再追加事件。推送失败即中止该条目，
//! 不留下其他节点无法兑现的事件。

use crate::config::Config;
use crate::error::Result;
use crate::event_log::EventLog;
use crate::models::EventType;
use crate::s3::ObjectStore;
use crate::sync::validate_rel_path;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 本地变更观察者
pub struct Uploader {
    node_id: String,
    files_root: PathBuf,
    log: Arc<EventLog>,
    store: Arc<dyn ObjectStore>,
}

impl Uploader {
    pub fn new(config: &Config, log: Arc<EventLog>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            node_id: config.node_id.clone(),
            files_root: config.storage.files_root.clone(),
            log,
            store,
        }
    }

    /// 本地新增文件：从受管根目录读取内容并推送
    pub async fn handle_upload(&self, rel_path: &str) -> Result<()> {
        validate_rel_path(rel_path)?;
        let local = self.files_root.join(rel_path);
        let bytes = tokio::fs::read(&local).await?;
        self.push(rel_path, &bytes).await
    }

    /// 本地新增内容已在内存中的变体
    pub async fn handle_upload_bytes(&self, rel_path: &str, bytes: &[u8]) -> Result<()> {
        validate_rel_path(rel_path)?;
        self.push(rel_path, bytes).await
    }

    /// 本地删除文件：删除远端对象并记录事件
    pub async fn handle_delete(&self, rel_path: &str) -> Result<()> {
        validate_rel_path(rel_path)?;

        if let Err(e) = self.store.delete(rel_path).await {
            warn!("删除远端对象失败: {} - {}", rel_path, e);
            return Err(e.into());
        }

        let event = self
            .log
            .append(rel_path, EventType::Delete, &self.node_id)?;
        info!("本地删除已登记: {} (事件 {})", rel_path, event.id);
        Ok(())
    }

    /// 处理一组关联文件的上传（如原图及其各尺寸缩略图）
    ///
    /// 本地已不存在的条目直接跳过；单条失败不影响其余条目。
    /// 返回成功推送的数量。
    pub async fn handle_upload_many(&self, rel_paths: &[String]) -> Result<usize> {
        let mut pushed = 0;
        for rel_path in rel_paths {
            // 先校验再做存在性检查，越界路径不触达文件系统
            if let Err(e) = validate_rel_path(rel_path) {
                warn!("批量条目路径不安全，跳过: {}", e);
                continue;
            }
            let local = self.files_root.join(rel_path);
            if !tokio::fs::try_exists(&local).await.unwrap_or(false) {
                debug!("本地文件不存在，跳过: {}", rel_path);
                continue;
            }
            if self.handle_upload(rel_path).await.is_ok() {
                pushed += 1;
            }
        }
        Ok(pushed)
    }

    /// 处理一组关联文件的删除，返回成功删除的数量
    pub async fn handle_delete_many(&self, rel_paths: &[String]) -> Result<usize> {
        let mut deleted = 0;
        for rel_path in rel_paths {
            if self.handle_delete(rel_path).await.is_ok() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// 推送成功后才追加事件，失败的推送不产生事件
    async fn push(&self, rel_path: &str, bytes: &[u8]) -> Result<()> {
        let content_type = mime_guess::from_path(rel_path).first_raw();

        if let Err(e) = self.store.put(rel_path, bytes, content_type).await {
            warn!("上传对象失败: {} - {}", rel_path, e);
            return Err(e.into());
        }

        let event = self
            .log
            .append(rel_path, EventType::Upload, &self.node_id)?;
        info!("本地上传已登记: {} (事件 {})", rel_path, event.id);
        Ok(())
    }
}
