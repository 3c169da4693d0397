//! 追加式事件日志
//!
//! 以 sled 持久化文件变更事件：`events` 树按大端 u64 事件 ID 做键，
//! 天然支持按 ID 升序的尾部范围读取；`meta` 树保存单调递增的 ID 计数器；
//! `cursors` 树保存各节点自己的同步游标。打开日志即完成建表。

use crate::error::{Result, SyncError};
use crate::models::{EventType, SyncEvent};
use chrono::{Duration, Utc};
use std::path::Path;

const META_LAST_ID: &[u8] = b"last_event_id";

/// 事件日志
pub struct EventLog {
    db: sled::Db,
    events: sled::Tree,
    meta: sled::Tree,
    cursors: sled::Tree,
}

impl EventLog {
    /// 打开事件日志，不存在时创建
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db =
            sled::open(path).map_err(|e| SyncError::Storage(format!("打开事件日志失败: {}", e)))?;

        let events = db
            .open_tree("events")
            .map_err(|e| SyncError::Storage(format!("打开事件表失败: {}", e)))?;

        let meta = db
            .open_tree("meta")
            .map_err(|e| SyncError::Storage(format!("打开元数据表失败: {}", e)))?;

        let cursors = db
            .open_tree("cursors")
            .map_err(|e| SyncError::Storage(format!("打开游标表失败: {}", e)))?;

        Ok(Self {
            db,
            events,
            meta,
            cursors,
        })
    }

    /// 追加一条变更事件，返回带有新分配 ID 的完整事件
    ///
    /// ID 严格大于此前分配过的任何 ID；保留期清理会留下空洞但不回退计数器。
    pub fn append(
        &self,
        file_path: &str,
        event_type: EventType,
        source_node_id: &str,
    ) -> Result<SyncEvent> {
        let id = self.next_id()?;
        let event = SyncEvent {
            id,
            file_path: file_path.to_string(),
            event_type,
            source_node_id: source_node_id.to_string(),
            created_at: Utc::now(),
        };

        let value = serde_json::to_vec(&event)?;
        self.events.insert(id.to_be_bytes(), value)?;
        self.db.flush()?;

        Ok(event)
    }

    /// 读取游标之后的事件，按 ID 升序，最多 `limit` 条
    ///
    /// 绝不返回 ID ≤ 游标的事件；被清理产生的 ID 空洞直接跳过。
    pub fn read_since(&self, cursor: u64, limit: usize) -> Result<Vec<SyncEvent>> {
        let start = cursor.saturating_add(1).to_be_bytes();
        let mut events = Vec::new();

        for item in self.events.range(start.as_slice()..).take(limit) {
            let (_key, value) = item?;
            let event: SyncEvent = serde_json::from_slice(&value)?;
            events.push(event);
        }

        Ok(events)
    }

    /// 清理早于保留窗口的事件，返回删除数量
    ///
    /// 与任何节点的游标无关：慢节点游标之前的超期事件同样被清理。
    pub fn prune(&self, retention: Duration) -> Result<usize> {
        let cutoff = Utc::now() - retention;
        let mut removed = 0;

        for item in self.events.iter() {
            let (key, value) = item?;
            let event: SyncEvent = serde_json::from_slice(&value)?;
            if event.created_at < cutoff {
                self.events.remove(key)?;
                removed += 1;
            }
        }

        if removed > 0 {
            self.db.flush()?;
        }

        Ok(removed)
    }

    /// 读取节点游标，从未同步过的节点为 0
    pub fn load_cursor(&self, node_id: &str) -> Result<u64> {
        Ok(self
            .cursors
            .get(node_id)?
            .map(|bytes| decode_u64(&bytes))
            .unwrap_or(0))
    }

    /// 持久化节点游标，每轮同步收尾时写一次
    pub fn store_cursor(&self, node_id: &str, cursor: u64) -> Result<()> {
        self.cursors.insert(node_id, &cursor.to_be_bytes())?;
        self.db.flush()?;
        Ok(())
    }

    /// 当前日志中的事件数量
    pub fn count(&self) -> usize {
        self.events.len()
    }

    fn next_id(&self) -> Result<u64> {
        let current = self.meta.update_and_fetch(META_LAST_ID, |old| {
            let next = match old {
                Some(bytes) => decode_u64(bytes) + 1,
                None => 1,
            };
            Some(next.to_be_bytes().to_vec())
        })?;

        let Some(bytes) = current else {
            return Err(SyncError::Storage("事件 ID 计数器丢失".to_string()));
        };
        Ok(decode_u64(&bytes))
    }
}

fn decode_u64(bytes: &[u8]) -> u64 {
    bytes.try_into().map(u64::from_be_bytes).unwrap_or(0)
}
