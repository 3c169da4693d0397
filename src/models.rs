use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 文件变更事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Upload,
    Delete,
}

/// 文件变更事件（事件日志中的一行）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEvent {
    /// 事件 ID，由日志追加时分配，单调递增，是唯一的排序与游标依据
    pub id: u64,
    /// 相对路径（POSIX 分隔符，无前导斜杠）
    pub file_path: String,
    /// 事件类型
    pub event_type: EventType,
    /// 产生该变更的节点
    pub source_node_id: String,
    /// 创建时间，仅用于保留期清理，不参与排序
    pub created_at: DateTime<Utc>,
}
