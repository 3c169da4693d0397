//! 多节点媒体文件同步库
//!
//! 以 S3 兼容对象存储为中转，在多个节点间同步本地文件树：
//! 本地变更经 [`Uploader`] 推送到对象存储并追加到共享事件日志，
//! 其他节点的 [`Syncer`] 周期性消费日志补齐本地副本。

pub mod config;
pub mod error;
pub mod event_log;
pub mod models;
pub mod s3;
pub mod sync;
pub mod uploader;

pub use config::Config;
pub use error::{Result, StoreError, SyncError};
pub use event_log::EventLog;
pub use models::{EventType, SyncEvent};
pub use s3::{ObjectStore, S3Client};
pub use sync::{SyncReport, Syncer, validate_rel_path};
pub use uploader::Uploader;
