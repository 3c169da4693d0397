use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("存储错误: {0}")]
    Storage(String),

    #[error("对象存储失败: {0}")]
    Store(#[from] StoreError),

    #[error("无效的文件路径: {0}")]
    InvalidPath(String),

    #[error("{0}")]
    Other(String),
}

// 为 sled::Error 实现 From trait
impl From<sled::Error> for SyncError {
    fn from(err: sled::Error) -> Self {
        SyncError::Storage(format!("数据库错误: {}", err))
    }
}

/// 对象存储请求的失败原因，调用方据此决定跳过或中止
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("请求超时")]
    Timeout,

    #[error("传输失败: {0}")]
    Transport(String),

    #[error("HTTP 状态异常: {0}")]
    Status(u16),

    #[error("本地写入失败: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
