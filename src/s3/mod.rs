//! 对象存储客户端（S3 兼容，Signature V4）

mod client;
mod signer;

pub use client::S3Client;
pub use signer::{SignedRequest, Signer};

use crate::error::StoreError;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;

/// 对象存储操作接口
///
/// 所有操作以 2xx 为成功，其余情况映射为 [`StoreError`]，不抛出原始故障。
/// 客户端内部不做重试，重试语义由调用方的幂等重放承担。
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// 上传对象
    ///
    /// # 参数
    /// * `remote_path` - 远端相对路径
    /// * `body` - 对象内容
    /// * `content_type` - 内容类型，Some 时参与签名并随请求发送
    async fn put(
        &self,
        remote_path: &str,
        body: &[u8],
        content_type: Option<&str>,
    ) -> Result<(), StoreError>;

    /// 读取对象内容
    async fn get(&self, remote_path: &str) -> Result<Bytes, StoreError>;

    /// 下载对象并流式写入本地文件
    ///
    /// 失败时删除已写入的半成品文件，避免残留截断内容。
    async fn get_to_file(&self, remote_path: &str, dest: &Path) -> Result<(), StoreError>;

    /// 删除对象
    async fn delete(&self, remote_path: &str) -> Result<(), StoreError>;
}
