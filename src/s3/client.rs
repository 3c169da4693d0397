use super::ObjectStore;
use super::signer::{Signer, encode_path};
use crate::config::S3Config;
use crate::error::{Result, StoreError, SyncError};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use reqwest::Method;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// 单次请求超时（秒），超时按失败处理而不是挂起
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// S3 兼容对象存储客户端
///
/// 使用虚拟主机寻址：请求主机为 `bucket.endpoint`，路径为对象键。
/// 持有一个长生命周期的连接池化 HTTP 客户端，签名本身无状态。
pub struct S3Client {
    http: reqwest::Client,
    signer: Signer,
    host: String,
}

impl S3Client {
    pub fn new(config: &S3Config) -> Result<Self> {
        let endpoint = config
            .endpoint
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        let host = format!("{}.{}", config.bucket, endpoint);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SyncError::Config(format!("构建 HTTP 客户端失败: {}", e)))?;

        Ok(Self {
            http,
            signer: Signer::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                config.region.clone(),
            ),
            host,
        })
    }

    /// 请求主机（bucket.endpoint）
    pub fn host(&self) -> &str {
        &self.host
    }

    /// 签名并发送请求，2xx 之外的状态码与传输故障都归入 [`StoreError`]
    async fn send(
        &self,
        method: Method,
        remote_path: &str,
        payload: &[u8],
        content_type: Option<&str>,
    ) -> std::result::Result<reqwest::Response, StoreError> {
        let signed = self.signer.sign(
            method.as_str(),
            &self.host,
            remote_path,
            payload,
            content_type,
            Utc::now(),
        );

        // 发送路径必须与签名用的规范路径逐字节一致
        let url = format!("https://{}{}", self.host, encode_path(remote_path));

        let mut req = self.http.request(method, &url);
        for (key, value) in &signed.headers {
            // host 由 URL 决定，不重复设置
            if key != "host" {
                req = req.header(key.as_str(), value.as_str());
            }
        }
        req = req.header("authorization", &signed.authorization);
        if !payload.is_empty() {
            req = req.body(payload.to_vec());
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(StoreError::Status(status.as_u16()));
        }
        Ok(resp)
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn put(
        &self,
        remote_path: &str,
        body: &[u8],
        content_type: Option<&str>,
    ) -> std::result::Result<(), StoreError> {
        self.send(Method::PUT, remote_path, body, content_type)
            .await?;
        debug!("对象已上传: {}", remote_path);
        Ok(())
    }

    async fn get(&self, remote_path: &str) -> std::result::Result<Bytes, StoreError> {
        let resp = self.send(Method::GET, remote_path, &[], None).await?;
        Ok(resp.bytes().await?)
    }

    async fn get_to_file(
        &self,
        remote_path: &str,
        dest: &Path,
    ) -> std::result::Result<(), StoreError> {
        let resp = self.send(Method::GET, remote_path, &[], None).await?;
        download_to_file(resp.bytes_stream(), dest).await?;
        debug!("对象已下载: {} -> {:?}", remote_path, dest);
        Ok(())
    }

    async fn delete(&self, remote_path: &str) -> std::result::Result<(), StoreError> {
        self.send(Method::DELETE, remote_path, &[], None).await?;
        debug!("对象已删除: {}", remote_path);
        Ok(())
    }
}

/// 将字节流写入目标文件，失败时清除写到一半的目标文件
async fn download_to_file<S, E>(stream: S, dest: &Path) -> std::result::Result<(), StoreError>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    StoreError: From<E>,
{
    if let Err(e) = write_stream(stream, dest).await {
        // 截断的半成品会被后续读取当作完整内容，必须清除
        let _ = tokio::fs::remove_file(dest).await;
        return Err(e);
    }
    Ok(())
}

/// 逐块落盘，避免整个对象载入内存
async fn write_stream<S, E>(stream: S, dest: &Path) -> std::result::Result<(), StoreError>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    StoreError: From<E>,
{
    let mut stream = std::pin::pin!(stream);
    let mut file = tokio::fs::File::create(dest).await?;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(())
}
