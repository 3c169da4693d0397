use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 本节点标识，部署时固定，事件按它区分来源
    pub node_id: String,
    pub s3: S3Config,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    pub access_key: String,
    pub secret_key: String,
    /// 对象存储端点主机，可带 http(s):// 前缀，客户端会剥离
    pub endpoint: String,
    pub bucket: String,
    #[serde(default = "S3Config::default_region")]
    pub region: String,
}

impl S3Config {
    fn default_region() -> String {
        "auto".to_string()
    }
}

/// 同步行为配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// 同步间隔（秒）
    #[serde(default = "SyncConfig::default_sync_interval")]
    pub sync_interval: u64,
    /// 事件保留天数，超期事件与游标进度无关地被清理
    #[serde(default = "SyncConfig::default_retention_days")]
    pub event_retention_days: u64,
}

impl SyncConfig {
    fn default_sync_interval() -> u64 {
        300
    }
    fn default_retention_days() -> u64 {
        7
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_interval: Self::default_sync_interval(),
            event_retention_days: Self::default_retention_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 受管文件根目录
    #[serde(default = "StorageConfig::default_files_root")]
    pub files_root: PathBuf,
    /// 事件日志数据库路径
    #[serde(default = "StorageConfig::default_db_path")]
    pub db_path: String,
}

impl StorageConfig {
    fn default_files_root() -> PathBuf {
        PathBuf::from("./files")
    }
    fn default_db_path() -> String {
        "./data/events.db".to_string()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            files_root: Self::default_files_root(),
            db_path: Self::default_db_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_id: String::new(),
            s3: S3Config {
                access_key: String::new(),
                secret_key: String::new(),
                endpoint: String::new(),
                bucket: String::new(),
                region: S3Config::default_region(),
            },
            sync: SyncConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Config(format!("无法读取配置文件: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| SyncError::Config(format!("配置文件解析失败: {}", e)))?;
        Ok(config)
    }

    pub fn load() -> Self {
        let mut config = Self::from_file("config.toml").unwrap_or_default();
        config.apply_env_overrides();
        config
    }

    /// 应用环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        if let Ok(node_id) = std::env::var("NODE_ID") {
            self.node_id = node_id;
        }

        // 对象存储配置
        if let Ok(access_key) = std::env::var("S3_ACCESS_KEY") {
            self.s3.access_key = access_key;
        }
        if let Ok(secret_key) = std::env::var("S3_SECRET_KEY") {
            self.s3.secret_key = secret_key;
        }
        if let Ok(endpoint) = std::env::var("S3_ENDPOINT") {
            self.s3.endpoint = endpoint;
        }
        if let Ok(bucket) = std::env::var("S3_BUCKET") {
            self.s3.bucket = bucket;
        }
        if let Ok(region) = std::env::var("S3_REGION") {
            self.s3.region = region;
        }

        // 同步行为配置
        if let Ok(si) = std::env::var("SYNC_INTERVAL")
            && let Ok(v) = si.parse::<u64>()
        {
            self.sync.sync_interval = v;
        }
        if let Ok(rd) = std::env::var("EVENT_RETENTION_DAYS")
            && let Ok(v) = rd.parse::<u64>()
        {
            self.sync.event_retention_days = v;
        }

        // 本地路径配置
        if let Ok(root) = std::env::var("FILES_ROOT") {
            self.storage.files_root = PathBuf::from(root);
        }
        if let Ok(db_path) = std::env::var("EVENT_DB_PATH") {
            self.storage.db_path = db_path;
        }
    }

    /// 校验必需配置项，一次性列出所有缺失项
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.node_id.is_empty() {
            missing.push("node_id");
        }
        if self.s3.access_key.is_empty() {
            missing.push("s3.access_key");
        }
        if self.s3.secret_key.is_empty() {
            missing.push("s3.secret_key");
        }
        if self.s3.endpoint.is_empty() {
            missing.push("s3.endpoint");
        }
        if self.s3.bucket.is_empty() {
            missing.push("s3.bucket");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SyncError::Config(format!(
                "缺少必需配置: {}",
                missing.join(", ")
            )))
        }
    }
}
