//! 运行配置
//!
//! 所有字段都有默认值；可从 JSON 文件加载，也可由环境变量覆盖。

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const ENV_DATABASE_URL: &str = "AGORA_DATABASE_URL";
pub const ENV_TOKEN_SECRET: &str = "AGORA_TOKEN_SECRET";
pub const ENV_LOG_LEVEL: &str = "AGORA_LOG_LEVEL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub log_level: String,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 为空时使用 `agora_path::get_db_path()` 下的 SQLite 文件
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub sqlx_logging: bool,
}

/// 令牌签发配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    #[serde(skip_serializing)]
    pub token_secret: String,
    pub token_ttl_secs: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 8,
            sqlx_logging: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            token_ttl_secs: 72 * 60 * 60,
        }
    }
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl AppConfig {
    /// 从 JSON 文件加载配置，再应用环境变量覆盖
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("无法读取配置文件 {}: {}", path.display(), e))?;
        let mut config = Self::from_json_str(&raw)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, String> {
        serde_json::from_str(raw).map_err(|e| format!("配置文件格式错误: {}", e))
    }

    /// 默认配置叠加环境变量
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_DATABASE_URL).filter(|v| !v.trim().is_empty()) {
            self.database.url = Some(url);
        }
        if let Some(secret) = lookup(ENV_TOKEN_SECRET).filter(|v| !v.is_empty()) {
            self.auth.token_secret = secret;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.trim().is_empty()) {
            self.log_level = level;
        }
    }
}
