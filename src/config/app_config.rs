//! # 应用配置结构定义

use serde::{Deserialize, Serialize};

use super::OAuthConfig;
use crate::ensure_config;

/// JWT 密钥的最小长度（字节）
pub const MIN_SECRET_LEN: usize = 32;
/// 访问令牌有效期上限（小时）
pub const MAX_ACCESS_TTL_HOURS: i64 = 24 * 30;
/// 刷新令牌有效期上限（天）
pub const MAX_REFRESH_TTL_DAYS: i64 = 365;
/// state 有效期上限（秒）
pub const MAX_STATE_TTL_SECS: u64 = 60 * 60;
/// state 清理间隔上限（秒）
pub const MAX_CLEANUP_INTERVAL_SECS: u64 = 24 * 60 * 60;
/// OAuth 请求超时上限（秒）
pub const MAX_HTTP_TIMEOUT_SECS: u64 = 300;

/// 应用主配置结构
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP 服务配置
    pub server: ServerConfig,
    /// 数据库配置
    pub database: DatabaseConfig,
    /// 令牌签发配置
    pub jwt: JwtConfig,
    /// OAuth 联邦登录配置
    pub oauth: OAuthConfig,
    /// CSRF state 存储配置
    pub state_store: StateStoreConfig,
    /// 日志级别（RUST_LOG 未设置时生效）
    pub log_level: Option<String>,
}

/// HTTP 服务配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// state cookie 是否带 Secure 属性
    pub cookie_secure: bool,
    /// 允许的 CORS 源，`*` 表示任意
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cookie_secure: false,
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// 数据库配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 数据库URL
    pub url: String,
    /// 最大连接数
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/auth.db?mode=rwc".to_string(),
            max_connections: 10,
        }
    }
}

/// 令牌签发配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    /// HS256 签名密钥
    pub secret: String,
    /// `iss` 声明
    pub issuer: String,
    /// 访问令牌有效期（小时）
    pub access_ttl_hours: i64,
    /// 刷新令牌有效期（天）
    pub refresh_ttl_days: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: "auth-service".to_string(),
            access_ttl_hours: 1,
            refresh_ttl_days: 7,
        }
    }
}

/// state 存储后端
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateStoreBackend {
    /// 进程内存
    #[default]
    Memory,
    /// Redis
    Redis,
}

/// CSRF state 存储配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateStoreConfig {
    /// 后端类型
    pub backend: StateStoreBackend,
    /// Redis 连接 URL
    pub redis_url: Option<String>,
    /// state 有效期（秒）
    pub ttl_secs: u64,
    /// 过期 state 清理间隔（秒）
    pub cleanup_interval_secs: u64,
}

impl Default for StateStoreConfig {
    fn default() -> Self {
        Self {
            backend: StateStoreBackend::Memory,
            redis_url: None,
            ttl_secs: 600,
            cleanup_interval_secs: 60,
        }
    }
}

impl AppConfig {
    /// 验证配置的有效性，启动时调用，失败即退出
    pub fn validate(&self) -> crate::error::Result<()> {
        ensure_config!(self.server.port != 0, "无效的服务器端口: 0");
        ensure_config!(!self.database.url.trim().is_empty(), "数据库URL不能为空");
        ensure_config!(
            self.jwt.secret.len() >= MIN_SECRET_LEN,
            "JWT_SECRET 必须设置且至少 {} 字节",
            MIN_SECRET_LEN
        );
        ensure_config!(!self.jwt.issuer.trim().is_empty(), "JWT issuer 不能为空");
        ensure_config!(
            (1..=MAX_ACCESS_TTL_HOURS).contains(&self.jwt.access_ttl_hours),
            "访问令牌有效期必须在 1..={} 小时之间",
            MAX_ACCESS_TTL_HOURS
        );
        ensure_config!(
            (1..=MAX_REFRESH_TTL_DAYS).contains(&self.jwt.refresh_ttl_days),
            "刷新令牌有效期必须在 1..={} 天之间",
            MAX_REFRESH_TTL_DAYS
        );
        ensure_config!(
            (1..=MAX_HTTP_TIMEOUT_SECS).contains(&self.oauth.http_timeout_secs),
            "OAuth 请求超时必须在 1..={} 秒之间",
            MAX_HTTP_TIMEOUT_SECS
        );
        ensure_config!(
            (1..=MAX_STATE_TTL_SECS).contains(&self.state_store.ttl_secs),
            "state 有效期必须在 1..={} 秒之间",
            MAX_STATE_TTL_SECS
        );
        ensure_config!(
            (1..=MAX_CLEANUP_INTERVAL_SECS).contains(&self.state_store.cleanup_interval_secs),
            "state 清理间隔必须在 1..={} 秒之间",
            MAX_CLEANUP_INTERVAL_SECS
        );

        if self.state_store.backend == StateStoreBackend::Redis {
            let has_url = self
                .state_store
                .redis_url
                .as_deref()
                .is_some_and(|url| !url.trim().is_empty());
            ensure_config!(has_url, "STATE_STORE=redis 时必须设置 REDIS_URL");
        }

        Ok(())
    }

    /// 监听地址
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.jwt.secret = "0123456789abcdef0123456789abcdef".to_string();
        config
    }

    #[test]
    fn test_defaults_follow_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.jwt.issuer, "auth-service");
        assert_eq!(config.jwt.access_ttl_hours, 1);
        assert_eq!(config.jwt.refresh_ttl_days, 7);
        assert_eq!(config.state_store.ttl_secs, 600);
        assert_eq!(config.oauth.http_timeout_secs, 10);
    }

    #[test]
    fn test_short_jwt_secret_fails_fast() {
        let mut config = valid_config();
        assert!(config.validate().is_ok());

        config.jwt.secret = "too-short".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn test_ttl_bounds() {
        let mut config = valid_config();
        config.jwt.access_ttl_hours = MAX_ACCESS_TTL_HOURS;
        config.state_store.ttl_secs = MAX_STATE_TTL_SECS;
        assert!(config.validate().is_ok());

        config.jwt.access_ttl_hours = i64::MAX;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.jwt.refresh_ttl_days = 0;
        assert!(config.validate().is_err());
        config.jwt.refresh_ttl_days = MAX_REFRESH_TTL_DAYS + 1;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.state_store.ttl_secs = u64::MAX;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("state"));

        let mut config = valid_config();
        config.oauth.http_timeout_secs = u64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_redis_backend_requires_url() {
        let mut config = valid_config();
        config.state_store.backend = StateStoreBackend::Redis;
        assert!(config.validate().is_err());

        config.state_store.redis_url = Some("redis://127.0.0.1:6379/0".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            port = 9000

            [oauth.github]
            client_id = "gh-client"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.oauth.github.client_id, "gh-client");
        assert!(config.oauth.google.client_id.is_empty());
    }
}
