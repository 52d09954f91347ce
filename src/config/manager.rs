//! # 配置管理器
//!
//! 加载顺序：默认值 → TOML 文件（可选）→ 环境变量覆盖 → 校验。

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use super::{AppConfig, StateStoreBackend};
use crate::database::redact_url;
use crate::error::{AuthError, Context, Result};
use crate::logging::{LogComponent, LogStage};
use crate::provider::ProviderKind;
use crate::{ldebug, linfo};

/// 指定配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "AUTH_CONFIG_PATH";

/// 配置管理器
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// 当前配置
    config: Arc<AppConfig>,
    /// 实际加载的配置文件
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// 从进程环境创建配置管理器
    ///
    /// `AUTH_CONFIG_PATH` 指定的文件必须存在；
    /// 未指定时尝试 `config/config.{RUST_ENV}.toml`，不存在则只使用默认值和环境变量。
    pub fn new() -> Result<Self> {
        let vars: HashMap<String, String> = env::vars().collect();

        let config_file = if let Some(path) = vars.get(CONFIG_PATH_ENV) {
            Some(PathBuf::from(path))
        } else {
            let env_name = vars.get("RUST_ENV").map_or("dev", String::as_str);
            let default_path = PathBuf::from(format!("config/config.{env_name}.toml"));
            default_path.exists().then_some(default_path)
        };

        Self::load(config_file.as_deref(), &vars)
    }

    /// 从指定文件和变量表创建配置管理器
    pub fn load(config_path: Option<&Path>, vars: &HashMap<String, String>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::load_config_file(path)?,
            None => AppConfig::default(),
        };

        let applied = Self::apply_env_overrides(&mut config, vars)?;
        config.validate()?;

        linfo!(
            "system",
            LogStage::Configuration,
            LogComponent::Config,
            "config_loaded",
            "配置加载完成",
            file = ?config_path,
            env_overrides = applied,
            state_store = ?config.state_store.backend
        );

        Ok(Self {
            config: Arc::new(config),
            source: config_path.map(Path::to_path_buf),
        })
    }

    /// 获取当前配置
    #[must_use]
    pub fn config(&self) -> Arc<AppConfig> {
        Arc::clone(&self.config)
    }

    /// 实际加载的配置文件
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// 加载配置文件
    fn load_config_file(path: &Path) -> Result<AppConfig> {
        if !path.exists() {
            return Err(AuthError::config(format!(
                "配置文件不存在: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;

        toml::from_str(&content).map_err(|e| {
            AuthError::config_with_source(format!("TOML解析失败 - 配置文件: {}", path.display()), e)
        })
    }

    /// 应用环境变量覆盖，返回生效的变量个数
    fn apply_env_overrides(
        config: &mut AppConfig,
        vars: &HashMap<String, String>,
    ) -> Result<usize> {
        let mut applied = 0;
        for (key, value) in vars {
            if Self::apply_override(config, key, value)? {
                ldebug!(
                    "system",
                    LogStage::Configuration,
                    LogComponent::Config,
                    "env_override",
                    "应用环境变量覆盖",
                    key = %key,
                    value = %Self::mask(key, value)
                );
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// 将单个环境变量应用到配置对象，未知变量返回 `false`
    fn apply_override(config: &mut AppConfig, key: &str, value: &str) -> Result<bool> {
        match key {
            "SERVER_HOST" => config.server.host = value.to_string(),
            "SERVER_PORT" => config.server.port = parse_var(key, value)?,
            "COOKIE_SECURE" => config.server.cookie_secure = parse_var(key, value)?,
            "CORS_ORIGINS" => config.server.cors_origins = split_list(value),
            "DATABASE_URL" => config.database.url = value.to_string(),
            "DATABASE_MAX_CONNECTIONS" => {
                config.database.max_connections = parse_var(key, value)?;
            }
            "JWT_SECRET" => config.jwt.secret = value.to_string(),
            "JWT_ISSUER" => config.jwt.issuer = value.to_string(),
            "JWT_ACCESS_TTL_HOURS" => config.jwt.access_ttl_hours = parse_var(key, value)?,
            "JWT_REFRESH_TTL_DAYS" => config.jwt.refresh_ttl_days = parse_var(key, value)?,
            "OAUTH_ENCRYPTION_KEY" => {
                config.oauth.encryption_key =
                    (!value.trim().is_empty()).then(|| value.to_string());
            }
            "OAUTH_HTTP_TIMEOUT_SECS" => config.oauth.http_timeout_secs = parse_var(key, value)?,
            "PUBLIC_BASE_URL" => config.oauth.public_base_url = value.to_string(),
            "STATE_STORE" => {
                config.state_store.backend = match value.to_ascii_lowercase().as_str() {
                    "memory" => StateStoreBackend::Memory,
                    "redis" => StateStoreBackend::Redis,
                    other => {
                        return Err(AuthError::config(format!(
                            "无效的 STATE_STORE: {other}（可选 memory / redis）"
                        )));
                    }
                };
            }
            "REDIS_URL" => config.state_store.redis_url = Some(value.to_string()),
            "LOG_LEVEL" => config.log_level = Some(value.to_string()),
            _ => return Ok(Self::apply_provider_override(config, key, value)),
        }
        Ok(true)
    }

    /// `{GOOGLE,LINKEDIN,GITHUB}_{CLIENT_ID,CLIENT_SECRET,REDIRECT_URL,SCOPES}`
    fn apply_provider_override(config: &mut AppConfig, key: &str, value: &str) -> bool {
        for kind in ProviderKind::ALL {
            let Some(field) = key.strip_prefix(kind.env_prefix()) else {
                continue;
            };
            let provider = config.oauth.provider_mut(kind);
            match field {
                "_CLIENT_ID" => provider.client_id = value.to_string(),
                "_CLIENT_SECRET" => provider.client_secret = value.to_string(),
                "_REDIRECT_URL" => provider.redirect_url = value.to_string(),
                "_SCOPES" => provider.scopes = split_list(value),
                _ => return false,
            }
            return true;
        }
        false
    }

    /// 日志中隐藏密钥，连接串只隐藏其中的密码
    fn mask(key: &str, value: &str) -> String {
        if key.contains("SECRET") || key.contains("KEY") || key.contains("PASSWORD") {
            "***".to_string()
        } else if key.ends_with("_URL") {
            redact_url(value)
        } else {
            value.to_string()
        }
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .map_err(|e| AuthError::config_with_source(format!("无效的环境变量 {key}: {value}"), e))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split([',', ' '])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
