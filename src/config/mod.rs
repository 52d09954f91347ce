//! # 配置管理模块
//!
//! 处理应用配置加载、环境变量覆盖和启动校验

mod app_config;
mod manager;
mod provider_config;

pub use app_config::{
    AppConfig, DatabaseConfig, JwtConfig, MAX_ACCESS_TTL_HOURS, MAX_CLEANUP_INTERVAL_SECS,
    MAX_HTTP_TIMEOUT_SECS, MAX_REFRESH_TTL_DAYS, MAX_STATE_TTL_SECS, MIN_SECRET_LEN,
    ServerConfig, StateStoreBackend, StateStoreConfig,
};
pub use manager::{CONFIG_PATH_ENV, ConfigManager};
pub use provider_config::{OAuthConfig, ProviderClientConfig};
