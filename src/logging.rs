//! # 日志配置模块
//!
//! 初始化 tracing 订阅器，并提供带有请求 ID、阶段和组件字段的结构化日志宏。
//!
//! 宏调用形式：
//!
//! ```ignore
//! linfo!(request_id, LogStage::Authentication, LogComponent::OAuth, "callback_ok", "回调处理完成", user_id = 7);
//! ```

use std::env;
use std::fmt;
use tracing_subscriber::{EnvFilter, fmt as fmt_layer, layer::SubscriberExt, util::SubscriberInitExt};

/// 请求处理所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStage {
    /// 启动
    Startup,
    /// 关闭
    Shutdown,
    /// 配置加载
    Configuration,
    /// 请求进入
    RequestStart,
    /// 认证与令牌
    Authentication,
    /// 调用第三方接口
    ExternalApi,
    /// 数据库操作
    Db,
    /// 状态存储
    Cache,
    /// 后台任务
    BackgroundTask,
    /// 响应输出
    Response,
    /// 错误处理
    Error,
}

impl LogStage {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Shutdown => "shutdown",
            Self::Configuration => "configuration",
            Self::RequestStart => "request_start",
            Self::Authentication => "authentication",
            Self::ExternalApi => "external_api",
            Self::Db => "db",
            Self::Cache => "cache",
            Self::BackgroundTask => "background_task",
            Self::Response => "response",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 产生日志的组件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogComponent {
    /// 主程序
    Main,
    /// 配置
    Config,
    /// 数据库
    Database,
    /// HTTP 服务装配
    ServerSetup,
    /// CSRF 状态存储
    StateStore,
    /// 凭证加解密
    Crypto,
    /// JWT 签发与校验
    Jwt,
    /// OAuth 流程
    OAuth,
    /// 身份提供方适配器
    Provider,
    /// 联邦登录协调器
    Federation,
    /// 身份存储
    IdentityStore,
    /// 认证中间件
    Auth,
}

impl LogComponent {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Config => "config",
            Self::Database => "database",
            Self::ServerSetup => "server_setup",
            Self::StateStore => "state_store",
            Self::Crypto => "crypto",
            Self::Jwt => "jwt",
            Self::OAuth => "oauth",
            Self::Provider => "provider",
            Self::Federation => "federation",
            Self::IdentityStore => "identity_store",
            Self::Auth => "auth",
        }
    }
}

impl fmt::Display for LogComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// info 级别结构化日志
#[macro_export]
macro_rules! linfo {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $description:expr $(, $($fields:tt)+)?) => {
        ::tracing::info!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            $($($fields)+,)?
            "{}",
            $description
        )
    };
}

/// debug 级别结构化日志
#[macro_export]
macro_rules! ldebug {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $description:expr $(, $($fields:tt)+)?) => {
        ::tracing::debug!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            $($($fields)+,)?
            "{}",
            $description
        )
    };
}

/// warn 级别结构化日志
#[macro_export]
macro_rules! lwarn {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $description:expr $(, $($fields:tt)+)?) => {
        ::tracing::warn!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            $($($fields)+,)?
            "{}",
            $description
        )
    };
}

/// error 级别结构化日志
#[macro_export]
macro_rules! lerror {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $description:expr $(, $($fields:tt)+)?) => {
        ::tracing::error!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            $($($fields)+,)?
            "{}",
            $description
        )
    };
}

/// 默认过滤规则：关闭 SQL 语句级别日志
fn default_filter(level: &str) -> String {
    format!("{level},federated_auth=debug,sqlx::query=off,sea_orm::query=warn,sqlx=warn")
}

/// 初始化日志系统
///
/// `RUST_LOG` 优先；否则使用 `log_level`（来自 `LOG_LEVEL`）拼出默认过滤规则。
pub fn init_logging(log_level: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let log_filter = env::var("RUST_LOG").unwrap_or_else(|_| default_filter(level));

    let result = tracing_subscriber::registry()
        .with(EnvFilter::try_new(&log_filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt_layer::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();

    if result.is_err() {
        tracing::debug!("日志系统已初始化，忽略重复初始化");
    }
}
