//! # 错误类型定义

use axum::http::StatusCode;
use thiserror::Error;

use super::{ErrorCategory, TokenError};

/// 应用主要错误类型
#[derive(Debug, Error)]
pub enum AuthError {
    /// 配置相关错误
    #[error("配置错误: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 身份提供方缺少 client id
    #[error("身份提供方未配置: {provider}")]
    ProviderNotConfigured { provider: String },

    /// 不支持的身份提供方标识
    #[error("未知的身份提供方: {provider}")]
    UnknownProvider { provider: String },

    /// state 缺失、过期、已被消费或与 cookie 不一致
    #[error("CSRF 校验失败: {message}")]
    Csrf { message: String },

    /// 身份提供方在回调中返回了 error 或缺少授权码
    #[error("身份提供方拒绝授权: {provider}")]
    AuthorizationDenied {
        provider: String,
        reason: Option<String>,
    },

    /// 授权码交换失败（网络、非 2xx、OAuth 错误响应）
    #[error("授权码交换失败 ({provider}): {message}")]
    Exchange {
        provider: String,
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 获取或解析用户资料失败
    #[error("获取用户资料失败 ({provider}): {message}")]
    ProfileFetch {
        provider: String,
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 身份存储写入或读取失败
    #[error("持久化错误: {message}")]
    Persistence {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 凭证加解密失败
    #[error("加解密错误: {message}")]
    Crypto {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 令牌校验失败
    #[error("令牌错误: {0}")]
    Token(#[from] TokenError),

    /// 缺少认证信息
    #[error("未认证: {message}")]
    Unauthorized { message: String },

    /// 通过邮箱匹配到的用户已绑定了该 provider 的另一个外部身份
    #[error("用户 {user_id} 已绑定 {provider} 身份")]
    ProviderAlreadyLinked { provider: String, user_id: i32 },

    /// 用户已停用
    #[error("用户已停用: {user_id}")]
    AccountInactive { user_id: i32 },

    /// 资源未找到
    #[error("资源未找到: {resource_type} {identifier}")]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    /// 系统内部错误
    #[error("内部错误: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 附加上下文的错误
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<AuthError>,
    },
}

impl AuthError {
    /// 将错误转换为HTTP状态码和错误代码
    #[must_use]
    pub fn to_http_response_parts(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Config { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            Self::ProviderNotConfigured { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "PROVIDER_NOT_CONFIGURED")
            }
            Self::UnknownProvider { .. } => (StatusCode::NOT_FOUND, "UNKNOWN_PROVIDER"),
            Self::Csrf { .. } => (StatusCode::BAD_REQUEST, "INVALID_STATE"),
            Self::AuthorizationDenied { .. } => (StatusCode::BAD_REQUEST, "OAUTH_DENIED"),
            Self::Exchange { .. } => (StatusCode::BAD_GATEWAY, "OAUTH_EXCHANGE_FAILED"),
            Self::ProfileFetch { .. } => (StatusCode::BAD_GATEWAY, "PROFILE_FETCH_FAILED"),
            Self::Persistence { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR"),
            Self::Crypto { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "CRYPTO_ERROR"),
            Self::Token(kind) => (StatusCode::UNAUTHORIZED, kind.code()),
            Self::Unauthorized { .. } => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::ProviderAlreadyLinked { .. } => (StatusCode::CONFLICT, "PROVIDER_ALREADY_LINKED"),
            Self::AccountInactive { .. } => (StatusCode::FORBIDDEN, "ACCOUNT_INACTIVE"),
            Self::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::Context { source, .. } => source.to_http_response_parts(),
        }
    }

    /// 返回给客户端的固定说明文字
    ///
    /// 不包含上游响应体或内部错误链。
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Config { .. } => "Service is misconfigured",
            Self::ProviderNotConfigured { .. } => "This identity provider is not configured",
            Self::UnknownProvider { .. } => "Unknown identity provider",
            Self::Csrf { .. } => "Invalid or expired OAuth state",
            Self::AuthorizationDenied { .. } => "Authorization was denied by the identity provider",
            Self::Exchange { .. } => "Failed to exchange authorization code",
            Self::ProfileFetch { .. } => "Failed to fetch profile from identity provider",
            Self::Persistence { .. } => "Failed to store identity",
            Self::Crypto { .. } => "Failed to process credentials",
            Self::Token(TokenError::Malformed) => "Token is malformed",
            Self::Token(TokenError::SignatureInvalid) => "Token is invalid",
            Self::Token(TokenError::Expired) => "Token has expired",
            Self::Unauthorized { .. } => "Authentication required",
            Self::ProviderAlreadyLinked { .. } => {
                "This account is already linked to another identity at this provider"
            }
            Self::AccountInactive { .. } => "Account is deactivated",
            Self::NotFound { .. } => "Resource not found",
            Self::Internal { .. } => "Internal server error",
            Self::Context { source, .. } => source.public_message(),
        }
    }

    /// 错误分类：4xx 归为客户端，其余归为服务端
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        if self.to_http_response_parts().0.is_client_error() {
            ErrorCategory::Client
        } else {
            ErrorCategory::Server
        }
    }

    /// 去掉上下文包装后的原始错误
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// 创建配置错误
    pub fn config<T: Into<String>>(message: T) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的配置错误
    pub fn config_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建 CSRF 错误
    pub fn csrf<T: Into<String>>(message: T) -> Self {
        Self::Csrf {
            message: message.into(),
        }
    }

    /// 创建授权码交换错误
    pub fn exchange<P: Into<String>, T: Into<String>>(provider: P, message: T) -> Self {
        Self::Exchange {
            provider: provider.into(),
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的授权码交换错误
    pub fn exchange_with_source<P: Into<String>, T: Into<String>, E: Into<anyhow::Error>>(
        provider: P,
        message: T,
        source: E,
    ) -> Self {
        Self::Exchange {
            provider: provider.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建用户资料获取错误
    pub fn profile_fetch<P: Into<String>, T: Into<String>>(provider: P, message: T) -> Self {
        Self::ProfileFetch {
            provider: provider.into(),
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的用户资料获取错误
    pub fn profile_fetch_with_source<P: Into<String>, T: Into<String>, E: Into<anyhow::Error>>(
        provider: P,
        message: T,
        source: E,
    ) -> Self {
        Self::ProfileFetch {
            provider: provider.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建持久化错误
    pub fn persistence<T: Into<String>>(message: T) -> Self {
        Self::Persistence {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的持久化错误
    pub fn persistence_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Persistence {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建加解密错误
    pub fn crypto<T: Into<String>>(message: T) -> Self {
        Self::Crypto {
            message: message.into(),
            source: None,
        }
    }

    /// 创建未认证错误
    pub fn unauthorized<T: Into<String>>(message: T) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// 创建资源未找到错误
    pub fn not_found<R: Into<String>, I: Into<String>>(resource_type: R, identifier: I) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            identifier: identifier.into(),
        }
    }

    /// 创建内部错误
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的内部错误
    pub fn internal_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

impl From<std::io::Error> for AuthError {
    fn from(err: std::io::Error) -> Self {
        Self::internal_with_source("IO操作失败", err)
    }
}

impl From<toml::de::Error> for AuthError {
    fn from(err: toml::de::Error) -> Self {
        Self::config_with_source("TOML解析失败", err)
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal_with_source("JSON序列化失败", err)
    }
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::persistence_with_source("数据库操作失败", err)
    }
}

impl From<redis::RedisError> for AuthError {
    fn from(err: redis::RedisError) -> Self {
        Self::internal_with_source("状态存储不可用", err)
    }
}
