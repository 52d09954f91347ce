//! # 认证类型定义
//!
//! 令牌载荷、令牌对以及令牌中携带的用户身份

use serde::{Deserialize, Serialize};

/// 令牌用途
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

/// 签发令牌所需的用户身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalIdentity {
    /// 用户ID
    pub id: i32,
    /// 邮箱
    pub email: String,
    /// 角色
    pub role: String,
}

impl From<&entity::users::Model> for PrincipalIdentity {
    fn from(user: &entity::users::Model) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role.clone(),
        }
    }
}

/// JWT 载荷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// 用户ID
    pub sub: String,
    /// 邮箱
    pub email: String,
    /// 角色
    pub role: String,
    /// 签发时间
    pub iat: i64,
    /// 过期时间
    pub exp: i64,
    /// 签发者
    pub iss: String,
    /// JWT ID
    pub jti: String,
    /// 令牌用途
    pub typ: TokenKind,
}

impl TokenClaims {
    /// 解析 `sub` 中的用户ID
    #[must_use]
    pub fn user_id(&self) -> Option<i32> {
        self.sub.parse().ok()
    }
}

/// 令牌对
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// 访问令牌
    pub access_token: String,
    /// 刷新令牌
    pub refresh_token: String,
    /// 令牌类型，固定为 `Bearer`
    pub token_type: String,
    /// 访问令牌有效期（秒）
    pub expires_in: i64,
}

/// `/auth/me` 返回的用户信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalProfile {
    pub id: i32,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub is_active: bool,
    /// 已绑定的 provider 标识
    pub linked_providers: Vec<String>,
}

/// 通过认证中间件注入请求扩展的当前用户
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedPrincipal {
    pub user_id: i32,
    pub claims: TokenClaims,
}
