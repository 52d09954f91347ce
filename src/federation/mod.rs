//! # 联邦登录模块
//!
//! - `coordinator`：授权跳转与回调处理的编排
//! - `store`：用户与第三方身份绑定的持久化

mod coordinator;
mod store;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::types::TokenPair;
use crate::provider::ProviderKind;

pub use coordinator::FederationCoordinator;
pub use store::{IdentityStore, SeaOrmIdentityStore};

/// 回调解析出的用户来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionOutcome {
    /// 已绑定的外部身份再次登录
    Login,
    /// 通过邮箱匹配到已有用户，新增绑定
    Linked,
    /// 新建用户
    Created,
}

/// 一次持久化完成后的用户与绑定记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub user: entity::users::Model,
    pub link: entity::provider_links::Model,
    pub outcome: ResolutionOutcome,
}

/// 已加密的 provider 凭证
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedCredentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// 授权跳转信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub provider: ProviderKind,
    pub authorize_url: String,
    pub state: String,
}

/// 回调处理结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackResult {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user_id: i32,
    pub provider: ProviderKind,
    pub outcome: ResolutionOutcome,
}
