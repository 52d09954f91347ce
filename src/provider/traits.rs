use async_trait::async_trait;
use oauth2::AuthType;

use crate::error::Result;

use super::types::{CanonicalProfile, ExchangeOutcome, ProviderKind};

/// 某个 provider 实际使用的端点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub profile_url: String,
    /// 邮箱列表端点（仅 GitHub）
    pub emails_url: Option<String>,
}

/// 单个身份提供方的差异化行为
///
/// 授权 URL 和授权码交换由 registry 统一完成，策略只描述默认值和用户资料的解析方式。
#[async_trait]
pub trait ProviderStrategy: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> ProviderKind;

    fn default_endpoints(&self) -> ProviderEndpoints;

    fn default_scopes(&self) -> &'static [&'static str];

    /// 授权 URL 上的额外参数
    fn extra_authorize_params(&self) -> &'static [(&'static str, &'static str)] {
        &[]
    }

    /// client 凭证的传递方式
    fn auth_type(&self) -> AuthType {
        AuthType::BasicAuth
    }

    /// 使用 provider 的访问令牌获取用户资料并转换为统一格式
    async fn fetch_profile(
        &self,
        http: &reqwest::Client,
        endpoints: &ProviderEndpoints,
        access_token: &str,
    ) -> Result<CanonicalProfile>;
}

/// 联邦登录所需的 provider 能力
///
/// `ProviderRegistry` 是生产实现，测试中可以替换为固定结果。
#[async_trait]
pub trait IdentityExchange: Send + Sync {
    /// provider 是否配置了 client id
    fn is_configured(&self, kind: ProviderKind) -> bool;

    /// 构建授权跳转 URL
    fn authorize_url(&self, kind: ProviderKind, state: &str) -> Result<String>;

    /// 用授权码换取 provider 令牌和用户资料
    async fn exchange_code(&self, kind: ProviderKind, code: &str) -> Result<ExchangeOutcome>;
}
