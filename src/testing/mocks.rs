//! # Mock 对象
//!
//! 身份存储的 mockall mock、固定结果的 provider 交换实现，以及模拟 provider 端点的 wiremock 服务

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use mockall::mock;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use entity::{provider_links, users};

use crate::config::ProviderClientConfig;
use crate::error::{AuthError, Result};
use crate::federation::{IdentityStore, ResolvedIdentity, SealedCredentials};
use crate::provider::{
    CanonicalProfile, ExchangeOutcome, IdentityExchange, ProviderKind, ProviderTokens,
};

use super::fixtures::sample_tokens;

mock! {
    pub IdentityStore {}

    #[async_trait]
    impl IdentityStore for IdentityStore {
        async fn resolve_and_persist(
            &self,
            profile: &CanonicalProfile,
            credentials: &SealedCredentials,
        ) -> Result<ResolvedIdentity>;
        async fn find_user(&self, user_id: i32) -> Result<Option<users::Model>>;
        async fn find_link(
            &self,
            user_id: i32,
            provider: ProviderKind,
        ) -> Result<Option<provider_links::Model>>;
        async fn linked_providers(&self, user_id: i32) -> Result<Vec<String>>;
    }
}

/// 返回固定结果的 provider 交换实现
#[derive(Debug, Clone)]
pub struct FakeExchange {
    configured: bool,
    profile: Option<CanonicalProfile>,
    tokens: ProviderTokens,
    calls: Arc<AtomicUsize>,
}

impl FakeExchange {
    /// 交换成功并返回指定资料
    #[must_use]
    pub fn with_profile(profile: CanonicalProfile) -> Self {
        Self {
            configured: true,
            profile: Some(profile),
            tokens: sample_tokens(Some("provider-refresh-token")),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 已配置但交换总是失败
    #[must_use]
    pub fn failing() -> Self {
        Self {
            profile: None,
            ..Self::with_profile(super::fixtures::sample_profile(
                ProviderKind::Google,
                "unused",
                "unused@example.com",
            ))
        }
    }

    /// 未配置任何 provider
    #[must_use]
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::failing()
        }
    }

    /// 授权码交换被调用的次数
    #[must_use]
    pub fn exchange_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl IdentityExchange for FakeExchange {
    fn is_configured(&self, _kind: ProviderKind) -> bool {
        self.configured
    }

    fn authorize_url(&self, kind: ProviderKind, state: &str) -> Result<String> {
        Ok(format!("https://{kind}.provider.test/authorize?state={state}"))
    }

    async fn exchange_code(&self, kind: ProviderKind, _code: &str) -> Result<ExchangeOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let profile = self
            .profile
            .clone()
            .ok_or_else(|| AuthError::exchange(kind.as_str(), "invalid_grant"))?;
        Ok(ExchangeOutcome {
            tokens: self.tokens.clone(),
            profile,
        })
    }
}

/// 模拟 provider 授权、令牌和资料端点的服务器
pub struct ProviderMockServer {
    server: MockServer,
}

impl ProviderMockServer {
    /// 启动模拟服务器
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// 服务器地址
    #[must_use]
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// 指向模拟服务器的 provider 客户端配置
    #[must_use]
    pub fn provider_config(&self, kind: ProviderKind) -> ProviderClientConfig {
        let base = format!("{}/{kind}", self.server.uri());
        ProviderClientConfig {
            client_id: format!("{kind}-client"),
            client_secret: "client-secret".to_string(),
            redirect_url: String::new(),
            scopes: Vec::new(),
            auth_url: Some(format!("{base}/authorize")),
            token_url: Some(format!("{base}/token")),
            profile_url: Some(format!("{base}/profile")),
            emails_url: Some(format!("{base}/emails")),
        }
    }

    /// 令牌端点返回成功
    pub async fn mock_token(&self, kind: ProviderKind, access_token: &str, refresh_token: Option<&str>) {
        let mut body = json!({
            "access_token": access_token,
            "token_type": "bearer",
            "expires_in": 3600,
        });
        if let Some(refresh_token) = refresh_token {
            body["refresh_token"] = json!(refresh_token);
        }

        Mock::given(method("POST"))
            .and(path(format!("/{kind}/token")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// 令牌端点返回 OAuth 错误
    pub async fn mock_token_error(&self, kind: ProviderKind, status: u16) {
        Mock::given(method("POST"))
            .and(path(format!("/{kind}/token")))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Bad Request"
            })))
            .mount(&self.server)
            .await;
    }

    /// 资料端点返回指定 JSON
    pub async fn mock_profile(&self, kind: ProviderKind, status: u16, body: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/{kind}/profile")))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// GitHub 邮箱列表端点返回指定 JSON
    pub async fn mock_emails(&self, body: Value) {
        Mock::given(method("GET"))
            .and(path("/github/emails"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// 已收到的请求
    pub async fn received_requests(&self) -> Vec<wiremock::Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}
