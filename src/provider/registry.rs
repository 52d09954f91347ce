use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RedirectUrl, RequestTokenError, Scope, TokenResponse, TokenUrl,
};

use crate::config::{OAuthConfig, ProviderClientConfig};
use crate::error::{AuthError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, linfo};

use super::provider_strategy::{GitHubProvider, GoogleProvider, LinkedInProvider};
use super::traits::{IdentityExchange, ProviderEndpoints, ProviderStrategy};
use super::types::{ExchangeOutcome, ProviderKind, ProviderTokens};

/// 设置了授权端点和令牌端点的 oauth2 客户端
type ConfiguredClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

static PROVIDER_STRATEGIES: LazyLock<HashMap<ProviderKind, Arc<dyn ProviderStrategy>>> =
    LazyLock::new(|| {
        let mut map: HashMap<ProviderKind, Arc<dyn ProviderStrategy>> = HashMap::new();
        map.insert(
            ProviderKind::Google,
            Arc::new(GoogleProvider) as Arc<dyn ProviderStrategy>,
        );
        map.insert(
            ProviderKind::LinkedIn,
            Arc::new(LinkedInProvider) as Arc<dyn ProviderStrategy>,
        );
        map.insert(
            ProviderKind::GitHub,
            Arc::new(GitHubProvider) as Arc<dyn ProviderStrategy>,
        );
        map
    });

pub fn resolve_strategy(kind: ProviderKind) -> Result<Arc<dyn ProviderStrategy>> {
    PROVIDER_STRATEGIES
        .get(&kind)
        .cloned()
        .ok_or_else(|| AuthError::internal(format!("no strategy registered for {kind}")))
}

/// 已配置的 provider：客户端、端点与 scope
#[derive(Debug)]
struct ConfiguredProvider {
    strategy: Arc<dyn ProviderStrategy>,
    client: ConfiguredClient,
    endpoints: ProviderEndpoints,
    scopes: Vec<String>,
}

impl ConfiguredProvider {
    fn build(
        strategy: Arc<dyn ProviderStrategy>,
        config: &ProviderClientConfig,
        redirect_url: String,
    ) -> Result<Self> {
        let kind = strategy.kind();
        let defaults = strategy.default_endpoints();
        let endpoints = ProviderEndpoints {
            auth_url: config.auth_url.clone().unwrap_or(defaults.auth_url),
            token_url: config.token_url.clone().unwrap_or(defaults.token_url),
            profile_url: config.profile_url.clone().unwrap_or(defaults.profile_url),
            emails_url: config.emails_url.clone().or(defaults.emails_url),
        };

        let auth_url = AuthUrl::new(endpoints.auth_url.clone())
            .map_err(|e| AuthError::config_with_source(format!("{kind} 授权端点无效"), e))?;
        let token_url = TokenUrl::new(endpoints.token_url.clone())
            .map_err(|e| AuthError::config_with_source(format!("{kind} 令牌端点无效"), e))?;
        let redirect_url = RedirectUrl::new(redirect_url)
            .map_err(|e| AuthError::config_with_source(format!("{kind} 回调地址无效"), e))?;

        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url)
            .set_auth_type(strategy.auth_type());

        let scopes = if config.scopes.is_empty() {
            strategy
                .default_scopes()
                .iter()
                .map(|scope| (*scope).to_string())
                .collect()
        } else {
            config.scopes.clone()
        };

        Ok(Self {
            strategy,
            client,
            endpoints,
            scopes,
        })
    }
}

/// provider 注册表
///
/// 启动时根据配置为每个已配置的 provider 构建 oauth2 客户端，
/// 并共享一个带超时、不跟随重定向的 HTTP 客户端。
#[derive(Debug)]
pub struct ProviderRegistry {
    http: reqwest::Client,
    providers: HashMap<ProviderKind, ConfiguredProvider>,
}

impl ProviderRegistry {
    pub fn from_config(config: &OAuthConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AuthError::config_with_source("HTTP 客户端初始化失败", e))?;

        let mut providers = HashMap::new();
        for kind in ProviderKind::ALL {
            let client_config = config.provider(kind);
            if !client_config.is_configured() {
                linfo!(
                    "system",
                    LogStage::Startup,
                    LogComponent::Provider,
                    "provider_disabled",
                    "身份提供方未配置 client id，已禁用",
                    provider = %kind
                );
                continue;
            }

            let provider = ConfiguredProvider::build(
                resolve_strategy(kind)?,
                client_config,
                config.redirect_url(kind),
            )?;
            linfo!(
                "system",
                LogStage::Startup,
                LogComponent::Provider,
                "provider_enabled",
                "身份提供方已启用",
                provider = %kind,
                token_url = %provider.endpoints.token_url
            );
            providers.insert(kind, provider);
        }

        Ok(Self { http, providers })
    }

    /// 已启用的 provider 列表
    #[must_use]
    pub fn configured_kinds(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|kind| self.providers.contains_key(kind))
            .collect()
    }

    fn configured(&self, kind: ProviderKind) -> Result<&ConfiguredProvider> {
        self.providers
            .get(&kind)
            .ok_or_else(|| AuthError::ProviderNotConfigured {
                provider: kind.as_str().to_string(),
            })
    }
}

#[async_trait]
impl IdentityExchange for ProviderRegistry {
    fn is_configured(&self, kind: ProviderKind) -> bool {
        self.providers.contains_key(&kind)
    }

    fn authorize_url(&self, kind: ProviderKind, state: &str) -> Result<String> {
        let provider = self.configured(kind)?;

        let mut request = provider
            .client
            .authorize_url(|| CsrfToken::new(state.to_string()));
        for scope in &provider.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }
        for (name, value) in provider.strategy.extra_authorize_params() {
            request = request.add_extra_param(*name, *value);
        }

        let (url, _state) = request.url();
        Ok(url.to_string())
    }

    async fn exchange_code(&self, kind: ProviderKind, code: &str) -> Result<ExchangeOutcome> {
        let provider = self.configured(kind)?;

        let response = provider
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|err| match err {
                RequestTokenError::ServerResponse(body) => AuthError::exchange(
                    kind.as_str(),
                    format!("provider rejected authorization code: {:?}", body.error()),
                ),
                other => AuthError::exchange_with_source(
                    kind.as_str(),
                    "token request failed",
                    anyhow::anyhow!(other.to_string()),
                ),
            })?;

        let expires_at = response
            .expires_in()
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .map(|ttl| Utc::now() + ttl);
        let tokens = ProviderTokens {
            access_token: response.access_token().secret().clone(),
            refresh_token: response.refresh_token().map(|t| t.secret().clone()),
            expires_at,
        };

        ldebug!(
            "system",
            LogStage::ExternalApi,
            LogComponent::OAuth,
            "code_exchanged",
            "授权码交换成功",
            provider = %kind,
            has_refresh_token = tokens.refresh_token.is_some()
        );

        let profile = provider
            .strategy
            .fetch_profile(&self.http, &provider.endpoints, &tokens.access_token)
            .await?;

        Ok(ExchangeOutcome { tokens, profile })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ProviderMockServer;
    use serde_json::json;

    fn config_with(kind: ProviderKind) -> OAuthConfig {
        let mut config = OAuthConfig::default();
        let provider = config.provider_mut(kind);
        provider.client_id = format!("{kind}-client");
        provider.client_secret = "secret".to_string();
        config
    }

    fn query_value(url: &str, key: &str) -> Option<String> {
        url::Url::parse(url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn built_in_strategies_resolve() {
        for kind in ProviderKind::ALL {
            assert_eq!(resolve_strategy(kind).unwrap().kind(), kind);
        }
    }

    #[test]
    fn unconfigured_provider_is_rejected() {
        let registry = ProviderRegistry::from_config(&OAuthConfig::default()).unwrap();
        assert!(registry.configured_kinds().is_empty());
        assert!(!registry.is_configured(ProviderKind::Google));

        let err = registry
            .authorize_url(ProviderKind::Google, "state")
            .unwrap_err();
        assert!(matches!(err, AuthError::ProviderNotConfigured { .. }));
    }

    #[test]
    fn google_url_requests_offline_access() {
        let registry = ProviderRegistry::from_config(&config_with(ProviderKind::Google)).unwrap();
        let url = registry
            .authorize_url(ProviderKind::Google, "abc123")
            .unwrap();

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/auth?"));
        assert_eq!(query_value(&url, "response_type").as_deref(), Some("code"));
        assert_eq!(query_value(&url, "client_id").as_deref(), Some("google-client"));
        assert_eq!(query_value(&url, "state").as_deref(), Some("abc123"));
        assert_eq!(
            query_value(&url, "redirect_uri").as_deref(),
            Some("http://localhost:8080/auth/oauth/google/callback")
        );
        assert_eq!(
            query_value(&url, "scope").as_deref(),
            Some("openid profile email")
        );
        assert_eq!(query_value(&url, "access_type").as_deref(), Some("offline"));
        assert_eq!(query_value(&url, "prompt").as_deref(), Some("consent"));
    }

    #[test]
    fn github_url_uses_configured_scopes() {
        let mut config = config_with(ProviderKind::GitHub);
        config.github.scopes = vec!["user:email".to_string()];
        let registry = ProviderRegistry::from_config(&config).unwrap();
        let url = registry
            .authorize_url(ProviderKind::GitHub, "s")
            .unwrap();

        assert!(url.starts_with("https://github.com/login/oauth/authorize?"));
        assert_eq!(query_value(&url, "scope").as_deref(), Some("user:email"));
        assert_eq!(query_value(&url, "access_type"), None);
    }

    async fn mocked_registry(server: &ProviderMockServer, kind: ProviderKind) -> ProviderRegistry {
        let mut config = OAuthConfig::default();
        *config.provider_mut(kind) = server.provider_config(kind);
        ProviderRegistry::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn google_exchange_yields_canonical_profile() {
        let server = ProviderMockServer::start().await;
        server
            .mock_token(ProviderKind::Google, "ya29.access", Some("1//refresh"))
            .await;
        server
            .mock_profile(
                ProviderKind::Google,
                200,
                json!({
                    "id": "g-42",
                    "email": "A@X.com",
                    "verified_email": true,
                    "name": "Ada",
                    "picture": "https://lh3.example.com/a.png"
                }),
            )
            .await;

        let registry = mocked_registry(&server, ProviderKind::Google).await;
        let outcome = registry
            .exchange_code(ProviderKind::Google, "auth-code")
            .await
            .unwrap();

        assert_eq!(outcome.tokens.access_token, "ya29.access");
        assert_eq!(outcome.tokens.refresh_token.as_deref(), Some("1//refresh"));
        assert!(outcome.tokens.expires_at.unwrap() > Utc::now());
        assert_eq!(outcome.profile.external_id, "g-42");
        assert_eq!(outcome.profile.email, "a@x.com");
        assert_eq!(outcome.profile.display_name.as_deref(), Some("Ada"));
        assert_eq!(outcome.profile.raw_attributes["verified_email"], json!(true));

        let requests = server.received_requests().await;
        let token_request = requests
            .iter()
            .find(|r| r.url.path() == "/google/token")
            .unwrap();
        assert!(token_request.headers.get("authorization").is_some());
        let body = String::from_utf8_lossy(&token_request.body);
        assert!(body.contains("grant_type=authorization_code"));
        assert!(body.contains("code=auth-code"));
    }

    #[tokio::test]
    async fn linkedin_sends_credentials_in_body() {
        let server = ProviderMockServer::start().await;
        server
            .mock_token(ProviderKind::LinkedIn, "li-access", None)
            .await;
        server
            .mock_profile(
                ProviderKind::LinkedIn,
                200,
                json!({ "sub": "li-7", "email": "b@x.com", "name": "Bea" }),
            )
            .await;

        let registry = mocked_registry(&server, ProviderKind::LinkedIn).await;
        let outcome = registry
            .exchange_code(ProviderKind::LinkedIn, "code")
            .await
            .unwrap();
        assert_eq!(outcome.profile.external_id, "li-7");
        assert!(outcome.tokens.refresh_token.is_none());

        let requests = server.received_requests().await;
        let token_request = requests
            .iter()
            .find(|r| r.url.path() == "/linkedin/token")
            .unwrap();
        assert!(token_request.headers.get("authorization").is_none());
        let body = String::from_utf8_lossy(&token_request.body);
        assert!(body.contains("client_id=linkedin-client"));
        assert!(body.contains("client_secret=client-secret"));
    }

    #[tokio::test]
    async fn github_falls_back_to_primary_verified_email() {
        let server = ProviderMockServer::start().await;
        server.mock_token(ProviderKind::GitHub, "gho_x", None).await;
        server
            .mock_profile(
                ProviderKind::GitHub,
                200,
                json!({ "id": 1001, "login": "octo", "name": null, "email": null }),
            )
            .await;
        server
            .mock_emails(json!([
                { "email": "old@x.com", "primary": false, "verified": true },
                { "email": "Octo@X.com", "primary": true, "verified": true }
            ]))
            .await;

        let registry = mocked_registry(&server, ProviderKind::GitHub).await;
        let outcome = registry
            .exchange_code(ProviderKind::GitHub, "code")
            .await
            .unwrap();
        assert_eq!(outcome.profile.external_id, "1001");
        assert_eq!(outcome.profile.email, "octo@x.com");
        assert_eq!(outcome.profile.display_name.as_deref(), Some("octo"));

        let requests = server.received_requests().await;
        let profile_request = requests
            .iter()
            .find(|r| r.url.path() == "/github/profile")
            .unwrap();
        assert_eq!(
            profile_request.headers.get("accept").unwrap(),
            "application/vnd.github+json"
        );
        assert!(profile_request.headers.get("user-agent").is_some());
    }

    #[tokio::test]
    async fn github_without_primary_verified_email_fails() {
        let server = ProviderMockServer::start().await;
        server.mock_token(ProviderKind::GitHub, "gho_x", None).await;
        server
            .mock_profile(
                ProviderKind::GitHub,
                200,
                json!({ "id": 1001, "login": "octo", "email": null }),
            )
            .await;
        server
            .mock_emails(json!([
                { "email": "octo@x.com", "primary": true, "verified": false }
            ]))
            .await;

        let registry = mocked_registry(&server, ProviderKind::GitHub).await;
        let err = registry
            .exchange_code(ProviderKind::GitHub, "code")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ProfileFetch { .. }));
    }

    #[tokio::test]
    async fn token_endpoint_error_is_exchange_failure() {
        let server = ProviderMockServer::start().await;
        server.mock_token_error(ProviderKind::Google, 400).await;

        let registry = mocked_registry(&server, ProviderKind::Google).await;
        let err = registry
            .exchange_code(ProviderKind::Google, "expired-code")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Exchange { .. }));
    }

    #[tokio::test]
    async fn profile_endpoint_error_is_fetch_failure() {
        let server = ProviderMockServer::start().await;
        server.mock_token(ProviderKind::Google, "ya29", None).await;
        server
            .mock_profile(ProviderKind::Google, 401, json!({ "error": "invalid_token" }))
            .await;

        let registry = mocked_registry(&server, ProviderKind::Google).await;
        let err = registry
            .exchange_code(ProviderKind::Google, "code")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ProfileFetch { .. }));
    }

    #[test]
    fn invalid_endpoint_is_a_config_error() {
        let mut config = config_with(ProviderKind::LinkedIn);
        config.linkedin.token_url = Some("not a url".to_string());
        let err = ProviderRegistry::from_config(&config).unwrap_err();
        assert!(matches!(err, AuthError::Config { .. }));
    }
}
