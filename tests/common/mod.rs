//! 集成测试公共工具
//!
//! 内存 SQLite + wiremock 模拟的 provider 端点 + 完整的 axum 路由

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, EntityTrait, PaginatorTrait, Set};
use sea_orm_migration::MigratorTrait;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use entity::{ProviderLinks, Users, users};
use federated_auth::api::create_router;
use federated_auth::app::AppContext;
use federated_auth::auth::{InMemoryStateStore, PrincipalIdentity, StateStore};
use federated_auth::config::AppConfig;
use federated_auth::provider::{IdentityExchange, ProviderKind, ProviderRegistry};

pub const TEST_JWT_SECRET: &str = "integration-test-jwt-secret-0123456789abcdef";
pub const TEST_ENCRYPTION_SECRET: &str = "integration-test-encryption-secret-0123456789";

/// 测试应用
pub struct TestApp {
    pub router: Router,
    pub context: Arc<AppContext>,
    pub provider_server: MockServer,
}

/// 一次 HTTP 调用的结果
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }

    pub fn set_cookie(&self) -> Option<&str> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
    }
}

/// 指向模拟服务器的配置，三个 provider 全部启用
fn test_config(provider_base: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.jwt.secret = TEST_JWT_SECRET.to_string();
    config.oauth.encryption_key = Some(TEST_ENCRYPTION_SECRET.to_string());
    config.database.url = "sqlite::memory:".to_string();

    for kind in ProviderKind::ALL {
        let provider = config.oauth.provider_mut(kind);
        provider.client_id = format!("{kind}-client");
        provider.client_secret = "client-secret".to_string();
        provider.auth_url = Some(format!("{provider_base}/{kind}/authorize"));
        provider.token_url = Some(format!("{provider_base}/{kind}/token"));
        provider.profile_url = Some(format!("{provider_base}/{kind}/profile"));
        provider.emails_url = Some(format!("{provider_base}/{kind}/emails"));
    }
    config
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// 启动前可调整配置
    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let provider_server = MockServer::start().await;
        let mut config = test_config(&provider_server.uri());
        configure(&mut config);

        let db: DatabaseConnection = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();

        let exchange: Arc<dyn IdentityExchange> =
            Arc::new(ProviderRegistry::from_config(&config.oauth).unwrap());
        let state_store: Arc<dyn StateStore> =
            Arc::new(InMemoryStateStore::new(Duration::from_secs(600)));

        let context = Arc::new(
            AppContext::from_parts(Arc::new(config), db, exchange, state_store).unwrap(),
        );
        let router = create_router(Arc::clone(&context));

        Self {
            router,
            context,
            provider_server,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    /// `GET /auth/oauth/{provider}`，返回 (state, 响应)
    pub async fn begin(&self, provider: &str) -> (String, TestResponse) {
        let response = self.get(&format!("/auth/oauth/{provider}")).await;
        assert_eq!(response.status, StatusCode::TEMPORARY_REDIRECT);

        let location = response
            .headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .unwrap();
        let state = url::Url::parse(location)
            .unwrap()
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .unwrap();
        (state, response)
    }

    /// 携带 cookie 调用回调
    pub async fn callback(
        &self,
        provider: &str,
        query: &str,
        cookie_state: Option<&str>,
    ) -> TestResponse {
        let mut request = Request::get(format!("/auth/oauth/{provider}/callback?{query}"));
        if let Some(cookie_state) = cookie_state {
            request = request.header(header::COOKIE, format!("oauth_state={cookie_state}"));
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    /// 完整走一遍授权跳转与回调
    pub async fn login(&self, provider: &str, code: &str) -> TestResponse {
        let (state, _) = self.begin(provider).await;
        self.callback(provider, &format!("code={code}&state={state}"), Some(&state))
            .await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> TestResponse {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn get_with_bearer(&self, uri: &str, token: &str) -> TestResponse {
        self.send(
            Request::get(uri)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// 令牌端点返回成功
    pub async fn mock_token(&self, kind: &str, access_token: &str, refresh_token: Option<&str>) {
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
            .mount(&self.provider_server)
            .await;
    }

    /// 令牌端点返回 OAuth 错误
    pub async fn mock_token_error(&self, kind: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/{kind}/token")))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Code was already redeemed"
            })))
            .mount(&self.provider_server)
            .await;
    }

    pub async fn mock_json(&self, route: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(route.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.provider_server)
            .await;
    }

    /// Google 令牌与资料端点
    pub async fn mock_google(
        &self,
        external_id: &str,
        email: &str,
        access_token: &str,
        refresh_token: Option<&str>,
    ) {
        self.mock_token("google", access_token, refresh_token).await;
        self.mock_json(
            "/google/profile",
            json!({
                "id": external_id,
                "email": email,
                "name": "Alice Example",
                "picture": "https://example.com/a.png"
            }),
        )
        .await;
    }

    /// 清空已挂载的 mock 与请求记录
    pub async fn reset_provider(&self) {
        self.provider_server.reset().await;
    }

    /// 令牌端点收到的请求数
    pub async fn token_requests(&self, kind: &str) -> usize {
        let token_path = format!("/{kind}/token");
        self.provider_server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == token_path)
            .count()
    }

    pub async fn user_count(&self) -> u64 {
        Users::find().count(&self.context.db).await.unwrap()
    }

    pub async fn link_count(&self) -> u64 {
        ProviderLinks::find().count(&self.context.db).await.unwrap()
    }

    /// 直接写入一个用户
    pub async fn insert_user(&self, email: &str, is_active: bool) -> users::Model {
        let now = chrono::Utc::now().naive_utc();
        users::ActiveModel {
            email: Set(email.to_string()),
            password_hash: Set(None),
            full_name: Set("Seeded User".to_string()),
            role: Set("client".to_string()),
            is_active: Set(is_active),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.context.db)
        .await
        .unwrap()
    }

    /// 为用户签发一对令牌
    pub fn issue_pair(&self, user: &users::Model) -> (String, String) {
        let pair = self
            .context
            .token_issuer
            .issue_pair(&PrincipalIdentity::from(user))
            .unwrap();
        (pair.access_token, pair.refresh_token)
    }
}
