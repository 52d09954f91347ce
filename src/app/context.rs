//! 应用上下文（DI 容器）
//!
//! 统一持有跨模块共享的服务实例，便于在测试中注入替身实现。

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::auth::state_store::{StateStore, build_state_store};
use crate::auth::{CredentialCipher, TokenIssuer, TokenService};
use crate::config::AppConfig;
use crate::database::{init_database, run_migrations};
use crate::error::Result;
use crate::federation::{FederationCoordinator, IdentityStore, SeaOrmIdentityStore};
use crate::{linfo, lwarn};
use crate::logging::{LogComponent, LogStage};
use crate::provider::{IdentityExchange, ProviderKind, ProviderRegistry};

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub token_issuer: Arc<TokenIssuer>,
    pub token_service: Arc<TokenService>,
    pub coordinator: Arc<FederationCoordinator>,
}

impl AppContext {
    /// 按配置装配全部服务：数据库与迁移、令牌签发器、凭证加密器、state 存储、provider 注册表
    ///
    /// 任何一步失败都会中止启动。
    pub async fn build(config: Arc<AppConfig>) -> Result<Self> {
        let db = init_database(&config.database).await?;
        run_migrations(&db).await?;

        let state_store = build_state_store(&config.state_store).await?;
        let registry = ProviderRegistry::from_config(&config.oauth)?;
        let providers: Vec<&str> = registry
            .configured_kinds()
            .iter()
            .map(ProviderKind::as_str)
            .collect();
        if providers.is_empty() {
            lwarn!(
                "system",
                LogStage::Startup,
                LogComponent::Provider,
                "no_providers",
                "没有启用任何身份提供方，OAuth 登录将返回 503"
            );
        }
        let exchange: Arc<dyn IdentityExchange> = Arc::new(registry);

        let context = Self::from_parts(config, db, exchange, state_store)?;

        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::Main,
            "context_ready",
            "应用上下文初始化完成",
            providers = ?providers
        );
        Ok(context)
    }

    /// 使用已准备好的数据库、provider 交换实现和 state 存储装配上下文
    pub fn from_parts(
        config: Arc<AppConfig>,
        db: DatabaseConnection,
        exchange: Arc<dyn IdentityExchange>,
        state_store: Arc<dyn StateStore>,
    ) -> Result<Self> {
        let token_issuer = Arc::new(TokenIssuer::new(&config.jwt)?);
        let cipher = Arc::new(CredentialCipher::from_config(&config.oauth, &config.jwt)?);
        let identity_store: Arc<dyn IdentityStore> =
            Arc::new(SeaOrmIdentityStore::new(db.clone()));

        let coordinator = Arc::new(FederationCoordinator::new(
            exchange,
            state_store,
            Arc::clone(&identity_store),
            cipher,
            Arc::clone(&token_issuer),
        ));
        let token_service = Arc::new(TokenService::new(
            Arc::clone(&token_issuer),
            identity_store,
        ));

        Ok(Self {
            config,
            db,
            token_issuer,
            token_service,
            coordinator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_config;

    #[tokio::test]
    async fn test_build_from_memory_config() {
        let context = AppContext::build(Arc::new(test_config())).await.unwrap();
        assert_eq!(context.token_issuer.access_ttl_secs(), 3600);
        assert_eq!(context.config.server.port, 8080);
    }

    #[tokio::test]
    async fn test_build_rejects_bad_secret() {
        let mut config = test_config();
        config.jwt.secret = "short".to_string();
        assert!(AppContext::build(Arc::new(config)).await.is_err());
    }
}
