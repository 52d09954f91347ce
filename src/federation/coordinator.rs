//! # 联邦登录编排
//!
//! 回调处理顺序：校验并消费 state → 授权码交换 → 加密凭证 → 事务内解析用户并写入 → 签发令牌。
//! state 校验失败时不会发起交换，也不会写入任何数据。

use std::sync::Arc;

use super::{
    AuthorizationRequest, CallbackResult, IdentityStore, ResolvedIdentity, SealedCredentials,
};
use crate::auth::credential_cipher::CredentialCipher;
use crate::auth::jwt::TokenIssuer;
use crate::auth::state_store::StateStore;
use crate::auth::types::PrincipalIdentity;
use crate::error::{AuthError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::provider::{CanonicalProfile, IdentityExchange, ProviderKind, ProviderTokens};
use crate::{ldebug, linfo, lwarn};

/// 联邦登录协调器
pub struct FederationCoordinator {
    exchange: Arc<dyn IdentityExchange>,
    state_store: Arc<dyn StateStore>,
    identity_store: Arc<dyn IdentityStore>,
    cipher: Arc<CredentialCipher>,
    token_issuer: Arc<TokenIssuer>,
}

impl FederationCoordinator {
    #[must_use]
    pub fn new(
        exchange: Arc<dyn IdentityExchange>,
        state_store: Arc<dyn StateStore>,
        identity_store: Arc<dyn IdentityStore>,
        cipher: Arc<CredentialCipher>,
        token_issuer: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            exchange,
            state_store,
            identity_store,
            cipher,
            token_issuer,
        }
    }

    /// 生成 state 并构建授权跳转地址
    pub async fn begin_authorization(&self, provider: ProviderKind) -> Result<AuthorizationRequest> {
        if !self.exchange.is_configured(provider) {
            return Err(AuthError::ProviderNotConfigured {
                provider: provider.as_str().to_string(),
            });
        }

        let state = self.state_store.generate_state().await?;
        let authorize_url = self.exchange.authorize_url(provider, &state)?;

        ldebug!(
            "system",
            LogStage::Authentication,
            LogComponent::Federation,
            "begin_authorization",
            "生成授权跳转地址",
            provider = %provider
        );

        Ok(AuthorizationRequest {
            provider,
            authorize_url,
            state,
        })
    }

    /// 处理 provider 回调
    pub async fn handle_callback(
        &self,
        provider: ProviderKind,
        code: &str,
        state: &str,
    ) -> Result<CallbackResult> {
        self.consume_state(state).await?;

        let exchanged = self.exchange.exchange_code(provider, code).await?;
        if exchanged.profile.provider != provider {
            return Err(AuthError::internal(format!(
                "{provider} 交换返回了 {} 的资料",
                exchanged.profile.provider
            )));
        }

        // 加密在事务开始前完成，失败时整个回调失败，不写入明文
        let sealed = self.seal(&exchanged.tokens)?;
        let resolved = self.persist_with_retry(&exchanged.profile, &sealed).await?;

        let tokens = self
            .token_issuer
            .issue_pair(&PrincipalIdentity::from(&resolved.user))?;

        linfo!(
            "system",
            LogStage::Authentication,
            LogComponent::Federation,
            "callback_completed",
            "联邦登录完成",
            provider = %provider,
            user_id = resolved.user.id,
            outcome = ?resolved.outcome
        );

        Ok(CallbackResult {
            tokens,
            user_id: resolved.user.id,
            provider,
            outcome: resolved.outcome,
        })
    }

    /// provider 返回 error 或缺少授权码：state 仍被消费，返回拒绝授权错误
    pub async fn abandon_authorization(
        &self,
        provider: ProviderKind,
        state: &str,
        reason: Option<String>,
    ) -> AuthError {
        self.discard_state(state).await;

        lwarn!(
            "system",
            LogStage::Authentication,
            LogComponent::Federation,
            "authorization_denied",
            "身份提供方拒绝授权",
            provider = %provider,
            reason = ?reason
        );

        AuthError::AuthorizationDenied {
            provider: provider.as_str().to_string(),
            reason,
        }
    }

    /// 消费 state 并忽略结果
    pub async fn discard_state(&self, state: &str) {
        if let Err(e) = self.state_store.validate_and_consume(state).await {
            lwarn!(
                "system",
                LogStage::Authentication,
                LogComponent::StateStore,
                "discard_state_failed",
                "丢弃 state 失败",
                error = %e
            );
        }
    }

    /// 读取并解密用户在某个 provider 上保存的凭证
    pub async fn stored_credentials(
        &self,
        user_id: i32,
        provider: ProviderKind,
    ) -> Result<Option<ProviderTokens>> {
        let Some(link) = self.identity_store.find_link(user_id, provider).await? else {
            return Ok(None);
        };

        let access_token = self.cipher.decrypt(&link.access_token)?;
        let refresh_token = link
            .refresh_token
            .as_deref()
            .map(|token| self.cipher.decrypt(token))
            .transpose()?;

        Ok(Some(ProviderTokens {
            access_token,
            refresh_token,
            expires_at: link.token_expires_at.map(|at| at.and_utc()),
        }))
    }

    async fn consume_state(&self, state: &str) -> Result<()> {
        if state.is_empty() {
            return Err(AuthError::csrf("state 缺失"));
        }
        if self.state_store.validate_and_consume(state).await? {
            Ok(())
        } else {
            Err(AuthError::csrf("state 无效、已过期或已被使用"))
        }
    }

    fn seal(&self, tokens: &ProviderTokens) -> Result<SealedCredentials> {
        Ok(SealedCredentials {
            access_token: self.cipher.encrypt(&tokens.access_token)?,
            refresh_token: tokens
                .refresh_token
                .as_deref()
                .map(|token| self.cipher.encrypt(token))
                .transpose()?,
            expires_at: tokens.expires_at,
        })
    }

    /// 持久化失败时基于同一次交换结果重试一次
    async fn persist_with_retry(
        &self,
        profile: &CanonicalProfile,
        sealed: &SealedCredentials,
    ) -> Result<ResolvedIdentity> {
        match self.identity_store.resolve_and_persist(profile, sealed).await {
            Err(e) if matches!(e.root(), AuthError::Persistence { .. }) => {
                lwarn!(
                    "system",
                    LogStage::Db,
                    LogComponent::Federation,
                    "persist_retry",
                    "身份写入失败，重试一次",
                    provider = %profile.provider,
                    error = %e
                );
                self.identity_store.resolve_and_persist(profile, sealed).await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::state_store::InMemoryStateStore;
    use crate::federation::ResolutionOutcome;
    use crate::testing::{
        FakeExchange, MockIdentityStore, init_test_env, sample_profile, test_cipher,
        test_token_issuer,
    };
    use std::time::Duration;

    fn resolved(outcome: ResolutionOutcome) -> ResolvedIdentity {
        crate::testing::sample_resolved_identity(1, "a@x.com", outcome)
    }

    fn coordinator(
        exchange: FakeExchange,
        store: MockIdentityStore,
    ) -> (FederationCoordinator, Arc<InMemoryStateStore>) {
        init_test_env();
        let states = Arc::new(InMemoryStateStore::new(Duration::from_secs(600)));
        let coordinator = FederationCoordinator::new(
            Arc::new(exchange),
            Arc::clone(&states) as Arc<dyn StateStore>,
            Arc::new(store),
            Arc::new(test_cipher()),
            Arc::new(test_token_issuer()),
        );
        (coordinator, states)
    }

    #[tokio::test]
    async fn test_unconfigured_provider_is_rejected() {
        let (coordinator, states) = coordinator(FakeExchange::unconfigured(), MockIdentityStore::new());
        let err = coordinator
            .begin_authorization(ProviderKind::Google)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ProviderNotConfigured { .. }));
        assert!(states.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_state_skips_exchange_and_store() {
        let exchange = FakeExchange::with_profile(sample_profile(ProviderKind::Google, "g-42", "a@x.com"));
        let calls = exchange.exchange_calls();
        let mut store = MockIdentityStore::new();
        store.expect_resolve_and_persist().never();

        let (coordinator, _) = coordinator(exchange, store);
        let err = coordinator
            .handle_callback(ProviderKind::Google, "code", "forged-state")
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Csrf { .. }));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_credentials_are_encrypted_before_persisting() {
        let exchange = FakeExchange::with_profile(sample_profile(ProviderKind::Google, "g-42", "a@x.com"));
        let mut store = MockIdentityStore::new();
        store
            .expect_resolve_and_persist()
            .times(1)
            .withf(|_, sealed| {
                let cipher = test_cipher();
                sealed.access_token != "provider-access-token"
                    && cipher.decrypt(&sealed.access_token).ok().as_deref()
                        == Some("provider-access-token")
            })
            .returning(|_, _| Ok(resolved(ResolutionOutcome::Created)));

        let (coordinator, _) = coordinator(exchange, store);
        let request = coordinator
            .begin_authorization(ProviderKind::Google)
            .await
            .unwrap();
        let result = coordinator
            .handle_callback(ProviderKind::Google, "code", &request.state)
            .await
            .unwrap();

        assert_eq!(result.outcome, ResolutionOutcome::Created);
        assert_eq!(result.tokens.token_type, "Bearer");
        assert!(!result.tokens.access_token.is_empty());
        assert!(!result.tokens.refresh_token.is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_is_retried_once() {
        let exchange = FakeExchange::with_profile(sample_profile(ProviderKind::Google, "g-42", "a@x.com"));
        let mut store = MockIdentityStore::new();
        let mut seq = mockall::Sequence::new();
        store
            .expect_resolve_and_persist()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(AuthError::persistence("UNIQUE constraint failed")));
        store
            .expect_resolve_and_persist()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(resolved(ResolutionOutcome::Login)));

        let (coordinator, _) = coordinator(exchange, store);
        let request = coordinator
            .begin_authorization(ProviderKind::Google)
            .await
            .unwrap();
        let result = coordinator
            .handle_callback(ProviderKind::Google, "code", &request.state)
            .await
            .unwrap();
        assert_eq!(result.outcome, ResolutionOutcome::Login);
    }

    #[tokio::test]
    async fn test_second_persistence_failure_surfaces() {
        let exchange = FakeExchange::with_profile(sample_profile(ProviderKind::Google, "g-42", "a@x.com"));
        let mut store = MockIdentityStore::new();
        store
            .expect_resolve_and_persist()
            .times(2)
            .returning(|_, _| Err(AuthError::persistence("database is locked")));

        let (coordinator, _) = coordinator(exchange, store);
        let request = coordinator
            .begin_authorization(ProviderKind::Google)
            .await
            .unwrap();
        let err = coordinator
            .handle_callback(ProviderKind::Google, "code", &request.state)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Persistence { .. }));
    }

    #[tokio::test]
    async fn test_conflict_is_not_retried() {
        let exchange = FakeExchange::with_profile(sample_profile(ProviderKind::Google, "g-99", "a@x.com"));
        let mut store = MockIdentityStore::new();
        store
            .expect_resolve_and_persist()
            .times(1)
            .returning(|_, _| {
                Err(AuthError::ProviderAlreadyLinked {
                    provider: "google".to_string(),
                    user_id: 1,
                })
            });

        let (coordinator, _) = coordinator(exchange, store);
        let request = coordinator
            .begin_authorization(ProviderKind::Google)
            .await
            .unwrap();
        let err = coordinator
            .handle_callback(ProviderKind::Google, "code", &request.state)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ProviderAlreadyLinked { .. }));
    }

    #[tokio::test]
    async fn test_exchange_failure_writes_nothing() {
        let mut store = MockIdentityStore::new();
        store.expect_resolve_and_persist().never();

        let (coordinator, _) = coordinator(FakeExchange::failing(), store);
        let request = coordinator
            .begin_authorization(ProviderKind::Google)
            .await
            .unwrap();
        let err = coordinator
            .handle_callback(ProviderKind::Google, "bad-code", &request.state)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Exchange { .. }));
    }

    #[tokio::test]
    async fn test_abandon_consumes_state() {
        let (coordinator, states) = coordinator(
            FakeExchange::with_profile(sample_profile(ProviderKind::Google, "g-42", "a@x.com")),
            MockIdentityStore::new(),
        );
        let request = coordinator
            .begin_authorization(ProviderKind::Google)
            .await
            .unwrap();

        let err = coordinator
            .abandon_authorization(
                ProviderKind::Google,
                &request.state,
                Some("access_denied".to_string()),
            )
            .await;
        assert!(matches!(err, AuthError::AuthorizationDenied { .. }));
        assert!(states.is_empty());
    }
}
