//! Token service
//!
//! Refresh-token exchange and bearer-token authentication on top of the
//! token issuer and the identity store.

use std::sync::Arc;

use crate::auth::jwt::TokenIssuer;
use crate::auth::types::{AuthenticatedPrincipal, PrincipalIdentity, PrincipalProfile, TokenPair};
use crate::error::{AuthError, Result};
use crate::federation::IdentityStore;
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, linfo};

/// Token service
pub struct TokenService {
    token_issuer: Arc<TokenIssuer>,
    identity_store: Arc<dyn IdentityStore>,
}

impl TokenService {
    #[must_use]
    pub fn new(token_issuer: Arc<TokenIssuer>, identity_store: Arc<dyn IdentityStore>) -> Self {
        Self {
            token_issuer,
            identity_store,
        }
    }

    /// Exchange a refresh token for a fresh pair.
    ///
    /// The principal is reloaded so that deactivated or deleted accounts
    /// cannot keep refreshing. Expired refresh tokens are rejected as such.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.token_issuer.validate_refresh(refresh_token)?;
        let user_id = claims
            .user_id()
            .ok_or_else(|| AuthError::unauthorized("token subject is not a user id"))?;

        let user = self
            .identity_store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AuthError::unauthorized("user no longer exists"))?;
        if !user.is_active {
            return Err(AuthError::AccountInactive { user_id });
        }

        let pair = self
            .token_issuer
            .issue_pair(&PrincipalIdentity::from(&user))?;

        linfo!(
            "system",
            LogStage::Authentication,
            LogComponent::Auth,
            "token_refreshed",
            "刷新令牌成功",
            user_id = user_id
        );
        Ok(pair)
    }

    /// Authenticate a bearer access token
    pub fn authenticate(&self, access_token: &str) -> Result<AuthenticatedPrincipal> {
        let claims = self.token_issuer.validate_access(access_token)?;
        let user_id = claims
            .user_id()
            .ok_or_else(|| AuthError::unauthorized("token subject is not a user id"))?;

        ldebug!(
            "system",
            LogStage::Authentication,
            LogComponent::Auth,
            "bearer_authenticated",
            "访问令牌校验通过",
            user_id = user_id
        );
        Ok(AuthenticatedPrincipal { user_id, claims })
    }

    /// Load the current principal with linked providers
    pub async fn current_principal(&self, user_id: i32) -> Result<PrincipalProfile> {
        let user = self
            .identity_store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AuthError::not_found("user", user_id.to_string()))?;
        if !user.is_active {
            return Err(AuthError::AccountInactive { user_id });
        }

        let linked_providers = self.identity_store.linked_providers(user_id).await?;
        Ok(PrincipalProfile {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            is_active: user.is_active,
            linked_providers,
        })
    }
}
