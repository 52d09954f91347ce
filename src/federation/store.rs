//! # 身份存储
//!
//! 用户（`users`）与第三方身份绑定（`provider_links`）的读写。
//! 回调中的“解析用户 + 写入凭证”在一个数据库事务内完成。

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};

use entity::{ProviderLinks, Users, provider_links, users};

use super::{ResolutionOutcome, ResolvedIdentity, SealedCredentials};
use crate::auth::permissions::UserRole;
use crate::error::{AuthError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::provider::{CanonicalProfile, ProviderKind};
use crate::{ldebug, linfo, persistence_error};

/// 身份存储接口
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// 按外部身份、邮箱的顺序解析用户，必要时创建用户，并写入加密后的凭证
    ///
    /// 整个过程是原子的：失败时不会留下没有绑定的用户或没有用户的绑定。
    async fn resolve_and_persist(
        &self,
        profile: &CanonicalProfile,
        credentials: &SealedCredentials,
    ) -> Result<ResolvedIdentity>;

    /// 按ID查询用户
    async fn find_user(&self, user_id: i32) -> Result<Option<users::Model>>;

    /// 用户在某个 provider 上的绑定
    async fn find_link(
        &self,
        user_id: i32,
        provider: ProviderKind,
    ) -> Result<Option<provider_links::Model>>;

    /// 用户已绑定的 provider 标识，按字母排序
    async fn linked_providers(&self, user_id: i32) -> Result<Vec<String>>;
}

/// 基于 Sea-ORM 的身份存储
#[derive(Debug, Clone)]
pub struct SeaOrmIdentityStore {
    db: DatabaseConnection,
}

impl SeaOrmIdentityStore {
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// 事务内解析用户
    async fn resolve_user(
        txn: &DatabaseTransaction,
        profile: &CanonicalProfile,
        existing_link: Option<&provider_links::Model>,
    ) -> Result<(users::Model, ResolutionOutcome)> {
        let provider = profile.provider.as_str();

        if let Some(link) = existing_link {
            let user = Users::find_by_id(link.user_id)
                .one(txn)
                .await?
                .ok_or_else(|| persistence_error!("绑定记录 {} 指向不存在的用户", link.id))?;
            return Ok((user, ResolutionOutcome::Login));
        }

        if let Some(user) = Users::find()
            .filter(users::Column::Email.eq(profile.email.as_str()))
            .one(txn)
            .await?
        {
            let already_linked = ProviderLinks::find()
                .filter(provider_links::Column::UserId.eq(user.id))
                .filter(provider_links::Column::Provider.eq(provider))
                .one(txn)
                .await?
                .is_some();
            if already_linked {
                return Err(AuthError::ProviderAlreadyLinked {
                    provider: provider.to_string(),
                    user_id: user.id,
                });
            }
            return Ok((user, ResolutionOutcome::Linked));
        }

        let now = Utc::now().naive_utc();
        let user = users::ActiveModel {
            email: Set(profile.email.clone()),
            password_hash: Set(None),
            full_name: Set(profile.full_name()),
            role: Set(UserRole::default().as_str().to_string()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        Ok((user, ResolutionOutcome::Created))
    }

    /// 事务内写入或更新绑定记录
    async fn upsert_link(
        txn: &DatabaseTransaction,
        user: &users::Model,
        profile: &CanonicalProfile,
        credentials: &SealedCredentials,
        existing_link: Option<provider_links::Model>,
    ) -> Result<provider_links::Model> {
        let now = Utc::now().naive_utc();
        let profile_data = serde_json::to_string(&profile.raw_attributes)?;
        let expires_at = credentials.expires_at.map(|at| at.naive_utc());

        let link = match existing_link {
            Some(link) => {
                // provider 未返回新的刷新令牌时保留已存储的
                let refresh_token = credentials
                    .refresh_token
                    .clone()
                    .or_else(|| link.refresh_token.clone());

                let mut active: provider_links::ActiveModel = link.into();
                active.email = Set(profile.email.clone());
                active.access_token = Set(credentials.access_token.clone());
                active.refresh_token = Set(refresh_token);
                active.token_expires_at = Set(expires_at);
                active.is_verified = Set(true);
                active.profile_data = Set(profile_data);
                active.updated_at = Set(now);
                active.update(txn).await?
            }
            None => {
                provider_links::ActiveModel {
                    user_id: Set(user.id),
                    provider: Set(profile.provider.as_str().to_string()),
                    external_id: Set(profile.external_id.clone()),
                    email: Set(profile.email.clone()),
                    access_token: Set(credentials.access_token.clone()),
                    refresh_token: Set(credentials.refresh_token.clone()),
                    token_expires_at: Set(expires_at),
                    is_verified: Set(true),
                    profile_data: Set(profile_data),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(txn)
                .await?
            }
        };

        Ok(link)
    }
}

#[async_trait]
impl IdentityStore for SeaOrmIdentityStore {
    async fn resolve_and_persist(
        &self,
        profile: &CanonicalProfile,
        credentials: &SealedCredentials,
    ) -> Result<ResolvedIdentity> {
        // 未提交的事务在 drop 时回滚
        let txn = self.db.begin().await?;

        let existing_link = ProviderLinks::find()
            .filter(provider_links::Column::Provider.eq(profile.provider.as_str()))
            .filter(provider_links::Column::ExternalId.eq(profile.external_id.as_str()))
            .one(&txn)
            .await?;

        let (user, outcome) = Self::resolve_user(&txn, profile, existing_link.as_ref()).await?;
        if !user.is_active {
            return Err(AuthError::AccountInactive { user_id: user.id });
        }

        let link = Self::upsert_link(&txn, &user, profile, credentials, existing_link).await?;
        txn.commit().await?;

        linfo!(
            "system",
            LogStage::Db,
            LogComponent::IdentityStore,
            "identity_persisted",
            "第三方身份已写入",
            user_id = user.id,
            link_id = link.id,
            provider = %profile.provider,
            outcome = ?outcome
        );

        Ok(ResolvedIdentity {
            user,
            link,
            outcome,
        })
    }

    async fn find_user(&self, user_id: i32) -> Result<Option<users::Model>> {
        Ok(Users::find_by_id(user_id).one(&self.db).await?)
    }

    async fn find_link(
        &self,
        user_id: i32,
        provider: ProviderKind,
    ) -> Result<Option<provider_links::Model>> {
        Ok(ProviderLinks::find()
            .filter(provider_links::Column::UserId.eq(user_id))
            .filter(provider_links::Column::Provider.eq(provider.as_str()))
            .one(&self.db)
            .await?)
    }

    async fn linked_providers(&self, user_id: i32) -> Result<Vec<String>> {
        let links = ProviderLinks::find()
            .filter(provider_links::Column::UserId.eq(user_id))
            .order_by_asc(provider_links::Column::Provider)
            .all(&self.db)
            .await?;

        ldebug!(
            "system",
            LogStage::Db,
            LogComponent::IdentityStore,
            "linked_providers",
            "查询用户绑定",
            user_id = user_id,
            count = links.len()
        );

        Ok(links.into_iter().map(|link| link.provider).collect())
    }
}
