//! # 测试数据 Fixtures
//!
//! 提供测试用的数据结构和预设数据

use chrono::{Duration, Utc};
use serde_json::json;

use entity::{provider_links, users};

use crate::federation::{ResolutionOutcome, ResolvedIdentity, SealedCredentials};
use crate::provider::{CanonicalProfile, ProviderKind, ProviderTokens};

/// 规范化后的用户资料
#[must_use]
pub fn sample_profile(provider: ProviderKind, external_id: &str, email: &str) -> CanonicalProfile {
    CanonicalProfile {
        provider,
        external_id: external_id.to_string(),
        email: email.to_string(),
        display_name: Some("Ada Lovelace".to_string()),
        avatar_url: Some("https://avatars.example.com/ada.png".to_string()),
        raw_attributes: json!({ "id": external_id, "email": email }),
    }
}

/// provider 颁发的明文令牌
#[must_use]
pub fn sample_tokens(refresh_token: Option<&str>) -> ProviderTokens {
    ProviderTokens {
        access_token: "provider-access-token".to_string(),
        refresh_token: refresh_token.map(str::to_string),
        expires_at: Some(Utc::now() + Duration::hours(1)),
    }
}

/// 已加密的凭证（测试中直接使用占位字符串）
#[must_use]
pub fn sample_credentials(access_token: &str, refresh_token: Option<&str>) -> SealedCredentials {
    SealedCredentials {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.map(str::to_string),
        expires_at: Some(Utc::now() + Duration::hours(1)),
    }
}

/// 用户模型
#[must_use]
pub fn sample_user(id: i32, email: &str) -> users::Model {
    let now = Utc::now().naive_utc();
    users::Model {
        id,
        email: email.to_string(),
        password_hash: None,
        full_name: "Ada Lovelace".to_string(),
        role: "freelancer".to_string(),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

/// 解析结果
#[must_use]
pub fn sample_resolved_identity(
    user_id: i32,
    email: &str,
    outcome: ResolutionOutcome,
) -> ResolvedIdentity {
    let now = Utc::now().naive_utc();
    ResolvedIdentity {
        user: sample_user(user_id, email),
        link: provider_links::Model {
            id: 1,
            user_id,
            provider: "google".to_string(),
            external_id: "g-42".to_string(),
            email: email.to_string(),
            access_token: "sealed".to_string(),
            refresh_token: None,
            token_expires_at: None,
            is_verified: true,
            profile_data: "{}".to_string(),
            created_at: now,
            updated_at: now,
        },
        outcome,
    }
}
