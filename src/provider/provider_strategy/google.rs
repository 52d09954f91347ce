use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;
use crate::provider::{CanonicalProfile, ProviderEndpoints, ProviderKind, ProviderStrategy};

use super::get_json;

/// `oauth2/v2/userinfo` 响应
#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: String,
    #[serde(default)]
    email: String,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Debug)]
pub struct GoogleProvider;

#[async_trait]
impl ProviderStrategy for GoogleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn default_endpoints(&self) -> ProviderEndpoints {
        ProviderEndpoints {
            auth_url: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            profile_url: "https://www.googleapis.com/oauth2/v2/userinfo".to_string(),
            emails_url: None,
        }
    }

    fn default_scopes(&self) -> &'static [&'static str] {
        &["openid", "profile", "email"]
    }

    fn extra_authorize_params(&self) -> &'static [(&'static str, &'static str)] {
        &[("access_type", "offline"), ("prompt", "consent")]
    }

    async fn fetch_profile(
        &self,
        http: &reqwest::Client,
        endpoints: &ProviderEndpoints,
        access_token: &str,
    ) -> Result<CanonicalProfile> {
        let (info, raw): (GoogleUserInfo, _) = get_json(
            http,
            self.kind(),
            &endpoints.profile_url,
            access_token,
            "application/json",
        )
        .await?;

        CanonicalProfile {
            provider: self.kind(),
            external_id: info.id,
            email: info.email,
            display_name: info.name,
            avatar_url: info.picture,
            raw_attributes: raw,
        }
        .normalized()
    }
}
