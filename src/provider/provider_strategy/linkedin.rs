use async_trait::async_trait;
use oauth2::AuthType;
use serde::Deserialize;

use crate::error::Result;
use crate::provider::{CanonicalProfile, ProviderEndpoints, ProviderKind, ProviderStrategy};

use super::get_json;

/// OpenID Connect `userinfo` 响应
#[derive(Debug, Deserialize)]
struct LinkedInUserInfo {
    sub: String,
    #[serde(default)]
    email: String,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Debug)]
pub struct LinkedInProvider;

#[async_trait]
impl ProviderStrategy for LinkedInProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::LinkedIn
    }

    fn default_endpoints(&self) -> ProviderEndpoints {
        ProviderEndpoints {
            auth_url: "https://www.linkedin.com/oauth/v2/authorization".to_string(),
            token_url: "https://www.linkedin.com/oauth/v2/accessToken".to_string(),
            profile_url: "https://api.linkedin.com/v2/userinfo".to_string(),
            emails_url: None,
        }
    }

    fn default_scopes(&self) -> &'static [&'static str] {
        &["openid", "profile", "email"]
    }

    // LinkedIn 不接受 HTTP Basic 方式的 client 凭证
    fn auth_type(&self) -> AuthType {
        AuthType::RequestBody
    }

    async fn fetch_profile(
        &self,
        http: &reqwest::Client,
        endpoints: &ProviderEndpoints,
        access_token: &str,
    ) -> Result<CanonicalProfile> {
        let (info, raw): (LinkedInUserInfo, _) = get_json(
            http,
            self.kind(),
            &endpoints.profile_url,
            access_token,
            "application/json",
        )
        .await?;

        CanonicalProfile {
            provider: self.kind(),
            external_id: info.sub,
            email: info.email,
            display_name: info.name,
            avatar_url: info.picture,
            raw_attributes: raw,
        }
        .normalized()
    }
}
