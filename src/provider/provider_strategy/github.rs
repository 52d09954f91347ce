use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{AuthError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::provider::{CanonicalProfile, ProviderEndpoints, ProviderKind, ProviderStrategy};
use crate::ldebug;

use super::get_json;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// `GET /user` 响应
#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: i64,
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
}

/// `GET /user/emails` 列表项
#[derive(Debug, Clone, Deserialize)]
struct GitHubEmail {
    email: String,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    verified: bool,
}

#[derive(Debug)]
pub struct GitHubProvider;

impl GitHubProvider {
    /// 选出同时为 primary 且 verified 的邮箱
    fn primary_verified(emails: &[GitHubEmail]) -> Option<&str> {
        emails
            .iter()
            .find(|entry| entry.primary && entry.verified)
            .map(|entry| entry.email.as_str())
    }
}

#[async_trait]
impl ProviderStrategy for GitHubProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GitHub
    }

    fn default_endpoints(&self) -> ProviderEndpoints {
        ProviderEndpoints {
            auth_url: "https://github.com/login/oauth/authorize".to_string(),
            token_url: "https://github.com/login/oauth/access_token".to_string(),
            profile_url: "https://api.github.com/user".to_string(),
            emails_url: Some("https://api.github.com/user/emails".to_string()),
        }
    }

    fn default_scopes(&self) -> &'static [&'static str] {
        &["user:email", "read:user"]
    }

    async fn fetch_profile(
        &self,
        http: &reqwest::Client,
        endpoints: &ProviderEndpoints,
        access_token: &str,
    ) -> Result<CanonicalProfile> {
        let (user, mut raw): (GitHubUser, _) = get_json(
            http,
            self.kind(),
            &endpoints.profile_url,
            access_token,
            GITHUB_ACCEPT,
        )
        .await?;

        let public_email = user.email.filter(|email| !email.trim().is_empty());
        let email = if let Some(email) = public_email {
            email
        } else {
            let emails_url = endpoints.emails_url.as_deref().ok_or_else(|| {
                AuthError::profile_fetch(self.kind().as_str(), "emails endpoint is not configured")
            })?;
            let (emails, _): (Vec<GitHubEmail>, _) =
                get_json(http, self.kind(), emails_url, access_token, GITHUB_ACCEPT).await?;

            ldebug!(
                "system",
                LogStage::ExternalApi,
                LogComponent::Provider,
                "github_emails",
                "GitHub 资料未公开邮箱，已查询邮箱列表",
                candidates = emails.len()
            );

            let selected = Self::primary_verified(&emails).ok_or_else(|| {
                AuthError::profile_fetch(self.kind().as_str(), "no primary verified email")
            })?;
            if let Some(object) = raw.as_object_mut() {
                object.insert(
                    "email".to_string(),
                    serde_json::Value::String(selected.to_string()),
                );
            }
            selected.to_string()
        };

        CanonicalProfile {
            provider: self.kind(),
            external_id: user.id.to_string(),
            email,
            display_name: user.name.or(Some(user.login)),
            avatar_url: user.avatar_url,
            raw_attributes: raw,
        }
        .normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(email: &str, primary: bool, verified: bool) -> GitHubEmail {
        GitHubEmail {
            email: email.to_string(),
            primary,
            verified,
        }
    }

    #[test]
    fn selects_primary_verified_email() {
        let emails = vec![
            entry("old@x.com", false, true),
            entry("main@x.com", true, true),
        ];
        assert_eq!(GitHubProvider::primary_verified(&emails), Some("main@x.com"));
    }

    #[test]
    fn unverified_primary_is_not_selected() {
        let emails = vec![
            entry("main@x.com", true, false),
            entry("other@x.com", false, true),
        ];
        assert_eq!(GitHubProvider::primary_verified(&emails), None);
    }
}
