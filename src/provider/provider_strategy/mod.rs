pub mod github;
pub mod google;
pub mod linkedin;

pub use github::GitHubProvider;
pub use google::GoogleProvider;
pub use linkedin::LinkedInProvider;

use reqwest::header::{ACCEPT, USER_AGENT};
use serde::de::DeserializeOwned;

use crate::error::{AuthError, Result};
use crate::provider::ProviderKind;

pub(crate) const CLIENT_USER_AGENT: &str = concat!("federated-auth/", env!("CARGO_PKG_VERSION"));

/// 携带访问令牌请求 provider 的 JSON 接口
///
/// 网络错误、非 2xx 响应和解析失败都归为用户资料获取失败，响应体不向上透传。
pub(crate) async fn get_json<T: DeserializeOwned>(
    http: &reqwest::Client,
    kind: ProviderKind,
    url: &str,
    access_token: &str,
    accept: &str,
) -> Result<(T, serde_json::Value)> {
    let response = http
        .get(url)
        .bearer_auth(access_token)
        .header(ACCEPT, accept)
        .header(USER_AGENT, CLIENT_USER_AGENT)
        .send()
        .await
        .map_err(|e| AuthError::profile_fetch_with_source(kind.as_str(), "request failed", e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AuthError::profile_fetch(
            kind.as_str(),
            format!("unexpected status {status} from {url}"),
        ));
    }

    let raw: serde_json::Value = response.json().await.map_err(|e| {
        AuthError::profile_fetch_with_source(kind.as_str(), "response is not JSON", e)
    })?;
    let parsed = serde_json::from_value(raw.clone()).map_err(|e| {
        AuthError::profile_fetch_with_source(kind.as_str(), "unexpected profile shape", e)
    })?;

    Ok((parsed, raw))
}
