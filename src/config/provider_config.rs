//! # 身份提供方配置
//!
//! 每个 provider 的 OAuth2 客户端参数。端点为空时使用各 provider 的默认地址，
//! 测试环境可以把端点指向本地 mock 服务。

use serde::{Deserialize, Serialize};

use crate::provider::ProviderKind;

/// 单个身份提供方的客户端配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderClientConfig {
    /// OAuth2 client id，为空表示未配置
    pub client_id: String,
    /// OAuth2 client secret
    pub client_secret: String,
    /// 回调地址，为空时按 `public_base_url` 生成
    pub redirect_url: String,
    /// 请求的 scope，为空时使用 provider 默认值
    pub scopes: Vec<String>,
    /// 授权端点覆盖
    pub auth_url: Option<String>,
    /// 令牌端点覆盖
    pub token_url: Option<String>,
    /// 用户资料端点覆盖
    pub profile_url: Option<String>,
    /// 邮箱列表端点覆盖（仅 GitHub 使用）
    pub emails_url: Option<String>,
}

impl ProviderClientConfig {
    /// 是否已配置 client id
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.client_id.trim().is_empty()
    }
}

/// OAuth 联邦登录配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// 凭证加密密钥：32 字节的 base64，或至少 32 字节的任意密钥材料
    pub encryption_key: Option<String>,
    /// 调用第三方接口的超时时间（秒）
    pub http_timeout_secs: u64,
    /// 对外访问地址，用于生成默认回调地址
    pub public_base_url: String,
    /// Google
    pub google: ProviderClientConfig,
    /// LinkedIn
    pub linkedin: ProviderClientConfig,
    /// GitHub
    pub github: ProviderClientConfig,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            encryption_key: None,
            http_timeout_secs: 10,
            public_base_url: "http://localhost:8080".to_string(),
            google: ProviderClientConfig::default(),
            linkedin: ProviderClientConfig::default(),
            github: ProviderClientConfig::default(),
        }
    }
}

impl OAuthConfig {
    /// 获取指定 provider 的配置
    #[must_use]
    pub const fn provider(&self, kind: ProviderKind) -> &ProviderClientConfig {
        match kind {
            ProviderKind::Google => &self.google,
            ProviderKind::LinkedIn => &self.linkedin,
            ProviderKind::GitHub => &self.github,
        }
    }

    /// 获取指定 provider 的可变配置
    pub fn provider_mut(&mut self, kind: ProviderKind) -> &mut ProviderClientConfig {
        match kind {
            ProviderKind::Google => &mut self.google,
            ProviderKind::LinkedIn => &mut self.linkedin,
            ProviderKind::GitHub => &mut self.github,
        }
    }

    /// 回调地址：显式配置优先
    #[must_use]
    pub fn redirect_url(&self, kind: ProviderKind) -> String {
        let configured = &self.provider(kind).redirect_url;
        if configured.trim().is_empty() {
            format!(
                "{}/auth/oauth/{}/callback",
                self.public_base_url.trim_end_matches('/'),
                kind
            )
        } else {
            configured.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_when_client_id_blank() {
        let mut config = ProviderClientConfig::default();
        assert!(!config.is_configured());
        config.client_id = "   ".to_string();
        assert!(!config.is_configured());
        config.client_id = "abc".to_string();
        assert!(config.is_configured());
    }

    #[test]
    fn test_default_redirect_url() {
        let mut config = OAuthConfig {
            public_base_url: "https://auth.example.com/".to_string(),
            ..OAuthConfig::default()
        };
        assert_eq!(
            config.redirect_url(ProviderKind::GitHub),
            "https://auth.example.com/auth/oauth/github/callback"
        );

        config.google.redirect_url = "https://app.example.com/cb".to_string();
        assert_eq!(
            config.redirect_url(ProviderKind::Google),
            "https://app.example.com/cb"
        );
    }
}
