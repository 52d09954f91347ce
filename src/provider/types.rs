use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AuthError, Result};

/// 支持的身份提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Google,
    #[serde(rename = "linkedin")]
    LinkedIn,
    #[serde(rename = "github")]
    GitHub,
}

impl ProviderKind {
    pub const ALL: [Self; 3] = [Self::Google, Self::LinkedIn, Self::GitHub];

    /// 路由和数据库中使用的标识
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::LinkedIn => "linkedin",
            Self::GitHub => "github",
        }
    }

    /// 环境变量前缀，如 `GOOGLE_CLIENT_ID`
    #[must_use]
    pub const fn env_prefix(&self) -> &'static str {
        match self {
            Self::Google => "GOOGLE",
            Self::LinkedIn => "LINKEDIN",
            Self::GitHub => "GITHUB",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "linkedin" => Ok(Self::LinkedIn),
            "github" => Ok(Self::GitHub),
            _ => Err(AuthError::UnknownProvider {
                provider: name.to_string(),
            }),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 归一化后的第三方用户资料
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalProfile {
    pub provider: ProviderKind,
    pub external_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    /// provider 返回的原始字段
    pub raw_attributes: serde_json::Value,
}

impl CanonicalProfile {
    /// 校验并规范化：去空白、邮箱转小写；外部 ID 或邮箱为空视为获取失败
    pub fn normalized(mut self) -> Result<Self> {
        self.external_id = self.external_id.trim().to_string();
        self.email = normalize_email(&self.email);
        self.display_name = self
            .display_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        self.avatar_url = self.avatar_url.filter(|url| !url.trim().is_empty());

        if self.external_id.is_empty() {
            return Err(AuthError::profile_fetch(
                self.provider.as_str(),
                "profile has no external id",
            ));
        }
        if self.email.is_empty() {
            return Err(AuthError::profile_fetch(
                self.provider.as_str(),
                "profile has no email address",
            ));
        }
        Ok(self)
    }

    /// 创建用户时使用的显示名
    #[must_use]
    pub fn full_name(&self) -> String {
        self.display_name.clone().unwrap_or_else(|| {
            self.email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string()
        })
    }
}

/// 邮箱统一为去空白的小写形式
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// provider 颁发的令牌（明文，仅存在于内存中）
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for ProviderTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderTokens")
            .field("access_token", &"***")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// 授权码交换的完整结果
#[derive(Debug, Clone)]
pub struct ExchangeOutcome {
    pub tokens: ProviderTokens,
    pub profile: CanonicalProfile,
}
