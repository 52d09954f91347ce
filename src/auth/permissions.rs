//! # 用户角色定义
//!
//! 定义系统中的基本用户角色

use serde::{Deserialize, Serialize};
use std::fmt;

/// 用户角色枚举
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// 普通用户
    User,
    /// 自由职业者，联邦登录新建用户的默认角色
    #[default]
    Freelancer,
    /// 雇主
    Client,
    /// 管理员
    Admin,
}

impl UserRole {
    /// 获取角色的字符串表示
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Freelancer => "freelancer",
            Self::Client => "client",
            Self::Admin => "admin",
        }
    }

    /// 从字符串解析角色
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "freelancer" => Some(Self::Freelancer),
            "client" => Some(Self::Client),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// 检查是否为管理员
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid user role: {s}"))
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role_string_conversion() {
        for role in [
            UserRole::User,
            UserRole::Freelancer,
            UserRole::Client,
            UserRole::Admin,
        ] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::parse("regular_user"), None);
        assert!("superuser".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_federated_default_role() {
        assert_eq!(UserRole::default(), UserRole::Freelancer);
        assert!(!UserRole::default().is_admin());
        assert!(UserRole::Admin.is_admin());
    }
}
