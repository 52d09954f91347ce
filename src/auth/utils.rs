//! # 认证工具函数
//!
//! 请求头中的 Bearer 令牌与 Cookie 解析

use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};

/// 认证工具类
pub struct AuthUtils;

impl AuthUtils {
    /// `从HTTP头中提取Authorization头的值`
    #[must_use]
    pub fn extract_authorization_header(headers: &HeaderMap) -> Option<String> {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }

    /// `从Authorization头中提取Bearer` token
    ///
    /// # 参数
    /// - `auth_header`: Authorization头的完整值，如 "Bearer eyJ..."
    ///
    /// # 返回
    /// - `Some(String)`: Bearer token部分
    /// - `None`: 不是Bearer类型的认证头
    #[must_use]
    pub fn extract_bearer_token(auth_header: &str) -> Option<String> {
        let (scheme, token) = auth_header.trim().split_once(' ')?;
        let token = token.trim();
        (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
    }

    /// 读取指定名称的 Cookie
    #[must_use]
    pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.trim().to_string())
    }
}
