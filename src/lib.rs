//! # Federated Auth Library
//!
//! 第三方身份联邦登录与令牌签发：OAuth2 授权码登录、账号绑定、访问/刷新令牌

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod federation;
pub mod logging;
pub mod provider;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AuthError, Result};
