//! # 认证授权模块
//!
//! 令牌签发与校验、一次性 state、第三方凭证加密以及 Bearer 认证。

pub mod credential_cipher;
pub mod jwt;
pub mod permissions;
pub mod service;
pub mod state_store;
pub mod types;
pub mod utils;

pub use credential_cipher::CredentialCipher;
pub use jwt::TokenIssuer;
pub use service::TokenService;
pub use state_store::{InMemoryStateStore, RedisStateStore, StateStore};
pub use types::{
    AuthenticatedPrincipal, PrincipalIdentity, PrincipalProfile, TokenClaims, TokenKind, TokenPair,
};
pub use utils::AuthUtils;
