//! 身份提供方模块
//!
//! - `types`：provider 标识、统一用户资料与 provider 令牌
//! - `traits`：单个 provider 的策略 trait 以及联邦登录使用的交换 trait
//! - `registry`：按配置构建 oauth2 客户端并完成授权码交换
//! - `provider_strategy`：Google / LinkedIn / GitHub 的资料解析

mod provider_strategy;
mod registry;
mod traits;
mod types;

pub use registry::{ProviderRegistry, resolve_strategy};
pub use traits::{IdentityExchange, ProviderEndpoints, ProviderStrategy};
pub use types::{CanonicalProfile, ExchangeOutcome, ProviderKind, ProviderTokens, normalize_email};
