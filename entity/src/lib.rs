//! # Entity 模块
//!
//! 包含身份联邦所需的 Sea-ORM 实体定义

pub mod provider_links;
pub mod users;

pub use provider_links::Entity as ProviderLinks;
pub use users::Entity as Users;

#[cfg(test)]
mod tests;
