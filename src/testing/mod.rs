//! # 测试支持模块
//!
//! 内存数据库、预设数据、身份存储 mock 以及模拟 provider 端点

pub mod fixtures;
pub mod helpers;
pub mod mocks;

pub use fixtures::*;
pub use helpers::*;
pub use mocks::*;
