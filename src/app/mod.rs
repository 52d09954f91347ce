//! # 应用装配
//!
//! 启动时构建共享服务，供 HTTP 层使用

pub mod context;

pub use context::AppContext;
