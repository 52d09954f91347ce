//! # HTTP 接口层
//!
//! 对外暴露 OAuth 跳转与回调、令牌刷新、当前用户和健康检查接口

pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;

pub use response::ErrorBody;
pub use server::{AppState, create_router, run_server};
