//! # 中间件模块

pub mod auth;
pub mod request_id;

pub use auth::auth;
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
