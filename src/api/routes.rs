//! # 路由配置
//!
//! 定义所有API路由和路由组织

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};

use super::handlers::{auth, health, oauth};
use super::middleware;
use super::server::AppState;

/// 创建所有路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .nest("/auth", auth_routes(state.clone()))
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state)
}

/// 认证路由
fn auth_routes(state: AppState) -> Router<AppState> {
    // 只有 /me 需要 Bearer 令牌
    let protected = Router::new()
        .route("/me", get(auth::me))
        .route_layer(from_fn_with_state(state, middleware::auth));

    Router::new()
        .route("/oauth/{provider}", get(oauth::authorize))
        .route("/oauth/{provider}/callback", get(oauth::callback))
        .route("/refresh", post(auth::refresh))
        .merge(protected)
}
