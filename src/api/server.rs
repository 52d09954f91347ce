//! # HTTP 服务器
//!
//! Axum HTTP服务器：路由装配、CORS、请求追踪和优雅关闭

use std::ops::Deref;
use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::middleware::request_id_middleware;
use crate::app::AppContext;
use crate::error::{AuthError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{lerror, linfo, lwarn};

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    context: Arc<AppContext>,
}

impl AppState {
    #[must_use]
    pub const fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }
}

impl Deref for AppState {
    type Target = AppContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

/// 按配置构建 CORS 层，`*` 表示任意源
fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
        ]);

    if origins.iter().any(|origin| origin == "*") {
        return cors.allow_origin(Any);
    }

    let parsed = origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<std::result::Result<Vec<_>, _>>();

    match parsed {
        Ok(origins) => cors.allow_origin(origins),
        Err(e) => {
            lwarn!(
                "system",
                LogStage::Startup,
                LogComponent::ServerSetup,
                "cors_config_fail",
                "CORS 源配置无效，回退为允许任意源",
                error = %e
            );
            cors.allow_origin(Any)
        }
    }
}

/// 创建路由器
pub fn create_router(context: Arc<AppContext>) -> Router {
    let cors = cors_layer(&context.config.server.cors_origins);
    let state = AppState::new(context);

    super::routes::create_routes(state).layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn(request_id_middleware))
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    )
}

/// 等待 Ctrl+C 或 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            lerror!(
                "system",
                LogStage::Shutdown,
                LogComponent::ServerSetup,
                "ctrl_c_error",
                "监听 Ctrl+C 失败",
                error = %e
            );
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                lerror!(
                    "system",
                    LogStage::Shutdown,
                    LogComponent::ServerSetup,
                    "sigterm_error",
                    "监听 SIGTERM 失败",
                    error = %e
                );
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    linfo!(
        "system",
        LogStage::Shutdown,
        LogComponent::ServerSetup,
        "shutdown_signal",
        "收到关闭信号，开始优雅关闭"
    );
}

/// 启动服务器，直到收到关闭信号
pub async fn run_server(context: Arc<AppContext>) -> Result<()> {
    let addr = context.config.bind_address();
    let router = create_router(context);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AuthError::config_with_source(format!("无法监听地址 {addr}"), e))?;

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::ServerSetup,
        "server_start",
        "HTTP 服务启动",
        addr = %addr
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_cors_origin_falls_back() {
        // 只验证不会 panic
        let _ = cors_layer(&["https://app.example.com".to_string()]);
        let _ = cors_layer(&["bad\norigin".to_string()]);
        let _ = cors_layer(&["*".to_string()]);
    }
}
