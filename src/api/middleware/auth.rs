//! # 认证中间件
//!
//! 从 `Authorization: Bearer` 头中提取访问令牌，校验后把当前用户注入到请求扩展中。

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::api::server::AppState;
use crate::auth::AuthUtils;
use crate::error::{AuthError, Result};

/// Axum认证中间件
pub async fn auth(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response> {
    let token = AuthUtils::extract_authorization_header(request.headers())
        .and_then(|header| AuthUtils::extract_bearer_token(&header))
        .ok_or_else(|| AuthError::unauthorized("missing bearer token"))?;

    // 令牌过期、签名错误等由 TokenError 映射为对应的 401 错误代码
    let principal = state.token_service.authenticate(&token)?;
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}
