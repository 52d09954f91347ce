//! # 令牌处理器
//!
//! 刷新令牌换取新令牌对、查询当前用户

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use serde::Deserialize;

use crate::api::server::AppState;
use crate::auth::{AuthenticatedPrincipal, PrincipalProfile, TokenPair};
use crate::error::{AuthError, Result};

/// 刷新请求
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// `POST /auth/refresh`
pub async fn refresh(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<TokenPair>> {
    let Json(request) =
        payload.map_err(|_| AuthError::unauthorized("refresh_token is required"))?;
    let pair = state.token_service.refresh(&request.refresh_token).await?;
    Ok(Json(pair))
}

/// `GET /auth/me`
pub async fn me(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthenticatedPrincipal>,
) -> Result<Json<PrincipalProfile>> {
    let profile = state
        .token_service
        .current_principal(principal.user_id)
        .await?;
    Ok(Json(profile))
}
