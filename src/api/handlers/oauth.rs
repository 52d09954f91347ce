//! # OAuth 联邦登录处理器
//!
//! - `GET /auth/oauth/{provider}`：生成 state，307 跳转到 provider 授权页，并把同一 state 写入 cookie
//! - `GET /auth/oauth/{provider}/callback`：双重提交校验 cookie 与 query 中的 state，再交给协调器处理

use axum::extract::{Extension, Path, Query, State};
use axum::http::HeaderMap;
use axum::http::header::SET_COOKIE;
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::api::middleware::RequestId;
use crate::api::response;
use crate::api::server::AppState;
use crate::auth::AuthUtils;
use crate::error::{AuthError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::provider::ProviderKind;
use crate::{ldebug, linfo};

/// state cookie 名称
pub const STATE_COOKIE: &str = "oauth_state";

/// state cookie 作用路径
const STATE_COOKIE_PATH: &str = "/auth/oauth";

/// 回调 query 参数
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// 构造 `Set-Cookie` 值；`max_age` 为 0 时清除 cookie
fn state_cookie(value: &str, max_age: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{STATE_COOKIE}={value}; HttpOnly; SameSite=Lax; Path={STATE_COOKIE_PATH}; Max-Age={max_age}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// 开始授权：跳转到 provider
pub async fn authorize(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(provider): Path<String>,
) -> Result<Response> {
    let kind = ProviderKind::parse(&provider)?;
    let request = state.coordinator.begin_authorization(kind).await?;

    linfo!(
        request_id,
        LogStage::Authentication,
        LogComponent::OAuth,
        "authorize_redirect",
        "跳转到身份提供方授权页",
        provider = %kind
    );

    let cookie = state_cookie(
        &request.state,
        state.config.state_store.ttl_secs,
        state.config.server.cookie_secure,
    );
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Redirect::temporary(&request.authorize_url),
    )
        .into_response())
}

/// provider 回调
pub async fn callback(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
    headers: HeaderMap,
) -> Result<Response> {
    // cookie 与 query 不一致时直接拒绝，不访问 state 存储
    let cookie_state = AuthUtils::read_cookie(&headers, STATE_COOKIE);
    let state_token = match (cookie_state.as_deref(), query.state.as_deref()) {
        (Some(cookie), Some(param)) if !param.is_empty() && cookie == param => param,
        _ => {
            ldebug!(
                request_id,
                LogStage::Authentication,
                LogComponent::OAuth,
                "state_cookie_mismatch",
                "state cookie 缺失或与 query 不一致",
                has_cookie = cookie_state.is_some(),
                has_query = query.state.is_some()
            );
            return Err(AuthError::csrf("state cookie missing or mismatched"));
        }
    };

    let kind = match ProviderKind::parse(&provider) {
        Ok(kind) => kind,
        Err(e) => {
            state.coordinator.discard_state(state_token).await;
            return Err(e);
        }
    };

    let code = query.code.as_deref().filter(|code| !code.is_empty());
    let Some(code) = code.filter(|_| query.error.is_none()) else {
        let reason = query.error_description.clone().or_else(|| query.error.clone());
        return Err(state
            .coordinator
            .abandon_authorization(kind, state_token, reason)
            .await);
    };

    let result = state
        .coordinator
        .handle_callback(kind, code, state_token)
        .await?;

    linfo!(
        request_id,
        LogStage::Response,
        LogComponent::OAuth,
        "callback_success",
        "联邦登录回调成功",
        provider = %kind,
        user_id = result.user_id
    );

    let clear = state_cookie("", 0, state.config.server.cookie_secure);
    Ok((AppendHeaders([(SET_COOKIE, clear)]), response::success(result)).into_response())
}
