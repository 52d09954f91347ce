//! # API 响应结构
//!
//! 错误统一输出为 `{error, message, code}`。`message` 是固定的对外说明，
//! 上游响应体和内部错误链只写日志，不返回给客户端。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, ErrorCategory};
use crate::logging::{LogComponent, LogStage};
use crate::{lerror, lwarn};

/// # 标准错误响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// HTTP 状态说明，如 `Bad Request`
    pub error: String,
    /// 对外说明
    pub message: String,
    /// 机器可读的错误代码
    pub code: String,
}

impl ErrorBody {
    /// 从错误构造响应体
    #[must_use]
    pub fn from_error(error: &AuthError) -> (StatusCode, Self) {
        let (status, code) = error.to_http_response_parts();
        let body = Self {
            error: status
                .canonical_reason()
                .unwrap_or("Unknown Error")
                .to_string(),
            message: error.public_message().to_string(),
            code: code.to_string(),
        };
        (status, body)
    }
}

/// 构建成功响应
pub fn success<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, body) = ErrorBody::from_error(&self);

        match self.category() {
            ErrorCategory::Server => lerror!(
                "system",
                LogStage::Error,
                LogComponent::ServerSetup,
                "request_failed",
                "请求处理失败",
                status = status.as_u16(),
                code = %body.code,
                error = ?self
            ),
            ErrorCategory::Client => lwarn!(
                "system",
                LogStage::Response,
                LogComponent::ServerSetup,
                "request_rejected",
                "请求被拒绝",
                status = status.as_u16(),
                code = %body.code,
                error = %self
            ),
        }

        (status, Json(body)).into_response()
    }
}
