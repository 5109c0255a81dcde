//! API error type and [`axum::response::IntoResponse`] implementation.

use std::borrow::Cow;

use arsenal_core::{Error as CoreError, store::StoreError, weapon::FieldError};
use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("validation failed on {} field(s)", .0.len())]
  Validation(Vec<FieldError>),

  #[error("bad request: {0}")]
  BadRequest(Cow<'static, str>),

  #[error("unauthorized: {0}")]
  Unauthorized(&'static str),

  #[error("forbidden: {0}")]
  Forbidden(&'static str),

  #[error("not found: {0}")]
  NotFound(Cow<'static, str>),

  #[error("conflict: {0}")]
  Conflict(Cow<'static, str>),

  /// The database engine failed; surfaced as 503.
  #[error("database error: {0}")]
  Database(#[source] BoxError),

  #[error("internal error: {0}")]
  Internal(#[source] BoxError),
}

impl ApiError {
  pub fn bad_request(msg: impl Into<Cow<'static, str>>) -> Self { Self::BadRequest(msg.into()) }

  pub fn not_found(msg: impl Into<Cow<'static, str>>) -> Self { Self::NotFound(msg.into()) }

  pub fn internal(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Internal(Box::new(e))
  }

  /// Classify a store error: domain failures get their own status and a
  /// user-facing message, engine failures become 503.
  pub fn store<E: StoreError>(e: E) -> Self {
    if let Some(mapped) = e.domain().and_then(Self::from_domain) {
      return mapped;
    }
    if e.is_database() {
      Self::Database(Box::new(e))
    } else {
      Self::Internal(Box::new(e))
    }
  }

  fn from_domain(e: &CoreError) -> Option<Self> {
    let err = match e {
      CoreError::WeaponNotFound(_) => Self::not_found("武器不存在"),
      CoreError::ManufacturerNotFound(_) => Self::not_found("制造商不存在"),
      CoreError::UnknownManufacturer(name) => {
        Self::bad_request(format!("制造商 \"{name}\" 不存在"))
      }
      CoreError::DuplicateManufacturer(_) => Self::Conflict("制造商已存在".into()),
      CoreError::ReservedManufacturerName(name) => {
        Self::bad_request(format!("制造商名称 \"{name}\" 为保留名称"))
      }
      CoreError::ManufacturerInUse(count) => {
        Self::bad_request(format!("无法删除制造商，还有 {count} 个武器关联到此制造商"))
      }
      CoreError::LookupNotFound { kind, .. } => Self::not_found(format!("{}不存在", kind.label())),
      CoreError::DuplicateLookup { kind, .. } => {
        Self::Conflict(format!("{}已存在", kind.label()).into())
      }
      CoreError::LookupInUse { kind, count } => Self::bad_request(format!(
        "无法删除{label}，还有 {count} 个武器关联到此{label}",
        label = kind.label()
      )),
      CoreError::UserExists => Self::Conflict("用户名或邮箱已存在".into()),
      CoreError::UserNotFound(_) => Self::not_found("用户不存在"),
      CoreError::IntegrityViolation { .. } | CoreError::Serialization(_) => return None,
    };
    Some(err)
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      Self::Forbidden(_) => StatusCode::FORBIDDEN,
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::Conflict(_) => StatusCode::CONFLICT,
      Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
      Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

// ─── Extractor rejections ─────────────────────────────────────────────────────

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    tracing::debug!(error = %rejection.body_text(), "rejected request body");
    Self::bad_request("请求体格式错误")
  }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self {
    tracing::debug!(error = %rejection.body_text(), "rejected path parameter");
    Self::bad_request("路径参数无效")
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    tracing::debug!(error = %rejection.body_text(), "rejected query string");
    Self::bad_request("查询参数无效")
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }

    let body = match &self {
      Self::Validation(errors) => {
        json!({ "success": false, "message": "数据验证失败", "errors": errors })
      }
      Self::BadRequest(m) | Self::NotFound(m) | Self::Conflict(m) => {
        json!({ "success": false, "message": m })
      }
      Self::Unauthorized(m) | Self::Forbidden(m) => json!({ "success": false, "message": m }),
      Self::Database(_) => json!({ "success": false, "message": "数据库操作错误，请稍后重试" }),
      Self::Internal(_) => json!({ "success": false, "message": "服务器内部错误" }),
    };
    (status, Json(body)).into_response()
  }
}
