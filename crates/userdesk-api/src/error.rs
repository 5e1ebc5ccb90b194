//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error body carries a human-readable `message`; validation failures
//! also carry the field-level `errors`.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  Unauthorized(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("validation failed")]
  Validation(ValidationErrors),

  #[error("password hashing failed: {0}")]
  PasswordHash(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn unauthenticated() -> Self { Self::Unauthorized("unauthenticated".into()) }

  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  fn status(&self) -> StatusCode {
    match self {
      ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::PasswordHash(_) | ApiError::Store(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }
}

impl From<userdesk_core::Error> for ApiError {
  fn from(e: userdesk_core::Error) -> Self { ApiError::BadRequest(e.to_string()) }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    ApiError::BadRequest(rejection.body_text())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }

    let body = match &self {
      ApiError::Unauthorized(m)
      | ApiError::NotFound(m)
      | ApiError::BadRequest(m)
      | ApiError::Conflict(m) => json!({ "statusCode": status.as_u16(), "message": m }),
      ApiError::Validation(errors) => json!({
        "statusCode": status.as_u16(),
        "message": validation_summary(errors),
        "errors": errors,
      }),
      ApiError::PasswordHash(_) | ApiError::Store(_) => json!({
        "statusCode": status.as_u16(),
        "message": "internal server error",
      }),
    };
    (status, Json(body)).into_response()
  }
}

/// `"name should not be empty; email must be an email"`.
fn validation_summary(errors: &ValidationErrors) -> String {
  userdesk_core::validate::messages(errors)
    .into_iter()
    .map(|(_, message)| message)
    .collect::<Vec<_>>()
    .join("; ")
}
