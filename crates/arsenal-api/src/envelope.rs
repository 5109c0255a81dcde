//! The `{success, message?, data?}` body shared by every endpoint.

use std::borrow::Cow;

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
  pub success: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<Cow<'static, str>>,
  /// Only set by the `/check` endpoints.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub exists:  Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data:    Option<T>,
}

impl<T: Serialize> IntoResponse for Envelope<T> {
  fn into_response(self) -> Response { Json(self).into_response() }
}

pub fn ok<T>(data: T) -> Envelope<T> {
  Envelope { success: true, message: None, exists: None, data: Some(data) }
}

pub fn ok_with<T>(message: impl Into<Cow<'static, str>>, data: T) -> Envelope<T> {
  Envelope { success: true, message: Some(message.into()), exists: None, data: Some(data) }
}

/// A success body that carries only a message.
pub fn message(message: impl Into<Cow<'static, str>>) -> Envelope<()> {
  Envelope { success: true, message: Some(message.into()), exists: None, data: None }
}

/// `201 Created` with a message and the new resource.
pub fn created<T: Serialize>(
  message: impl Into<Cow<'static, str>>,
  data: T,
) -> (StatusCode, Envelope<T>) {
  (StatusCode::CREATED, ok_with(message, data))
}

/// Result of a name-existence check.
pub fn exists<T>(found: Option<T>) -> Envelope<T> {
  Envelope { success: true, message: None, exists: Some(found.is_some()), data: found }
}
