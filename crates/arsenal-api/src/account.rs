//! Handlers for `/api/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/api/auth/register` | Returns a token; 409 on taken username/email |
//! | `POST` | `/api/auth/login` | `username` may also be the email |
//! | `GET`  | `/api/auth/profile` | Bearer |
//! | `PUT`  | `/api/auth/profile` | Bearer; partial update |
//! | `PUT`  | `/api/auth/change-password` | Bearer; `{oldPassword, newPassword}` |
//! | `POST` | `/api/auth/refresh` | Bearer; rotates the token |
//! | `POST` | `/api/auth/logout` | Bearer; revokes the token |

use arsenal_core::{
  store::ArsenalStore,
  user::{AccountStatus, NewUser, ProfileUpdate, Registration, Role, User, password_problem},
  weapon::FieldError,
};
use axum::{extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  AppState,
  auth::{self, CurrentUser},
  envelope::{self, Envelope},
  error::ApiError,
  extract::Json,
};

const BAD_CREDENTIALS: &str = "用户名或密码错误";

#[derive(Debug, Serialize)]
pub struct SessionPayload {
  pub user:       User,
  pub token:      String,
  pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TokenPayload {
  pub token:      String,
  pub expires_at: DateTime<Utc>,
}

// ─── Register ─────────────────────────────────────────────────────────────────

/// `POST /api/auth/register`
pub async fn register<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<Registration>,
) -> Result<(StatusCode, Envelope<SessionPayload>), ApiError> {
  let errors = body.validate();
  if !errors.is_empty() {
    return Err(ApiError::Validation(errors));
  }

  let password_hash = auth::hash_password(&body.password).map_err(ApiError::internal)?;
  let user = state
    .store
    .create_user(NewUser {
      username: body.username,
      email: body.email,
      password_hash,
      name: body.name,
      role: Role::User,
    })
    .await
    .map_err(ApiError::store)?;
  tracing::info!(user_id = user.id, username = %user.username, "registered user");

  let (token, expires_at) = auth::start_session(&state, user.id).await?;
  Ok(envelope::created("注册成功", SessionPayload { user, token, expires_at }))
}

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub password: String,
}

/// `POST /api/auth/login`
pub async fn login<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<Envelope<SessionPayload>, ApiError> {
  if body.username.is_empty() || body.password.is_empty() {
    return Err(ApiError::bad_request("用户名和密码都是必填项"));
  }

  let creds = state
    .store
    .find_credentials(body.username)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::Unauthorized(BAD_CREDENTIALS))?;

  if !auth::verify_password(&body.password, &creds.password_hash) {
    return Err(ApiError::Unauthorized(BAD_CREDENTIALS));
  }
  if creds.user.status == AccountStatus::Disabled {
    return Err(ApiError::Forbidden("账户已被禁用"));
  }

  let user_id = creds.user.id;
  state.store.touch_login(user_id).await.map_err(ApiError::store)?;
  let user = state.store.get_user(user_id).await.map_err(ApiError::store)?.unwrap_or(creds.user);

  let (token, expires_at) = auth::start_session(&state, user_id).await?;
  tracing::info!(user_id, "user logged in");
  Ok(envelope::ok_with("登录成功", SessionPayload { user, token, expires_at }))
}

// ─── Profile ──────────────────────────────────────────────────────────────────

/// `GET /api/auth/profile`
pub async fn profile(current: CurrentUser) -> Envelope<User> {
  envelope::ok_with("获取用户信息成功", current.user)
}

/// `PUT /api/auth/profile`
pub async fn update_profile<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Json(body): Json<ProfileUpdate>,
) -> Result<Envelope<User>, ApiError> {
  if body.is_empty() {
    return Err(ApiError::bad_request("没有需要更新的字段"));
  }
  if let Some(name) = &body.name {
    let len = name.chars().count();
    if !(2..=50).contains(&len) {
      return Err(ApiError::Validation(vec![FieldError::new("name", "姓名长度必须在2-50个字符之间")]));
    }
  }
  if body.preferences.as_ref().is_some_and(|p| !p.is_object()) {
    return Err(ApiError::Validation(vec![FieldError::new("preferences", "偏好设置必须是对象格式")]));
  }

  let user = state.store.update_profile(current.user.id, body).await.map_err(ApiError::store)?;
  tracing::info!(user_id = user.id, "updated profile");
  Ok(envelope::ok_with("资料更新成功", user))
}

// ─── Password ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChangePasswordBody {
  #[serde(default, alias = "oldPassword")]
  pub old_password: String,
  #[serde(default, alias = "newPassword")]
  pub new_password: String,
}

/// `PUT /api/auth/change-password`
pub async fn change_password<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Json(body): Json<ChangePasswordBody>,
) -> Result<Envelope<()>, ApiError> {
  if body.old_password.is_empty() || body.new_password.is_empty() {
    return Err(ApiError::bad_request("原密码和新密码都是必填项"));
  }
  if let Some(msg) = password_problem(&body.new_password) {
    return Err(ApiError::Validation(vec![FieldError::new("newPassword", msg)]));
  }

  let creds = state
    .store
    .find_credentials(current.user.username.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("用户不存在"))?;
  if !auth::verify_password(&body.old_password, &creds.password_hash) {
    return Err(ApiError::bad_request("原密码错误"));
  }

  let hash = auth::hash_password(&body.new_password).map_err(ApiError::internal)?;
  state.store.set_password_hash(current.user.id, hash).await.map_err(ApiError::store)?;
  tracing::info!(user_id = current.user.id, "changed password");
  Ok(envelope::message("密码修改成功"))
}

// ─── Tokens ───────────────────────────────────────────────────────────────────

/// `POST /api/auth/refresh`: issue a new token and revoke the one used.
pub async fn refresh<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
) -> Result<Envelope<TokenPayload>, ApiError> {
  let (token, expires_at) = auth::start_session(&state, current.user.id).await?;
  state.store.delete_session(current.token_digest).await.map_err(ApiError::store)?;
  Ok(envelope::ok_with("令牌刷新成功", TokenPayload { token, expires_at }))
}

/// `POST /api/auth/logout`
pub async fn logout<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
) -> Result<Envelope<()>, ApiError> {
  state.store.delete_session(current.token_digest).await.map_err(ApiError::store)?;
  tracing::info!(user_id = current.user.id, "user logged out");
  Ok(envelope::message("退出登录成功"))
}
