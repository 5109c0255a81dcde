//! Bearer-token sessions, password hashing, and the auth extractors.
//!
//! Tokens are 32 random bytes, URL-safe base64 encoded. The store only ever
//! sees their SHA-256 digest.

use std::fmt;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use arsenal_core::{
  store::ArsenalStore,
  user::{AccountStatus, NewUser, Role, User},
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use rand_core::{OsRng, RngCore as _};
use sha2::{Digest as _, Sha256};
use thiserror::Error;

use crate::{AppState, error::ApiError};

pub const DEFAULT_SESSION_TTL_HOURS: i64 = 168;

const TOKEN_MISSING: &str = "访问令牌缺失";
const TOKEN_INVALID: &str = "访问令牌无效或已过期";
const ACCOUNT_DISABLED: &str = "账户已被禁用";
const ADMIN_REQUIRED: &str = "需要管理员权限";

#[derive(Debug, Clone)]
pub struct AuthConfig {
  pub session_ttl: Duration,
}

impl AuthConfig {
  pub fn with_ttl_hours(hours: i64) -> Self { Self { session_ttl: Duration::hours(hours) } }
}

impl Default for AuthConfig {
  fn default() -> Self { Self::with_ttl_hours(DEFAULT_SESSION_TTL_HOURS) }
}

// ─── Passwords ────────────────────────────────────────────────────────────────

/// An argon2 hashing failure, carried as its display text.
#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct HashError(String);

/// Hash `password` into an argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, HashError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| HashError(e.to_string()))
}

/// `false` for a wrong password and for an unparseable stored hash alike.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(password_hash) else {
    return false;
  };
  Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
}

// ─── Tokens ───────────────────────────────────────────────────────────────────

/// A freshly generated bearer token. Only `digest` is persisted.
pub struct IssuedToken {
  pub token:  String,
  pub digest: String,
}

impl fmt::Debug for IssuedToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("IssuedToken").field("digest", &self.digest).finish_non_exhaustive()
  }
}

pub fn issue_token() -> IssuedToken {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  let token = URL_SAFE_NO_PAD.encode(bytes);
  IssuedToken { digest: token_digest(&token), token }
}

pub fn token_digest(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

fn bearer(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

/// Issue a token for `user_id` and store its digest. Returns the plaintext
/// token and its expiry.
pub async fn start_session<S: ArsenalStore>(
  state: &AppState<S>,
  user_id: i64,
) -> Result<(String, DateTime<Utc>), ApiError> {
  let issued = issue_token();
  let expires_at = Utc::now() + state.auth.session_ttl;
  state
    .store
    .create_session(issued.digest, user_id, expires_at)
    .await
    .map_err(ApiError::store)?;
  Ok((issued.token, expires_at))
}

// ─── Extractors ───────────────────────────────────────────────────────────────

/// An authenticated, active user together with the digest of the token
/// that authenticated them.
#[derive(Debug, Clone)]
pub struct CurrentUser {
  pub user:         User,
  pub token_digest: String,
}

impl<S: ArsenalStore> FromRequestParts<AppState<S>> for CurrentUser {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer(&parts.headers).ok_or(ApiError::Unauthorized(TOKEN_MISSING))?;
    let digest = token_digest(token);

    let session = state
      .store
      .find_session(digest.clone())
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::Unauthorized(TOKEN_INVALID))?;

    if session.user.status == AccountStatus::Disabled {
      return Err(ApiError::Forbidden(ACCOUNT_DISABLED));
    }
    Ok(CurrentUser { user: session.user, token_digest: digest })
  }
}

/// The caller if they sent a valid token; anonymous otherwise. A bad token
/// is treated like no token.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl<S: ArsenalStore> FromRequestParts<AppState<S>> for MaybeUser {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    match CurrentUser::from_request_parts(parts, state).await {
      Ok(current) => Ok(MaybeUser(Some(current.user))),
      Err(ApiError::Unauthorized(_) | ApiError::Forbidden(_)) => Ok(MaybeUser(None)),
      Err(e) => Err(e),
    }
  }
}

/// An authenticated user with the `admin` role.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub User);

impl<S: ArsenalStore> FromRequestParts<AppState<S>> for RequireAdmin {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let CurrentUser { user, .. } = CurrentUser::from_request_parts(parts, state).await?;
    if !user.is_admin() {
      return Err(ApiError::Forbidden(ADMIN_REQUIRED));
    }
    Ok(RequireAdmin(user))
  }
}

// ─── Bootstrap ────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum BootstrapError<E: std::error::Error + 'static> {
  #[error("admin password hash is not a valid PHC string")]
  InvalidHash,

  #[error("store error: {0}")]
  Store(#[source] E),
}

/// Make sure `username` exists with the admin role and the configured
/// password hash.
pub async fn bootstrap_admin<S: ArsenalStore>(
  store: &S,
  username: &str,
  password_hash: &str,
) -> Result<(), BootstrapError<S::Error>> {
  if PasswordHash::new(password_hash).is_err() {
    return Err(BootstrapError::InvalidHash);
  }

  let existing = store.find_credentials(username.to_owned()).await.map_err(BootstrapError::Store)?;
  match existing {
    None => {
      let user = store
        .create_user(NewUser {
          username:      username.to_owned(),
          email:         format!("{username}@localhost"),
          password_hash: password_hash.to_owned(),
          name:          None,
          role:          Role::Admin,
        })
        .await
        .map_err(BootstrapError::Store)?;
      tracing::info!(user_id = user.id, username, "created admin account");
    }
    Some(creds) if !creds.user.is_admin() => {
      tracing::warn!(username, "configured admin account exists without the admin role");
    }
    Some(creds) => {
      if creds.password_hash != password_hash {
        store
          .set_password_hash(creds.user.id, password_hash.to_owned())
          .await
          .map_err(BootstrapError::Store)?;
        tracing::info!(username, "updated admin password from configuration");
      }
    }
  }
  Ok(())
}
