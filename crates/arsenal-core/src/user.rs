//! User accounts and profile updates.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::weapon::FieldError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  #[default]
  User,
  Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
  #[default]
  Active,
  Disabled,
}

/// A user as exposed through the API. The password hash never leaves the
/// store except through [`Credentials`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub id:          i64,
  pub username:    String,
  pub email:       String,
  pub name:        Option<String>,
  pub phone:       Option<String>,
  pub bio:         Option<String>,
  pub avatar:      Option<String>,
  pub role:        Role,
  pub status:      AccountStatus,
  pub preferences: serde_json::Value,
  pub created_at:  Option<NaiveDateTime>,
  pub updated_at:  Option<NaiveDateTime>,
  pub last_login:  Option<NaiveDateTime>,
}

impl User {
  pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}

/// A user row plus its stored argon2 PHC string; returned only for login and
/// password checks.
#[derive(Debug, Clone)]
pub struct Credentials {
  pub user:          User,
  pub password_hash: String,
}

/// Input to [`crate::store::ArsenalStore::create_user`]. The password is
/// already hashed by the caller.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username:      String,
  pub email:         String,
  pub password_hash: String,
  pub name:          Option<String>,
  pub role:          Role,
}

/// Partial profile update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
  pub name:        Option<String>,
  pub phone:       Option<String>,
  pub bio:         Option<String>,
  pub avatar:      Option<String>,
  pub preferences: Option<serde_json::Value>,
}

impl ProfileUpdate {
  pub fn is_empty(&self) -> bool {
    self.name.is_none()
      && self.phone.is_none()
      && self.bio.is_none()
      && self.avatar.is_none()
      && self.preferences.is_none()
  }
}

/// A live bearer-token session, resolved to its user.
#[derive(Debug, Clone)]
pub struct Session {
  pub user:       User,
  pub expires_at: DateTime<Utc>,
}

// ─── Registration ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registration {
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub email:    String,
  #[serde(default)]
  pub password: String,
  pub name:     Option<String>,
}

impl Registration {
  pub fn validate(&self) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let username_len = self.username.chars().count();
    if username_len == 0 {
      errors.push(FieldError::new("username", "用户名是必填项"));
    } else if !self.username.chars().all(|c| c.is_ascii_alphanumeric()) {
      errors.push(FieldError::new("username", "用户名只能包含字母和数字"));
    } else if username_len < 3 {
      errors.push(FieldError::new("username", "用户名至少需要3个字符"));
    } else if username_len > 30 {
      errors.push(FieldError::new("username", "用户名不能超过30个字符"));
    }

    if self.email.is_empty() {
      errors.push(FieldError::new("email", "邮箱是必填项"));
    } else if !looks_like_email(&self.email) {
      errors.push(FieldError::new("email", "请输入有效的邮箱地址"));
    }

    if let Some(msg) = password_problem(&self.password) {
      errors.push(FieldError::new("password", msg));
    }

    if let Some(name) = &self.name {
      let len = name.chars().count();
      if len < 2 {
        errors.push(FieldError::new("name", "姓名至少需要2个字符"));
      } else if len > 50 {
        errors.push(FieldError::new("name", "姓名不能超过50个字符"));
      }
    }

    errors
  }
}

/// Length rule shared by registration and password changes.
pub fn password_problem(password: &str) -> Option<&'static str> {
  let len = password.chars().count();
  if len == 0 {
    Some("密码是必填项")
  } else if len < 6 {
    Some("密码至少需要6个字符")
  } else if len > 128 {
    Some("密码不能超过128个字符")
  } else {
    None
  }
}

fn looks_like_email(s: &str) -> bool {
  match s.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && !domain.contains('@')
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
    }
    None => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn reg(username: &str, email: &str, password: &str) -> Registration {
    Registration {
      username: username.into(),
      email:    email.into(),
      password: password.into(),
      name:     None,
    }
  }

  #[test]
  fn accepts_well_formed_registration() {
    assert!(reg("alice01", "alice@example.com", "hunter22").validate().is_empty());
  }

  #[test]
  fn rejects_non_alphanumeric_username() {
    let errors = reg("ali_ce", "alice@example.com", "hunter22").validate();
    assert_eq!(errors, [FieldError::new("username", "用户名只能包含字母和数字")]);
  }

  #[test]
  fn rejects_bad_email_and_short_password() {
    let errors = reg("alice", "alice@localhost", "123").validate();
    let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
    assert_eq!(fields, ["email", "password"]);
  }

  #[test]
  fn empty_profile_update_is_detected() {
    assert!(ProfileUpdate::default().is_empty());
    let update = ProfileUpdate { bio: Some(String::new()), ..Default::default() };
    assert!(!update.is_empty());
  }
}
