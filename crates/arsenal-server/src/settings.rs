//! Runtime configuration: an optional TOML file layered under `ARSENAL_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                 String,
  #[serde(default = "default_port")]
  pub port:                 u16,
  #[serde(default = "default_store_path")]
  pub store_path:           PathBuf,
  /// Turn on `PRAGMA foreign_keys` for the store connection.
  #[serde(default = "default_true")]
  pub enforce_foreign_keys: bool,
  /// Insert the reference lookups, manufacturers and sample weapons on
  /// start. Idempotent.
  #[serde(default = "default_true")]
  pub seed_sample_data:     bool,
  #[serde(default = "default_session_ttl_hours")]
  pub session_ttl_hours:    i64,
  /// Account created or promoted to admin on start, together with
  /// `admin_password_hash`.
  pub admin_username:       Option<String>,
  /// argon2 PHC string; generate one with `arsenal hash-password`.
  pub admin_password_hash:  Option<String>,
  /// Origins allowed to call the API from a browser. `"*"` allows any;
  /// an empty list disables CORS. `ARSENAL_CORS_ORIGINS` is comma-separated.
  #[serde(default = "default_cors_origins")]
  pub cors_origins:         Vec<String>,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 3001 }
fn default_store_path() -> PathBuf { PathBuf::from("data/arsenal.db") }
fn default_true() -> bool { true }
fn default_session_ttl_hours() -> i64 { arsenal_api::auth::DEFAULT_SESSION_TTL_HOURS }
fn default_cors_origins() -> Vec<String> { vec!["*".to_owned()] }

impl ServerConfig {
  /// Read `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("ARSENAL")
          .try_parsing(true)
          .list_separator(",")
          .with_list_parse_key("cors_origins"),
      )
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  /// Both halves of the admin credentials, or neither.
  pub fn admin(&self) -> anyhow::Result<Option<(&str, &str)>> {
    match (self.admin_username.as_deref(), self.admin_password_hash.as_deref()) {
      (Some(user), Some(hash)) => Ok(Some((user, hash))),
      (None, None) => Ok(None),
      _ => anyhow::bail!("admin_username and admin_password_hash must be set together"),
    }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn from_toml(src: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(config::File::from_str(src, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_file_uses_defaults() {
    let cfg = from_toml("");
    assert_eq!(cfg.address(), "127.0.0.1:3001");
    assert_eq!(cfg.store_path, PathBuf::from("data/arsenal.db"));
    assert!(cfg.enforce_foreign_keys);
    assert!(cfg.seed_sample_data);
    assert_eq!(cfg.session_ttl_hours, 168);
    assert_eq!(cfg.cors_origins, ["*"]);
    assert!(cfg.admin().unwrap().is_none());
  }

  #[test]
  fn file_values_override_defaults() {
    let cfg = from_toml(
      r#"
        port = 8080
        enforce_foreign_keys = false
        cors_origins = []
        admin_username = "root"
        admin_password_hash = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"
      "#,
    );
    assert_eq!(cfg.port, 8080);
    assert!(!cfg.enforce_foreign_keys);
    assert!(cfg.cors_origins.is_empty());
    assert_eq!(cfg.admin().unwrap().map(|(u, _)| u), Some("root"));
  }

  #[test]
  fn half_configured_admin_is_an_error() {
    let cfg = from_toml(r#"admin_username = "root""#);
    assert!(cfg.admin().is_err());
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/a.db")), PathBuf::from(home).join("a.db"));
    assert_eq!(expand_tilde(Path::new("/tmp/a.db")), PathBuf::from("/tmp/a.db"));
  }
}
