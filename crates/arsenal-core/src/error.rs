//! Error types for `arsenal-core`.

use thiserror::Error;

use crate::lookup::LookupKind;

#[derive(Debug, Error)]
pub enum Error {
  #[error("weapon not found: {0}")]
  WeaponNotFound(i64),

  #[error("manufacturer not found: {0}")]
  ManufacturerNotFound(i64),

  /// A weapon referenced a manufacturer by name that is not stored.
  #[error("unknown manufacturer: {0:?}")]
  UnknownManufacturer(String),

  #[error("manufacturer already exists: {0:?}")]
  DuplicateManufacturer(String),

  /// The name of the statistics bucket for weapons with no manufacturer.
  #[error("manufacturer name is reserved: {0:?}")]
  ReservedManufacturerName(String),

  #[error("manufacturer still linked to {0} weapon(s)")]
  ManufacturerInUse(u64),

  #[error("{kind} not found: {id}")]
  LookupNotFound { kind: LookupKind, id: i64 },

  #[error("{kind} already exists: {name:?}")]
  DuplicateLookup { kind: LookupKind, name: String },

  #[error("{kind} still referenced by {count} weapon(s)")]
  LookupInUse { kind: LookupKind, count: u64 },

  #[error("username or email already taken")]
  UserExists,

  #[error("user not found: {0}")]
  UserNotFound(i64),

  #[error(
    "integrity check failed: {dangling_weapons} dangling weapon link(s), \
     {dangling_manufacturers} dangling manufacturer link(s)"
  )]
  IntegrityViolation {
    dangling_weapons:       u64,
    dangling_manufacturers: u64,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
