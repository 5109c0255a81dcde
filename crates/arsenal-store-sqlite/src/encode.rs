//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! Catalogue timestamps are SQLite `datetime('now')` text
//! (`YYYY-MM-DD HH:MM:SS`, UTC); session timestamps are RFC 3339. JSON
//! columns are stored as compact text and decoded leniently: text that does
//! not parse reads back as the column default.

use arsenal_core::{
  lookup::{Lookup, LookupKind},
  manufacturer::{Manufacturer, ManufacturerRef},
  user::{AccountStatus, Role, User},
  weapon::{Weapon, WeaponSummary},
};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Row;
use serde_json::Value;

use crate::{Error, Result};

// ─── Timestamps ──────────────────────────────────────────────────────────────

const SQLITE_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

pub fn decode_naive(s: &str) -> Result<NaiveDateTime> {
  NaiveDateTime::parse_from_str(s, SQLITE_DATETIME)
    .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.naive_utc()))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

pub fn decode_naive_opt(s: Option<String>) -> Result<Option<NaiveDateTime>> {
  s.as_deref().map(decode_naive).transpose()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_json(v: &Value) -> Result<String> { Ok(serde_json::to_string(v)?) }

/// Parse a JSON column; `NULL` or malformed text yields `default`.
pub fn decode_json_or(s: Option<&str>, default: Value) -> Value {
  s.and_then(|s| serde_json::from_str(s).ok()).unwrap_or(default)
}

pub fn empty_object() -> Value { Value::Object(serde_json::Map::new()) }

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn encode_role(r: Role) -> &'static str {
  match r {
    Role::User => "user",
    Role::Admin => "admin",
  }
}

pub fn decode_role(s: &str) -> Role {
  match s {
    "admin" => Role::Admin,
    _ => Role::User,
  }
}

pub fn decode_status(s: &str) -> AccountStatus {
  match s {
    "disabled" | "inactive" | "banned" => AccountStatus::Disabled,
    _ => AccountStatus::Active,
  }
}

/// Table name for a lookup kind. Only ever interpolated from this match.
pub fn lookup_table(kind: LookupKind) -> &'static str {
  match kind {
    LookupKind::Category => "categories",
    LookupKind::Country => "countries",
  }
}

// ─── Row mappers ─────────────────────────────────────────────────────────────

pub const SUMMARY_COLUMNS: &str = "w.id, w.name, w.type, w.country, w.year, w.description";

/// Map a row selected with [`SUMMARY_COLUMNS`].
pub fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<WeaponSummary> {
  Ok(WeaponSummary {
    id:          row.get(0)?,
    name:        row.get::<_, Option<String>>(1)?.unwrap_or_default(),
    kind:        row.get::<_, Option<String>>(2)?.unwrap_or_default(),
    country:     row.get::<_, Option<String>>(3)?.unwrap_or_default(),
    year:        row.get(4)?,
    description: row.get(5)?,
  })
}

pub const MANUFACTURER_COLUMNS: &str =
  "m.id, m.name, m.country, m.founded, m.description, m.created_at";

/// Raw strings read directly from a `manufacturers` row.
pub struct RawManufacturer {
  pub id:          i64,
  pub name:        String,
  pub country:     Option<String>,
  pub founded:     Option<i32>,
  pub description: Option<String>,
  pub created_at:  Option<String>,
}

impl RawManufacturer {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      name:        row.get(1)?,
      country:     row.get(2)?,
      founded:     row.get(3)?,
      description: row.get(4)?,
      created_at:  row.get(5)?,
    })
  }

  pub fn into_manufacturer(self) -> Result<Manufacturer> {
    Ok(Manufacturer {
      id:          self.id,
      name:        self.name,
      country:     self.country,
      founded:     self.founded,
      description: self.description,
      created_at:  decode_naive_opt(self.created_at)?,
    })
  }
}

pub const WEAPON_COLUMNS: &str = "w.id, w.name, w.type, w.country, w.year, w.description, \
   w.specifications, w.images, w.performance_data, w.created_at, w.updated_at";

/// Raw strings read directly from a `weapons` row.
pub struct RawWeapon {
  pub summary:          WeaponSummary,
  pub specifications:   Option<String>,
  pub images:           Option<String>,
  pub performance_data: Option<String>,
  pub created_at:       Option<String>,
  pub updated_at:       Option<String>,
}

impl RawWeapon {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      summary:          summary_from_row(row)?,
      specifications:   row.get(6)?,
      images:           row.get(7)?,
      performance_data: row.get(8)?,
      created_at:       row.get(9)?,
      updated_at:       row.get(10)?,
    })
  }

  pub fn into_weapon(self, manufacturers: Vec<ManufacturerRef>) -> Result<Weapon> {
    let WeaponSummary { id, name, kind, country, year, description } = self.summary;
    Ok(Weapon {
      id,
      name,
      kind,
      country,
      year,
      description,
      specifications: decode_json_or(self.specifications.as_deref(), empty_object()),
      images: decode_json_or(self.images.as_deref(), Value::Array(Vec::new())),
      performance_data: decode_json_or(self.performance_data.as_deref(), empty_object()),
      manufacturers,
      created_at: decode_naive_opt(self.created_at)?,
      updated_at: decode_naive_opt(self.updated_at)?,
    })
  }
}

pub const USER_COLUMNS: &str = "u.id, u.username, u.email, u.name, u.phone, u.bio, u.avatar, \
   u.role, u.status, u.preferences, u.created_at, u.updated_at, u.last_login";

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub id:          i64,
  pub username:    String,
  pub email:       String,
  pub name:        Option<String>,
  pub phone:       Option<String>,
  pub bio:         Option<String>,
  pub avatar:      Option<String>,
  pub role:        Option<String>,
  pub status:      Option<String>,
  pub preferences: Option<String>,
  pub created_at:  Option<String>,
  pub updated_at:  Option<String>,
  pub last_login:  Option<String>,
}

impl RawUser {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      username:    row.get(1)?,
      email:       row.get(2)?,
      name:        row.get(3)?,
      phone:       row.get(4)?,
      bio:         row.get(5)?,
      avatar:      row.get(6)?,
      role:        row.get(7)?,
      status:      row.get(8)?,
      preferences: row.get(9)?,
      created_at:  row.get(10)?,
      updated_at:  row.get(11)?,
      last_login:  row.get(12)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:          self.id,
      username:    self.username,
      email:       self.email,
      name:        self.name,
      phone:       self.phone,
      bio:         self.bio,
      avatar:      self.avatar,
      role:        self.role.as_deref().map_or(Role::User, decode_role),
      status:      self.status.as_deref().map_or(AccountStatus::Active, decode_status),
      preferences: decode_json_or(self.preferences.as_deref(), empty_object()),
      created_at:  decode_naive_opt(self.created_at)?,
      updated_at:  decode_naive_opt(self.updated_at)?,
      last_login:  decode_naive_opt(self.last_login)?,
    })
  }
}

pub fn lookup_from_row(row: &Row<'_>) -> rusqlite::Result<Lookup> {
  Ok(Lookup { id: row.get(0)?, name: row.get(1)?, detail: row.get(2)? })
}
