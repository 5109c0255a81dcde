//! Name-keyed lookup tables: weapon types (`categories`) and countries.
//!
//! Both tables have the same shape (an id, a unique name and one optional
//! text column) and weapons refer to them by name rather than by id, so a
//! single model serves both.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKind {
  Category,
  Country,
}

impl LookupKind {
  /// Name of the optional text column: `description` for categories, `code`
  /// for countries.
  pub fn detail_field(self) -> &'static str {
    match self {
      Self::Category => "description",
      Self::Country => "code",
    }
  }

  /// The `weapons` column holding the referencing name.
  pub fn weapon_column(self) -> &'static str {
    match self {
      Self::Category => "type",
      Self::Country => "country",
    }
  }

  /// Human-readable noun used in user-facing messages.
  pub fn label(self) -> &'static str {
    match self {
      Self::Category => "武器类型",
      Self::Country => "国家",
    }
  }
}

impl fmt::Display for LookupKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Category => f.write_str("category"),
      Self::Country => f.write_str("country"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lookup {
  pub id:     i64,
  pub name:   String,
  /// `description` or `code`, depending on the kind.
  pub detail: Option<String>,
}

/// A lookup entry together with how many weapons reference its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupDetail {
  pub lookup:       Lookup,
  pub weapon_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewLookup {
  pub name:   String,
  pub detail: Option<String>,
}

impl NewLookup {
  pub fn named(name: &str) -> Self {
    Self { name: name.to_owned(), detail: None }
  }
}
