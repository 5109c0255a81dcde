//! Manufacturers and their many-to-many link to weapons.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::weapon::WeaponSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manufacturer {
  pub id:          i64,
  /// Unique across all manufacturers.
  pub name:        String,
  pub country:     Option<String>,
  pub founded:     Option<i32>,
  pub description: Option<String>,
  pub created_at:  Option<NaiveDateTime>,
}

/// The id/name pair embedded in weapon detail responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManufacturerRef {
  pub id:   i64,
  pub name: String,
}

impl From<&Manufacturer> for ManufacturerRef {
  fn from(m: &Manufacturer) -> Self {
    Self { id: m.id, name: m.name.clone() }
  }
}

/// A manufacturer together with every weapon linked to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManufacturerDetail {
  #[serde(flatten)]
  pub manufacturer: Manufacturer,
  pub weapons:      Vec<WeaponSummary>,
}

/// Body of manufacturer create and update requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewManufacturer {
  #[serde(default)]
  pub name:        String,
  pub country:     Option<String>,
  pub founded:     Option<i32>,
  pub description: Option<String>,
}

impl NewManufacturer {
  pub fn named(name: &str, country: Option<&str>) -> Self {
    Self {
      name: name.to_owned(),
      country: country.map(str::to_owned),
      ..Self::default()
    }
  }
}
