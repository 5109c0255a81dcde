//! Reports produced by the maintenance procedures: integrity checks and
//! repair, manufacturer linking, duplicate cleanup, and seeding.

use serde::{Deserialize, Serialize};

/// State of the `weapon_manufacturers` join table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IntegrityReport {
  /// Whether `PRAGMA foreign_keys` is on for the store's connection.
  pub foreign_keys_enabled:        bool,
  pub total_links:                 u64,
  /// Rows whose weapon and manufacturer both exist.
  pub valid_links:                 u64,
  pub dangling_weapon_links:       u64,
  pub dangling_manufacturer_links: u64,
}

impl IntegrityReport {
  pub fn is_healthy(&self) -> bool {
    self.dangling_weapon_links == 0 && self.dangling_manufacturer_links == 0
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
  pub before:  IntegrityReport,
  pub after:   IntegrityReport,
  /// Rows dropped because a parent no longer existed.
  pub removed: u64,
}

/// Row counts shown by the health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableCounts {
  pub weapons:       u64,
  pub manufacturers: u64,
  pub categories:    u64,
  pub countries:     u64,
  pub users:         u64,
  pub links:         u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
  pub integrity: IntegrityReport,
  pub counts:    TableCounts,
}

impl HealthReport {
  pub fn is_healthy(&self) -> bool {
    self.integrity.is_healthy() && self.integrity.foreign_keys_enabled
  }
}

/// What the resolver decided for one weapon during
/// [`crate::store::ArsenalStore::link_manufacturers`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkOutcome {
  pub weapon_id:     i64,
  pub weapon:        String,
  pub country:       String,
  /// All matched manufacturer names, including already-linked ones.
  pub manufacturers: Vec<String>,
  /// Join rows newly written for this weapon.
  pub inserted:      u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkReport {
  pub processed: u64,
  pub inserted:  u64,
  /// One entry per weapon with at least one match.
  pub outcomes:  Vec<LinkOutcome>,
}

impl LinkReport {
  pub fn unmatched(&self) -> u64 {
    self.processed - self.outcomes.len() as u64
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateName {
  pub name:  String,
  pub count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DedupeReport {
  pub duplicates: Vec<DuplicateName>,
  pub removed:    u64,
}

/// Rows actually inserted by [`crate::store::ArsenalStore::seed_sample_data`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedReport {
  pub categories:    u64,
  pub countries:     u64,
  pub manufacturers: u64,
  pub weapons:       u64,
  pub links:         u64,
}
