//! Aggregate read models for the statistics endpoints.

use serde::{Deserialize, Serialize};

/// Bucket name for weapons without a valid manufacturer link.
pub const UNKNOWN_MANUFACTURER: &str = "未知制造商";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCount {
  #[serde(rename = "type")]
  pub kind:  String,
  pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryCount {
  pub country: String,
  pub count:   u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponStatistics {
  pub total_weapons: u64,
  /// Every type, most common first.
  pub by_type:       Vec<TypeCount>,
  /// The ten most common countries.
  pub by_country:    Vec<CountryCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManufacturerCount {
  pub manufacturer_name:    String,
  pub weapon_count:         u64,
  pub manufacturer_country: Option<String>,
}

/// Weapons per manufacturer. Each weapon is counted exactly once, so the
/// counts always add up to the number of weapon rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManufacturerWeaponCounts {
  /// Sorted by count descending, then name.
  pub statistics: Vec<ManufacturerCount>,
}

impl ManufacturerWeaponCounts {
  pub fn total_weapons(&self) -> u64 {
    self.statistics.iter().map(|s| s.weapon_count).sum()
  }

  /// `{manufacturer_name: weapon_count}` for chart consumers. Rows sharing a
  /// name are summed, so the values still add up to [`Self::total_weapons`].
  pub fn as_map(&self) -> serde_json::Map<String, serde_json::Value> {
    let mut counts: Vec<(&str, u64)> = Vec::with_capacity(self.statistics.len());
    for s in &self.statistics {
      match counts.iter_mut().find(|(name, _)| *name == s.manufacturer_name) {
        Some((_, n)) => *n += s.weapon_count,
        None => counts.push((s.manufacturer_name.as_str(), s.weapon_count)),
      }
    }
    counts.into_iter().map(|(name, n)| (name.to_owned(), n.into())).collect()
  }

  pub fn unknown(&self) -> u64 {
    self
      .statistics
      .iter()
      .filter(|s| s.manufacturer_name == UNKNOWN_MANUFACTURER)
      .map(|s| s.weapon_count)
      .sum()
  }
}

/// A manufacturer with the names of all weapons linked to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManufacturerUsage {
  pub id:           i64,
  pub name:         String,
  pub country:      Option<String>,
  pub founded:      Option<i32>,
  pub description:  Option<String>,
  pub weapon_count: u64,
  pub weapon_names: Vec<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn row(name: &str, n: u64) -> ManufacturerCount {
    ManufacturerCount { manufacturer_name: name.into(), weapon_count: n, manufacturer_country: None }
  }

  #[test]
  fn map_sums_rows_that_share_a_name() {
    let counts = ManufacturerWeaponCounts {
      statistics: vec![
        row("卡拉什尼科夫集团", 3),
        row(UNKNOWN_MANUFACTURER, 2),
        row(UNKNOWN_MANUFACTURER, 1),
      ],
    };
    let map = counts.as_map();
    assert_eq!(map.len(), 2);
    assert_eq!(map[UNKNOWN_MANUFACTURER], 3);
    let summed: u64 = map.values().filter_map(serde_json::Value::as_u64).sum();
    assert_eq!(summed, counts.total_weapons());
    assert_eq!(counts.unknown(), 3);
  }
}
