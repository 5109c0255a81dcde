//! Weapon records, write inputs, and listing queries.
//!
//! Weapons reference their type and country by name; only the
//! weapon ↔ manufacturer relationship is a real foreign-key join.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::manufacturer::ManufacturerRef;

/// The weapon types accepted by the validated create/update endpoints.
pub const WEAPON_TYPES: &[&str] = &[
  "步枪", "手枪", "机枪", "狙击枪", "火箭筒", "坦克", "战斗机", "军舰", "导弹", "火炮",
  "其他",
];

pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Large enough for clients that load the whole catalogue with one request.
pub const MAX_PAGE_SIZE: u32 = 10_000;
pub const SEARCH_LIMIT: u32 = 50;
pub const DEFAULT_SIMILAR_LIMIT: u32 = 5;

// ─── Read models ─────────────────────────────────────────────────────────────

/// The list/search projection of a weapon row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponSummary {
  pub id:          i64,
  pub name:        String,
  #[serde(rename = "type")]
  pub kind:        String,
  pub country:     String,
  pub year:        Option<i32>,
  pub description: Option<String>,
}

/// A fully-loaded weapon with its JSON columns parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weapon {
  pub id:               i64,
  pub name:             String,
  #[serde(rename = "type")]
  pub kind:             String,
  pub country:          String,
  pub year:             Option<i32>,
  pub description:      Option<String>,
  pub specifications:   serde_json::Value,
  pub images:           serde_json::Value,
  pub performance_data: serde_json::Value,
  /// Manufacturers linked through `weapon_manufacturers`.
  pub manufacturers:    Vec<ManufacturerRef>,
  pub created_at:       Option<NaiveDateTime>,
  pub updated_at:       Option<NaiveDateTime>,
}

impl Weapon {
  pub fn summary(&self) -> WeaponSummary {
    WeaponSummary {
      id:          self.id,
      name:        self.name.clone(),
      kind:        self.kind.clone(),
      country:     self.country.clone(),
      year:        self.year,
      description: self.description.clone(),
    }
  }
}

// ─── Write inputs ────────────────────────────────────────────────────────────

/// How a new weapon should be associated with a manufacturer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManufacturerLink {
  pub name:        String,
  /// Create the manufacturer instead of looking it up by name.
  #[serde(default, alias = "isNew")]
  pub is_new:      bool,
  pub country:     Option<String>,
  pub founded:     Option<i32>,
  pub description: Option<String>,
}

/// Body of weapon create and update requests.
///
/// `manufacturer` is only honoured on create.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeaponInput {
  #[serde(default)]
  pub name:             String,
  #[serde(rename = "type", default)]
  pub kind:             String,
  #[serde(default)]
  pub country:          String,
  pub year:             Option<i32>,
  pub description:      Option<String>,
  pub specifications:   Option<serde_json::Value>,
  pub performance_data: Option<serde_json::Value>,
  pub manufacturer:     Option<ManufacturerLink>,
}

/// A single failed validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
  pub field:   &'static str,
  pub message: &'static str,
}

impl FieldError {
  pub const fn new(field: &'static str, message: &'static str) -> Self {
    Self { field, message }
  }
}

impl WeaponInput {
  pub fn new(name: &str, kind: &str, country: &str) -> Self {
    Self {
      name: name.to_owned(),
      kind: kind.to_owned(),
      country: country.to_owned(),
      ..Self::default()
    }
  }

  /// Full rule set for the authenticated create/update endpoints. Returns every
  /// violated rule, not just the first.
  pub fn validate(&self) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let name_len = self.name.trim().chars().count();
    if name_len == 0 {
      errors.push(FieldError::new("name", "武器名称是必填项"));
    } else if name_len < 2 {
      errors.push(FieldError::new("name", "武器名称至少需要2个字符"));
    } else if name_len > 100 {
      errors.push(FieldError::new("name", "武器名称不能超过100个字符"));
    }

    if self.kind.is_empty() {
      errors.push(FieldError::new("type", "武器类型是必填项"));
    } else if !WEAPON_TYPES.contains(&self.kind.as_str()) {
      errors.push(FieldError::new("type", "武器类型必须是预定义的类型之一"));
    }

    let country_len = self.country.trim().chars().count();
    if country_len == 0 {
      errors.push(FieldError::new("country", "制造国家是必填项"));
    } else if country_len < 2 {
      errors.push(FieldError::new("country", "制造国家至少需要2个字符"));
    } else if country_len > 50 {
      errors.push(FieldError::new("country", "制造国家不能超过50个字符"));
    }

    if let Some(year) = self.year {
      if year < 1800 {
        errors.push(FieldError::new("year", "年份不能早于1800年"));
      } else if year > 2030 {
        errors.push(FieldError::new("year", "年份不能超过2030年"));
      }
    }

    if let Some(desc) = &self.description {
      if desc.chars().count() > 1000 {
        errors.push(FieldError::new("description", "描述不能超过1000个字符"));
      }
    }

    if let Some(specs) = &self.specifications {
      if !specs.is_object() {
        errors.push(FieldError::new("specifications", "技术规格必须是对象格式"));
      }
    }

    errors
  }

  /// The minimal check applied by the admin direct endpoints.
  pub fn has_required_fields(&self) -> bool {
    !self.name.trim().is_empty()
      && !self.kind.trim().is_empty()
      && !self.country.trim().is_empty()
  }
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::ArsenalStore::list_weapons`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeaponQuery {
  /// Exact match on the weapon's type name.
  pub category: Option<String>,
  pub country:  Option<String>,
  pub page:     Option<u32>,
  pub limit:    Option<u32>,
}

impl WeaponQuery {
  /// 1-based page number.
  pub fn page(&self) -> u32 { self.page.unwrap_or(1).max(1) }

  pub fn limit(&self) -> u32 {
    self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
  }

  pub fn offset(&self) -> u64 { u64::from(self.page() - 1) * u64::from(self.limit()) }
}

/// Parameters for [`crate::store::ArsenalStore::search_weapons`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
  /// Substring matched against name and description.
  pub q:        Option<String>,
  pub category: Option<String>,
  pub country:  Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
  pub current_page:   u32,
  pub total_pages:    u64,
  pub total_items:    u64,
  pub items_per_page: u32,
}

impl Pagination {
  pub fn new(page: u32, limit: u32, total: u64) -> Self {
    Self {
      current_page:   page,
      total_pages:    total.div_ceil(u64::from(limit.max(1))),
      total_items:    total,
      items_per_page: limit,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponPage {
  pub weapons:    Vec<WeaponSummary>,
  pub pagination: Pagination,
}

// ─── Interests ───────────────────────────────────────────────────────────────

/// How a user interacted with a weapon; stored in `user_interests`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interaction {
  View,
  Favorite,
}

impl Interaction {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::View => "view",
      Self::Favorite => "favorite",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn valid_input_has_no_errors() {
    let mut input = WeaponInput::new("AK-47突击步枪", "步枪", "俄罗斯");
    input.year = Some(1947);
    assert!(input.validate().is_empty());
  }

  #[test]
  fn rejects_unknown_type_and_short_name() {
    let input = WeaponInput::new("A", "激光炮", "美国");
    let errors = input.validate();
    let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
    assert_eq!(fields, ["name", "type"]);
  }

  #[test]
  fn year_bounds_are_inclusive() {
    let mut input = WeaponInput::new("M16突击步枪", "步枪", "美国");
    input.year = Some(1800);
    assert!(input.validate().is_empty());
    input.year = Some(2030);
    assert!(input.validate().is_empty());
    input.year = Some(2031);
    assert_eq!(input.validate()[0].field, "year");
  }

  #[test]
  fn name_length_counts_characters_not_bytes() {
    // 34 CJK characters is ~100 bytes but well under the 100-char limit.
    let name = "重".repeat(34);
    let input = WeaponInput::new(&name, "坦克", "中国");
    assert!(input.validate().is_empty());
  }

  #[test]
  fn direct_endpoints_only_need_three_fields() {
    assert!(WeaponInput::new("X", "激光炮", "火星").has_required_fields());
    assert!(!WeaponInput::new("X", "", "火星").has_required_fields());
  }

  #[test]
  fn query_defaults_and_clamping() {
    let q = WeaponQuery::default();
    assert_eq!((q.page(), q.limit(), q.offset()), (1, 20, 0));

    let q = WeaponQuery { page: Some(3), limit: Some(500), ..Default::default() };
    assert_eq!((q.page(), q.limit(), q.offset()), (3, 500, 1000));

    let q = WeaponQuery { limit: Some(50_000), ..Default::default() };
    assert_eq!(q.limit(), MAX_PAGE_SIZE);

    let q = WeaponQuery { page: Some(0), limit: Some(0), ..Default::default() };
    assert_eq!((q.page(), q.limit()), (1, 1));
  }

  #[test]
  fn pagination_rounds_up() {
    let p = Pagination::new(1, 20, 41);
    assert_eq!(p.total_pages, 3);
    assert_eq!(Pagination::new(1, 20, 0).total_pages, 0);
  }

  #[test]
  fn manufacturer_link_accepts_camel_case_flag() {
    let link: ManufacturerLink =
      serde_json::from_str(r#"{"name":"贝雷塔公司","isNew":true}"#).unwrap();
    assert!(link.is_new);
  }
}
