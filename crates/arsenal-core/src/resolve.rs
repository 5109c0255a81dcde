//! Heuristic entity resolution: inferring a weapon's manufacturer, country and
//! type from its free-text name.
//!
//! Everything here is best-effort and driven by fixed, ordered tables. A name
//! matches a rule when it contains the rule's pattern (case-insensitively);
//! the first matching rule in table order wins. Anything that matches nothing
//! resolves to [`UNKNOWN`].

use serde::Serialize;

use crate::{lookup::Lookup, manufacturer::Manufacturer};

/// Placeholder for an attribute no rule could infer.
pub const UNKNOWN: &str = "未知";

// ─── Rule tables ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct NameRule {
  pub pattern:       &'static str,
  pub country:       &'static str,
  pub category:      Option<&'static str>,
  pub manufacturers: &'static [&'static str],
}

const fn rule(
  pattern: &'static str,
  country: &'static str,
  category: Option<&'static str>,
  manufacturers: &'static [&'static str],
) -> NameRule {
  NameRule { pattern, country, category, manufacturers }
}

const RIFLE: Option<&str> = Some("步枪");
const PISTOL: Option<&str> = Some("手枪");
const TANK: Option<&str> = Some("坦克");
const FIGHTER: Option<&str> = Some("战斗机");
const SHIP: Option<&str> = Some("军舰");
const MISSILE: Option<&str> = Some("导弹");

/// Ordered name rules. More specific patterns precede the general ones they
/// contain (`B-21` before `B-2`, `东风-41` before `东风`).
pub const NAME_RULES: &[NameRule] = &[
  // United States
  rule("M16", "美国", RIFLE, &["柯尔特公司"]),
  rule("M4", "美国", RIFLE, &["柯尔特公司"]),
  rule("M9手枪", "美国", PISTOL, &["贝雷塔公司"]),
  rule("F-22", "美国", FIGHTER, &["洛克希德·马丁"]),
  rule("F-35", "美国", FIGHTER, &["洛克希德·马丁"]),
  rule("F-16", "美国", FIGHTER, &["洛克希德·马丁"]),
  rule("F-15", "美国", FIGHTER, &["波音公司"]),
  rule("F/A-18", "美国", FIGHTER, &["波音公司"]),
  rule("AH-64", "美国", None, &["波音公司"]),
  rule("阿帕奇", "美国", None, &["波音公司"]),
  rule("Apache", "美国", None, &["波音公司"]),
  rule("CH-47", "美国", None, &["波音公司"]),
  rule("B-21", "美国", None, &["诺斯罗普·格鲁曼"]),
  rule("B-2", "美国", None, &["诺斯罗普·格鲁曼"]),
  rule("E-2", "美国", None, &["诺斯罗普·格鲁曼"]),
  rule("Global Hawk", "美国", None, &["诺斯罗普·格鲁曼"]),
  rule("Predator", "美国", None, &["通用原子航空系统"]),
  rule("Reaper", "美国", None, &["通用原子航空系统"]),
  rule("Patriot", "美国", MISSILE, &["雷神公司"]),
  rule("爱国者", "美国", MISSILE, &["雷神公司"]),
  rule("Tomahawk", "美国", MISSILE, &["雷神公司"]),
  rule("AMRAAM", "美国", MISSILE, &["雷神公司"]),
  rule("Sidewinder", "美国", MISSILE, &["雷神公司"]),
  rule("Stinger", "美国", MISSILE, &["雷神公司"]),
  rule("毒刺", "美国", MISSILE, &["雷神公司"]),
  rule("Hellfire", "美国", MISSILE, &["洛克希德·马丁", "波音公司"]),
  rule("海尔法", "美国", MISSILE, &["洛克希德·马丁", "波音公司"]),
  rule("Abrams", "美国", TANK, &["通用动力"]),
  rule("M1A2", "美国", TANK, &["通用动力"]),
  rule("Bradley", "美国", None, &["BAE系统公司"]),
  rule("Paladin", "美国", Some("火炮"), &["BAE系统公司"]),
  rule("伯克级", "美国", SHIP, &["通用动力巴斯铁工厂", "英格尔斯造船厂"]),
  rule("提康德罗加级", "美国", SHIP, &["通用动力巴斯铁工厂", "英格尔斯造船厂"]),
  // Russia
  rule("AK-", "俄罗斯", RIFLE, &["卡拉什尼科夫集团"]),
  rule("AK47", "俄罗斯", RIFLE, &["卡拉什尼科夫集团"]),
  rule("Su-", "俄罗斯", FIGHTER, &["苏霍伊设计局"]),
  rule("MiG-", "俄罗斯", FIGHTER, &["米格设计局"]),
  rule("Tu-", "俄罗斯", None, &["图波列夫设计局"]),
  rule("S-300", "俄罗斯", MISSILE, &["阿尔马兹-安泰"]),
  rule("S-400", "俄罗斯", MISSILE, &["阿尔马兹-安泰"]),
  rule("S-500", "俄罗斯", MISSILE, &["阿尔马兹-安泰"]),
  rule("T-80", "俄罗斯", TANK, &["列宁格勒基洛夫工厂"]),
  rule("T-72", "俄罗斯", TANK, &["乌拉尔车辆厂"]),
  rule("T-90", "俄罗斯", TANK, &["乌拉尔车辆厂"]),
  rule("T-14", "俄罗斯", TANK, &["乌拉尔车辆厂"]),
  // China
  rule("J-10", "中国", FIGHTER, &["成都飞机工业集团"]),
  rule("J-20", "中国", FIGHTER, &["成都飞机工业集团"]),
  rule("J-11", "中国", FIGHTER, &["沈阳飞机工业集团"]),
  rule("J-15", "中国", FIGHTER, &["沈阳飞机工业集团"]),
  rule("J-16", "中国", FIGHTER, &["沈阳飞机工业集团"]),
  rule("H-6", "中国", None, &["西安飞机工业集团"]),
  rule("Y-20", "中国", None, &["西安飞机工业集团"]),
  rule("Z-10", "中国", None, &["昌河飞机工业集团"]),
  rule("Z-19", "中国", None, &["哈尔滨飞机工业集团"]),
  rule("东风-41", "中国", MISSILE, &["中国航天科技集团"]),
  rule("DF-41", "中国", MISSILE, &["中国航天科技集团"]),
  rule("东风", "中国", MISSILE, &["中国航天科工集团"]),
  rule("DF-", "中国", MISSILE, &["中国航天科工集团"]),
  rule("HQ-9", "中国", MISSILE, &["中国航天科工集团"]),
  rule("055型", "中国", SHIP, &["江南造船厂"]),
  rule("Type 99", "中国", TANK, &["中国北方工业公司"]),
  rule("Type 96", "中国", TANK, &["中国北方工业公司"]),
  rule("99式", "中国", TANK, &["中国北方工业公司"]),
  rule("96式", "中国", TANK, &["中国北方工业公司"]),
  // Germany
  rule("Leopard 2", "德国", TANK, &["莱茵金属"]),
  rule("豹2", "德国", TANK, &["莱茵金属"]),
  rule("G36", "德国", RIFLE, &["Heckler & Koch"]),
  rule("HK416", "德国", RIFLE, &["Heckler & Koch"]),
  rule("HK417", "德国", RIFLE, &["Heckler & Koch"]),
  rule("MP5", "德国", None, &["Heckler & Koch"]),
  // Austria / Belgium / Italy
  rule("Glock", "奥地利", PISTOL, &["格洛克公司"]),
  rule("格洛克", "奥地利", PISTOL, &["格洛克公司"]),
  rule("AUG", "奥地利", RIFLE, &["斯太尔-曼利夏"]),
  rule("P90", "比利时", None, &["埃斯塔勒国营工厂"]),
  rule("贝雷塔92", "意大利", PISTOL, &["贝雷塔公司"]),
  // Europe
  rule("阵风", "法国", FIGHTER, &["达索航空"]),
  rule("Rafale", "法国", FIGHTER, &["达索航空"]),
  rule("台风", "欧洲", FIGHTER, &["空中客车防务与航天"]),
  rule("Typhoon", "欧洲", FIGHTER, &["空中客车防务与航天"]),
  // Israel
  rule("Merkava", "以色列", TANK, &["以色列军事工业"]),
  rule("梅卡瓦", "以色列", TANK, &["以色列军事工业"]),
  rule("Iron Dome", "以色列", MISSILE, &["拉斐尔先进防务系统"]),
  rule("铁穹", "以色列", MISSILE, &["拉斐尔先进防务系统"]),
  rule("David's Sling", "以色列", MISSILE, &["拉斐尔先进防务系统"]),
  rule("Spike", "以色列", MISSILE, &["拉斐尔先进防务系统"]),
  rule("Jericho", "以色列", MISSILE, &["以色列航空工业"]),
];

/// Known manufacturers per country, used when a weapon's name matches no
/// rule.
pub const COUNTRY_MANUFACTURERS: &[(&str, &[&str])] = &[
  ("美国", &["洛克希德·马丁", "波音公司", "诺斯罗普·格鲁曼", "雷神公司", "通用动力", "柯尔特公司"]),
  ("俄罗斯", &["苏霍伊设计局", "米格设计局", "图波列夫设计局", "卡拉什尼科夫集团", "阿尔马兹-安泰"]),
  ("中国", &["成都飞机工业集团", "沈阳飞机工业集团", "西安飞机工业集团", "中国航天科工集团", "中国北方工业公司"]),
  ("德国", &["莱茵金属", "Heckler & Koch"]),
  ("奥地利", &["格洛克公司", "斯太尔-曼利夏"]),
  ("以色列", &["以色列军事工业", "拉斐尔先进防务系统", "以色列航空工业"]),
  ("法国", &["达索航空", "泰雷兹集团"]),
  ("英国", &["BAE系统公司"]),
  ("意大利", &["贝雷塔公司"]),
  ("欧洲", &["空中客车防务与航天"]),
];

/// Groups of interchangeable type names.
pub const CATEGORY_SYNONYMS: &[&[&str]] = &[
  &["自动步枪", "突击步枪", "步枪"],
  &["手枪", "pistol"],
  &["坦克", "主战坦克"],
  &["战斗机", "战机"],
  &["导弹", "火箭"],
  &["直升机", "武装直升机"],
  &["驱逐舰", "军舰"],
  &["巡洋舰", "军舰"],
  &["轰炸机", "战略轰炸机"],
  &["防空系统", "防空导弹"],
];

const REGIONS: &[(&str, &str)] = &[
  ("美国", "北美洲"),
  ("俄罗斯", "欧亚大陆"),
  ("中国", "亚洲"),
  ("德国", "欧洲"),
  ("法国", "欧洲"),
  ("英国", "欧洲"),
  ("以色列", "中东"),
  ("瑞典", "欧洲"),
  ("意大利", "欧洲"),
  ("日本", "亚洲"),
  ("奥地利", "欧洲"),
  ("西班牙", "欧洲"),
];

// ─── Pure inference ──────────────────────────────────────────────────────────

/// The first rule whose pattern occurs in `name`.
pub fn first_rule(name: &str) -> Option<&'static NameRule> {
  let name = name.to_lowercase();
  NAME_RULES
    .iter()
    .find(|r| name.contains(&r.pattern.to_lowercase()))
}

/// What the rule tables say about a weapon name, independent of what is
/// stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inference {
  pub manufacturers: Vec<&'static str>,
  pub country:       &'static str,
  pub category:      &'static str,
}

pub fn infer(name: &str) -> Inference {
  match first_rule(name) {
    Some(r) => Inference {
      manufacturers: r.manufacturers.to_vec(),
      country:       r.country,
      category:      r.category.unwrap_or(UNKNOWN),
    },
    None => Inference {
      manufacturers: Vec::new(),
      country:       UNKNOWN,
      category:      UNKNOWN,
    },
  }
}

pub fn region_of(country: &str) -> &'static str {
  REGIONS
    .iter()
    .find(|(c, _)| *c == country)
    .map_or(UNKNOWN, |(_, region)| region)
}

/// Find the category a weapon type refers to: exact name first, then any
/// category in a synonym group containing `weapon_type`.
pub fn match_category<'a>(weapon_type: &str, categories: &'a [Lookup]) -> Option<&'a Lookup> {
  if let Some(exact) = categories.iter().find(|c| c.name == weapon_type) {
    return Some(exact);
  }
  CATEGORY_SYNONYMS
    .iter()
    .filter(|group| group.contains(&weapon_type))
    .find_map(|group| categories.iter().find(|c| group.contains(&c.name.as_str())))
}

// ─── Resolver over stored manufacturers ──────────────────────────────────────

/// Maps rule-table manufacturer names onto stored manufacturer rows.
pub struct Resolver<'a> {
  manufacturers: &'a [Manufacturer],
}

impl<'a> Resolver<'a> {
  pub fn new(manufacturers: &'a [Manufacturer]) -> Self { Self { manufacturers } }

  /// A stored manufacturer whose name contains, or is contained in, `name`.
  pub fn find(&self, name: &str) -> Option<&'a Manufacturer> {
    if name.is_empty() {
      return None;
    }
    self.manufacturers.iter().find(|m| {
      !m.name.is_empty() && (m.name.contains(name) || name.contains(m.name.as_str()))
    })
  }

  /// Manufacturers named by the first rule matching `weapon_name`.
  pub fn by_name(&self, weapon_name: &str) -> Vec<&'a Manufacturer> {
    first_rule(weapon_name)
      .map(|r| r.manufacturers.iter().filter_map(|n| self.find(n)).collect())
      .unwrap_or_default()
  }

  /// Known manufacturers for `country`; failing that, every stored
  /// manufacturer based there. Unknown countries resolve to nothing.
  pub fn by_country(&self, country: &str) -> Vec<&'a Manufacturer> {
    if country.is_empty() || country == UNKNOWN {
      return Vec::new();
    }
    let known: Vec<_> = COUNTRY_MANUFACTURERS
      .iter()
      .find(|(c, _)| *c == country)
      .map(|(_, names)| names.iter().filter_map(|n| self.find(n)).collect())
      .unwrap_or_default();
    if !known.is_empty() {
      return known;
    }
    self
      .manufacturers
      .iter()
      .filter(|m| m.country.as_deref() == Some(country))
      .collect()
  }

  /// Name rules first, country fallback second; deduplicated by id in match
  /// order.
  pub fn manufacturers_for(&self, weapon_name: &str, country: &str) -> Vec<&'a Manufacturer> {
    let mut matches = self.by_name(weapon_name);
    if matches.is_empty() {
      matches = self.by_country(country);
    }
    let mut seen = Vec::with_capacity(matches.len());
    matches.retain(|m| {
      if seen.contains(&m.id) {
        false
      } else {
        seen.push(m.id);
        true
      }
    });
    matches
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn manufacturer(id: i64, name: &str, country: &str) -> Manufacturer {
    Manufacturer {
      id,
      name: name.into(),
      country: Some(country.into()),
      founded: None,
      description: None,
      created_at: None,
    }
  }

  fn lookup(id: i64, name: &str) -> Lookup {
    Lookup { id, name: name.into(), detail: None }
  }

  #[test]
  fn ak_prefix_resolves_to_russia() {
    let inf = infer("AK-74M突击步枪");
    assert_eq!(inf.country, "俄罗斯");
    assert_eq!(inf.category, "步枪");
    assert_eq!(inf.manufacturers, ["卡拉什尼科夫集团"]);
  }

  #[test]
  fn matching_is_case_insensitive() {
    assert_eq!(infer("glock 19").country, "奥地利");
    assert_eq!(infer("su-57战斗机").manufacturers, ["苏霍伊设计局"]);
  }

  #[test]
  fn unmatched_name_is_unknown() {
    let inf = infer("某型试验武器");
    assert_eq!(inf.country, UNKNOWN);
    assert_eq!(inf.category, UNKNOWN);
    assert!(inf.manufacturers.is_empty());
  }

  #[test]
  fn first_matching_rule_wins() {
    // "B-21" also contains "B-2"; the earlier, more specific rule is used.
    assert_eq!(first_rule("B-21突袭者").unwrap().pattern, "B-21");
    // "东风-41" also contains "东风".
    assert_eq!(infer("东风-41洲际导弹").manufacturers, ["中国航天科技集团"]);
    assert_eq!(infer("东风-21D").manufacturers, ["中国航天科工集团"]);
  }

  #[test]
  fn region_table_with_fallback() {
    assert_eq!(region_of("美国"), "北美洲");
    assert_eq!(region_of("巴西"), UNKNOWN);
  }

  #[test]
  fn category_exact_then_synonym() {
    let cats = [lookup(1, "步枪"), lookup(2, "军舰"), lookup(3, "坦克")];
    assert_eq!(match_category("坦克", &cats).map(|c| c.id), Some(3));
    assert_eq!(match_category("突击步枪", &cats).map(|c| c.id), Some(1));
    assert_eq!(match_category("驱逐舰", &cats).map(|c| c.id), Some(2));
    assert_eq!(match_category("潜艇", &cats), None);
  }

  #[test]
  fn resolver_prefers_name_rules_over_country() {
    let stored = [
      manufacturer(1, "柯尔特公司", "美国"),
      manufacturer(2, "洛克希德·马丁", "美国"),
      manufacturer(3, "卡拉什尼科夫集团", "俄罗斯"),
    ];
    let r = Resolver::new(&stored);

    let by_name: Vec<_> = r.manufacturers_for("M16A4", "美国").iter().map(|m| m.id).collect();
    assert_eq!(by_name, [1]);

    // No name rule: fall back to the country table, in table order.
    let by_country: Vec<_> =
      r.manufacturers_for("某型无人机", "美国").iter().map(|m| m.id).collect();
    assert_eq!(by_country, [2, 1]);

    assert!(r.manufacturers_for("某型无人机", UNKNOWN).is_empty());
  }

  #[test]
  fn resolver_falls_back_to_stored_country() {
    let stored = [manufacturer(7, "萨博集团", "瑞典")];
    let r = Resolver::new(&stored);
    let ids: Vec<_> = r.by_country("瑞典").iter().map(|m| m.id).collect();
    assert_eq!(ids, [7]);
  }

  #[test]
  fn resolver_name_match_is_bidirectional() {
    let stored = [manufacturer(1, "卡拉什尼科夫", "俄罗斯")];
    let r = Resolver::new(&stored);
    assert_eq!(r.find("卡拉什尼科夫集团").map(|m| m.id), Some(1));
    assert_eq!(r.find(""), None);
  }

  #[test]
  fn rule_with_unstored_manufacturer_yields_nothing_by_name() {
    let stored = [manufacturer(1, "波音公司", "美国")];
    let r = Resolver::new(&stored);
    assert!(r.by_name("F-22猛禽").is_empty());
    // ... but the country fallback still applies.
    let ids: Vec<_> = r.manufacturers_for("F-22猛禽", "美国").iter().map(|m| m.id).collect();
    assert_eq!(ids, [1]);
  }
}
