//! Knowledge-graph projection of the catalogue.
//!
//! The store hands over a [`GraphSnapshot`] of plain rows; [`build`] turns it
//! into typed nodes and relationships for visualisation. Every link endpoint
//! is guaranteed to be a node in the same graph.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::{
  lookup::Lookup,
  manufacturer::Manufacturer,
  resolve::{self, Resolver},
  weapon::WeaponSummary,
};

pub const USES: &str = "使用";
pub const OF_TYPE: &str = "类型";
pub const MANUFACTURES: &str = "制造";
pub const BASED_IN: &str = "属于";

/// Everything [`build`] needs, read in one pass by the store.
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
  pub weapons:       Vec<WeaponSummary>,
  pub countries:     Vec<Lookup>,
  pub categories:    Vec<Lookup>,
  pub manufacturers: Vec<Manufacturer>,
  /// Valid `(weapon_id, manufacturer_id)` join rows.
  pub links:         Vec<(i64, i64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
  pub id:         String,
  pub labels:     Vec<String>,
  pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
  pub source: String,
  pub target: String,
  #[serde(rename = "type")]
  pub kind:   String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
  pub nodes: Vec<Node>,
  pub links: Vec<Link>,
}

fn weapon_id(id: i64) -> String { format!("weapon_{id}") }
fn country_id(id: i64) -> String { format!("country_{id}") }
fn type_id(id: i64) -> String { format!("type_{id}") }
fn manufacturer_id(id: i64) -> String { format!("manufacturer_{id}") }

fn node(id: String, label: &str, properties: Value) -> Node {
  let properties = match properties {
    Value::Object(map) => map,
    _ => Map::new(),
  };
  Node { id, labels: vec![label.to_owned()], properties }
}

pub fn build(snapshot: &GraphSnapshot) -> Graph {
  let mut nodes = Vec::new();

  for w in &snapshot.weapons {
    nodes.push(node(
      weapon_id(w.id),
      "Weapon",
      json!({
        "name": w.name,
        "type": w.kind,
        "country": w.country,
        "year": w.year,
        "description": w.description,
      }),
    ));
  }
  for c in &snapshot.countries {
    nodes.push(node(
      country_id(c.id),
      "Country",
      json!({ "name": c.name, "code": c.detail, "region": resolve::region_of(&c.name) }),
    ));
  }
  for t in &snapshot.categories {
    nodes.push(node(
      type_id(t.id),
      "Type",
      json!({ "name": t.name, "description": t.detail }),
    ));
  }
  for m in &snapshot.manufacturers {
    nodes.push(node(
      manufacturer_id(m.id),
      "Manufacturer",
      json!({
        "name": m.name,
        "country": m.country,
        "founded": m.founded,
        "description": m.description,
      }),
    ));
  }

  let country_by_name: HashMap<&str, i64> =
    snapshot.countries.iter().map(|c| (c.name.as_str(), c.id)).collect();
  let manufacturer_ids: HashSet<i64> = snapshot.manufacturers.iter().map(|m| m.id).collect();

  let mut stored: HashMap<i64, Vec<i64>> = HashMap::new();
  for &(w, m) in &snapshot.links {
    if manufacturer_ids.contains(&m) {
      stored.entry(w).or_default().push(m);
    }
  }

  let resolver = Resolver::new(&snapshot.manufacturers);
  let mut links = Vec::new();

  for w in &snapshot.weapons {
    let source = weapon_id(w.id);

    if let Some(&c) = country_by_name.get(w.country.as_str()) {
      links.push(Link { source: source.clone(), target: country_id(c), kind: USES.into() });
    }

    if let Some(t) = resolve::match_category(&w.kind, &snapshot.categories) {
      links.push(Link { source: source.clone(), target: type_id(t.id), kind: OF_TYPE.into() });
    }

    // Stored links take precedence; otherwise the first name-rule match.
    match stored.get(&w.id) {
      Some(ms) => {
        for m in ms {
          links.push(Link {
            source: manufacturer_id(*m),
            target: source.clone(),
            kind:   MANUFACTURES.into(),
          });
        }
      }
      None => {
        if let Some(m) = resolver.by_name(&w.name).first() {
          links.push(Link {
            source: manufacturer_id(m.id),
            target: source.clone(),
            kind:   MANUFACTURES.into(),
          });
        }
      }
    }
  }

  for m in &snapshot.manufacturers {
    let Some(country) = m.country.as_deref() else { continue };
    if let Some(&c) = country_by_name.get(country) {
      links.push(Link {
        source: manufacturer_id(m.id),
        target: country_id(c),
        kind:   BASED_IN.into(),
      });
    }
  }

  Graph { nodes, links }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn weapon(id: i64, name: &str, kind: &str, country: &str) -> WeaponSummary {
    WeaponSummary {
      id,
      name: name.into(),
      kind: kind.into(),
      country: country.into(),
      year: None,
      description: None,
    }
  }

  fn lookup(id: i64, name: &str) -> Lookup {
    Lookup { id, name: name.into(), detail: None }
  }

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

  fn snapshot() -> GraphSnapshot {
    GraphSnapshot {
      weapons:       vec![
        weapon(1, "AK-47突击步枪", "步枪", "俄罗斯"),
        weapon(2, "M16突击步枪", "突击步枪", "美国"),
        weapon(3, "某型试验武器", "激光炮", "火星"),
      ],
      countries:     vec![lookup(10, "俄罗斯"), lookup(11, "美国")],
      categories:    vec![lookup(20, "步枪")],
      manufacturers: vec![
        manufacturer(30, "卡拉什尼科夫集团", "俄罗斯"),
        manufacturer(31, "柯尔特公司", "美国"),
        manufacturer(32, "萨博集团", "瑞典"),
      ],
      links:         vec![(1, 30)],
    }
  }

  fn has(graph: &Graph, source: &str, target: &str, kind: &str) -> bool {
    graph
      .links
      .iter()
      .any(|l| l.source == source && l.target == target && l.kind == kind)
  }

  #[test]
  fn every_row_becomes_a_node() {
    let g = build(&snapshot());
    assert_eq!(g.nodes.len(), 3 + 2 + 1 + 3);
    let russia = g.nodes.iter().find(|n| n.id == "country_10").unwrap();
    assert_eq!(russia.labels, ["Country"]);
    assert_eq!(russia.properties["region"], "欧亚大陆");
  }

  #[test]
  fn links_cover_all_relationship_kinds() {
    let g = build(&snapshot());
    assert!(has(&g, "weapon_1", "country_10", USES));
    assert!(has(&g, "weapon_1", "type_20", OF_TYPE));
    assert!(has(&g, "manufacturer_30", "weapon_1", MANUFACTURES));
    // Synonym match for the type, name rule for the manufacturer.
    assert!(has(&g, "weapon_2", "type_20", OF_TYPE));
    assert!(has(&g, "manufacturer_31", "weapon_2", MANUFACTURES));
    assert!(has(&g, "manufacturer_31", "country_11", BASED_IN));
  }

  #[test]
  fn unresolvable_weapon_has_no_links() {
    let g = build(&snapshot());
    assert!(!g.links.iter().any(|l| l.source == "weapon_3" || l.target == "weapon_3"));
    // Manufacturer whose country has no node gets no 属于 link.
    assert!(!g.links.iter().any(|l| l.source == "manufacturer_32"));
  }

  #[test]
  fn link_endpoints_are_always_nodes() {
    let mut s = snapshot();
    // A join row pointing at a manufacturer that is not in the snapshot.
    s.links.push((2, 999));
    let g = build(&s);
    let ids: HashSet<_> = g.nodes.iter().map(|n| n.id.as_str()).collect();
    for l in &g.links {
      assert!(ids.contains(l.source.as_str()), "{l:?}");
      assert!(ids.contains(l.target.as_str()), "{l:?}");
    }
  }

  #[test]
  fn serialises_link_kind_as_type() {
    let link = Link { source: "a".into(), target: "b".into(), kind: USES.into() };
    let v = serde_json::to_value(&link).unwrap();
    assert_eq!(v["type"], USES);
  }
}
