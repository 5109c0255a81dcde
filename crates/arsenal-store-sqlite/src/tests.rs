//! Integration tests for `SqliteStore` against an in-memory database.

use arsenal_core::{
  Error as CoreError, graph,
  lookup::{LookupKind, NewLookup},
  manufacturer::NewManufacturer,
  stats::UNKNOWN_MANUFACTURER,
  store::{ArsenalStore, StoreError as _},
  user::{NewUser, ProfileUpdate, Role},
  weapon::{Interaction, ManufacturerLink, SearchQuery, WeaponInput, WeaponQuery},
};
use chrono::{Duration, Utc};

use crate::{Error, SqliteStore, StoreOptions};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn unenforced_store() -> SqliteStore {
  SqliteStore::open_in_memory_with(StoreOptions { enforce_foreign_keys: false })
    .await
    .expect("in-memory store")
}

fn weapon(name: &str, kind: &str, country: &str) -> WeaponInput { WeaponInput::new(name, kind, country) }

fn linked(name: &str, kind: &str, country: &str, manufacturer: &str) -> WeaponInput {
  WeaponInput {
    manufacturer: Some(ManufacturerLink { name: manufacturer.into(), ..Default::default() }),
    ..WeaponInput::new(name, kind, country)
  }
}

async fn link_count(s: &SqliteStore) -> u64 {
  s.integrity_report().await.unwrap().total_links
}

/// Insert a join row directly, bypassing every check.
async fn raw_link(s: &SqliteStore, weapon_id: i64, manufacturer_id: i64) {
  s.conn
    .call(move |c| {
      c.execute(
        "INSERT INTO weapon_manufacturers (weapon_id, manufacturer_id) VALUES (?1, ?2)",
        [weapon_id, manufacturer_id],
      )?;
      Ok(())
    })
    .await
    .unwrap();
}

fn core(e: &Error) -> &CoreError { e.domain().expect("domain error") }

// ─── Seeding ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn seed_inserts_reference_data_and_samples() {
  let s = store().await;
  let report = s.seed_sample_data().await.unwrap();
  assert_eq!(report.categories, 11);
  assert_eq!(report.countries, 11);
  assert_eq!(report.manufacturers, 14);
  assert_eq!(report.weapons, 3);
  assert_eq!(report.links, 3);

  let ak = s
    .search_weapons(SearchQuery { q: Some("AK-47".into()), ..Default::default() })
    .await
    .unwrap();
  let ak = s.get_weapon(ak[0].id).await.unwrap().unwrap();
  assert_eq!(ak.manufacturers[0].name, "卡拉什尼科夫集团");
  assert_eq!(ak.specifications["caliber"], "7.62×39mm");

  let categories = s.list_lookups(LookupKind::Category).await.unwrap();
  for kind in arsenal_core::weapon::WEAPON_TYPES {
    assert!(categories.iter().any(|c| c.name == *kind), "no category for {kind}");
  }
}

#[tokio::test]
async fn seed_is_idempotent() {
  let s = store().await;
  s.seed_sample_data().await.unwrap();
  let second = s.seed_sample_data().await.unwrap();
  assert_eq!(second, Default::default());

  let counts = s.table_counts().await.unwrap();
  assert_eq!(counts.weapons, 3);
  assert_eq!(counts.manufacturers, 14);
}

// ─── Weapons ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_weapon_links_existing_manufacturer() {
  let s = store().await;
  s.seed_sample_data().await.unwrap();

  let w = s.create_weapon(linked("M4卡宾枪", "步枪", "美国", "柯尔特公司")).await.unwrap();
  assert_eq!(w.manufacturers.len(), 1);
  assert_eq!(w.manufacturers[0].name, "柯尔特公司");
  assert_eq!(w.specifications, serde_json::json!({}));
  assert_eq!(w.images, serde_json::json!([]));
  assert!(w.created_at.is_some());
}

#[tokio::test]
async fn unknown_manufacturer_writes_nothing() {
  let s = store().await;
  let err = s.create_weapon(linked("幽灵步枪", "步枪", "美国", "不存在公司")).await.unwrap_err();
  assert!(matches!(core(&err), CoreError::UnknownManufacturer(n) if n == "不存在公司"));
  assert_eq!(s.table_counts().await.unwrap().weapons, 0);
}

#[tokio::test]
async fn new_manufacturer_is_created_with_weapon() {
  let s = store().await;
  let mut input = weapon("贝雷塔92F", "手枪", "意大利");
  input.manufacturer = Some(ManufacturerLink {
    name: "贝雷塔公司".into(),
    is_new: true,
    country: Some("意大利".into()),
    founded: Some(1526),
    description: None,
  });
  let w = s.create_weapon(input).await.unwrap();
  assert_eq!(w.manufacturers[0].name, "贝雷塔公司");

  let m = s.find_manufacturer_by_name("贝雷塔公司".into()).await.unwrap().unwrap();
  assert_eq!(m.founded, Some(1526));
}

#[tokio::test]
async fn duplicate_weapon_names_are_accepted() {
  let s = store().await;
  let a = s.create_weapon(weapon("T-90", "坦克", "俄罗斯")).await.unwrap();
  let b = s.create_weapon(weapon("T-90", "坦克", "俄罗斯")).await.unwrap();
  assert_ne!(a.id, b.id);
}

#[tokio::test]
async fn list_filters_and_paginates() {
  let s = store().await;
  for i in 0..5 {
    s.create_weapon(weapon(&format!("步枪{i}"), "步枪", "美国")).await.unwrap();
  }
  s.create_weapon(weapon("T-72", "坦克", "俄罗斯")).await.unwrap();

  let page = s
    .list_weapons(WeaponQuery { category: Some("步枪".into()), limit: Some(2), page: Some(3), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(page.pagination.total_items, 5);
  assert_eq!(page.pagination.total_pages, 3);
  assert_eq!(page.weapons.len(), 1);

  // Newest first: equal timestamps fall back to id order.
  let all = s.list_weapons(WeaponQuery::default()).await.unwrap();
  assert_eq!(all.weapons[0].name, "T-72");

  let russian = s
    .list_weapons(WeaponQuery { country: Some("俄罗斯".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(russian.pagination.total_items, 1);
}

#[tokio::test]
async fn search_matches_name_or_description() {
  let s = store().await;
  let mut w = weapon("92式手枪", "手枪", "中国");
  w.description = Some("中国人民解放军制式手枪".into());
  s.create_weapon(w).await.unwrap();
  s.create_weapon(weapon("AK-12", "步枪", "俄罗斯")).await.unwrap();

  let hits = s
    .search_weapons(SearchQuery { q: Some("解放军".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].name, "92式手枪");

  let filtered = s
    .search_weapons(SearchQuery {
      q:        Some("AK".into()),
      category: Some("手枪".into()),
      country:  None,
    })
    .await
    .unwrap();
  assert!(filtered.is_empty());
}

#[tokio::test]
async fn similar_prefers_same_type() {
  let s = store().await;
  let base = s.create_weapon(weapon("M1A2", "坦克", "美国")).await.unwrap();
  let same_country = s.create_weapon(weapon("F-35", "战斗机", "美国")).await.unwrap();
  let same_type = s.create_weapon(weapon("T-90", "坦克", "俄罗斯")).await.unwrap();
  s.create_weapon(weapon("J-20", "战斗机", "中国")).await.unwrap();

  let similar = s.similar_weapons(base.id, 5).await.unwrap().unwrap();
  let ids: Vec<_> = similar.iter().map(|w| w.id).collect();
  assert_eq!(ids, [same_type.id, same_country.id]);

  assert!(s.similar_weapons(9999, 5).await.unwrap().is_none());
}

#[tokio::test]
async fn update_keeps_json_when_omitted() {
  let s = store().await;
  let mut input = weapon("豹2A7", "坦克", "德国");
  input.specifications = Some(serde_json::json!({ "weight": "64t" }));
  let w = s.create_weapon(input).await.unwrap();

  let mut update = weapon("豹2A7+", "坦克", "德国");
  update.year = Some(2014);
  let updated = s.update_weapon(w.id, update).await.unwrap();
  assert_eq!(updated.name, "豹2A7+");
  assert_eq!(updated.specifications["weight"], "64t");

  let err = s.update_weapon(424242, weapon("x", "坦克", "德国")).await.unwrap_err();
  assert!(matches!(core(&err), CoreError::WeaponNotFound(424242)));
}

#[tokio::test]
async fn malformed_json_column_reads_as_default() {
  let s = store().await;
  let w = s.create_weapon(weapon("测试", "其他", "中国")).await.unwrap();
  let id = w.id;
  s.conn
    .call(move |c| {
      c.execute("UPDATE weapons SET specifications = '{broken' WHERE id = ?1", [id])?;
      Ok(())
    })
    .await
    .unwrap();
  let w = s.get_weapon(id).await.unwrap().unwrap();
  assert_eq!(w.specifications, serde_json::json!({}));
}

// ─── Cascade and repair ──────────────────────────────────────────────────────

#[tokio::test]
async fn delete_cascades_when_foreign_keys_enforced() {
  let s = store().await;
  s.seed_sample_data().await.unwrap();
  let w = s.create_weapon(linked("M4卡宾枪", "步枪", "美国", "柯尔特公司")).await.unwrap();
  assert_eq!(link_count(&s).await, 4);

  s.delete_weapon(w.id).await.unwrap();
  assert_eq!(link_count(&s).await, 3);
  assert!(s.integrity_report().await.unwrap().is_healthy());
}

#[tokio::test]
async fn delete_leaves_links_without_enforcement() {
  let s = unenforced_store().await;
  s.seed_sample_data().await.unwrap();
  let w = s.create_weapon(linked("M4卡宾枪", "步枪", "美国", "柯尔特公司")).await.unwrap();

  s.delete_weapon(w.id).await.unwrap();
  let report = s.integrity_report().await.unwrap();
  assert!(!report.foreign_keys_enabled);
  assert_eq!(report.dangling_weapon_links, 1);
  assert!(!report.is_healthy());
}

#[tokio::test]
async fn purge_removes_links_even_without_enforcement() {
  let s = unenforced_store().await;
  s.seed_sample_data().await.unwrap();
  let w = s.create_weapon(linked("M4卡宾枪", "步枪", "美国", "柯尔特公司")).await.unwrap();

  assert_eq!(s.purge_weapon(w.id).await.unwrap().as_deref(), Some("M4卡宾枪"));
  assert!(s.integrity_report().await.unwrap().is_healthy());
  assert_eq!(s.purge_weapon(w.id).await.unwrap(), None);
}

#[tokio::test]
async fn repair_drops_dangling_rows_and_enables_cascade() {
  let s = unenforced_store().await;
  s.seed_sample_data().await.unwrap();
  raw_link(&s, 9001, 1).await;
  raw_link(&s, 1, 9002).await;
  raw_link(&s, 9003, 9004).await;

  let before = s.integrity_report().await.unwrap();
  assert_eq!(before.total_links, 6);
  assert_eq!(before.dangling_weapon_links, 2);
  assert_eq!(before.dangling_manufacturer_links, 2);

  let report = s.repair_links().await.unwrap();
  assert_eq!(report.removed, 3);
  assert_eq!(report.after.total_links, 3);
  assert_eq!(report.after.dangling_weapon_links, 0);
  assert_eq!(report.after.dangling_manufacturer_links, 0);
  assert!(report.after.foreign_keys_enabled);

  // Enforcement now applies to the same connection.
  let ak = s.list_weapons(WeaponQuery::default()).await.unwrap().weapons;
  let last = ak.last().unwrap().id;
  s.delete_weapon(last).await.unwrap();
  assert!(s.integrity_report().await.unwrap().is_healthy());
}

#[tokio::test]
async fn repair_rebuilds_legacy_table() {
  let s = unenforced_store().await;
  s.seed_sample_data().await.unwrap();

  // Recreate the join table the way old catalogue files had it: no foreign
  // keys and no uniqueness, with a duplicate pair and a dangling row.
  s.conn
    .call(|c| {
      c.execute_batch(
        "DROP TABLE weapon_manufacturers;
         CREATE TABLE weapon_manufacturers (
           id INTEGER PRIMARY KEY AUTOINCREMENT,
           weapon_id INTEGER NOT NULL,
           manufacturer_id INTEGER NOT NULL,
           created_at DATETIME DEFAULT (datetime('now'))
         );
         INSERT INTO weapon_manufacturers (weapon_id, manufacturer_id, created_at)
           VALUES (1, 1, '2023-01-01 00:00:00'), (1, 1, '2023-06-01 00:00:00'), (77, 1, NULL);",
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let report = s.repair_links().await.unwrap();
  assert_eq!(report.after.total_links, 1);
  assert_eq!(report.removed, 2);

  let created_at: String = s
    .conn
    .call(|c| Ok(c.query_row("SELECT created_at FROM weapon_manufacturers", [], |r| r.get(0))?))
    .await
    .unwrap();
  assert_eq!(created_at, "2023-01-01 00:00:00");

  // The rebuilt table rejects duplicate pairs.
  raw_link(&s, 2, 2).await;
  let dup = s
    .conn
    .call(|c| {
      Ok(c.execute("INSERT INTO weapon_manufacturers (weapon_id, manufacturer_id) VALUES (2, 2)", [])?)
    })
    .await;
  assert!(dup.is_err());
}

/// Dependent tables as older catalogue files declared them: foreign keys
/// into `weapons` without `ON DELETE CASCADE`.
const LEGACY_DEPENDENTS: &str = "
CREATE TABLE users (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  username TEXT UNIQUE NOT NULL,
  email TEXT UNIQUE NOT NULL,
  password_hash TEXT NOT NULL,
  name TEXT, phone TEXT, bio TEXT, avatar TEXT,
  role TEXT DEFAULT 'user',
  status TEXT DEFAULT 'active',
  preferences TEXT DEFAULT '{}',
  created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
  updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
  last_login DATETIME
);
CREATE TABLE weapons (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL, type TEXT NOT NULL, country TEXT NOT NULL,
  year INTEGER, description TEXT,
  specifications TEXT DEFAULT '{}', images TEXT DEFAULT '[]', performance_data TEXT DEFAULT '{}',
  created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
  updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE user_interests (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  user_id INTEGER NOT NULL,
  weapon_id INTEGER NOT NULL,
  interaction_type TEXT DEFAULT 'view',
  count INTEGER DEFAULT 1,
  created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
  updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
  FOREIGN KEY (user_id) REFERENCES users (id),
  FOREIGN KEY (weapon_id) REFERENCES weapons (id),
  UNIQUE(user_id, weapon_id)
);
CREATE TABLE weapon_similarities (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  weapon1_id INTEGER NOT NULL,
  weapon2_id INTEGER NOT NULL,
  similarity_score REAL DEFAULT 0.8,
  reason TEXT,
  created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
  FOREIGN KEY (weapon1_id) REFERENCES weapons (id),
  FOREIGN KEY (weapon2_id) REFERENCES weapons (id)
);
INSERT INTO users (username, email, password_hash) VALUES ('reader', 'reader@example.com', 'x');
INSERT INTO weapons (name, type, country) VALUES
  ('AK-47', '步枪', '俄罗斯'), ('AK-47', '步枪', '俄罗斯'), ('M1A2', '坦克', '美国');
INSERT INTO user_interests (user_id, weapon_id, interaction_type) VALUES (1, 3, 'favorite');
INSERT INTO weapon_similarities (weapon1_id, weapon2_id, reason) VALUES (1, 2, '同型号'), (2, 3, NULL);
";

fn legacy_file() -> (tempfile::TempDir, std::path::PathBuf) {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("legacy.db");
  rusqlite::Connection::open(&path).unwrap().execute_batch(LEGACY_DEPENDENTS).unwrap();
  (dir, path)
}

async fn scalar(s: &SqliteStore, sql: &'static str) -> i64 {
  s.conn.call(move |c| Ok(c.query_row(sql, [], |r| r.get(0))?)).await.unwrap()
}

#[tokio::test]
async fn legacy_file_deletes_weapons_with_interests() {
  let (_dir, path) = legacy_file();
  let s = SqliteStore::open(&path).await.unwrap();

  s.delete_weapon(3).await.unwrap();
  assert_eq!(scalar(&s, "SELECT COUNT(*) FROM user_interests").await, 0);
  assert_eq!(
    scalar(&s, "SELECT COUNT(*) FROM weapon_similarities WHERE similar_weapon_id = 3").await,
    0
  );
}

#[tokio::test]
async fn legacy_file_dedupes_and_purges() {
  let (_dir, path) = legacy_file();
  let s = SqliteStore::open(&path).await.unwrap();

  // The legacy pair columns carry over.
  assert_eq!(
    scalar(&s, "SELECT COUNT(*) FROM weapon_similarities WHERE reason = '同型号'").await,
    1
  );

  let report = s.remove_duplicate_weapons().await.unwrap();
  assert_eq!(report.removed, 1);
  // (1, 2) collapsed onto itself and went; (2, 3) now points at the kept row.
  assert_eq!(
    scalar(&s, "SELECT COUNT(*) FROM weapon_similarities WHERE weapon_id = 1 AND similar_weapon_id = 3")
      .await,
    1
  );
  assert_eq!(scalar(&s, "SELECT COUNT(*) FROM weapon_similarities").await, 1);

  assert_eq!(s.purge_weapon(1).await.unwrap().as_deref(), Some("AK-47"));
  assert_eq!(scalar(&s, "SELECT COUNT(*) FROM weapon_similarities").await, 0);
}

#[tokio::test]
async fn reopening_an_upgraded_file_keeps_rows() {
  let (_dir, path) = legacy_file();
  drop(SqliteStore::open(&path).await.unwrap());
  let s = SqliteStore::open(&path).await.unwrap();
  assert_eq!(scalar(&s, "SELECT COUNT(*) FROM user_interests").await, 1);
  assert_eq!(scalar(&s, "SELECT COUNT(*) FROM weapon_similarities").await, 2);
  assert!(s.repair_links().await.unwrap().after.is_healthy());
}

#[tokio::test]
async fn repair_with_no_surviving_rows_leaves_empty_table() {
  let s = unenforced_store().await;
  raw_link(&s, 1, 1).await;
  raw_link(&s, 2, 2).await;

  let report = s.repair_links().await.unwrap();
  assert_eq!(report.removed, 2);
  assert_eq!(report.after.total_links, 0);
  assert!(report.after.is_healthy());
}

#[tokio::test]
async fn prune_removes_only_dangling_rows() {
  let s = unenforced_store().await;
  s.seed_sample_data().await.unwrap();
  raw_link(&s, 555, 1).await;
  assert_eq!(s.prune_dangling_links().await.unwrap(), 1);
  assert_eq!(link_count(&s).await, 3);
}

// ─── Manufacturers and statistics ────────────────────────────────────────────

#[tokio::test]
async fn manufacturer_counts_sum_to_weapon_total() {
  let s = store().await;
  s.seed_sample_data().await.unwrap();
  // Two links on one weapon must not count it twice.
  let w = s.create_weapon(linked("F-35闪电II", "战斗机", "美国", "洛克希德·马丁")).await.unwrap();
  s.link_manufacturer(w.id, ManufacturerLink { name: "BAE系统公司".into(), ..Default::default() })
    .await
    .unwrap();
  s.create_weapon(weapon("某型无人机", "其他", "未知")).await.unwrap();
  s.create_weapon(weapon("某型火炮", "火炮", "未知")).await.unwrap();

  let counts = s.manufacturer_weapon_counts().await.unwrap();
  let total = s.table_counts().await.unwrap().weapons;
  assert_eq!(counts.total_weapons(), total);
  assert_eq!(counts.unknown(), 2);
  assert_eq!(counts.statistics[0].manufacturer_name, UNKNOWN_MANUFACTURER);

  let map = counts.as_map();
  assert_eq!(map["洛克希德·马丁"], 1);
  assert!(!map.contains_key("BAE系统公司"));
}

#[tokio::test]
async fn manufacturer_details_list_weapon_names() {
  let s = store().await;
  s.seed_sample_data().await.unwrap();
  let details = s.manufacturer_details().await.unwrap();
  let colt = details.iter().find(|d| d.name == "柯尔特公司").unwrap();
  assert_eq!(colt.weapon_count, 1);
  assert_eq!(colt.weapon_names, ["M16突击步枪"]);
  assert!(details.windows(2).all(|p| p[0].weapon_count >= p[1].weapon_count));
}

#[tokio::test]
async fn manufacturer_crud_and_in_use_guard() {
  let s = store().await;
  let m = s.create_manufacturer(NewManufacturer::named("萨博集团", Some("瑞典"))).await.unwrap();

  let dup = s.create_manufacturer(NewManufacturer::named(" 萨博集团 ", None)).await.unwrap_err();
  assert!(matches!(core(&dup), CoreError::DuplicateManufacturer(_)));

  let w = s.create_weapon(linked("JAS 39", "战斗机", "瑞典", "萨博集团")).await.unwrap();
  let detail = s.get_manufacturer(m.id).await.unwrap().unwrap();
  assert_eq!(detail.weapons[0].id, w.id);

  let err = s.delete_manufacturer(m.id).await.unwrap_err();
  assert!(matches!(core(&err), CoreError::ManufacturerInUse(1)));

  s.delete_weapon(w.id).await.unwrap();
  let mut renamed = NewManufacturer::named("萨博", Some("瑞典"));
  renamed.founded = Some(1937);
  assert_eq!(s.update_manufacturer(m.id, renamed).await.unwrap().founded, Some(1937));
  s.delete_manufacturer(m.id).await.unwrap();
  assert!(s.get_manufacturer(m.id).await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_bucket_name_is_reserved() {
  let s = store().await;
  let reserved = || NewManufacturer::named(UNKNOWN_MANUFACTURER, None);
  let err = s.create_manufacturer(reserved()).await.unwrap_err();
  assert!(matches!(core(&err), CoreError::ReservedManufacturerName(_)));

  let m = s.create_manufacturer(NewManufacturer::named("萨博集团", None)).await.unwrap();
  let err = s.update_manufacturer(m.id, reserved()).await.unwrap_err();
  assert!(matches!(core(&err), CoreError::ReservedManufacturerName(_)));

  let input = WeaponInput {
    manufacturer: Some(ManufacturerLink {
      name: UNKNOWN_MANUFACTURER.into(),
      is_new: true,
      ..Default::default()
    }),
    ..weapon("JAS 39", "战斗机", "瑞典")
  };
  let err = s.create_weapon(input).await.unwrap_err();
  assert!(matches!(core(&err), CoreError::ReservedManufacturerName(_)));
  assert_eq!(s.list_weapons(WeaponQuery::default()).await.unwrap().pagination.total_items, 0);
}

#[tokio::test]
async fn linking_twice_is_a_no_op() {
  let s = store().await;
  s.seed_sample_data().await.unwrap();
  let w = s.create_weapon(weapon("贝雷塔 M9", "手枪", "意大利")).await.unwrap();
  let link = ManufacturerLink { name: "贝雷塔公司".into(), ..Default::default() };
  s.link_manufacturer(w.id, link.clone()).await.unwrap();
  s.link_manufacturer(w.id, link).await.unwrap();
  assert_eq!(s.get_weapon(w.id).await.unwrap().unwrap().manufacturers.len(), 1);

  let missing = s
    .link_manufacturer(9999, ManufacturerLink { name: "贝雷塔公司".into(), ..Default::default() })
    .await
    .unwrap_err();
  assert!(matches!(core(&missing), CoreError::WeaponNotFound(9999)));
}

// ─── Lookups ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn lookups_count_weapons_by_name() {
  let s = store().await;
  s.seed_sample_data().await.unwrap();
  let rifles = s.find_lookup(LookupKind::Category, "步枪".into()).await.unwrap().unwrap();
  let detail = s.get_lookup(LookupKind::Category, rifles.id).await.unwrap().unwrap();
  assert_eq!(detail.weapon_count, 2);

  let err = s.delete_lookup(LookupKind::Category, rifles.id).await.unwrap_err();
  assert!(matches!(core(&err), CoreError::LookupInUse { count: 2, .. }));

  let countries = s.list_lookups(LookupKind::Country).await.unwrap();
  assert_eq!(countries.len(), 11);
  assert!(countries.windows(2).all(|p| p[0].name <= p[1].name));
}

#[tokio::test]
async fn lookup_create_update_delete() {
  let s = store().await;
  let c = s
    .create_lookup(LookupKind::Country, NewLookup { name: "巴西".into(), detail: Some("BR".into()) })
    .await
    .unwrap();
  assert_eq!(c.detail.as_deref(), Some("BR"));

  let dup = s.create_lookup(LookupKind::Country, NewLookup::named("巴西")).await.unwrap_err();
  assert!(matches!(core(&dup), CoreError::DuplicateLookup { kind: LookupKind::Country, .. }));

  let updated = s
    .update_lookup(LookupKind::Country, c.id, NewLookup { name: "巴西".into(), detail: Some("BRA".into()) })
    .await
    .unwrap();
  assert_eq!(updated.detail.as_deref(), Some("BRA"));

  s.delete_lookup(LookupKind::Country, c.id).await.unwrap();
  let gone = s.delete_lookup(LookupKind::Country, c.id).await.unwrap_err();
  assert!(matches!(core(&gone), CoreError::LookupNotFound { .. }));
}

// ─── Maintenance ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn link_manufacturers_infers_from_names() {
  let s = store().await;
  s.seed_sample_data().await.unwrap();
  let f22 = s.create_weapon(weapon("F-22猛禽", "战斗机", "美国")).await.unwrap();
  let glock = s.create_weapon(weapon("格洛克19", "手枪", "奥地利")).await.unwrap();
  s.create_weapon(weapon("某型试验武器", "其他", "未知")).await.unwrap();

  let report = s.link_manufacturers().await.unwrap();
  assert_eq!(report.processed, 6);
  assert_eq!(report.unmatched(), 1);

  let f22 = s.get_weapon(f22.id).await.unwrap().unwrap();
  assert_eq!(f22.manufacturers[0].name, "洛克希德·马丁");
  let glock = s.get_weapon(glock.id).await.unwrap().unwrap();
  assert_eq!(glock.manufacturers[0].name, "格洛克公司");

  // Second run finds the same matches but inserts nothing.
  let again = s.link_manufacturers().await.unwrap();
  assert_eq!(again.inserted, 0);
}

#[tokio::test]
async fn dedupe_keeps_lowest_id_and_moves_links() {
  let s = store().await;
  s.seed_sample_data().await.unwrap();
  let keep = s.create_weapon(weapon("T-90", "坦克", "俄罗斯")).await.unwrap();
  s.create_weapon(linked("T-90", "坦克", "俄罗斯", "乌拉尔车辆厂")).await.unwrap();
  s.create_weapon(weapon("T-90", "坦克", "俄罗斯")).await.unwrap();

  let report = s.remove_duplicate_weapons().await.unwrap();
  assert_eq!(report.removed, 2);
  assert_eq!(report.duplicates[0].name, "T-90");
  assert_eq!(report.duplicates[0].count, 3);

  let kept = s.get_weapon(keep.id).await.unwrap().unwrap();
  assert_eq!(kept.manufacturers[0].name, "乌拉尔车辆厂");
  assert!(s.integrity_report().await.unwrap().is_healthy());

  assert_eq!(s.remove_duplicate_weapons().await.unwrap().removed, 0);
}

#[tokio::test]
async fn graph_snapshot_builds_consistent_graph() {
  let s = store().await;
  s.seed_sample_data().await.unwrap();
  let g = graph::build(&s.graph_snapshot().await.unwrap());
  let ids: std::collections::HashSet<_> = g.nodes.iter().map(|n| n.id.as_str()).collect();
  assert!(g.links.iter().all(|l| ids.contains(l.source.as_str()) && ids.contains(l.target.as_str())));
  assert_eq!(g.links.iter().filter(|l| l.kind == graph::MANUFACTURES).count(), 3);
}

#[tokio::test]
async fn every_accepted_type_gets_a_type_link() {
  let s = store().await;
  s.seed_sample_data().await.unwrap();
  let w = s.create_weapon(weapon("某型无人机", "其他", "中国")).await.unwrap();

  let g = graph::build(&s.graph_snapshot().await.unwrap());
  let node = format!("weapon_{}", w.id);
  assert!(g.links.iter().any(|l| l.source == node && l.kind == graph::OF_TYPE));
}

// ─── Users, sessions, interests ──────────────────────────────────────────────

fn new_user(username: &str, email: &str) -> NewUser {
  NewUser {
    username:      username.into(),
    email:         email.into(),
    password_hash: "$argon2id$placeholder".into(),
    name:          None,
    role:          Role::User,
  }
}

#[tokio::test]
async fn users_are_unique_and_found_by_email() {
  let s = store().await;
  let u = s.create_user(new_user("alice", "alice@example.com")).await.unwrap();
  assert_eq!(u.preferences["theme"], "light");

  let dup = s.create_user(new_user("alice2", "alice@example.com")).await.unwrap_err();
  assert!(matches!(core(&dup), CoreError::UserExists));

  let creds = s.find_credentials("alice@example.com".into()).await.unwrap().unwrap();
  assert_eq!(creds.user.id, u.id);
  assert_eq!(creds.password_hash, "$argon2id$placeholder");

  let updated = s
    .update_profile(u.id, ProfileUpdate { bio: Some("hi".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(updated.bio.as_deref(), Some("hi"));
  assert_eq!(updated.preferences["language"], "zh-cn");
}

#[tokio::test]
async fn sessions_expire() {
  let s = store().await;
  let u = s.create_user(new_user("bob", "bob@example.com")).await.unwrap();

  s.create_session("live".into(), u.id, Utc::now() + Duration::hours(1)).await.unwrap();
  s.create_session("stale".into(), u.id, Utc::now() - Duration::hours(1)).await.unwrap();

  assert_eq!(s.find_session("live".into()).await.unwrap().unwrap().user.id, u.id);
  assert!(s.find_session("stale".into()).await.unwrap().is_none());

  s.delete_session("live".into()).await.unwrap();
  assert!(s.find_session("live".into()).await.unwrap().is_none());
}

async fn session_rows(s: &SqliteStore) -> i64 {
  s.conn.call(|c| Ok(c.query_row("SELECT COUNT(*) FROM sessions", [], |r| r.get(0))?)).await.unwrap()
}

#[tokio::test]
async fn expired_sessions_are_deleted() {
  let s = store().await;
  let u = s.create_user(new_user("carol", "carol@example.com")).await.unwrap();

  s.create_session("old-a".into(), u.id, Utc::now() - Duration::hours(2)).await.unwrap();
  assert_eq!(session_rows(&s).await, 1);

  // Looking up an expired token drops its row.
  assert!(s.find_session("old-a".into()).await.unwrap().is_none());
  assert_eq!(session_rows(&s).await, 0);

  // Issuing a new session sweeps any other expired row.
  s.create_session("old-b".into(), u.id, Utc::now() - Duration::minutes(5)).await.unwrap();
  s.create_session("fresh".into(), u.id, Utc::now() + Duration::hours(1)).await.unwrap();
  assert_eq!(session_rows(&s).await, 1);
  assert!(s.find_session("fresh".into()).await.unwrap().is_some());
}

#[tokio::test]
async fn favourites_upsert_and_downgrade() {
  let s = store().await;
  let u = s.create_user(new_user("carol", "carol@example.com")).await.unwrap();
  let w = s.create_weapon(weapon("AK-12", "步枪", "俄罗斯")).await.unwrap();

  s.record_interest(u.id, w.id, Interaction::Favorite).await.unwrap();
  s.record_interest(u.id, w.id, Interaction::View).await.unwrap();

  let (kind, count): (String, i64) = s
    .conn
    .call(|c| {
      Ok(c.query_row("SELECT interaction_type, count FROM user_interests", [], |r| {
        Ok((r.get(0)?, r.get(1)?))
      })?)
    })
    .await
    .unwrap();
  assert_eq!((kind.as_str(), count), ("favorite", 2));

  s.remove_favorite(u.id, w.id).await.unwrap();
  let kind: String = s
    .conn
    .call(|c| Ok(c.query_row("SELECT interaction_type FROM user_interests", [], |r| r.get(0))?))
    .await
    .unwrap();
  assert_eq!(kind, "view");

  let err = s.record_interest(u.id, 9999, Interaction::Favorite).await.unwrap_err();
  assert!(matches!(core(&err), CoreError::WeaponNotFound(9999)));
}

#[tokio::test]
async fn database_errors_are_classified() {
  let s = store().await;
  let err = s
    .conn
    .call(|c| Ok(c.execute("INSERT INTO nonexistent VALUES (1)", [])?))
    .await
    .map_err(Error::from)
    .unwrap_err();
  assert!(err.is_database());
  assert!(err.domain().is_none());
}
