//! Reference data and sample weapons for a fresh catalogue.
//!
//! Lookups and manufacturers are inserted with `INSERT OR IGNORE` on their
//! unique names. Sample weapons are only inserted into an empty `weapons`
//! table, so running the seed repeatedly never duplicates them.

use arsenal_core::{maintenance::SeedReport, weapon::WEAPON_TYPES};
use rusqlite::{Connection, OptionalExtension as _, params};

/// One category per accepted weapon type.
pub const CATEGORIES: &[&str] = WEAPON_TYPES;

pub const COUNTRIES: &[&str] = &[
  "美国", "俄罗斯", "中国", "德国", "法国", "英国", "以色列", "瑞典", "意大利", "日本", "奥地利",
];

/// `(name, country, founded, description)`
pub const MANUFACTURERS: &[(&str, &str, i32, &str)] = &[
  ("卡拉什尼科夫集团", "俄罗斯", 1807, "俄罗斯著名军工企业，AK系列步枪制造商"),
  ("柯尔特公司", "美国", 1855, "美国历史悠久的枪械制造商，M16步枪制造商之一"),
  ("格洛克公司", "奥地利", 1963, "奥地利手枪制造商，以Glock系列手枪闻名"),
  ("中国北方工业公司", "中国", 1980, "中国大型军工企业集团"),
  ("洛克希德·马丁", "美国", 1995, "美国航空航天、军火、军工技术公司"),
  ("波音公司", "美国", 1916, "美国跨国航空航天公司和国防承包商"),
  ("雷神公司", "美国", 1922, "美国主要国防承包商和工业公司"),
  ("莱茵金属", "德国", 1889, "德国汽车零部件和军工企业"),
  ("泰雷兹集团", "法国", 2000, "法国跨国公司，专门从事航空航天、国防、运输和安全市场"),
  ("BAE系统公司", "英国", 1999, "英国跨国国防、安全和航空航天公司"),
  ("乌拉尔车辆厂", "俄罗斯", 1936, "俄罗斯主要坦克制造商，T-72、T-90等坦克的生产厂家"),
  ("通用动力巴斯铁工厂", "美国", 1884, "美国海军舰艇制造商，伯克级驱逐舰和提康德罗加级巡洋舰的建造商"),
  ("英格尔斯造船厂", "美国", 1938, "美国主要军舰制造商，隶属于亨廷顿英格尔斯工业公司"),
  ("贝雷塔公司", "意大利", 1526, "意大利著名枪械制造商，世界上最古老的枪械制造公司之一"),
];

struct SampleWeapon {
  name:             &'static str,
  kind:             &'static str,
  country:          &'static str,
  year:             i32,
  description:      &'static str,
  specifications:   &'static str,
  performance_data: &'static str,
  manufacturer:     &'static str,
}

const WEAPONS: &[SampleWeapon] = &[
  SampleWeapon {
    name:             "AK-47突击步枪",
    kind:             "步枪",
    country:          "俄罗斯",
    year:             1947,
    description:      "AK-47是由苏联枪械设计师米哈伊尔·卡拉什尼科夫设计的自动步枪，\
                       是世界上最著名和使用最广泛的突击步枪之一。",
    specifications:   r#"{"caliber":"7.62×39mm","length":"870mm","weight":"4.3kg","rate_of_fire":"600发/分钟","effective_range":"400m"}"#,
    performance_data: r#"{"reliability":9.5,"accuracy":7.0,"durability":9.8}"#,
    manufacturer:     "卡拉什尼科夫集团",
  },
  SampleWeapon {
    name:             "M16突击步枪",
    kind:             "步枪",
    country:          "美国",
    year:             1964,
    description:      "M16是美国军队的制式突击步枪，以其轻量化和高精度著称。",
    specifications:   r#"{"caliber":"5.56×45mm NATO","length":"1006mm","weight":"3.26kg","rate_of_fire":"700-950发/分钟","effective_range":"550m"}"#,
    performance_data: r#"{"reliability":8.0,"accuracy":9.0,"durability":7.5}"#,
    manufacturer:     "柯尔特公司",
  },
  SampleWeapon {
    name:             "Glock 17手枪",
    kind:             "手枪",
    country:          "奥地利",
    year:             1982,
    description:      "Glock 17是奥地利格洛克公司生产的半自动手枪，以其可靠性和简洁设计闻名。",
    specifications:   r#"{"caliber":"9×19mm","length":"186mm","weight":"0.625kg","magazine_capacity":"17发","effective_range":"50m"}"#,
    performance_data: r#"{"reliability":9.2,"accuracy":8.5,"durability":9.0}"#,
    manufacturer:     "格洛克公司",
  },
];

pub fn seed(conn: &mut Connection) -> rusqlite::Result<SeedReport> {
  let tx = conn.transaction()?;
  let mut report = SeedReport::default();

  {
    let mut stmt = tx.prepare("INSERT OR IGNORE INTO categories (name) VALUES (?1)")?;
    for name in CATEGORIES {
      report.categories += stmt.execute([name])? as u64;
    }

    let mut stmt = tx.prepare("INSERT OR IGNORE INTO countries (name) VALUES (?1)")?;
    for name in COUNTRIES {
      report.countries += stmt.execute([name])? as u64;
    }

    let mut stmt = tx.prepare(
      "INSERT OR IGNORE INTO manufacturers (name, country, founded, description)
       VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (name, country, founded, description) in MANUFACTURERS {
      report.manufacturers += stmt.execute(params![name, country, founded, description])? as u64;
    }
  }

  let empty: bool = tx.query_row("SELECT NOT EXISTS (SELECT 1 FROM weapons)", [], |r| r.get(0))?;
  if empty {
    for w in WEAPONS {
      tx.execute(
        "INSERT INTO weapons
           (name, type, country, year, description, specifications, performance_data)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
          w.name,
          w.kind,
          w.country,
          w.year,
          w.description,
          w.specifications,
          w.performance_data
        ],
      )?;
      report.weapons += 1;
      let weapon_id = tx.last_insert_rowid();

      let manufacturer_id: Option<i64> = tx
        .query_row("SELECT id FROM manufacturers WHERE name = ?1", [w.manufacturer], |r| r.get(0))
        .optional()?;
      if let Some(manufacturer_id) = manufacturer_id {
        report.links += tx.execute(
          "INSERT OR IGNORE INTO weapon_manufacturers (weapon_id, manufacturer_id) VALUES (?1, ?2)",
          params![weapon_id, manufacturer_id],
        )? as u64;
      }
    }
  }

  tx.commit()?;
  Ok(report)
}
