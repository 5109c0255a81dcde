//! Bulk catalogue maintenance: inferred manufacturer links and duplicate
//! weapon cleanup.

use arsenal_core::{
  maintenance::{DedupeReport, DuplicateName, LinkOutcome, LinkReport},
  manufacturer::Manufacturer,
  resolve::Resolver,
};
use rusqlite::{Connection, params};

/// Run the resolver over every weapon and insert the join rows it finds.
pub fn link_all(conn: &mut Connection) -> rusqlite::Result<LinkReport> {
  let tx = conn.transaction()?;
  let mut report = LinkReport::default();

  {
    // The resolver only looks at id, name and country.
    let manufacturers: Vec<Manufacturer> = tx
      .prepare("SELECT id, name, country FROM manufacturers ORDER BY id")?
      .query_map([], |r| {
        Ok(Manufacturer {
          id:          r.get(0)?,
          name:        r.get(1)?,
          country:     r.get(2)?,
          founded:     None,
          description: None,
          created_at:  None,
        })
      })?
      .collect::<rusqlite::Result<_>>()?;

    let weapons: Vec<(i64, String, String)> = tx
      .prepare("SELECT id, name, COALESCE(country, '') FROM weapons ORDER BY id")?
      .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
      .collect::<rusqlite::Result<_>>()?;

    let resolver = Resolver::new(&manufacturers);
    let mut insert = tx.prepare(
      "INSERT OR IGNORE INTO weapon_manufacturers (weapon_id, manufacturer_id) VALUES (?1, ?2)",
    )?;

    for (weapon_id, weapon, country) in weapons {
      report.processed += 1;
      let matches = resolver.manufacturers_for(&weapon, &country);
      if matches.is_empty() {
        continue;
      }

      let mut inserted = 0;
      for m in &matches {
        inserted += insert.execute(params![weapon_id, m.id])? as u64;
      }
      report.inserted += inserted;
      report.outcomes.push(LinkOutcome {
        weapon_id,
        weapon,
        country,
        manufacturers: matches.iter().map(|m| m.name.clone()).collect(),
        inserted,
      });
    }
  }

  tx.commit()?;
  Ok(report)
}

/// Keep the lowest id per weapon name. Links, interests and similarities of
/// the removed rows move onto the kept row where that does not create a
/// duplicate pair; the rest are deleted with their weapon.
pub fn dedupe(conn: &mut Connection) -> rusqlite::Result<DedupeReport> {
  let tx = conn.transaction()?;

  let duplicates: Vec<DuplicateName> = tx
    .prepare(
      "SELECT name, COUNT(*) FROM weapons
       GROUP BY name HAVING COUNT(*) > 1
       ORDER BY COUNT(*) DESC, name",
    )?
    .query_map([], |r| Ok(DuplicateName { name: r.get(0)?, count: r.get::<_, i64>(1)? as u64 }))?
    .collect::<rusqlite::Result<_>>()?;

  if duplicates.is_empty() {
    return Ok(DedupeReport::default());
  }

  tx.execute_batch(
    "CREATE TEMP TABLE weapon_keep AS
       SELECT w.id AS old_id, k.keep_id
       FROM weapons w
       JOIN (SELECT name, MIN(id) AS keep_id FROM weapons GROUP BY name) k ON k.name = w.name
       WHERE w.id != k.keep_id;

     UPDATE OR IGNORE weapon_manufacturers
       SET weapon_id = (SELECT keep_id FROM temp.weapon_keep WHERE old_id = weapon_id)
       WHERE weapon_id IN (SELECT old_id FROM temp.weapon_keep);
     DELETE FROM weapon_manufacturers WHERE weapon_id IN (SELECT old_id FROM temp.weapon_keep);

     UPDATE OR IGNORE user_interests
       SET weapon_id = (SELECT keep_id FROM temp.weapon_keep WHERE old_id = weapon_id)
       WHERE weapon_id IN (SELECT old_id FROM temp.weapon_keep);
     DELETE FROM user_interests WHERE weapon_id IN (SELECT old_id FROM temp.weapon_keep);

     UPDATE OR IGNORE weapon_similarities
       SET weapon_id = (SELECT keep_id FROM temp.weapon_keep WHERE old_id = weapon_id)
       WHERE weapon_id IN (SELECT old_id FROM temp.weapon_keep);
     UPDATE OR IGNORE weapon_similarities
       SET similar_weapon_id =
         (SELECT keep_id FROM temp.weapon_keep WHERE old_id = similar_weapon_id)
       WHERE similar_weapon_id IN (SELECT old_id FROM temp.weapon_keep);
     DELETE FROM weapon_similarities
       WHERE weapon_id IN (SELECT old_id FROM temp.weapon_keep)
          OR similar_weapon_id IN (SELECT old_id FROM temp.weapon_keep)
          OR weapon_id = similar_weapon_id;",
  )?;

  let removed =
    tx.execute("DELETE FROM weapons WHERE id IN (SELECT old_id FROM temp.weapon_keep)", [])?;
  tx.execute_batch("DROP TABLE temp.weapon_keep;")?;
  tx.commit()?;

  Ok(DedupeReport { duplicates, removed: removed as u64 })
}
