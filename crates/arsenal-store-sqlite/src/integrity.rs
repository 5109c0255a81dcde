//! Referential integrity of the `weapon_manufacturers` join table and the
//! tables that hang off `weapons`.
//!
//! Older catalogue files were written with `PRAGMA foreign_keys` off, so
//! deleting a weapon or manufacturer left its join rows behind. [`repair`]
//! rebuilds the table from the rows whose parents still exist and switches
//! enforcement on for the connection. [`upgrade_dependents`] does the same
//! for `user_interests` and `weapon_similarities` when they were declared
//! without `ON DELETE CASCADE`.

use arsenal_core::{
  Error,
  maintenance::{IntegrityReport, RepairReport, TableCounts},
};
use rusqlite::Connection;

use crate::{
  error::domain,
  schema::{USER_INTERESTS, WEAPON_MANUFACTURERS, WEAPON_SIMILARITIES},
};

pub fn foreign_keys_enabled(conn: &Connection) -> rusqlite::Result<bool> {
  conn.query_row("PRAGMA foreign_keys", [], |r| r.get::<_, i64>(0)).map(|v| v == 1)
}

pub fn report(conn: &Connection) -> rusqlite::Result<IntegrityReport> {
  let foreign_keys_enabled = foreign_keys_enabled(conn)?;
  conn.query_row(
    "SELECT
       (SELECT COUNT(*) FROM weapon_manufacturers),
       (SELECT COUNT(*) FROM weapon_manufacturers wm
          JOIN weapons w       ON w.id = wm.weapon_id
          JOIN manufacturers m ON m.id = wm.manufacturer_id),
       (SELECT COUNT(*) FROM weapon_manufacturers wm
          LEFT JOIN weapons w ON w.id = wm.weapon_id
          WHERE w.id IS NULL),
       (SELECT COUNT(*) FROM weapon_manufacturers wm
          LEFT JOIN manufacturers m ON m.id = wm.manufacturer_id
          WHERE m.id IS NULL)",
    [],
    |r| {
      Ok(IntegrityReport {
        foreign_keys_enabled,
        total_links: r.get::<_, i64>(0)? as u64,
        valid_links: r.get::<_, i64>(1)? as u64,
        dangling_weapon_links: r.get::<_, i64>(2)? as u64,
        dangling_manufacturer_links: r.get::<_, i64>(3)? as u64,
      })
    },
  )
}

pub fn table_counts(conn: &Connection) -> rusqlite::Result<TableCounts> {
  conn.query_row(
    "SELECT
       (SELECT COUNT(*) FROM weapons),
       (SELECT COUNT(*) FROM manufacturers),
       (SELECT COUNT(*) FROM categories),
       (SELECT COUNT(*) FROM countries),
       (SELECT COUNT(*) FROM users),
       (SELECT COUNT(*) FROM weapon_manufacturers)",
    [],
    |r| {
      Ok(TableCounts {
        weapons:       r.get::<_, i64>(0)? as u64,
        manufacturers: r.get::<_, i64>(1)? as u64,
        categories:    r.get::<_, i64>(2)? as u64,
        countries:     r.get::<_, i64>(3)? as u64,
        users:         r.get::<_, i64>(4)? as u64,
        links:         r.get::<_, i64>(5)? as u64,
      })
    },
  )
}

/// Rebuild the join table with cascading foreign keys.
///
/// Runs backup, drop, recreate and restore in one transaction; duplicate
/// pairs in a legacy table collapse onto the lowest row id. Enforcement
/// is switched on after commit, since the pragma is ignored inside a
/// transaction.
pub fn repair(conn: &mut Connection) -> tokio_rusqlite::Result<RepairReport> {
  upgrade_dependents(conn)?;
  let before = report(conn)?;

  let tx = conn.transaction()?;
  tx.execute_batch(
    "DROP TABLE IF EXISTS temp.weapon_manufacturers_backup;
     CREATE TEMP TABLE weapon_manufacturers_backup AS
       SELECT wm.id, wm.weapon_id, wm.manufacturer_id, wm.created_at
       FROM weapon_manufacturers wm
       INNER JOIN weapons w       ON w.id = wm.weapon_id
       INNER JOIN manufacturers m ON m.id = wm.manufacturer_id;
     DROP TABLE weapon_manufacturers;",
  )?;
  tx.execute_batch(WEAPON_MANUFACTURERS)?;
  tx.execute_batch(
    "INSERT OR IGNORE INTO weapon_manufacturers (id, weapon_id, manufacturer_id, created_at)
       SELECT id, weapon_id, manufacturer_id, COALESCE(created_at, datetime('now'))
       FROM temp.weapon_manufacturers_backup
       ORDER BY id;
     DROP TABLE temp.weapon_manufacturers_backup;",
  )?;
  tx.commit()?;

  conn.pragma_update(None, "foreign_keys", true)?;

  let after = report(conn)?;
  if !after.is_healthy() {
    return Err(domain(Error::IntegrityViolation {
      dangling_weapons:       after.dangling_weapon_links,
      dangling_manufacturers: after.dangling_manufacturer_links,
    }));
  }

  Ok(RepairReport {
    before,
    after,
    removed: before.total_links.saturating_sub(after.total_links),
  })
}

/// Delete dangling join rows in place.
pub fn prune(conn: &mut Connection) -> rusqlite::Result<u64> {
  let tx = conn.transaction()?;
  let removed = tx.execute(
    "DELETE FROM weapon_manufacturers
     WHERE weapon_id       NOT IN (SELECT id FROM weapons)
        OR manufacturer_id NOT IN (SELECT id FROM manufacturers)",
    [],
  )?;
  tx.commit()?;
  Ok(removed as u64)
}

// ─── Dependent tables ────────────────────────────────────────────────────────

/// `true` when every foreign key of `table` that points at `weapons`
/// cascades on delete.
fn cascades_from_weapons(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
  let mut stmt = conn.prepare(&format!("PRAGMA foreign_key_list({table})"))?;
  let actions = stmt
    .query_map([], |r| Ok((r.get::<_, String>("table")?, r.get::<_, String>("on_delete")?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(
    actions
      .iter()
      .filter(|(parent, _)| parent.eq_ignore_ascii_case("weapons"))
      .all(|(_, on_delete)| on_delete.eq_ignore_ascii_case("CASCADE")),
  )
}

fn has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
  let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
  let names = stmt
    .query_map([], |r| r.get::<_, String>("name"))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(names.iter().any(|n| n == column))
}

/// Rebuild `user_interests` and `weapon_similarities` with cascading
/// foreign keys if either was declared without them. Rows whose weapon or
/// user no longer exists are dropped; the legacy `weapon1_id`/`weapon2_id`
/// pair maps onto `weapon_id`/`similar_weapon_id`. Returns the number of
/// tables rebuilt.
pub fn upgrade_dependents(conn: &mut Connection) -> rusqlite::Result<u32> {
  let interests = !cascades_from_weapons(conn, "user_interests")?;
  let similarities = !cascades_from_weapons(conn, "weapon_similarities")?;
  if !interests && !similarities {
    return Ok(0);
  }

  let tx = conn.transaction()?;
  let mut rebuilt = 0;

  if interests {
    tx.execute_batch("ALTER TABLE user_interests RENAME TO user_interests_legacy;")?;
    tx.execute_batch(USER_INTERESTS)?;
    tx.execute_batch(
      "INSERT OR IGNORE INTO user_interests
         (id, user_id, weapon_id, interaction_type, count, created_at, updated_at)
       SELECT ui.id, ui.user_id, ui.weapon_id,
              COALESCE(ui.interaction_type, 'view'), COALESCE(ui.count, 1),
              COALESCE(ui.created_at, datetime('now')), COALESCE(ui.updated_at, datetime('now'))
       FROM user_interests_legacy ui
       JOIN users u   ON u.id = ui.user_id
       JOIN weapons w ON w.id = ui.weapon_id
       ORDER BY ui.id;
       DROP TABLE user_interests_legacy;",
    )?;
    rebuilt += 1;
  }

  if similarities {
    let (left, right) = if has_column(&tx, "weapon_similarities", "weapon1_id")? {
      ("weapon1_id", "weapon2_id")
    } else {
      ("weapon_id", "similar_weapon_id")
    };
    let reason =
      if has_column(&tx, "weapon_similarities", "reason")? { "ws.reason" } else { "NULL" };

    tx.execute_batch("ALTER TABLE weapon_similarities RENAME TO weapon_similarities_legacy;")?;
    tx.execute_batch(WEAPON_SIMILARITIES)?;
    tx.execute_batch(&format!(
      "INSERT OR IGNORE INTO weapon_similarities
         (id, weapon_id, similar_weapon_id, similarity_score, reason, created_at)
       SELECT ws.id, ws.{left}, ws.{right}, ws.similarity_score, {reason},
              COALESCE(ws.created_at, datetime('now'))
       FROM weapon_similarities_legacy ws
       JOIN weapons a ON a.id = ws.{left}
       JOIN weapons b ON b.id = ws.{right}
       ORDER BY ws.id;
       DROP TABLE weapon_similarities_legacy;"
    ))?;
    rebuilt += 1;
  }

  tx.commit()?;
  Ok(rebuilt)
}
