//! [`SqliteStore`], the SQLite implementation of [`ArsenalStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, params};
use tracing::{debug, info};

use arsenal_core::{
  Error as CoreError,
  graph::GraphSnapshot,
  lookup::{Lookup, LookupDetail, LookupKind, NewLookup},
  maintenance::{
    DedupeReport, IntegrityReport, LinkReport, RepairReport, SeedReport, TableCounts,
  },
  manufacturer::{Manufacturer, ManufacturerDetail, ManufacturerRef, NewManufacturer},
  stats::{
    CountryCount, ManufacturerCount, ManufacturerUsage, ManufacturerWeaponCounts,
    TypeCount, UNKNOWN_MANUFACTURER, WeaponStatistics,
  },
  store::ArsenalStore,
  user::{Credentials, NewUser, ProfileUpdate, Session, User},
  weapon::{
    Interaction, ManufacturerLink, Pagination, SEARCH_LIMIT, SearchQuery, Weapon, WeaponInput,
    WeaponPage, WeaponQuery, WeaponSummary,
  },
};

use crate::{
  Error, Result,
  encode::{
    MANUFACTURER_COLUMNS, RawManufacturer, RawUser, RawWeapon, SUMMARY_COLUMNS, USER_COLUMNS,
    WEAPON_COLUMNS, decode_dt, encode_dt, encode_json, encode_role, lookup_from_row,
    lookup_table, summary_from_row,
  },
  error::domain,
  integrity, maintenance,
  schema::SCHEMA,
  seed,
};

// ─── Options ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
  /// Issue `PRAGMA foreign_keys = ON` on open. With this off, deleting a
  /// weapon leaves its join rows behind, as older catalogue files did.
  pub enforce_foreign_keys: bool,
}

impl Default for StoreOptions {
  fn default() -> Self { Self { enforce_foreign_keys: true } }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Arsenal catalogue backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` with default options.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with(path, StoreOptions::default()).await
  }

  pub async fn open_with(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init(options).await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    Self::open_in_memory_with(StoreOptions::default()).await
  }

  pub async fn open_in_memory_with(options: StoreOptions) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init(options).await?;
    Ok(store)
  }

  async fn init(&self, options: StoreOptions) -> Result<()> {
    let rebuilt = self
      .conn
      .call(move |conn| {
        conn.execute_batch(SCHEMA)?;
        let rebuilt = integrity::upgrade_dependents(conn)?;
        conn.pragma_update(None, "foreign_keys", options.enforce_foreign_keys)?;
        Ok(rebuilt)
      })
      .await?;
    if rebuilt > 0 {
      info!(tables = rebuilt, "rebuilt legacy tables with cascading foreign keys");
    }
    debug!(enforce_foreign_keys = options.enforce_foreign_keys, "schema initialised");
    Ok(())
  }

  async fn load_weapon(&self, id: i64) -> Result<Option<Weapon>> {
    let raw = self.conn.call(move |conn| Ok(fetch_weapon(conn, id)?)).await?;
    raw.map(|(w, ms)| w.into_weapon(ms)).transpose()
  }

  async fn load_manufacturer(&self, id: i64) -> Result<Manufacturer> {
    let raw = self
      .conn
      .call(move |conn| {
        fetch_manufacturer(conn, id)?.ok_or_else(|| domain(CoreError::ManufacturerNotFound(id)))
      })
      .await?;
    raw.into_manufacturer()
  }

  async fn load_user(&self, id: i64) -> Result<Option<User>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1"),
              [id],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }
}

// ─── Connection helpers ──────────────────────────────────────────────────────

fn count(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> rusqlite::Result<u64> {
  conn.query_row(sql, params, |r| r.get::<_, i64>(0)).map(|n| n.max(0) as u64)
}

fn non_empty(s: Option<String>) -> Option<String> {
  s.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

fn weapon_exists(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
  conn.query_row("SELECT EXISTS (SELECT 1 FROM weapons WHERE id = ?1)", [id], |r| r.get(0))
}

fn fetch_weapon(
  conn: &Connection,
  id: i64,
) -> rusqlite::Result<Option<(RawWeapon, Vec<ManufacturerRef>)>> {
  let Some(raw) = conn
    .query_row(
      &format!("SELECT {WEAPON_COLUMNS} FROM weapons w WHERE w.id = ?1"),
      [id],
      RawWeapon::from_row,
    )
    .optional()?
  else {
    return Ok(None);
  };

  let manufacturers = conn
    .prepare(
      "SELECT m.id, m.name FROM weapon_manufacturers wm
       JOIN manufacturers m ON m.id = wm.manufacturer_id
       WHERE wm.weapon_id = ?1
       ORDER BY wm.id",
    )?
    .query_map([id], |r| Ok(ManufacturerRef { id: r.get(0)?, name: r.get(1)? }))?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(Some((raw, manufacturers)))
}

fn fetch_manufacturer(conn: &Connection, id: i64) -> rusqlite::Result<Option<RawManufacturer>> {
  conn
    .query_row(
      &format!("SELECT {MANUFACTURER_COLUMNS} FROM manufacturers m WHERE m.id = ?1"),
      [id],
      RawManufacturer::from_row,
    )
    .optional()
}

fn manufacturer_id_by_name(conn: &Connection, name: &str) -> rusqlite::Result<Option<i64>> {
  conn
    .query_row("SELECT id FROM manufacturers WHERE name = ?1", [name], |r| r.get(0))
    .optional()
}

fn unreserved(name: &str) -> tokio_rusqlite::Result<()> {
  if name == UNKNOWN_MANUFACTURER {
    return Err(domain(CoreError::ReservedManufacturerName(name.to_owned())));
  }
  Ok(())
}

/// Find (or, for `is_new`, create) the manufacturer a link names.
fn resolve_link(conn: &Connection, link: &ManufacturerLink) -> tokio_rusqlite::Result<i64> {
  let name = link.name.trim();
  if let Some(id) = manufacturer_id_by_name(conn, name)? {
    return Ok(id);
  }
  if !link.is_new {
    return Err(domain(CoreError::UnknownManufacturer(name.to_owned())));
  }
  unreserved(name)?;
  conn.execute(
    "INSERT INTO manufacturers (name, country, founded, description) VALUES (?1, ?2, ?3, ?4)",
    params![name, link.country, link.founded, link.description],
  )?;
  Ok(conn.last_insert_rowid())
}

fn list_summaries(
  conn: &Connection,
  sql: &str,
  params: impl rusqlite::Params,
) -> rusqlite::Result<Vec<WeaponSummary>> {
  conn
    .prepare(sql)?
    .query_map(params, summary_from_row)?
    .collect()
}

fn list_lookups(conn: &Connection, kind: LookupKind) -> rusqlite::Result<Vec<Lookup>> {
  conn
    .prepare(&format!(
      "SELECT id, name, {detail} FROM {table}
       WHERE name IS NOT NULL AND name != ''
       ORDER BY name",
      detail = kind.detail_field(),
      table = lookup_table(kind),
    ))?
    .query_map([], lookup_from_row)?
    .collect()
}

fn lookup_by_name(conn: &Connection, kind: LookupKind, name: &str) -> rusqlite::Result<Option<Lookup>> {
  conn
    .query_row(
      &format!(
        "SELECT id, name, {detail} FROM {table} WHERE name = ?1",
        detail = kind.detail_field(),
        table = lookup_table(kind),
      ),
      [name],
      lookup_from_row,
    )
    .optional()
}

fn lookup_by_id(conn: &Connection, kind: LookupKind, id: i64) -> rusqlite::Result<Option<Lookup>> {
  conn
    .query_row(
      &format!(
        "SELECT id, name, {detail} FROM {table} WHERE id = ?1",
        detail = kind.detail_field(),
        table = lookup_table(kind),
      ),
      [id],
      lookup_from_row,
    )
    .optional()
}

fn lookup_usage(conn: &Connection, kind: LookupKind, name: &str) -> rusqlite::Result<u64> {
  count(
    conn,
    &format!("SELECT COUNT(*) FROM weapons WHERE {} = ?1", kind.weapon_column()),
    [name],
  )
}

/// Serialised JSON columns for a weapon write; `None` keeps the stored value
/// on update.
fn encode_weapon_json(input: &WeaponInput) -> Result<(Option<String>, Option<String>)> {
  let specs = input.specifications.as_ref().map(encode_json).transpose()?;
  let perf = input.performance_data.as_ref().map(encode_json).transpose()?;
  Ok((specs, perf))
}

// ─── ArsenalStore impl ───────────────────────────────────────────────────────

impl ArsenalStore for SqliteStore {
  type Error = Error;

  // ── Weapons ───────────────────────────────────────────────────────────────

  async fn list_weapons(&self, query: WeaponQuery) -> Result<WeaponPage> {
    let page = query.page();
    let limit = query.limit();
    let offset = i64::try_from(query.offset()).unwrap_or(i64::MAX);
    let category = non_empty(query.category);
    let country = non_empty(query.country);

    let (weapons, total) = self
      .conn
      .call(move |conn| {
        let filter = "(?1 IS NULL OR w.type = ?1) AND (?2 IS NULL OR w.country = ?2)";
        let total = count(
          conn,
          &format!("SELECT COUNT(*) FROM weapons w WHERE {filter}"),
          params![category, country],
        )?;
        let weapons = list_summaries(
          conn,
          &format!(
            "SELECT {SUMMARY_COLUMNS} FROM weapons w WHERE {filter}
             ORDER BY w.created_at DESC, w.id DESC
             LIMIT ?3 OFFSET ?4"
          ),
          params![category, country, i64::from(limit), offset],
        )?;
        Ok((weapons, total))
      })
      .await?;

    Ok(WeaponPage { weapons, pagination: Pagination::new(page, limit, total) })
  }

  async fn search_weapons(&self, query: SearchQuery) -> Result<Vec<WeaponSummary>> {
    let pattern = format!("%{}%", query.q.as_deref().unwrap_or("").trim());
    let category = non_empty(query.category);
    let country = non_empty(query.country);

    let weapons = self
      .conn
      .call(move |conn| {
        Ok(list_summaries(
          conn,
          &format!(
            "SELECT {SUMMARY_COLUMNS} FROM weapons w
             WHERE (w.name LIKE ?1 OR w.description LIKE ?1)
               AND (?2 IS NULL OR w.type = ?2)
               AND (?3 IS NULL OR w.country = ?3)
             ORDER BY w.name, w.id
             LIMIT ?4"
          ),
          params![pattern, category, country, i64::from(SEARCH_LIMIT)],
        )?)
      })
      .await?;
    Ok(weapons)
  }

  async fn get_weapon(&self, id: i64) -> Result<Option<Weapon>> { self.load_weapon(id).await }

  async fn similar_weapons(&self, id: i64, limit: u32) -> Result<Option<Vec<WeaponSummary>>> {
    let similar = self
      .conn
      .call(move |conn| {
        let Some((kind, country)) = conn
          .query_row("SELECT type, country FROM weapons WHERE id = ?1", [id], |r| {
            Ok((r.get::<_, Option<String>>(0)?, r.get::<_, Option<String>>(1)?))
          })
          .optional()?
        else {
          return Ok(None);
        };

        Ok(Some(list_summaries(
          conn,
          &format!(
            "SELECT {SUMMARY_COLUMNS} FROM weapons w
             WHERE w.id != ?1 AND (w.type = ?2 OR w.country = ?3)
             ORDER BY CASE WHEN w.type = ?2 THEN 0 ELSE 1 END, w.id
             LIMIT ?4"
          ),
          params![id, kind, country, i64::from(limit)],
        )?))
      })
      .await?;
    Ok(similar)
  }

  async fn create_weapon(&self, input: WeaponInput) -> Result<Weapon> {
    let (specs, perf) = encode_weapon_json(&input)?;
    let link = input.manufacturer.clone().filter(|l| !l.name.trim().is_empty());

    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let manufacturer_id = link.as_ref().map(|l| resolve_link(&tx, l)).transpose()?;

        tx.execute(
          "INSERT INTO weapons
             (name, type, country, year, description, specifications, performance_data)
           VALUES (?1, ?2, ?3, ?4, ?5, COALESCE(?6, '{}'), COALESCE(?7, '{}'))",
          params![
            input.name.trim(),
            input.kind,
            input.country.trim(),
            input.year,
            input.description,
            specs,
            perf
          ],
        )?;
        let id = tx.last_insert_rowid();

        if let Some(manufacturer_id) = manufacturer_id {
          tx.execute(
            "INSERT OR IGNORE INTO weapon_manufacturers (weapon_id, manufacturer_id)
             VALUES (?1, ?2)",
            params![id, manufacturer_id],
          )?;
        }
        tx.commit()?;
        Ok(id)
      })
      .await?;

    info!(weapon_id = id, "weapon created");
    self.load_weapon(id).await?.ok_or(Error::Core(CoreError::WeaponNotFound(id)))
  }

  async fn link_manufacturer(&self, weapon_id: i64, link: ManufacturerLink) -> Result<Manufacturer> {
    let manufacturer_id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !weapon_exists(&tx, weapon_id)? {
          return Err(domain(CoreError::WeaponNotFound(weapon_id)));
        }
        let manufacturer_id = resolve_link(&tx, &link)?;
        tx.execute(
          "INSERT OR IGNORE INTO weapon_manufacturers (weapon_id, manufacturer_id)
           VALUES (?1, ?2)",
          params![weapon_id, manufacturer_id],
        )?;
        tx.commit()?;
        Ok(manufacturer_id)
      })
      .await?;

    debug!(weapon_id, manufacturer_id, "manufacturer linked");
    self.load_manufacturer(manufacturer_id).await
  }

  async fn update_weapon(&self, id: i64, input: WeaponInput) -> Result<Weapon> {
    let (specs, perf) = encode_weapon_json(&input)?;

    self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE weapons SET
             name             = ?2,
             type             = ?3,
             country          = ?4,
             year             = ?5,
             description      = ?6,
             specifications   = COALESCE(?7, specifications),
             performance_data = COALESCE(?8, performance_data),
             updated_at       = datetime('now')
           WHERE id = ?1",
          params![
            id,
            input.name.trim(),
            input.kind,
            input.country.trim(),
            input.year,
            input.description,
            specs,
            perf
          ],
        )?;
        if changed == 0 {
          return Err(domain(CoreError::WeaponNotFound(id)));
        }
        Ok(())
      })
      .await?;

    info!(weapon_id = id, "weapon updated");
    self.load_weapon(id).await?.ok_or(Error::Core(CoreError::WeaponNotFound(id)))
  }

  async fn delete_weapon(&self, id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        if conn.execute("DELETE FROM weapons WHERE id = ?1", [id])? == 0 {
          return Err(domain(CoreError::WeaponNotFound(id)));
        }
        Ok(())
      })
      .await?;
    info!(weapon_id = id, "weapon deleted");
    Ok(())
  }

  async fn purge_weapon(&self, id: i64) -> Result<Option<String>> {
    let name = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(name): Option<String> = tx
          .query_row("SELECT name FROM weapons WHERE id = ?1", [id], |r| r.get(0))
          .optional()?
        else {
          return Ok(None);
        };
        tx.execute("DELETE FROM weapon_manufacturers WHERE weapon_id = ?1", [id])?;
        tx.execute("DELETE FROM user_interests WHERE weapon_id = ?1", [id])?;
        tx.execute(
          "DELETE FROM weapon_similarities WHERE weapon_id = ?1 OR similar_weapon_id = ?1",
          [id],
        )?;
        tx.execute("DELETE FROM weapons WHERE id = ?1", [id])?;
        tx.commit()?;
        Ok(Some(name))
      })
      .await?;
    if name.is_some() {
      info!(weapon_id = id, "weapon purged");
    }
    Ok(name)
  }

  async fn weapon_statistics(&self) -> Result<WeaponStatistics> {
    let stats = self
      .conn
      .call(|conn| {
        let total_weapons = count(conn, "SELECT COUNT(*) FROM weapons", [])?;
        let by_type = conn
          .prepare(
            "SELECT COALESCE(type, ''), COUNT(*) FROM weapons
             GROUP BY type ORDER BY COUNT(*) DESC, type",
          )?
          .query_map([], |r| Ok(TypeCount { kind: r.get(0)?, count: r.get::<_, i64>(1)? as u64 }))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        let by_country = conn
          .prepare(
            "SELECT COALESCE(country, ''), COUNT(*) FROM weapons
             GROUP BY country ORDER BY COUNT(*) DESC, country
             LIMIT 10",
          )?
          .query_map([], |r| {
            Ok(CountryCount { country: r.get(0)?, count: r.get::<_, i64>(1)? as u64 })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(WeaponStatistics { total_weapons, by_type, by_country })
      })
      .await?;
    Ok(stats)
  }

  // ── Manufacturers ─────────────────────────────────────────────────────────

  async fn list_manufacturers(&self) -> Result<Vec<Manufacturer>> {
    let raws = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .prepare(&format!("SELECT {MANUFACTURER_COLUMNS} FROM manufacturers m ORDER BY m.name"))?
            .query_map([], RawManufacturer::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        )
      })
      .await?;
    raws.into_iter().map(RawManufacturer::into_manufacturer).collect()
  }

  async fn find_manufacturer_by_name(&self, name: String) -> Result<Option<Manufacturer>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {MANUFACTURER_COLUMNS} FROM manufacturers m WHERE m.name = ?1"),
              [name.trim()],
              RawManufacturer::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawManufacturer::into_manufacturer).transpose()
  }

  async fn get_manufacturer(&self, id: i64) -> Result<Option<ManufacturerDetail>> {
    let found = self
      .conn
      .call(move |conn| {
        let Some(raw) = fetch_manufacturer(conn, id)? else {
          return Ok(None);
        };
        let weapons = list_summaries(
          conn,
          &format!(
            "SELECT {SUMMARY_COLUMNS} FROM weapons w
             JOIN weapon_manufacturers wm ON wm.weapon_id = w.id
             WHERE wm.manufacturer_id = ?1
             ORDER BY w.name, w.id"
          ),
          [id],
        )?;
        Ok(Some((raw, weapons)))
      })
      .await?;

    found
      .map(|(raw, weapons)| {
        Ok(ManufacturerDetail { manufacturer: raw.into_manufacturer()?, weapons })
      })
      .transpose()
  }

  async fn create_manufacturer(&self, input: NewManufacturer) -> Result<Manufacturer> {
    let id = self
      .conn
      .call(move |conn| {
        let name = input.name.trim();
        unreserved(name)?;
        if manufacturer_id_by_name(conn, name)?.is_some() {
          return Err(domain(CoreError::DuplicateManufacturer(name.to_owned())));
        }
        conn.execute(
          "INSERT INTO manufacturers (name, country, founded, description)
           VALUES (?1, ?2, ?3, ?4)",
          params![name, input.country, input.founded, input.description],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    info!(manufacturer_id = id, "manufacturer created");
    self.load_manufacturer(id).await
  }

  async fn update_manufacturer(&self, id: i64, input: NewManufacturer) -> Result<Manufacturer> {
    self
      .conn
      .call(move |conn| {
        let name = input.name.trim();
        if fetch_manufacturer(conn, id)?.is_none() {
          return Err(domain(CoreError::ManufacturerNotFound(id)));
        }
        unreserved(name)?;
        if manufacturer_id_by_name(conn, name)?.is_some_and(|other| other != id) {
          return Err(domain(CoreError::DuplicateManufacturer(name.to_owned())));
        }
        conn.execute(
          "UPDATE manufacturers SET
             name = ?2, country = ?3, founded = ?4, description = ?5,
             updated_at = datetime('now')
           WHERE id = ?1",
          params![id, name, input.country, input.founded, input.description],
        )?;
        Ok(())
      })
      .await?;

    info!(manufacturer_id = id, "manufacturer updated");
    self.load_manufacturer(id).await
  }

  async fn delete_manufacturer(&self, id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        if fetch_manufacturer(conn, id)?.is_none() {
          return Err(domain(CoreError::ManufacturerNotFound(id)));
        }
        let linked = count(
          conn,
          "SELECT COUNT(*) FROM weapon_manufacturers WHERE manufacturer_id = ?1",
          [id],
        )?;
        if linked > 0 {
          return Err(domain(CoreError::ManufacturerInUse(linked)));
        }
        conn.execute("DELETE FROM manufacturers WHERE id = ?1", [id])?;
        Ok(())
      })
      .await?;
    info!(manufacturer_id = id, "manufacturer deleted");
    Ok(())
  }

  async fn manufacturer_weapon_counts(&self) -> Result<ManufacturerWeaponCounts> {
    let statistics = self
      .conn
      .call(|conn| {
        // Each weapon is attributed to its earliest valid link, or to the
        // unknown bucket when it has none.
        Ok(
          conn
            .prepare(
              "SELECT COALESCE(m.name, ?1), COUNT(*), m.country
               FROM weapons w
               LEFT JOIN (
                 SELECT wm.weapon_id, MIN(wm.id) AS first_link
                 FROM weapon_manufacturers wm
                 JOIN manufacturers m2 ON m2.id = wm.manufacturer_id
                 GROUP BY wm.weapon_id
               ) f ON f.weapon_id = w.id
               LEFT JOIN weapon_manufacturers wm ON wm.id = f.first_link
               LEFT JOIN manufacturers m ON m.id = wm.manufacturer_id
               GROUP BY m.id
               ORDER BY COUNT(*) DESC, COALESCE(m.name, ?1)",
            )?
            .query_map([UNKNOWN_MANUFACTURER], |r| {
              Ok(ManufacturerCount {
                manufacturer_name:    r.get(0)?,
                weapon_count:         r.get::<_, i64>(1)? as u64,
                manufacturer_country: r.get(2)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        )
      })
      .await?;
    Ok(ManufacturerWeaponCounts { statistics })
  }

  async fn manufacturer_details(&self) -> Result<Vec<ManufacturerUsage>> {
    let (manufacturers, weapon_names) = self
      .conn
      .call(|conn| {
        let manufacturers = conn
          .prepare(&format!("SELECT {MANUFACTURER_COLUMNS} FROM manufacturers m"))?
          .query_map([], RawManufacturer::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        let weapon_names = conn
          .prepare(
            "SELECT wm.manufacturer_id, w.name FROM weapon_manufacturers wm
             JOIN weapons w ON w.id = wm.weapon_id
             ORDER BY w.name",
          )?
          .query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((manufacturers, weapon_names))
      })
      .await?;

    let mut usage: Vec<ManufacturerUsage> = manufacturers
      .into_iter()
      .map(|m| {
        let weapon_names: Vec<String> = weapon_names
          .iter()
          .filter(|(id, _)| *id == m.id)
          .map(|(_, name)| name.clone())
          .collect();
        ManufacturerUsage {
          id: m.id,
          name: m.name,
          country: m.country,
          founded: m.founded,
          description: m.description,
          weapon_count: weapon_names.len() as u64,
          weapon_names,
        }
      })
      .collect();
    usage.sort_by(|a, b| b.weapon_count.cmp(&a.weapon_count).then_with(|| a.name.cmp(&b.name)));
    Ok(usage)
  }

  // ── Lookups ───────────────────────────────────────────────────────────────

  async fn list_lookups(&self, kind: LookupKind) -> Result<Vec<Lookup>> {
    Ok(self.conn.call(move |conn| Ok(list_lookups(conn, kind)?)).await?)
  }

  async fn find_lookup(&self, kind: LookupKind, name: String) -> Result<Option<Lookup>> {
    Ok(
      self
        .conn
        .call(move |conn| Ok(lookup_by_name(conn, kind, name.trim())?))
        .await?,
    )
  }

  async fn get_lookup(&self, kind: LookupKind, id: i64) -> Result<Option<LookupDetail>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let Some(lookup) = lookup_by_id(conn, kind, id)? else {
            return Ok(None);
          };
          let weapon_count = lookup_usage(conn, kind, &lookup.name)?;
          Ok(Some(LookupDetail { lookup, weapon_count }))
        })
        .await?,
    )
  }

  async fn create_lookup(&self, kind: LookupKind, input: NewLookup) -> Result<Lookup> {
    let lookup = self
      .conn
      .call(move |conn| {
        let name = input.name.trim();
        if lookup_by_name(conn, kind, name)?.is_some() {
          return Err(domain(CoreError::DuplicateLookup { kind, name: name.to_owned() }));
        }
        conn.execute(
          &format!(
            "INSERT INTO {table} (name, {detail}) VALUES (?1, ?2)",
            table = lookup_table(kind),
            detail = kind.detail_field(),
          ),
          params![name, input.detail],
        )?;
        Ok(Lookup { id: conn.last_insert_rowid(), name: name.to_owned(), detail: input.detail })
      })
      .await?;
    info!(%kind, id = lookup.id, "lookup created");
    Ok(lookup)
  }

  async fn update_lookup(&self, kind: LookupKind, id: i64, input: NewLookup) -> Result<Lookup> {
    let lookup = self
      .conn
      .call(move |conn| {
        let name = input.name.trim();
        if lookup_by_id(conn, kind, id)?.is_none() {
          return Err(domain(CoreError::LookupNotFound { kind, id }));
        }
        if lookup_by_name(conn, kind, name)?.is_some_and(|other| other.id != id) {
          return Err(domain(CoreError::DuplicateLookup { kind, name: name.to_owned() }));
        }
        conn.execute(
          &format!(
            "UPDATE {table} SET name = ?2, {detail} = ?3 WHERE id = ?1",
            table = lookup_table(kind),
            detail = kind.detail_field(),
          ),
          params![id, name, input.detail],
        )?;
        Ok(Lookup { id, name: name.to_owned(), detail: input.detail })
      })
      .await?;
    info!(%kind, id, "lookup updated");
    Ok(lookup)
  }

  async fn delete_lookup(&self, kind: LookupKind, id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let Some(lookup) = lookup_by_id(conn, kind, id)? else {
          return Err(domain(CoreError::LookupNotFound { kind, id }));
        };
        let used = lookup_usage(conn, kind, &lookup.name)?;
        if used > 0 {
          return Err(domain(CoreError::LookupInUse { kind, count: used }));
        }
        conn.execute(&format!("DELETE FROM {} WHERE id = ?1", lookup_table(kind)), [id])?;
        Ok(())
      })
      .await?;
    info!(%kind, id, "lookup deleted");
    Ok(())
  }

  // ── Users and sessions ────────────────────────────────────────────────────

  async fn create_user(&self, user: NewUser) -> Result<User> {
    let id = self
      .conn
      .call(move |conn| {
        let taken = count(
          conn,
          "SELECT COUNT(*) FROM users WHERE username = ?1 OR email = ?2",
          params![user.username, user.email],
        )?;
        if taken > 0 {
          return Err(domain(CoreError::UserExists));
        }
        conn.execute(
          "INSERT INTO users (username, email, password_hash, name, role)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          params![
            user.username,
            user.email,
            user.password_hash,
            user.name,
            encode_role(user.role)
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    info!(user_id = id, "user created");
    self.load_user(id).await?.ok_or(Error::Core(CoreError::UserNotFound(id)))
  }

  async fn find_credentials(&self, login: String) -> Result<Option<Credentials>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {USER_COLUMNS}, u.password_hash FROM users u
                 WHERE u.username = ?1 OR u.email = ?1
                 ORDER BY u.id LIMIT 1"
              ),
              [login.trim()],
              |r| Ok((RawUser::from_row(r)?, r.get::<_, String>(13)?)),
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|(user, password_hash)| Ok(Credentials { user: user.into_user()?, password_hash }))
      .transpose()
  }

  async fn get_user(&self, id: i64) -> Result<Option<User>> { self.load_user(id).await }

  async fn update_profile(&self, id: i64, update: ProfileUpdate) -> Result<User> {
    let preferences = update.preferences.as_ref().map(encode_json).transpose()?;
    self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE users SET
             name        = COALESCE(?2, name),
             phone       = COALESCE(?3, phone),
             bio         = COALESCE(?4, bio),
             avatar      = COALESCE(?5, avatar),
             preferences = COALESCE(?6, preferences),
             updated_at  = datetime('now')
           WHERE id = ?1",
          params![id, update.name, update.phone, update.bio, update.avatar, preferences],
        )?;
        if changed == 0 {
          return Err(domain(CoreError::UserNotFound(id)));
        }
        Ok(())
      })
      .await?;
    self.load_user(id).await?.ok_or(Error::Core(CoreError::UserNotFound(id)))
  }

  async fn set_password_hash(&self, id: i64, password_hash: String) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE users SET password_hash = ?2, updated_at = datetime('now') WHERE id = ?1",
          params![id, password_hash],
        )?;
        if changed == 0 {
          return Err(domain(CoreError::UserNotFound(id)));
        }
        Ok(())
      })
      .await?;
    info!(user_id = id, "password changed");
    Ok(())
  }

  async fn touch_login(&self, id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute("UPDATE users SET last_login = datetime('now') WHERE id = ?1", [id])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn create_session(
    &self,
    token_digest: String,
    user_id: i64,
    expires_at: DateTime<Utc>,
  ) -> Result<()> {
    let created = encode_dt(Utc::now());
    let expires = encode_dt(expires_at);
    let swept = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let swept =
          tx.execute("DELETE FROM sessions WHERE julianday(expires_at) <= julianday('now')", [])?;
        tx.execute(
          "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          params![token_digest, user_id, created, expires],
        )?;
        tx.commit()?;
        Ok(swept)
      })
      .await?;
    if swept > 0 {
      debug!(swept, "deleted expired sessions");
    }
    Ok(())
  }

  async fn find_session(&self, token_digest: String) -> Result<Option<Session>> {
    let digest = token_digest.clone();
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {USER_COLUMNS}, s.expires_at FROM sessions s
                 JOIN users u ON u.id = s.user_id
                 WHERE s.token_hash = ?1"
              ),
              [token_digest],
              |r| Ok((RawUser::from_row(r)?, r.get::<_, String>(13)?)),
            )
            .optional()?,
        )
      })
      .await?;

    let Some((user, expires_at)) = raw else {
      return Ok(None);
    };
    let expires_at = decode_dt(&expires_at)?;
    if expires_at <= Utc::now() {
      self.delete_session(digest).await?;
      return Ok(None);
    }
    Ok(Some(Session { user: user.into_user()?, expires_at }))
  }

  async fn delete_session(&self, token_digest: String) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM sessions WHERE token_hash = ?1", [token_digest])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Interests ─────────────────────────────────────────────────────────────

  async fn record_interest(
    &self,
    user_id: i64,
    weapon_id: i64,
    interaction: Interaction,
  ) -> Result<()> {
    let kind = interaction.as_str();
    self
      .conn
      .call(move |conn| {
        if !weapon_exists(conn, weapon_id)? {
          return Err(domain(CoreError::WeaponNotFound(weapon_id)));
        }
        // A later view never downgrades an existing favourite.
        conn.execute(
          "INSERT INTO user_interests (user_id, weapon_id, interaction_type)
           VALUES (?1, ?2, ?3)
           ON CONFLICT (user_id, weapon_id) DO UPDATE SET
             count            = count + 1,
             interaction_type = CASE
               WHEN excluded.interaction_type = 'favorite' THEN 'favorite'
               ELSE user_interests.interaction_type
             END,
             updated_at       = datetime('now')",
          params![user_id, weapon_id, kind],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn remove_favorite(&self, user_id: i64, weapon_id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        if !weapon_exists(conn, weapon_id)? {
          return Err(domain(CoreError::WeaponNotFound(weapon_id)));
        }
        conn.execute(
          "UPDATE user_interests SET interaction_type = 'view', updated_at = datetime('now')
           WHERE user_id = ?1 AND weapon_id = ?2 AND interaction_type = 'favorite'",
          params![user_id, weapon_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Knowledge graph ───────────────────────────────────────────────────────

  async fn graph_snapshot(&self) -> Result<GraphSnapshot> {
    let (weapons, countries, categories, manufacturers, links) = self
      .conn
      .call(|conn| {
        let weapons = list_summaries(
          conn,
          &format!("SELECT {SUMMARY_COLUMNS} FROM weapons w ORDER BY w.id"),
          [],
        )?;
        let countries = list_lookups(conn, LookupKind::Country)?;
        let categories = list_lookups(conn, LookupKind::Category)?;
        let manufacturers = conn
          .prepare(&format!("SELECT {MANUFACTURER_COLUMNS} FROM manufacturers m ORDER BY m.id"))?
          .query_map([], RawManufacturer::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        let links = conn
          .prepare(
            "SELECT wm.weapon_id, wm.manufacturer_id FROM weapon_manufacturers wm
             JOIN weapons w       ON w.id = wm.weapon_id
             JOIN manufacturers m ON m.id = wm.manufacturer_id
             ORDER BY wm.id",
          )?
          .query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((weapons, countries, categories, manufacturers, links))
      })
      .await?;

    Ok(GraphSnapshot {
      weapons,
      countries,
      categories,
      manufacturers: manufacturers
        .into_iter()
        .map(RawManufacturer::into_manufacturer)
        .collect::<Result<_>>()?,
      links,
    })
  }

  // ── Maintenance ───────────────────────────────────────────────────────────

  async fn integrity_report(&self) -> Result<IntegrityReport> {
    Ok(self.conn.call(|conn| Ok(integrity::report(conn)?)).await?)
  }

  async fn table_counts(&self) -> Result<TableCounts> {
    Ok(self.conn.call(|conn| Ok(integrity::table_counts(conn)?)).await?)
  }

  async fn repair_links(&self) -> Result<RepairReport> {
    let report = self.conn.call(integrity::repair).await?;
    info!(
      removed = report.removed,
      kept = report.after.total_links,
      "weapon_manufacturers rebuilt with cascading foreign keys"
    );
    Ok(report)
  }

  async fn prune_dangling_links(&self) -> Result<u64> {
    let removed = self.conn.call(|conn| Ok(integrity::prune(conn)?)).await?;
    info!(removed, "dangling links pruned");
    Ok(removed)
  }

  async fn link_manufacturers(&self) -> Result<LinkReport> {
    let report = self.conn.call(|conn| Ok(maintenance::link_all(conn)?)).await?;
    info!(
      processed = report.processed,
      inserted = report.inserted,
      unmatched = report.unmatched(),
      "manufacturer links inferred"
    );
    Ok(report)
  }

  async fn remove_duplicate_weapons(&self) -> Result<DedupeReport> {
    let report = self.conn.call(|conn| Ok(maintenance::dedupe(conn)?)).await?;
    info!(
      names = report.duplicates.len(),
      removed = report.removed,
      "duplicate weapons removed"
    );
    Ok(report)
  }

  async fn seed_sample_data(&self) -> Result<SeedReport> {
    let report = self.conn.call(|conn| Ok(seed::seed(conn)?)).await?;
    info!(
      categories = report.categories,
      countries = report.countries,
      manufacturers = report.manufacturers,
      weapons = report.weapons,
      "sample data seeded"
    );
    Ok(report)
  }
}
