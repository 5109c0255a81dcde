//! The `ArsenalStore` trait.
//!
//! Implemented by storage backends (e.g. `arsenal-store-sqlite`). The HTTP
//! layer depends on this abstraction only.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  Error,
  graph::GraphSnapshot,
  lookup::{Lookup, LookupDetail, LookupKind, NewLookup},
  maintenance::{
    DedupeReport, IntegrityReport, LinkReport, RepairReport, SeedReport, TableCounts,
  },
  manufacturer::{Manufacturer, ManufacturerDetail, NewManufacturer},
  stats::{ManufacturerUsage, ManufacturerWeaponCounts, WeaponStatistics},
  user::{Credentials, NewUser, ProfileUpdate, Session, User},
  weapon::{
    Interaction, ManufacturerLink, SearchQuery, Weapon, WeaponInput, WeaponPage, WeaponQuery,
    WeaponSummary,
  },
};

/// Lets callers classify backend errors without knowing the backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The domain error, if this is one.
  fn domain(&self) -> Option<&Error>;

  /// Whether the failure came from the database engine itself (locked file,
  /// I/O, constraint the domain layer did not anticipate).
  fn is_database(&self) -> bool;
}

/// Abstraction over an arsenal catalogue backend.
///
/// All methods return `Send` futures so the trait can be used behind `axum`
/// on a multi-threaded runtime.
pub trait ArsenalStore: Send + Sync {
  type Error: StoreError;

  // ── Weapons ───────────────────────────────────────────────────────────

  /// One page of weapons, newest first, optionally filtered by exact type and
  /// country.
  fn list_weapons(
    &self,
    query: WeaponQuery,
  ) -> impl Future<Output = Result<WeaponPage, Self::Error>> + Send + '_;

  /// Substring search over name and description, capped at
  /// [`crate::weapon::SEARCH_LIMIT`] rows.
  fn search_weapons(
    &self,
    query: SearchQuery,
  ) -> impl Future<Output = Result<Vec<WeaponSummary>, Self::Error>> + Send + '_;

  fn get_weapon(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Weapon>, Self::Error>> + Send + '_;

  /// Other weapons of the same type or country. `None` if `id` does not exist.
  fn similar_weapons(
    &self,
    id: i64,
    limit: u32,
  ) -> impl Future<Output = Result<Option<Vec<WeaponSummary>>, Self::Error>> + Send + '_;

  /// Insert a weapon and, if `input.manufacturer` is set, link it in the same
  /// transaction. An unknown manufacturer name fails the whole operation with
  /// [`Error::UnknownManufacturer`].
  fn create_weapon(
    &self,
    input: WeaponInput,
  ) -> impl Future<Output = Result<Weapon, Self::Error>> + Send + '_;

  /// Link an existing weapon to a manufacturer found by name, or created
  /// when `link.is_new` is set. Linking twice is a no-op.
  fn link_manufacturer(
    &self,
    weapon_id: i64,
    link: ManufacturerLink,
  ) -> impl Future<Output = Result<Manufacturer, Self::Error>> + Send + '_;

  /// Replace the scalar and JSON columns of a weapon. Links are untouched.
  fn update_weapon(
    &self,
    id: i64,
    input: WeaponInput,
  ) -> impl Future<Output = Result<Weapon, Self::Error>> + Send + '_;

  /// Delete a weapon; its links go with it through the cascade.
  fn delete_weapon(&self, id: i64) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete a weapon and its links explicitly, in one transaction, whether
  /// or not foreign keys are enforced. Returns the deleted weapon's name.
  fn purge_weapon(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_;

  fn weapon_statistics(
    &self,
  ) -> impl Future<Output = Result<WeaponStatistics, Self::Error>> + Send + '_;

  // ── Manufacturers ─────────────────────────────────────────────────────

  fn list_manufacturers(
    &self,
  ) -> impl Future<Output = Result<Vec<Manufacturer>, Self::Error>> + Send + '_;

  fn find_manufacturer_by_name(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Option<Manufacturer>, Self::Error>> + Send + '_;

  fn get_manufacturer(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<ManufacturerDetail>, Self::Error>> + Send + '_;

  fn create_manufacturer(
    &self,
    input: NewManufacturer,
  ) -> impl Future<Output = Result<Manufacturer, Self::Error>> + Send + '_;

  fn update_manufacturer(
    &self,
    id: i64,
    input: NewManufacturer,
  ) -> impl Future<Output = Result<Manufacturer, Self::Error>> + Send + '_;

  /// Refuses with [`Error::ManufacturerInUse`] while any weapon is linked.
  fn delete_manufacturer(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn manufacturer_weapon_counts(
    &self,
  ) -> impl Future<Output = Result<ManufacturerWeaponCounts, Self::Error>> + Send + '_;

  fn manufacturer_details(
    &self,
  ) -> impl Future<Output = Result<Vec<ManufacturerUsage>, Self::Error>> + Send + '_;

  // ── Lookups ───────────────────────────────────────────────────────────

  fn list_lookups(
    &self,
    kind: LookupKind,
  ) -> impl Future<Output = Result<Vec<Lookup>, Self::Error>> + Send + '_;

  fn find_lookup(
    &self,
    kind: LookupKind,
    name: String,
  ) -> impl Future<Output = Result<Option<Lookup>, Self::Error>> + Send + '_;

  fn get_lookup(
    &self,
    kind: LookupKind,
    id: i64,
  ) -> impl Future<Output = Result<Option<LookupDetail>, Self::Error>> + Send + '_;

  fn create_lookup(
    &self,
    kind: LookupKind,
    input: NewLookup,
  ) -> impl Future<Output = Result<Lookup, Self::Error>> + Send + '_;

  fn update_lookup(
    &self,
    kind: LookupKind,
    id: i64,
    input: NewLookup,
  ) -> impl Future<Output = Result<Lookup, Self::Error>> + Send + '_;

  /// Refuses with [`Error::LookupInUse`] while any weapon references the
  /// entry's name.
  fn delete_lookup(
    &self,
    kind: LookupKind,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Users and sessions ────────────────────────────────────────────────

  fn create_user(
    &self,
    user: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Look a user up by username or email, with their password hash.
  fn find_credentials(
    &self,
    login: String,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + '_;

  fn get_user(&self, id: i64)
  -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn update_profile(
    &self,
    id: i64,
    update: ProfileUpdate,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn set_password_hash(
    &self,
    id: i64,
    password_hash: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn touch_login(&self, id: i64) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Store the digest of a freshly issued bearer token.
  fn create_session(
    &self,
    token_digest: String,
    user_id: i64,
    expires_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The unexpired session for a token digest, if any.
  fn find_session(
    &self,
    token_digest: String,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + '_;

  fn delete_session(
    &self,
    token_digest: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Interests ─────────────────────────────────────────────────────────

  /// Record a view or favourite; repeated interactions bump a counter.
  fn record_interest(
    &self,
    user_id: i64,
    weapon_id: i64,
    interaction: Interaction,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Downgrade a favourite back to a plain view.
  fn remove_favorite(
    &self,
    user_id: i64,
    weapon_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Knowledge graph ───────────────────────────────────────────────────

  fn graph_snapshot(&self)
  -> impl Future<Output = Result<GraphSnapshot, Self::Error>> + Send + '_;

  // ── Maintenance ───────────────────────────────────────────────────────

  fn integrity_report(
    &self,
  ) -> impl Future<Output = Result<IntegrityReport, Self::Error>> + Send + '_;

  fn table_counts(&self) -> impl Future<Output = Result<TableCounts, Self::Error>> + Send + '_;

  /// Rebuild `weapon_manufacturers` with cascading foreign keys, keeping only
  /// rows whose parents both exist. Fails with [`Error::IntegrityViolation`]
  /// if dangling rows remain afterwards.
  fn repair_links(&self) -> impl Future<Output = Result<RepairReport, Self::Error>> + Send + '_;

  /// Delete dangling join rows without rebuilding the table.
  fn prune_dangling_links(&self)
  -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Run the resolver over every weapon and insert missing links.
  fn link_manufacturers(&self)
  -> impl Future<Output = Result<LinkReport, Self::Error>> + Send + '_;

  /// Keep the lowest id per weapon name and delete the rest.
  fn remove_duplicate_weapons(
    &self,
  ) -> impl Future<Output = Result<DedupeReport, Self::Error>> + Send + '_;

  /// Insert the reference lookups and manufacturers, plus sample weapons when
  /// the weapon table is empty. Safe to run repeatedly.
  fn seed_sample_data(&self)
  -> impl Future<Output = Result<SeedReport, Self::Error>> + Send + '_;
}
