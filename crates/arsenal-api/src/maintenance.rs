//! Admin-only maintenance endpoints under `/api/maintenance`.
//!
//! The same procedures are available from the server binary as
//! subcommands; these handlers are thin wrappers that log who ran them.

use arsenal_core::{
  maintenance::{DedupeReport, HealthReport, LinkReport, RepairReport},
  store::ArsenalStore,
};
use axum::extract::State;

use crate::{
  AppState,
  auth::RequireAdmin,
  envelope::{self, Envelope},
  error::ApiError,
};

/// `GET /api/maintenance/health`
pub async fn health<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  RequireAdmin(_): RequireAdmin,
) -> Result<Envelope<HealthReport>, ApiError> {
  let integrity = state.store.integrity_report().await.map_err(ApiError::store)?;
  let counts = state.store.table_counts().await.map_err(ApiError::store)?;
  let report = HealthReport { integrity, counts };
  let message = if report.is_healthy() { "数据完整性正常" } else { "发现数据完整性问题" };
  Ok(envelope::ok_with(message, report))
}

/// `POST /api/maintenance/repair-links`
pub async fn repair_links<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  RequireAdmin(admin): RequireAdmin,
) -> Result<Envelope<RepairReport>, ApiError> {
  let report = state.store.repair_links().await.map_err(ApiError::store)?;
  tracing::info!(admin = %admin.username, removed = report.removed, "repaired weapon_manufacturers");
  Ok(envelope::ok_with("关联表修复完成", report))
}

/// `POST /api/maintenance/link-manufacturers`
pub async fn link_manufacturers<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  RequireAdmin(admin): RequireAdmin,
) -> Result<Envelope<LinkReport>, ApiError> {
  let report = state.store.link_manufacturers().await.map_err(ApiError::store)?;
  tracing::info!(
    admin = %admin.username,
    processed = report.processed,
    inserted = report.inserted,
    "linked manufacturers"
  );
  Ok(envelope::ok_with("制造商关联完成", report))
}

/// `POST /api/maintenance/dedupe-weapons`
pub async fn dedupe_weapons<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  RequireAdmin(admin): RequireAdmin,
) -> Result<Envelope<DedupeReport>, ApiError> {
  let report = state.store.remove_duplicate_weapons().await.map_err(ApiError::store)?;
  tracing::info!(admin = %admin.username, removed = report.removed, "removed duplicate weapons");
  Ok(envelope::ok_with("重复武器清理完成", report))
}
