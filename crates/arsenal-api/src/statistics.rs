//! Handlers for `/api/manufacturer-statistics`.

use arsenal_core::{
  stats::{ManufacturerCount, ManufacturerUsage},
  store::ArsenalStore,
};
use axum::extract::State;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
  AppState,
  envelope::{self, Envelope},
  error::ApiError,
};

#[derive(Debug, Serialize)]
pub struct WeaponCountBody {
  /// `{manufacturer_name: weapon_count}`, including the unknown bucket.
  pub manufacturer_count:  Map<String, Value>,
  pub total_manufacturers: usize,
  pub statistics:          Vec<ManufacturerCount>,
}

/// `GET /api/manufacturer-statistics/weapon-count`
///
/// Every weapon is counted once, so the counts sum to the weapon total.
pub async fn weapon_count<S: ArsenalStore>(
  State(state): State<AppState<S>>,
) -> Result<Envelope<WeaponCountBody>, ApiError> {
  let counts = state.store.manufacturer_weapon_counts().await.map_err(ApiError::store)?;
  Ok(envelope::ok(WeaponCountBody {
    manufacturer_count:  counts.as_map(),
    total_manufacturers: counts.statistics.len(),
    statistics:          counts.statistics,
  }))
}

#[derive(Debug, Serialize)]
pub struct DetailsBody {
  pub manufacturers: Vec<ManufacturerUsage>,
}

/// `GET /api/manufacturer-statistics/details`
pub async fn details<S: ArsenalStore>(
  State(state): State<AppState<S>>,
) -> Result<Envelope<DetailsBody>, ApiError> {
  let manufacturers = state.store.manufacturer_details().await.map_err(ApiError::store)?;
  Ok(envelope::ok(DetailsBody { manufacturers }))
}
