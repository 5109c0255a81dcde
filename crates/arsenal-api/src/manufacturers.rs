//! Handlers for `/api/manufacturers` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/api/manufacturers` | Sorted by name |
//! | `GET`    | `/api/manufacturers/check` | `?name=` |
//! | `GET`    | `/api/manufacturers/{id}` | With linked weapons |
//! | `POST`   | `/api/manufacturers` | 409 on duplicate name |
//! | `PUT`    | `/api/manufacturers/{id}` | Admin |
//! | `DELETE` | `/api/manufacturers/{id}` | Admin; 400 while weapons are linked |

use arsenal_core::{
  manufacturer::{Manufacturer, ManufacturerDetail, NewManufacturer},
  store::ArsenalStore,
};
use axum::{extract::State, http::StatusCode};
use serde::Deserialize;

use crate::{
  AppState,
  auth::RequireAdmin,
  envelope::{self, Envelope},
  error::ApiError,
  extract::{Json, Path, Query},
};

const NAME_REQUIRED: &str = "制造商名称不能为空";

fn named(mut input: NewManufacturer) -> Result<NewManufacturer, ApiError> {
  input.name = input.name.trim().to_owned();
  if input.name.is_empty() {
    return Err(ApiError::bad_request(NAME_REQUIRED));
  }
  Ok(input)
}

/// `GET /api/manufacturers`
pub async fn list<S: ArsenalStore>(
  State(state): State<AppState<S>>,
) -> Result<Envelope<Vec<Manufacturer>>, ApiError> {
  let manufacturers = state.store.list_manufacturers().await.map_err(ApiError::store)?;
  Ok(envelope::ok(manufacturers))
}

#[derive(Debug, Deserialize)]
pub struct CheckParams {
  pub name: Option<String>,
}

/// `GET /api/manufacturers/check?name=`
pub async fn check<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  Query(params): Query<CheckParams>,
) -> Result<Envelope<Manufacturer>, ApiError> {
  let name = params.name.unwrap_or_default();
  if name.trim().is_empty() {
    return Err(ApiError::bad_request(NAME_REQUIRED));
  }
  let found = state.store.find_manufacturer_by_name(name).await.map_err(ApiError::store)?;
  Ok(envelope::exists(found))
}

/// `GET /api/manufacturers/{id}`
pub async fn get_one<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
) -> Result<Envelope<ManufacturerDetail>, ApiError> {
  let detail = state
    .store
    .get_manufacturer(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("制造商不存在"))?;
  Ok(envelope::ok(detail))
}

/// `POST /api/manufacturers`
pub async fn create<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  Json(input): Json<NewManufacturer>,
) -> Result<(StatusCode, Envelope<Manufacturer>), ApiError> {
  let manufacturer =
    state.store.create_manufacturer(named(input)?).await.map_err(ApiError::store)?;
  Ok(envelope::created("制造商创建成功", manufacturer))
}

/// `PUT /api/manufacturers/{id}`
pub async fn update<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  RequireAdmin(_): RequireAdmin,
  Path(id): Path<i64>,
  Json(input): Json<NewManufacturer>,
) -> Result<Envelope<Manufacturer>, ApiError> {
  let manufacturer =
    state.store.update_manufacturer(id, named(input)?).await.map_err(ApiError::store)?;
  Ok(envelope::ok_with("制造商更新成功", manufacturer))
}

/// `DELETE /api/manufacturers/{id}`
pub async fn delete_one<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  RequireAdmin(admin): RequireAdmin,
  Path(id): Path<i64>,
) -> Result<Envelope<()>, ApiError> {
  state.store.delete_manufacturer(id).await.map_err(ApiError::store)?;
  tracing::info!(manufacturer_id = id, admin = %admin.username, "deleted manufacturer");
  Ok(envelope::message("制造商删除成功"))
}
