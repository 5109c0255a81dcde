//! Handlers for `/api/weapons` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/api/weapons` | `?category&country&page&limit` |
//! | `GET`    | `/api/weapons/search` | `?q` required |
//! | `GET`    | `/api/weapons/statistics` | |
//! | `GET`    | `/api/weapons/{id}` | Records a view for signed-in callers |
//! | `GET`    | `/api/weapons/{id}/similar` | `?limit`, default 5 |
//! | `POST`   | `/api/weapons` | Admin; validated; duplicate names allowed |
//! | `PUT`    | `/api/weapons/{id}` | Admin; validated |
//! | `DELETE` | `/api/weapons/{id}` | Admin |
//! | `POST`   | `/api/weapons/{id}/favorite` | Bearer |
//! | `DELETE` | `/api/weapons/{id}/favorite` | Bearer |
//! | `POST`   | `/api/weapons/direct-add` | Admin; name/type/country only |
//! | `PUT`    | `/api/weapons/direct-update/{id}` | Admin; name/type/country only |
//! | `DELETE` | `/api/weapons/direct-delete/{id}` | Admin; removes links explicitly |

use arsenal_core::{
  stats::WeaponStatistics,
  store::ArsenalStore,
  weapon::{
    DEFAULT_SIMILAR_LIMIT, Interaction, ManufacturerLink, SearchQuery, Weapon, WeaponInput,
    WeaponPage, WeaponQuery, WeaponSummary,
  },
};
use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::{
  AppState,
  auth::{CurrentUser, MaybeUser, RequireAdmin},
  envelope::{self, Envelope},
  error::ApiError,
  extract::{Json, Path, Query},
};

const MISSING_FIELDS: &str = "缺少必需字段：name, type, country";

fn validated(input: &WeaponInput) -> Result<(), ApiError> {
  let errors = input.validate();
  if errors.is_empty() { Ok(()) } else { Err(ApiError::Validation(errors)) }
}

async fn require_weapon<S: ArsenalStore>(store: &S, id: i64) -> Result<Weapon, ApiError> {
  store
    .get_weapon(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("武器不存在"))
}

// ─── Reads ────────────────────────────────────────────────────────────────────

/// `GET /api/weapons`
pub async fn list<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  Query(query): Query<WeaponQuery>,
) -> Result<Envelope<WeaponPage>, ApiError> {
  let page = state.store.list_weapons(query).await.map_err(ApiError::store)?;
  Ok(envelope::ok(page))
}

/// `GET /api/weapons/search?q=`
pub async fn search<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  Query(mut query): Query<SearchQuery>,
) -> Result<Envelope<Vec<WeaponSummary>>, ApiError> {
  let q = query.q.as_deref().map(str::trim).unwrap_or_default().to_owned();
  if q.is_empty() {
    return Err(ApiError::bad_request("搜索关键词不能为空"));
  }
  query.q = Some(q);

  let weapons = state.store.search_weapons(query).await.map_err(ApiError::store)?;
  Ok(envelope::ok(weapons))
}

/// `GET /api/weapons/statistics`
pub async fn statistics<S: ArsenalStore>(
  State(state): State<AppState<S>>,
) -> Result<Envelope<WeaponStatistics>, ApiError> {
  let stats = state.store.weapon_statistics().await.map_err(ApiError::store)?;
  Ok(envelope::ok(stats))
}

/// `GET /api/weapons/{id}`
pub async fn get_one<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  MaybeUser(user): MaybeUser,
  Path(id): Path<i64>,
) -> Result<Envelope<Weapon>, ApiError> {
  let weapon = require_weapon(state.store.as_ref(), id).await?;

  if let Some(user) = user {
    if let Err(e) = state.store.record_interest(user.id, id, Interaction::View).await {
      tracing::warn!(user_id = user.id, weapon_id = id, error = %e, "failed to record view");
    }
  }
  Ok(envelope::ok(weapon))
}

#[derive(Debug, Deserialize)]
pub struct SimilarParams {
  pub limit: Option<u32>,
}

/// `GET /api/weapons/{id}/similar[?limit=n]`
pub async fn similar<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  Query(params): Query<SimilarParams>,
) -> Result<Envelope<Vec<WeaponSummary>>, ApiError> {
  let limit = params.limit.unwrap_or(DEFAULT_SIMILAR_LIMIT).clamp(1, 50);
  let weapons = state
    .store
    .similar_weapons(id, limit)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("武器不存在"))?;
  Ok(envelope::ok(weapons))
}

// ─── Validated writes ─────────────────────────────────────────────────────────

/// `POST /api/weapons`
pub async fn create<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  RequireAdmin(admin): RequireAdmin,
  Json(input): Json<WeaponInput>,
) -> Result<(StatusCode, Envelope<Weapon>), ApiError> {
  validated(&input)?;
  let weapon = state.store.create_weapon(input).await.map_err(ApiError::store)?;
  tracing::info!(weapon_id = weapon.id, admin = %admin.username, "created weapon");
  Ok(envelope::created("武器创建成功", weapon))
}

/// `PUT /api/weapons/{id}`
pub async fn update<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  RequireAdmin(_): RequireAdmin,
  Path(id): Path<i64>,
  Json(input): Json<WeaponInput>,
) -> Result<Envelope<Weapon>, ApiError> {
  validated(&input)?;
  let weapon = state.store.update_weapon(id, input).await.map_err(ApiError::store)?;
  Ok(envelope::ok_with("武器更新成功", weapon))
}

/// `DELETE /api/weapons/{id}`
pub async fn delete_one<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  RequireAdmin(_): RequireAdmin,
  Path(id): Path<i64>,
) -> Result<Envelope<()>, ApiError> {
  state.store.delete_weapon(id).await.map_err(ApiError::store)?;
  Ok(envelope::message("武器删除成功"))
}

// ─── Favourites ───────────────────────────────────────────────────────────────

/// `POST /api/weapons/{id}/favorite`
pub async fn favorite<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Path(id): Path<i64>,
) -> Result<Envelope<()>, ApiError> {
  state
    .store
    .record_interest(current.user.id, id, Interaction::Favorite)
    .await
    .map_err(ApiError::store)?;
  Ok(envelope::message("收藏成功"))
}

/// `DELETE /api/weapons/{id}/favorite`
pub async fn unfavorite<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Path(id): Path<i64>,
) -> Result<Envelope<()>, ApiError> {
  state.store.remove_favorite(current.user.id, id).await.map_err(ApiError::store)?;
  Ok(envelope::message("取消收藏成功"))
}

// ─── Direct admin writes ──────────────────────────────────────────────────────

/// Attach `link` to an already-written weapon. A failure is logged and the
/// weapon write stands.
async fn link_best_effort<S: ArsenalStore>(store: &S, weapon_id: i64, link: ManufacturerLink) {
  if link.name.trim().is_empty() {
    return;
  }
  let name = link.name.clone();
  if let Err(e) = store.link_manufacturer(weapon_id, link).await {
    tracing::warn!(weapon_id, manufacturer = %name, error = %e, "manufacturer link failed, weapon kept");
  }
}

/// `POST /api/weapons/direct-add`
pub async fn direct_add<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  RequireAdmin(admin): RequireAdmin,
  Json(mut input): Json<WeaponInput>,
) -> Result<Envelope<Weapon>, ApiError> {
  if !input.has_required_fields() {
    return Err(ApiError::bad_request(MISSING_FIELDS));
  }
  let link = input.manufacturer.take();

  let weapon = state.store.create_weapon(input).await.map_err(ApiError::store)?;
  tracing::info!(weapon_id = weapon.id, admin = %admin.username, "direct-added weapon");

  let weapon = match link {
    Some(link) => {
      link_best_effort(state.store.as_ref(), weapon.id, link).await;
      require_weapon(state.store.as_ref(), weapon.id).await?
    }
    None => weapon,
  };
  Ok(envelope::ok_with("武器添加成功", weapon))
}

/// `PUT /api/weapons/direct-update/{id}`
pub async fn direct_update<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  RequireAdmin(_): RequireAdmin,
  Path(id): Path<i64>,
  Json(mut input): Json<WeaponInput>,
) -> Result<Envelope<Weapon>, ApiError> {
  if !input.has_required_fields() {
    return Err(ApiError::bad_request(MISSING_FIELDS));
  }
  let link = input.manufacturer.take();

  let weapon = state.store.update_weapon(id, input).await.map_err(ApiError::store)?;
  let weapon = match link {
    Some(link) => {
      link_best_effort(state.store.as_ref(), id, link).await;
      require_weapon(state.store.as_ref(), id).await?
    }
    None => weapon,
  };
  Ok(envelope::ok_with("武器更新成功", weapon))
}

#[derive(Debug, Serialize)]
pub struct Deleted {
  pub id:   i64,
  pub name: String,
}

/// `DELETE /api/weapons/direct-delete/{id}`
pub async fn direct_delete<S: ArsenalStore>(
  State(state): State<AppState<S>>,
  RequireAdmin(admin): RequireAdmin,
  Path(id): Path<i64>,
) -> Result<Envelope<Deleted>, ApiError> {
  let name = state
    .store
    .purge_weapon(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("武器不存在"))?;
  tracing::info!(weapon_id = id, admin = %admin.username, "direct-deleted weapon");
  Ok(envelope::ok_with("武器删除成功", Deleted { id, name }))
}
