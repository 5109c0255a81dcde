//! Handlers for the two name-keyed lookup tables, mounted at
//! `/api/weapon-types` and `/api/weapon-countries`.
//!
//! Both share one set of handlers, parameterised by a [`LookupTable`]
//! marker. The optional text column is exposed under its own name:
//! `description` for types, `code` for countries.

use arsenal_core::{
  lookup::{Lookup, LookupDetail, LookupKind, NewLookup},
  store::ArsenalStore,
};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
  AppState,
  auth::RequireAdmin,
  envelope::{self, Envelope},
  error::ApiError,
  extract::{Json, Path, Query},
};

pub trait LookupTable: Send + Sync + 'static {
  const KIND: LookupKind;
}

/// `/api/weapon-types`, backed by `categories`.
pub struct Categories;

impl LookupTable for Categories {
  const KIND: LookupKind = LookupKind::Category;
}

/// `/api/weapon-countries`, backed by `countries`.
pub struct Countries;

impl LookupTable for Countries {
  const KIND: LookupKind = LookupKind::Country;
}

pub fn routes<S, T>() -> Router<AppState<S>>
where
  S: ArsenalStore + Clone + 'static,
  T: LookupTable,
{
  Router::new()
    .route("/", get(list::<S, T>).post(create::<S, T>))
    .route("/check", get(check::<S, T>))
    .route("/{id}", get(get_one::<S, T>).put(update::<S, T>).delete(delete_one::<S, T>))
}

// ─── Wire shape ───────────────────────────────────────────────────────────────

fn to_json(kind: LookupKind, lookup: Lookup) -> Map<String, Value> {
  let mut map = Map::new();
  map.insert("id".into(), lookup.id.into());
  map.insert("name".into(), lookup.name.into());
  map.insert(kind.detail_field().into(), lookup.detail.into());
  map
}

#[derive(Debug, Default, Deserialize)]
pub struct LookupBody {
  #[serde(default)]
  pub name:        String,
  pub description: Option<String>,
  pub code:        Option<String>,
}

impl LookupBody {
  fn into_new(self, kind: LookupKind) -> Result<NewLookup, ApiError> {
    let name = self.name.trim().to_owned();
    if name.is_empty() {
      return Err(ApiError::bad_request(format!("{}名称不能为空", kind.label())));
    }
    let detail = match kind {
      LookupKind::Category => self.description,
      LookupKind::Country => self.code,
    };
    Ok(NewLookup { name, detail })
  }
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

pub async fn list<S: ArsenalStore, T: LookupTable>(
  State(state): State<AppState<S>>,
) -> Result<Envelope<Vec<Map<String, Value>>>, ApiError> {
  let lookups = state.store.list_lookups(T::KIND).await.map_err(ApiError::store)?;
  Ok(envelope::ok(lookups.into_iter().map(|l| to_json(T::KIND, l)).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CheckParams {
  pub name: Option<String>,
}

pub async fn check<S: ArsenalStore, T: LookupTable>(
  State(state): State<AppState<S>>,
  Query(params): Query<CheckParams>,
) -> Result<Envelope<Map<String, Value>>, ApiError> {
  let name = params.name.unwrap_or_default();
  if name.trim().is_empty() {
    return Err(ApiError::bad_request(format!("{}名称不能为空", T::KIND.label())));
  }
  let found = state.store.find_lookup(T::KIND, name).await.map_err(ApiError::store)?;
  Ok(envelope::exists(found.map(|l| to_json(T::KIND, l))))
}

pub async fn get_one<S: ArsenalStore, T: LookupTable>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
) -> Result<Envelope<Map<String, Value>>, ApiError> {
  let LookupDetail { lookup, weapon_count } = state
    .store
    .get_lookup(T::KIND, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found(format!("{}不存在", T::KIND.label())))?;

  let mut body = to_json(T::KIND, lookup);
  body.insert("weapon_count".into(), weapon_count.into());
  Ok(envelope::ok(body))
}

pub async fn create<S: ArsenalStore, T: LookupTable>(
  State(state): State<AppState<S>>,
  Json(body): Json<LookupBody>,
) -> Result<(StatusCode, Envelope<Map<String, Value>>), ApiError> {
  let input = body.into_new(T::KIND)?;
  let lookup = state.store.create_lookup(T::KIND, input).await.map_err(ApiError::store)?;
  Ok(envelope::created(format!("{}创建成功", T::KIND.label()), to_json(T::KIND, lookup)))
}

pub async fn update<S: ArsenalStore, T: LookupTable>(
  State(state): State<AppState<S>>,
  RequireAdmin(_): RequireAdmin,
  Path(id): Path<i64>,
  Json(body): Json<LookupBody>,
) -> Result<Envelope<Map<String, Value>>, ApiError> {
  let input = body.into_new(T::KIND)?;
  let lookup = state.store.update_lookup(T::KIND, id, input).await.map_err(ApiError::store)?;
  Ok(envelope::ok_with(format!("{}更新成功", T::KIND.label()), to_json(T::KIND, lookup)))
}

pub async fn delete_one<S: ArsenalStore, T: LookupTable>(
  State(state): State<AppState<S>>,
  RequireAdmin(_): RequireAdmin,
  Path(id): Path<i64>,
) -> Result<Envelope<()>, ApiError> {
  state.store.delete_lookup(T::KIND, id).await.map_err(ApiError::store)?;
  Ok(envelope::message(format!("{}删除成功", T::KIND.label())))
}
