//! JSON REST API for the Arsenal weapons encyclopedia.
//!
//! Exposes an axum [`Router`] backed by any [`ArsenalStore`]. Every body is
//! wrapped in the `{success, message?, data?}` envelope from [`envelope`].
//! Authentication is by bearer token; see [`auth`].

pub mod account;
pub mod auth;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod knowledge;
pub mod lookups;
pub mod maintenance;
pub mod manufacturers;
pub mod statistics;
pub mod weapons;


use std::sync::Arc;

use arsenal_core::store::ArsenalStore;
use axum::{
  Json, Router,
  http::{HeaderValue, Method, StatusCode, Uri, header},
  routing::{delete, get, post, put},
};
use serde_json::{Value, json};
use tower_http::{
  cors::{AllowOrigin, CorsLayer},
  trace::TraceLayer,
};

pub use auth::AuthConfig;
pub use error::ApiError;
use lookups::{Categories, Countries};

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S> {
  pub store: Arc<S>,
  pub auth:  Arc<AuthConfig>,
}

impl<S> AppState<S> {
  pub fn new(store: S, auth: AuthConfig) -> Self {
    Self { store: Arc::new(store), auth: Arc::new(auth) }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router, `/health` and everything under `/api`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ArsenalStore + Clone + 'static,
{
  Router::new()
    .route("/health", get(health))
    .route("/api", get(index))
    // Accounts
    .route("/api/auth/register",        post(account::register::<S>))
    .route("/api/auth/login",           post(account::login::<S>))
    .route("/api/auth/profile",         get(account::profile).put(account::update_profile::<S>))
    .route("/api/auth/change-password", put(account::change_password::<S>))
    .route("/api/auth/refresh",         post(account::refresh::<S>))
    .route("/api/auth/logout",          post(account::logout::<S>))
    // Weapons
    .route("/api/weapons",              get(weapons::list::<S>).post(weapons::create::<S>))
    .route("/api/weapons/search",       get(weapons::search::<S>))
    .route("/api/weapons/statistics",   get(weapons::statistics::<S>))
    .route("/api/weapons/direct-add",   post(weapons::direct_add::<S>))
    .route("/api/weapons/direct-update/{id}", put(weapons::direct_update::<S>))
    .route("/api/weapons/direct-delete/{id}", delete(weapons::direct_delete::<S>))
    .route(
      "/api/weapons/{id}",
      get(weapons::get_one::<S>).put(weapons::update::<S>).delete(weapons::delete_one::<S>),
    )
    .route("/api/weapons/{id}/similar", get(weapons::similar::<S>))
    .route(
      "/api/weapons/{id}/favorite",
      post(weapons::favorite::<S>).delete(weapons::unfavorite::<S>),
    )
    // Manufacturers
    .route(
      "/api/manufacturers",
      get(manufacturers::list::<S>).post(manufacturers::create::<S>),
    )
    .route("/api/manufacturers/check", get(manufacturers::check::<S>))
    .route(
      "/api/manufacturers/{id}",
      get(manufacturers::get_one::<S>)
        .put(manufacturers::update::<S>)
        .delete(manufacturers::delete_one::<S>),
    )
    .route("/api/manufacturer-statistics/weapon-count", get(statistics::weapon_count::<S>))
    .route("/api/manufacturer-statistics/details",      get(statistics::details::<S>))
    // Lookups
    .nest("/api/weapon-types",     lookups::routes::<S, Categories>())
    .nest("/api/weapon-countries", lookups::routes::<S, Countries>())
    // Knowledge graph
    .route("/api/knowledge/graph-data", get(knowledge::graph_data::<S>))
    // Maintenance
    .route("/api/maintenance/health",             get(maintenance::health::<S>))
    .route("/api/maintenance/repair-links",       post(maintenance::repair_links::<S>))
    .route("/api/maintenance/link-manufacturers", post(maintenance::link_manufacturers::<S>))
    .route("/api/maintenance/dedupe-weapons",     post(maintenance::dedupe_weapons::<S>))
    .fallback(not_found)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// [`router`] wrapped in a CORS layer for `origins`. `"*"` allows any
/// origin; an empty list adds no layer.
pub fn router_with_cors<S>(state: AppState<S>, origins: &[String]) -> Router
where
  S: ArsenalStore + Clone + 'static,
{
  let router = router(state);
  match cors_layer(origins) {
    Some(cors) => router.layer(cors),
    None => router,
  }
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
  let allow = if origins.iter().any(|o| o == "*") {
    AllowOrigin::any()
  } else {
    let parsed: Vec<HeaderValue> = origins
      .iter()
      .filter_map(|origin| match HeaderValue::from_str(origin) {
        Ok(value) => Some(value),
        Err(err) => {
          tracing::warn!(%origin, %err, "ignoring invalid CORS origin");
          None
        }
      })
      .collect();
    if parsed.is_empty() {
      return None;
    }
    AllowOrigin::list(parsed)
  };

  Some(
    CorsLayer::new()
      .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
      .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
      .allow_origin(allow),
  )
}

async fn not_found(uri: Uri) -> (StatusCode, Json<Value>) {
  (
    StatusCode::NOT_FOUND,
    Json(json!({ "success": false, "message": "请求的资源不存在", "path": uri.path() })),
  )
}

/// `GET /health`
async fn health() -> Json<Value> {
  Json(json!({ "success": true, "message": "服务运行正常" }))
}

/// `GET /api`: an index of the endpoint groups.
async fn index() -> Json<Value> {
  Json(json!({
    "success": true,
    "message": "兵智世界后端API服务",
    "version": env!("CARGO_PKG_VERSION"),
    "endpoints": {
      "auth":          "/api/auth",
      "weapons":       "/api/weapons",
      "manufacturers": "/api/manufacturers",
      "statistics":    "/api/manufacturer-statistics",
      "types":         "/api/weapon-types",
      "countries":     "/api/weapon-countries",
      "knowledge":     "/api/knowledge",
      "maintenance":   "/api/maintenance",
    }
  }))
}
