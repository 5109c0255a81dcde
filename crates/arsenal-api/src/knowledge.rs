//! `GET /api/knowledge/graph-data`: the catalogue as a node/link graph.

use arsenal_core::{
  graph::{self, Graph},
  store::ArsenalStore,
};
use axum::extract::State;

use crate::{
  AppState,
  envelope::{self, Envelope},
  error::ApiError,
};

pub async fn graph_data<S: ArsenalStore>(
  State(state): State<AppState<S>>,
) -> Result<Envelope<Graph>, ApiError> {
  let snapshot = state.store.graph_snapshot().await.map_err(ApiError::store)?;
  let graph = graph::build(&snapshot);
  tracing::debug!(nodes = graph.nodes.len(), links = graph.links.len(), "built knowledge graph");
  Ok(envelope::ok(graph))
}
