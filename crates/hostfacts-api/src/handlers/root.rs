//! Index documents, liveness and metrics.

use axum::{Extension, Json, extract::State};
use hostfacts_core::store::FactStore;
use serde::Serialize;
use serde_json::{Value, json};

use crate::{
  API_V2_ROOT, AUTH_SETTINGS, AppState, METRICS, PING,
  auth::Identity,
  error::ApiError,
};

/// `GET /api/`
pub async fn api_root() -> Json<Value> {
  Json(json!({
    "description":        "hostfacts REST API",
    "current_version":    API_V2_ROOT,
    "available_versions": { "v2": API_V2_ROOT },
  }))
}

/// `GET /api/v2/`
pub async fn v2_root() -> Json<Value> {
  Json(json!({
    "ping":                    PING,
    "metrics":                 METRICS,
    "hosts":                   "/api/v2/hosts/",
    "settings/authentication": AUTH_SETTINGS,
  }))
}

/// `GET /api/v2/ping/`
pub async fn ping() -> Json<Value> {
  Json(json!({ "ok": true, "version": env!("CARGO_PKG_VERSION") }))
}

#[derive(Debug, Serialize)]
pub struct Metrics {
  pub hosts: u64,
  pub facts: u64,
}

/// `GET /api/v2/metrics/`
///
/// Anonymous callers need `allow_metrics_for_anonymous_users`.
pub async fn metrics<S>(
  State(state): State<AppState<S>>,
  Extension(identity): Extension<Identity>,
) -> Result<Json<Metrics>, ApiError>
where
  S: FactStore,
{
  if !identity.is_authenticated()
    && !state.settings.read().await.allow_metrics_for_anonymous_users
  {
    return Err(ApiError::Unauthorized);
  }

  let hosts = state
    .store
    .count_hosts()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  let facts = state
    .store
    .count_facts()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  Ok(Json(Metrics { hosts, facts }))
}
