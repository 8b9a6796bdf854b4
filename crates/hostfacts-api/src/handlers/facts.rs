//! Handlers for migrated fact records.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/v2/hosts/{id}/facts/` | optional `?module=`; oldest first |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use hostfacts_core::{
  fact::FactRecord,
  host::{Host, HostId},
  store::FactStore,
};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// Restrict to one collection module (e.g. `"ansible"`).
  pub module: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HostFacts {
  pub host:  Host,
  pub facts: Vec<FactRecord>,
}

/// `GET /api/v2/hosts/{id}/facts/[?module=...]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<HostId>,
  Query(params): Query<ListParams>,
) -> Result<Json<HostFacts>, ApiError>
where
  S: FactStore,
{
  let host = state
    .store
    .get_host(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("host {id} not found")))?;

  let facts = state
    .store
    .host_facts(id, params.module.as_deref())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  Ok(Json(HostFacts { host, facts }))
}
