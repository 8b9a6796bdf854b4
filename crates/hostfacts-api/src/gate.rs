//! Anonymous-access gate.
//!
//! Runs in front of every route. It attaches an [`Identity`] to the request
//! and, when `restrict_api_anonymous_access` is on, turns away anonymous
//! requests to API paths that are not on the allow-list. Non-API paths are
//! never restricted.

use axum::{
  extract::{Request, State},
  middleware::Next,
  response::{IntoResponse, Response},
};
use hostfacts_core::store::FactStore;

use crate::{
  AppState,
  auth::{Identity, identify},
  error::ApiError,
  settings::AuthSettings,
};

/// Whether `path` falls under the API prefix.
pub fn is_api_path(path: &str) -> bool {
  path == "/api" || path.starts_with("/api/")
}

/// Decide whether a request may proceed.
///
/// Allow-list entries match the request path exactly.
pub fn check_access(
  path: &str,
  identity: &Identity,
  settings: &AuthSettings,
) -> Result<(), ApiError> {
  if !is_api_path(path)
    || identity.is_authenticated()
    || !settings.restrict_api_anonymous_access
    || settings
      .anonymous_access_api_allowed_paths
      .iter()
      .any(|allowed| allowed == path)
  {
    return Ok(());
  }
  Err(ApiError::Unauthorized)
}

/// axum middleware wrapping [`check_access`].
pub async fn restrict_anonymous<S>(
  State(state): State<AppState<S>>,
  mut req: Request,
  next: Next,
) -> Response
where
  S: FactStore + 'static,
{
  let (identity, decision) = {
    let settings = state.settings.read().await;
    let identity = identify(req.headers(), &state.auth, &settings);
    let decision = check_access(req.uri().path(), &identity, &settings);
    (identity, decision)
  };

  if let Err(e) = decision {
    tracing::debug!(path = %req.uri().path(), "anonymous API request refused");
    return e.into_response();
  }

  req.extensions_mut().insert(identity);
  next.run(req).await
}
