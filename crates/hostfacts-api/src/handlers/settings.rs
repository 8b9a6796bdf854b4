//! Handlers for the authentication settings category.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/v2/settings/authentication/` | values + definitions |
//! | `PUT`  | `/api/v2/settings/authentication/` | authenticated; body: [`AuthSettingsPatch`] |

use axum::{Json, extract::State};
use hostfacts_core::store::FactStore;
use serde::Serialize;

use crate::{
  AppState,
  auth::Authenticated,
  error::ApiError,
  settings::{AuthSettings, AuthSettingsPatch, SettingDefinition, definitions},
};

#[derive(Debug, Serialize)]
pub struct SettingsView {
  pub settings:    AuthSettings,
  pub definitions: &'static [SettingDefinition],
}

/// `GET /api/v2/settings/authentication/`
pub async fn show<S>(State(state): State<AppState<S>>) -> Json<SettingsView>
where
  S: FactStore,
{
  let settings = state.settings.read().await.clone();
  Json(SettingsView { settings, definitions: definitions() })
}

/// `PUT /api/v2/settings/authentication/`
///
/// Validation runs under the write lock; on failure nothing is written.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Authenticated(username): Authenticated,
  Json(patch): Json<AuthSettingsPatch>,
) -> Result<Json<AuthSettings>, ApiError>
where
  S: FactStore,
{
  let mut current = state.settings.write().await;
  let next = patch.apply(&current).validate(&state.allow_list)?;
  *current = next.clone();

  tracing::info!(
    user = %username,
    restrict_api_anonymous_access = next.restrict_api_anonymous_access,
    allowed_paths = next.anonymous_access_api_allowed_paths.len(),
    "authentication settings updated"
  );
  Ok(Json(next))
}
