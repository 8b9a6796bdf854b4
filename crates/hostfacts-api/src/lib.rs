//! JSON HTTP API for host facts.
//!
//! Exposes an axum [`Router`] backed by any [`FactStore`], with the
//! anonymous-access gate in front of every route and the live
//! [`AuthSettings`] held in the router state.

pub mod allowlist;
pub mod auth;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod settings;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, middleware, routing::get};
use hostfacts_core::store::FactStore;
use serde::Deserialize;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use allowlist::{AllowListValidator, RouteTable};
use auth::AuthConfig;
use settings::AuthSettings;

// ─── Routes ──────────────────────────────────────────────────────────────────

pub const API_ROOT: &str = "/api/";
pub const API_V2_ROOT: &str = "/api/v2/";
pub const PING: &str = "/api/v2/ping/";
pub const METRICS: &str = "/api/v2/metrics/";
pub const HOST_FACTS: &str = "/api/v2/hosts/{id}/facts/";
pub const AUTH_SETTINGS: &str = "/api/v2/settings/authentication/";

/// Every route pattern the router serves.
pub const ROUTES: &[&str] =
  &[API_ROOT, API_V2_ROOT, PING, METRICS, HOST_FACTS, AUTH_SETTINGS];

/// The table allow-list entries are resolved against.
pub fn route_table() -> RouteTable { RouteTable::new(ROUTES) }

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  pub auth_username:      String,
  pub auth_password_hash: String,
  /// Initial authentication settings; validated before the server starts.
  #[serde(default)]
  pub authentication:     AuthSettings,
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through the gate and all handlers.
#[derive(Clone)]
pub struct AppState<S: FactStore> {
  pub store:      Arc<S>,
  pub auth:       Arc<AuthConfig>,
  pub settings:   Arc<RwLock<AuthSettings>>,
  pub allow_list: Arc<AllowListValidator>,
}

impl<S: FactStore> AppState<S> {
  /// Assemble state from settings already checked by `allow_list`.
  pub fn new(
    store: S,
    auth: AuthConfig,
    settings: AuthSettings,
    allow_list: AllowListValidator,
  ) -> Self {
    Self {
      store:      Arc::new(store),
      auth:       Arc::new(auth),
      settings:   Arc::new(RwLock::new(settings)),
      allow_list: Arc::new(allow_list),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router. Unmatched paths still pass through the gate.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: FactStore + Clone + 'static,
{
  Router::new()
    .route(API_ROOT,      get(handlers::root::api_root))
    .route(API_V2_ROOT,   get(handlers::root::v2_root))
    .route(PING,          get(handlers::root::ping))
    .route(METRICS,       get(handlers::root::metrics::<S>))
    .route(HOST_FACTS,    get(handlers::facts::list::<S>))
    .route(
      AUTH_SETTINGS,
      get(handlers::settings::show::<S>).put(handlers::settings::update::<S>),
    )
    .fallback(handlers::not_found)
    .layer(middleware::from_fn_with_state(
      state.clone(),
      gate::restrict_anonymous::<S>,
    ))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
