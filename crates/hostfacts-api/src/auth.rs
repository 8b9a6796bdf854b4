//! HTTP Basic-auth verification and the per-request [`Identity`].

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;

use crate::{error::ApiError, settings::AuthSettings};

/// Credentials accepted as valid for this server instance.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Who sent the request. Inserted into request extensions by the access
/// gate for every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
  Anonymous,
  User(String),
}

impl Identity {
  pub fn is_authenticated(&self) -> bool { matches!(self, Self::User(_)) }
}

/// Verify Basic credentials from headers and return the username.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<String, ApiError> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;

  if username != config.username {
    return Err(ApiError::Unauthorized);
  }

  let parsed_hash = PasswordHash::new(&config.password_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Ok(username.to_owned())
}

/// Resolve the identity of a request under the current settings.
///
/// Missing or wrong credentials make the request anonymous; whether that is
/// acceptable is for the gate and the handlers to decide.
pub fn identify(headers: &HeaderMap, config: &AuthConfig, settings: &AuthSettings) -> Identity {
  if !settings.auth_basic_enabled || settings.disable_local_auth {
    return Identity::Anonymous;
  }
  match verify_auth(headers, config) {
    Ok(username) => Identity::User(username),
    Err(_) => Identity::Anonymous,
  }
}

/// Extractor that only succeeds for authenticated requests.
pub struct Authenticated(pub String);

impl<S> FromRequestParts<S> for Authenticated
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    match parts.extensions.get::<Identity>() {
      Some(Identity::User(username)) => Ok(Authenticated(username.clone())),
      _ => Err(ApiError::Unauthorized),
    }
  }
}
