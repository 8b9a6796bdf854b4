//! axum handlers, one module per resource.

pub mod facts;
pub mod root;
pub mod settings;

use axum::http::Uri;

use crate::error::ApiError;

/// Fallback for unrouted paths.
pub async fn not_found(uri: Uri) -> ApiError {
  ApiError::NotFound(format!("no route for {}", uri.path()))
}
