//! Error types for `hostfacts-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("malformed legacy document {id}: {source}")]
  MalformedDocument {
    id:     i64,
    #[source]
    source: serde_json::Error,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
