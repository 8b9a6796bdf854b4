//! The `FactStore` and `LegacyStore` traits.
//!
//! Traits are implemented by storage backends (e.g. `hostfacts-store-sqlite`).
//! Higher layers (`hostfacts-migrate`, `hostfacts-api`) depend on these
//! abstractions, not on any concrete backend.

use std::future::Future;

use serde_json::Value;
use thiserror::Error;

use crate::{
  fact::{FactRecord, NewFactRecord},
  host::{Host, HostId, HostLookup},
};

// ─── Target store ────────────────────────────────────────────────────────────

/// Abstraction over the relational fact store.
///
/// Fact records are append-only. Hosts are read-only from this side.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait FactStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Number of rows in the facts table.
  fn count_facts(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Number of rows in the hosts table.
  fn count_hosts(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Persist a new fact record and return it with its assigned id.
  fn record_fact(
    &self,
    input: NewFactRecord,
  ) -> impl Future<Output = Result<FactRecord, Self::Error>> + Send + '_;

  /// Resolve a host by inventory and name, fetching only its id.
  fn find_host<'a>(
    &'a self,
    inventory_id: i64,
    name: &'a str,
  ) -> impl Future<Output = Result<HostLookup, Self::Error>> + Send + 'a;

  /// Retrieve a host by id. Returns `None` if not found.
  fn get_host(
    &self,
    id: HostId,
  ) -> impl Future<Output = Result<Option<Host>, Self::Error>> + Send + '_;

  /// All fact records of a host, oldest first, optionally restricted to one
  /// collection module.
  fn host_facts<'a>(
    &'a self,
    host_id: HostId,
    module: Option<&'a str>,
  ) -> impl Future<Output = Result<Vec<FactRecord>, Self::Error>> + Send + 'a;
}

// ─── Legacy store ────────────────────────────────────────────────────────────

/// A raw document from the legacy fact-version collection.
///
/// `id` is the document's position in the collection's natural order and is
/// used as the pagination cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyDocument {
  pub id:   i64,
  pub body: Value,
}

/// Failure kinds of the legacy store. The two are handled differently by
/// callers, so backends must classify every failure into one of them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LegacyError {
  /// The store could not be reached at all (missing, refused, closed).
  #[error("legacy store unreachable: {0}")]
  Unreachable(String),

  /// The store answered but the operation failed.
  #[error("legacy store operation failed: {0}")]
  Operation(String),
}

/// Read-and-drop access to the legacy document store.
pub trait LegacyStore: Send + Sync {
  /// Count fact-version documents. Doubles as the connectivity check.
  fn count_fact_versions(
    &self,
  ) -> impl Future<Output = Result<u64, LegacyError>> + Send + '_;

  /// Up to `limit` documents following the `after` cursor, in natural order.
  /// An empty page means the collection is exhausted.
  fn fact_version_page(
    &self,
    after: Option<i64>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<LegacyDocument>, LegacyError>> + Send + '_;

  /// Irreversibly destroy the whole legacy store.
  fn drop_store(
    &self,
  ) -> impl Future<Output = Result<(), LegacyError>> + Send + '_;
}
