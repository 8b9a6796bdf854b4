//! Host: the inventory member that owns fact records.
//!
//! Host rows are owned by the inventory subsystem. Fact storage and the
//! legacy migration only ever read them.

use serde::{Deserialize, Serialize};

/// Primary key of a row in the `hosts` table.
pub type HostId = i64;

/// A host as stored in the relational store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
  pub id:           HostId,
  pub inventory_id: i64,
  pub name:         String,
}

/// Result of resolving a host by `(inventory_id, name)`.
///
/// A miss is an expected outcome (the host was removed or never created), so
/// it is a variant rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostLookup {
  Found(HostId),
  NotFound,
}
