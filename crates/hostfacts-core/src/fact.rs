//! Fact types: legacy fact-version documents and the relational fact records
//! that replace them.
//!
//! A fact record is an immutable snapshot of what one collection module
//! reported about one host at one point in time. Records are never updated.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{
  Error, Result,
  host::HostId,
  keys::KeyCodec,
  store::LegacyDocument,
};

// ─── Legacy ──────────────────────────────────────────────────────────────────

/// How a legacy document names its host: there was no foreign key, only the
/// inventory and the host name at the time of collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostReference {
  pub inventory_id: i64,
  pub hostname:     String,
}

/// One fact snapshot as stored in the legacy document store.
///
/// Keys inside `fact` are still escaped with the legacy substitutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyFactVersion {
  /// Stored as `host` by the legacy store.
  #[serde(alias = "host")]
  pub host_reference: HostReference,
  /// Either RFC 3339 or a naive datetime, which the legacy store means as UTC.
  #[serde(deserialize_with = "legacy_timestamp")]
  pub timestamp:      DateTime<Utc>,
  pub module:         String,
  #[serde(default)]
  pub fact:           Value,
}

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

fn legacy_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = String::deserialize(deserializer)?;
  if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
    return Ok(dt.with_timezone(&Utc));
  }
  NAIVE_FORMATS
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(&raw, fmt).ok())
    .map(|naive| naive.and_utc())
    .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {raw:?}")))
}

impl LegacyFactVersion {
  /// Decode a raw legacy document into the fact-version shape.
  pub fn from_document(doc: LegacyDocument) -> Result<Self> {
    let id = doc.id;
    serde_json::from_value(doc.body)
      .map_err(|source| Error::MalformedDocument { id, source })
  }
}

// ─── Target ──────────────────────────────────────────────────────────────────

/// A persisted row of the `facts` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRecord {
  pub id:        i64,
  pub host_id:   HostId,
  pub timestamp: DateTime<Utc>,
  pub module:    String,
  /// Fact payload with original, unescaped keys.
  pub facts:     Value,
}

/// Input to [`crate::store::FactStore::record_fact`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewFactRecord {
  pub host_id:   HostId,
  pub timestamp: DateTime<Utc>,
  pub module:    String,
  pub facts:     Value,
}

impl NewFactRecord {
  /// Map a legacy fact version onto a resolved host.
  ///
  /// `timestamp` and `module` are copied verbatim; the payload keys are
  /// decoded with `codec`. Resolving `host_id` is the caller's job.
  pub fn from_legacy(
    version: LegacyFactVersion,
    host_id: HostId,
    codec: &KeyCodec,
  ) -> Self {
    Self {
      host_id,
      timestamp: version.timestamp,
      module: version.module,
      facts: codec.decode_owned(version.fact),
    }
  }
}
