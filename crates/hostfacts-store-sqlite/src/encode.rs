//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings; fact payloads as compact JSON.

use chrono::{DateTime, Utc};
use hostfacts_core::{fact::FactRecord, host::Host};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `facts` row.
pub struct RawFactRecord {
  pub id:        i64,
  pub host_id:   i64,
  pub timestamp: String,
  pub module:    String,
  pub facts:     String,
}

impl RawFactRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:        row.get(0)?,
      host_id:   row.get(1)?,
      timestamp: row.get(2)?,
      module:    row.get(3)?,
      facts:     row.get(4)?,
    })
  }

  pub fn into_record(self) -> Result<FactRecord> {
    Ok(FactRecord {
      id:        self.id,
      host_id:   self.host_id,
      timestamp: decode_dt(&self.timestamp)?,
      module:    self.module,
      facts:     serde_json::from_str(&self.facts)?,
    })
  }
}

/// Read a `hosts` row selected as `id, inventory_id, name`.
pub fn host_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Host> {
  Ok(Host {
    id:           row.get(0)?,
    inventory_id: row.get(1)?,
    name:         row.get(2)?,
  })
}
