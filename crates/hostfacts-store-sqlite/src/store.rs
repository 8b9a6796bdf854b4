//! [`SqliteStore`]: the SQLite implementation of [`FactStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;

use hostfacts_core::{
  fact::{FactRecord, NewFactRecord},
  host::{Host, HostId, HostLookup},
  store::FactStore,
};

use crate::{
  Result,
  encode::{RawFactRecord, encode_dt, host_from_row},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A fact store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert a host row.
  ///
  /// Hosts belong to the inventory subsystem; this exists for seeding and
  /// tests.
  pub async fn add_host(&self, inventory_id: i64, name: &str) -> Result<Host> {
    let name = name.to_owned();
    let host = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO hosts (inventory_id, name) VALUES (?1, ?2)",
          rusqlite::params![inventory_id, name],
        )?;
        Ok(Host { id: conn.last_insert_rowid(), inventory_id, name })
      })
      .await?;
    Ok(host)
  }

  async fn count_rows(&self, sql: &'static str) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(move |conn| Ok(conn.query_row(sql, [], |r| r.get(0))?))
      .await?;
    Ok(n.max(0) as u64)
  }
}

// ─── FactStore impl ──────────────────────────────────────────────────────────

impl FactStore for SqliteStore {
  type Error = crate::Error;

  async fn count_facts(&self) -> Result<u64> {
    self.count_rows("SELECT COUNT(*) FROM facts").await
  }

  async fn count_hosts(&self) -> Result<u64> {
    self.count_rows("SELECT COUNT(*) FROM hosts").await
  }

  async fn record_fact(&self, input: NewFactRecord) -> Result<FactRecord> {
    let timestamp_str = encode_dt(input.timestamp);
    let facts_str     = serde_json::to_string(&input.facts)?;
    let module        = input.module.clone();
    let host_id       = input.host_id;

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO facts (host_id, timestamp, module, facts)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![host_id, timestamp_str, module, facts_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(FactRecord {
      id,
      host_id:   input.host_id,
      timestamp: input.timestamp,
      module:    input.module,
      facts:     input.facts,
    })
  }

  async fn find_host(&self, inventory_id: i64, name: &str) -> Result<HostLookup> {
    let name = name.to_owned();

    let id: Option<HostId> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT id FROM hosts WHERE inventory_id = ?1 AND name = ?2",
            rusqlite::params![inventory_id, name],
            |r| r.get(0),
          )
          .optional()?)
      })
      .await?;

    Ok(id.map_or(HostLookup::NotFound, HostLookup::Found))
  }

  async fn get_host(&self, id: HostId) -> Result<Option<Host>> {
    let host = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT id, inventory_id, name FROM hosts WHERE id = ?1",
            rusqlite::params![id],
            host_from_row,
          )
          .optional()?)
      })
      .await?;
    Ok(host)
  }

  async fn host_facts(
    &self,
    host_id: HostId,
    module:  Option<&str>,
  ) -> Result<Vec<FactRecord>> {
    let module = module.map(str::to_owned);

    let raws: Vec<RawFactRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, host_id, timestamp, module, facts
           FROM facts
           WHERE host_id = ?1
             AND (?2 IS NULL OR module = ?2)
           ORDER BY timestamp, id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![host_id, module], RawFactRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFactRecord::into_record).collect()
  }
}
