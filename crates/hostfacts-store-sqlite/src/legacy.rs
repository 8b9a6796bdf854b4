//! [`LegacyDocStore`]: the legacy fact-version document collection.
//!
//! Documents are kept as JSON text, one per row, in a SQLite file. The file
//! is opened without `SQLITE_OPEN_CREATE`, so a missing file surfaces as
//! [`LegacyError::Unreachable`] rather than silently creating an empty store.

use std::path::PathBuf;

use hostfacts_core::store::{LegacyDocument, LegacyError, LegacyStore};
use rusqlite::{ErrorCode, OpenFlags};
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::schema::LEGACY_SCHEMA;

/// Sort a driver error into the two failure kinds callers act on.
fn classify(err: tokio_rusqlite::Error) -> LegacyError {
  let unreachable = match &err {
    tokio_rusqlite::Error::ConnectionClosed => true,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _)) => {
      matches!(e.code, ErrorCode::CannotOpen | ErrorCode::PermissionDenied)
    }
    _ => false,
  };
  if unreachable {
    LegacyError::Unreachable(err.to_string())
  } else {
    LegacyError::Operation(err.to_string())
  }
}

/// Client for the legacy document store.
///
/// The connection is opened lazily on first use and then reused, so
/// constructing a store never fails; connectivity problems show up on the
/// first operation.
pub struct LegacyDocStore {
  path: Option<PathBuf>,
  conn: OnceCell<tokio_rusqlite::Connection>,
}

impl LegacyDocStore {
  /// A store backed by the existing file at `path`.
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: Some(path.into()), conn: OnceCell::new() }
  }

  /// An empty in-memory collection, useful for testing.
  pub async fn open_in_memory() -> Result<Self, LegacyError> {
    let conn = tokio_rusqlite::Connection::open_in_memory()
      .await
      .map_err(classify)?;
    conn
      .call(|conn| {
        conn.execute_batch(LEGACY_SCHEMA)?;
        Ok(())
      })
      .await
      .map_err(classify)?;
    Ok(Self { path: None, conn: OnceCell::new_with(Some(conn)) })
  }

  async fn connection(&self) -> Result<&tokio_rusqlite::Connection, LegacyError> {
    self
      .conn
      .get_or_try_init(|| async {
        let path = self.path.clone().ok_or_else(|| {
          LegacyError::Unreachable("in-memory store was closed".into())
        })?;
        tokio_rusqlite::Connection::open_with_flags(
          path,
          OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .await
        .map_err(classify)
      })
      .await
  }

  /// Append a document to the collection and return its id.
  ///
  /// The legacy store is read-only for the migration; this exists for
  /// seeding and tests.
  pub async fn insert_document(&self, body: &Value) -> Result<i64, LegacyError> {
    let text = body.to_string();
    self
      .connection()
      .await?
      .call(move |conn| {
        conn.execute(
          "INSERT INTO fact_versions (document) VALUES (?1)",
          rusqlite::params![text],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await
      .map_err(classify)
  }
}

impl LegacyStore for LegacyDocStore {
  async fn count_fact_versions(&self) -> Result<u64, LegacyError> {
    let n: i64 = self
      .connection()
      .await?
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM fact_versions", [], |r| r.get(0))?)
      })
      .await
      .map_err(classify)?;
    Ok(n.max(0) as u64)
  }

  async fn fact_version_page(
    &self,
    after: Option<i64>,
    limit: usize,
  ) -> Result<Vec<LegacyDocument>, LegacyError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    let rows: Vec<(i64, String)> = self
      .connection()
      .await?
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, document FROM fact_versions
           WHERE ?1 IS NULL OR id > ?1
           ORDER BY id
           LIMIT ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![after, limit], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(classify)?;

    // Text that is not JSON at all is still handed out as a document so the
    // caller can account for it; it will fail to decode as a fact version.
    Ok(
      rows
        .into_iter()
        .map(|(id, text)| {
          let body = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(_) => Value::String(text),
          };
          LegacyDocument { id, body }
        })
        .collect(),
    )
  }

  async fn drop_store(&self) -> Result<(), LegacyError> {
    self
      .connection()
      .await?
      .call(|conn| {
        let tables: Vec<String> = conn
          .prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'",
          )?
          .query_map([], |r| r.get(0))?
          .collect::<rusqlite::Result<_>>()?;

        let tx = conn.transaction()?;
        for table in &tables {
          let quoted = table.replace('"', "\"\"");
          tx.execute_batch(&format!("DROP TABLE IF EXISTS \"{quoted}\""))?;
        }
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(classify)
  }
}
