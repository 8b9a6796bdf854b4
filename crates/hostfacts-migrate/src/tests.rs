//! Migration tests against in-memory SQLite stores.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{TimeZone, Utc};
use hostfacts_core::{
  fact::{FactRecord, NewFactRecord},
  host::{Host, HostId, HostLookup},
  store::{FactStore, LegacyDocument, LegacyError, LegacyStore},
};
use hostfacts_store_sqlite::{LegacyDocStore, SqliteStore};
use serde_json::{Value, json};

use crate::{DropOutcome, MigrationOutcome, Migrator, drop_legacy_store};

async fn target() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn legacy(docs: &[Value]) -> LegacyDocStore {
  let store = LegacyDocStore::open_in_memory()
    .await
    .expect("in-memory legacy store");
  for doc in docs {
    store.insert_document(doc).await.unwrap();
  }
  store
}

fn fact_version(inventory_id: i64, hostname: &str, fact: Value) -> Value {
  json!({
    "host": { "inventory_id": inventory_id, "hostname": hostname },
    "timestamp": "2016-05-04T12:30:00Z",
    "module": "ansible",
    "fact": fact,
  })
}

/// A legacy store that fails every call with the given error, or fails only
/// page reads after the count succeeds.
struct BrokenLegacy {
  count: Result<u64, LegacyError>,
  page:  LegacyError,
}

impl LegacyStore for BrokenLegacy {
  async fn count_fact_versions(&self) -> Result<u64, LegacyError> {
    self.count.clone()
  }

  async fn fact_version_page(
    &self,
    _after: Option<i64>,
    _limit: usize,
  ) -> Result<Vec<LegacyDocument>, LegacyError> {
    Err(self.page.clone())
  }

  async fn drop_store(&self) -> Result<(), LegacyError> {
    Err(self.page.clone())
  }
}

#[derive(Debug, thiserror::Error)]
enum FlakyError {
  #[error("injected failure")]
  Injected,
  #[error(transparent)]
  Store(#[from] hostfacts_store_sqlite::Error),
}

/// A fact store that starts failing after a set number of calls.
struct FlakyTarget {
  inner:          SqliteStore,
  count_fails:    bool,
  lookups_before: usize,
  writes_before:  usize,
  lookups:        AtomicUsize,
  writes:         AtomicUsize,
}

impl FlakyTarget {
  fn new(inner: SqliteStore) -> Self {
    Self {
      inner,
      count_fails: false,
      lookups_before: usize::MAX,
      writes_before: usize::MAX,
      lookups: AtomicUsize::new(0),
      writes: AtomicUsize::new(0),
    }
  }
}

impl FactStore for FlakyTarget {
  type Error = FlakyError;

  async fn count_facts(&self) -> Result<u64, FlakyError> {
    if self.count_fails {
      return Err(FlakyError::Injected);
    }
    Ok(self.inner.count_facts().await?)
  }

  async fn count_hosts(&self) -> Result<u64, FlakyError> {
    Ok(self.inner.count_hosts().await?)
  }

  async fn record_fact(&self, input: NewFactRecord) -> Result<FactRecord, FlakyError> {
    if self.writes.fetch_add(1, Ordering::SeqCst) >= self.writes_before {
      return Err(FlakyError::Injected);
    }
    Ok(self.inner.record_fact(input).await?)
  }

  async fn find_host<'a>(
    &'a self,
    inventory_id: i64,
    name: &'a str,
  ) -> Result<HostLookup, FlakyError> {
    if self.lookups.fetch_add(1, Ordering::SeqCst) >= self.lookups_before {
      return Err(FlakyError::Injected);
    }
    Ok(self.inner.find_host(inventory_id, name).await?)
  }

  async fn get_host(&self, id: HostId) -> Result<Option<Host>, FlakyError> {
    Ok(self.inner.get_host(id).await?)
  }

  async fn host_facts<'a>(
    &'a self,
    host_id: HostId,
    module: Option<&'a str>,
  ) -> Result<Vec<FactRecord>, FlakyError> {
    Ok(self.inner.host_facts(host_id, module).await?)
  }
}

// ─── Preconditions ───────────────────────────────────────────────────────────

#[tokio::test]
async fn not_configured_is_a_no_op() {
  let t = target().await;
  let outcome = Migrator::<_, LegacyDocStore>::new(&t, None).migrate().await;

  assert_eq!(outcome, MigrationOutcome::NotConfigured);
  assert_eq!(outcome.counts(), (0, 0));
  assert_eq!(t.count_facts().await.unwrap(), 0);
}

#[tokio::test]
async fn unreachable_legacy_store_is_a_no_op() {
  let t = target().await;
  t.add_host(1, "web01").await.unwrap();
  let l = LegacyDocStore::new("/nonexistent/hostfacts/legacy.sqlite3");

  let outcome = Migrator::new(&t, Some(&l)).migrate().await;

  assert_eq!(outcome, MigrationOutcome::LegacyUnreachable);
  assert_eq!(outcome.counts(), (0, 0));
  assert_eq!(t.count_facts().await.unwrap(), 0);
}

#[tokio::test]
async fn failing_legacy_query_is_a_no_op() {
  let t = target().await;
  let l = BrokenLegacy {
    count: Err(LegacyError::Operation("not authorized".into())),
    page:  LegacyError::Operation("not authorized".into()),
  };

  let outcome = Migrator::new(&t, Some(&l)).migrate().await;

  assert_eq!(outcome, MigrationOutcome::LegacyQueryFailed);
  assert_eq!(outcome.counts(), (0, 0));
}

#[tokio::test]
async fn populated_target_is_not_migrated_again() {
  let t = target().await;
  let host = t.add_host(1, "web01").await.unwrap();
  let l = legacy(&[fact_version(1, "web01", json!({ "a\u{FF0E}b": 1 }))]).await;

  let first = Migrator::new(&t, Some(&l)).migrate().await;
  assert_eq!(first.counts(), (1, 0));

  let second = Migrator::new(&t, Some(&l)).migrate().await;
  assert_eq!(second, MigrationOutcome::AlreadyMigrated);
  assert_eq!(second.counts(), (0, 0));
  assert_eq!(t.host_facts(host.id, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn uncountable_target_is_a_no_op() {
  let inner = target().await;
  inner.add_host(1, "web01").await.unwrap();
  let t = FlakyTarget { count_fails: true, ..FlakyTarget::new(inner) };
  let l = legacy(&[fact_version(1, "web01", json!({}))]).await;

  let outcome = Migrator::new(&t, Some(&l)).migrate().await;

  assert_eq!(outcome, MigrationOutcome::TargetUnavailable);
  assert_eq!(outcome.counts(), (0, 0));
  assert!(outcome.is_skipped());
  assert_eq!(t.writes.load(Ordering::SeqCst), 0);
}

// ─── Main loop ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_host_is_tallied_and_keys_are_restored() {
  let t = target().await;
  let host = t.add_host(1, "web01").await.unwrap();
  let l = legacy(&[
    fact_version(
      1,
      "web01",
      json!({
        "ansible_eth0\u{FF0E}ipv4": { "\u{FF04}address": "10.0.0.5" },
        "note": "value.with.dots"
      }),
    ),
    fact_version(1, "gone01", json!({ "x": 1 })),
  ])
  .await;

  let outcome = Migrator::new(&t, Some(&l)).migrate().await;

  assert_eq!(
    outcome,
    MigrationOutcome::Completed { migrated: 1, not_migrated: 1 }
  );
  assert_eq!(outcome.counts(), (1, 1));

  let records = t.host_facts(host.id, None).await.unwrap();
  assert_eq!(records.len(), 1);
  let record = &records[0];
  assert_eq!(record.module, "ansible");
  assert_eq!(
    record.timestamp,
    Utc.with_ymd_and_hms(2016, 5, 4, 12, 30, 0).unwrap()
  );
  assert_eq!(
    record.facts,
    json!({
      "ansible_eth0.ipv4": { "$address": "10.0.0.5" },
      "note": "value.with.dots"
    })
  );
}

#[tokio::test]
async fn every_document_is_accounted_for_across_pages() {
  let t = target().await;
  t.add_host(1, "a").await.unwrap();
  t.add_host(1, "b").await.unwrap();

  let mut docs = Vec::new();
  for i in 0..7 {
    let name = if i % 2 == 0 { "a" } else { "b" };
    docs.push(fact_version(1, name, json!({ "run": i })));
  }
  docs.push(fact_version(2, "a", json!({})));
  docs.push(json!("not a fact version"));
  let l = legacy(&docs).await;

  let outcome = Migrator::new(&t, Some(&l))
    .with_batch_size(2)
    .migrate()
    .await;

  assert_eq!(
    outcome,
    MigrationOutcome::Completed { migrated: 7, not_migrated: 2 }
  );
  assert_eq!(t.count_facts().await.unwrap(), 7);
}

#[tokio::test]
async fn empty_legacy_store_completes_with_zero_counts() {
  let t = target().await;
  let l = legacy(&[]).await;

  let outcome = Migrator::new(&t, Some(&l)).migrate().await;
  assert_eq!(
    outcome,
    MigrationOutcome::Completed { migrated: 0, not_migrated: 0 }
  );
  assert!(!outcome.is_skipped());
}

#[tokio::test]
async fn page_failure_interrupts_without_propagating() {
  let t = target().await;
  let l = BrokenLegacy {
    count: Ok(3),
    page:  LegacyError::Unreachable("connection reset".into()),
  };

  let outcome = Migrator::new(&t, Some(&l)).migrate().await;

  assert!(matches!(
    outcome,
    MigrationOutcome::Interrupted { migrated: 0, not_migrated: 0, .. }
  ));
  assert_eq!(outcome.counts(), (0, 0));
}

#[tokio::test]
async fn write_failure_keeps_partial_counts_and_rows() {
  let inner = target().await;
  inner.add_host(1, "web01").await.unwrap();
  let t = FlakyTarget { writes_before: 2, ..FlakyTarget::new(inner) };
  let l = legacy(&[
    fact_version(1, "web01", json!({ "run": 1 })),
    fact_version(1, "gone01", json!({})),
    fact_version(1, "web01", json!({ "run": 2 })),
    fact_version(1, "web01", json!({ "run": 3 })),
    fact_version(1, "web01", json!({ "run": 4 })),
  ])
  .await;

  let outcome = Migrator::new(&t, Some(&l)).migrate().await;

  assert!(matches!(
    outcome,
    MigrationOutcome::Interrupted { migrated: 2, not_migrated: 1, .. }
  ));
  assert_eq!(outcome.counts(), (2, 1));
  assert_eq!(t.inner.count_facts().await.unwrap(), 2);
}

#[tokio::test]
async fn host_lookup_failure_interrupts_with_partial_counts() {
  let inner = target().await;
  inner.add_host(1, "web01").await.unwrap();
  let t = FlakyTarget { lookups_before: 1, ..FlakyTarget::new(inner) };
  let l = legacy(&[
    fact_version(1, "web01", json!({ "run": 1 })),
    fact_version(1, "web01", json!({ "run": 2 })),
  ])
  .await;

  let outcome = Migrator::new(&t, Some(&l)).migrate().await;

  let MigrationOutcome::Interrupted { migrated, not_migrated, reason } = &outcome else {
    panic!("expected an interrupted run, got {outcome:?}");
  };
  assert_eq!((*migrated, *not_migrated), (1, 0));
  assert!(reason.contains("injected failure"), "{reason}");
  assert_eq!(t.inner.count_facts().await.unwrap(), 1);
}

#[tokio::test]
async fn naive_legacy_timestamps_are_migrated_as_utc() {
  let t = target().await;
  let host = t.add_host(1, "web01").await.unwrap();
  let l = legacy(&[json!({
    "host": { "inventory_id": 1, "hostname": "web01" },
    "timestamp": "2016-05-04T12:30:00",
    "module": "ansible",
    "fact": { "a\u{FF0E}b": 1 },
  })])
  .await;

  let outcome = Migrator::new(&t, Some(&l)).migrate().await;

  assert_eq!(
    outcome,
    MigrationOutcome::Completed { migrated: 1, not_migrated: 0 }
  );
  let records = t.host_facts(host.id, None).await.unwrap();
  assert_eq!(
    records[0].timestamp,
    Utc.with_ymd_and_hms(2016, 5, 4, 12, 30, 0).unwrap()
  );
}

// ─── Cleanup ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn drop_legacy_store_drops_collection() {
  let l = legacy(&[fact_version(1, "web01", json!({}))]).await;

  assert_eq!(drop_legacy_store(&l).await, DropOutcome::Dropped);
  assert!(l.count_fact_versions().await.is_err());
}

#[tokio::test]
async fn drop_legacy_store_never_fails() {
  let unreachable = LegacyDocStore::new("/nonexistent/hostfacts/legacy.sqlite3");
  assert_eq!(drop_legacy_store(&unreachable).await, DropOutcome::Unreachable);

  let broken = BrokenLegacy {
    count: Ok(0),
    page:  LegacyError::Operation("read-only".into()),
  };
  assert_eq!(drop_legacy_store(&broken).await, DropOutcome::Failed);
}
