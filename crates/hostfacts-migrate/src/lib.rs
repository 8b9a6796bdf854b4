//! One-time migration of host facts out of the legacy document store.
//!
//! [`Migrator::migrate`] drains every legacy fact-version document into the
//! relational fact store, restoring the payload keys the legacy store forced
//! us to escape. It is a single best-effort batch: nothing spans the whole
//! run in a transaction, and no store failure is ever propagated to the
//! caller. Every outcome, including the early no-op exits, is reported as a
//! [`MigrationOutcome`].
//!
//! [`drop_legacy_store`] is the separate, deliberate cleanup step.

pub mod config;
pub mod error;

use hostfacts_core::{
  fact::{LegacyFactVersion, NewFactRecord},
  host::HostLookup,
  keys::KeyCodec,
  store::{FactStore, LegacyDocument, LegacyError, LegacyStore},
};
use tracing::{error, info, warn};

pub use error::StepError;

/// Documents fetched from the legacy store per round trip.
pub const DEFAULT_BATCH_SIZE: usize = 500;

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// What a call to [`Migrator::migrate`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
  /// No legacy store is configured; nothing to migrate.
  NotConfigured,
  /// The legacy store could not be reached; most likely a fresh install.
  LegacyUnreachable,
  /// The legacy store answered but the count query failed.
  LegacyQueryFailed,
  /// The fact store could not be inspected, so nothing was attempted.
  TargetUnavailable,
  /// The fact table already holds records; migration ran before.
  AlreadyMigrated,
  /// Every legacy document was accounted for.
  Completed { migrated: u64, not_migrated: u64 },
  /// A store failure stopped the run part-way. Records written so far stay.
  Interrupted {
    migrated:     u64,
    not_migrated: u64,
    reason:       String,
  },
}

impl MigrationOutcome {
  /// `(migrated_count, not_migrated_count)`; `(0, 0)` for every early exit.
  pub fn counts(&self) -> (u64, u64) {
    match self {
      Self::Completed { migrated, not_migrated }
      | Self::Interrupted { migrated, not_migrated, .. } => {
        (*migrated, *not_migrated)
      }
      _ => (0, 0),
    }
  }

  /// Whether the main loop never started.
  pub fn is_skipped(&self) -> bool {
    !matches!(self, Self::Completed { .. } | Self::Interrupted { .. })
  }
}

#[derive(Debug, Default)]
struct Tally {
  migrated:     u64,
  not_migrated: u64,
}

// ─── Migrator ────────────────────────────────────────────────────────────────

/// Moves legacy fact versions into a [`FactStore`].
///
/// `legacy` is `None` when no legacy store is configured.
pub struct Migrator<'a, S, L> {
  target:     &'a S,
  legacy:     Option<&'a L>,
  codec:      KeyCodec,
  batch_size: usize,
}

impl<'a, S, L> Migrator<'a, S, L>
where
  S: FactStore,
  L: LegacyStore,
{
  pub fn new(target: &'a S, legacy: Option<&'a L>) -> Self {
    Self {
      target,
      legacy,
      codec: KeyCodec::legacy(),
      batch_size: DEFAULT_BATCH_SIZE,
    }
  }

  pub fn with_batch_size(mut self, batch_size: usize) -> Self {
    self.batch_size = batch_size.max(1);
    self
  }

  /// Run the migration once.
  ///
  /// Returns early, writing nothing, when the legacy store is not configured,
  /// unreachable, or failing, or when the fact table is already populated.
  pub async fn migrate(&self) -> MigrationOutcome {
    let Some(legacy) = self.legacy else {
      info!("legacy fact store not configured, nothing to migrate");
      return MigrationOutcome::NotConfigured;
    };

    let documents = match legacy.count_fact_versions().await {
      Ok(n) => n,
      Err(LegacyError::Unreachable(reason)) => {
        warn!(%reason, "legacy fact store unreachable, skipping fact migration");
        return MigrationOutcome::LegacyUnreachable;
      }
      Err(LegacyError::Operation(reason)) => {
        warn!(%reason, "legacy fact store query failed, skipping fact migration");
        return MigrationOutcome::LegacyQueryFailed;
      }
    };

    match self.target.count_facts().await {
      Ok(0) => {}
      Ok(existing) => {
        info!(existing, "fact table already populated, migration already done");
        return MigrationOutcome::AlreadyMigrated;
      }
      Err(e) => {
        error!(error = %e, "cannot count facts in the fact store, skipping fact migration");
        return MigrationOutcome::TargetUnavailable;
      }
    }

    info!(documents, batch_size = self.batch_size, "migrating legacy facts");

    let mut tally = Tally::default();
    match self.run(legacy, &mut tally).await {
      Ok(()) => {
        info!(
          migrated = tally.migrated,
          not_migrated = tally.not_migrated,
          "legacy fact migration complete"
        );
        MigrationOutcome::Completed {
          migrated:     tally.migrated,
          not_migrated: tally.not_migrated,
        }
      }
      Err(e) => {
        error!(
          error = %e,
          migrated = tally.migrated,
          not_migrated = tally.not_migrated,
          "legacy fact migration interrupted, fact table is partially migrated"
        );
        MigrationOutcome::Interrupted {
          migrated:     tally.migrated,
          not_migrated: tally.not_migrated,
          reason:       e.to_string(),
        }
      }
    }
  }

  async fn run(&self, legacy: &L, tally: &mut Tally) -> Result<(), StepError> {
    let mut cursor = None;
    loop {
      let page = legacy.fact_version_page(cursor, self.batch_size).await?;
      let Some(last) = page.last() else {
        return Ok(());
      };
      cursor = Some(last.id);

      for doc in page {
        self.migrate_document(doc, tally).await?;
      }
    }
  }

  async fn migrate_document(
    &self,
    doc: LegacyDocument,
    tally: &mut Tally,
  ) -> Result<(), StepError> {
    let document = doc.id;
    let version = match LegacyFactVersion::from_document(doc) {
      Ok(v) => v,
      Err(e) => {
        warn!(document, error = %e, "malformed legacy fact document, not migrated");
        tally.not_migrated += 1;
        return Ok(());
      }
    };

    let reference = &version.host_reference;
    let lookup = self
      .target
      .find_host(reference.inventory_id, &reference.hostname)
      .await
      .map_err(|e| StepError::Target(Box::new(e)))?;

    let HostLookup::Found(host_id) = lookup else {
      warn!(
        document,
        inventory_id = reference.inventory_id,
        hostname = %reference.hostname,
        "no host found for legacy facts, not migrated"
      );
      tally.not_migrated += 1;
      return Ok(());
    };

    let record = NewFactRecord::from_legacy(version, host_id, &self.codec);
    self
      .target
      .record_fact(record)
      .await
      .map_err(|e| StepError::Target(Box::new(e)))?;
    tally.migrated += 1;
    Ok(())
  }
}

// ─── Cleanup ─────────────────────────────────────────────────────────────────

/// What [`drop_legacy_store`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
  Dropped,
  /// The store could not be reached; it may need to be removed by hand.
  Unreachable,
  /// The store answered but refused or failed the drop.
  Failed,
}

/// Irreversibly destroy the legacy store.
///
/// Never fails: both failure kinds are logged and reported as a
/// [`DropOutcome`]. Only call this after confirming the migration succeeded.
pub async fn drop_legacy_store<L: LegacyStore>(legacy: &L) -> DropOutcome {
  match legacy.drop_store().await {
    Ok(()) => {
      info!("legacy fact store dropped");
      DropOutcome::Dropped
    }
    Err(LegacyError::Unreachable(reason)) => {
      warn!(%reason, "legacy fact store unreachable, it may need to be dropped manually");
      DropOutcome::Unreachable
    }
    Err(LegacyError::Operation(reason)) => {
      warn!(%reason, "dropping the legacy fact store failed");
      DropOutcome::Failed
    }
  }
}

#[cfg(test)]
mod tests;
