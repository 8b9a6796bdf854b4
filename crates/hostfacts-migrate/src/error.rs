//! Error type for a failed migration step.
//!
//! Step errors never leave the crate as errors: [`crate::Migrator::migrate`]
//! turns them into [`crate::MigrationOutcome::Interrupted`].

use hostfacts_core::store::LegacyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StepError {
  #[error("reading legacy documents failed: {0}")]
  Legacy(#[from] LegacyError),

  #[error("fact store error: {0}")]
  Target(#[source] Box<dyn std::error::Error + Send + Sync>),
}
