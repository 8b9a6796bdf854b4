//! hostfacts-migrate binary.
//!
//! Reads `config.toml` (or the path given with `--config`) and either moves
//! legacy fact documents into the fact store or drops the legacy store.
//!
//! ```text
//! hostfacts-migrate migrate
//! hostfacts-migrate drop-legacy --confirm
//! ```

use std::{path::PathBuf, process::ExitCode};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use hostfacts_migrate::{
  DropOutcome, MigrationOutcome, Migrator, config::MigrateConfig,
  drop_legacy_store,
};
use hostfacts_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Legacy host fact migration")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Copy every legacy fact document into the fact store, once.
  Migrate,
  /// Irreversibly destroy the legacy fact store.
  DropLegacy {
    /// Required; the drop cannot be undone.
    #[arg(long)]
    confirm: bool,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = MigrateConfig::load(&cli.config)
    .context("failed to read migration configuration")?;

  match cli.command {
    Command::Migrate => {
      let store_path = cfg.store_path();
      let store = SqliteStore::open(&store_path)
        .await
        .with_context(|| format!("failed to open fact store at {store_path:?}"))?;
      let legacy = cfg.legacy_store();

      let outcome = Migrator::new(&store, legacy.as_ref())
        .with_batch_size(cfg.batch_size)
        .migrate()
        .await;

      let (migrated, not_migrated) = outcome.counts();
      println!("migrated={migrated} not_migrated={not_migrated}");

      if let MigrationOutcome::Interrupted { reason, .. } = &outcome {
        eprintln!("migration interrupted: {reason}");
        return Ok(ExitCode::FAILURE);
      }
      Ok(ExitCode::SUCCESS)
    }

    Command::DropLegacy { confirm } => {
      if !confirm {
        anyhow::bail!("refusing to drop the legacy fact store without --confirm");
      }
      let Some(legacy) = cfg.legacy_store() else {
        tracing::info!("legacy fact store not configured, nothing to drop");
        return Ok(ExitCode::SUCCESS);
      };

      match drop_legacy_store(&legacy).await {
        DropOutcome::Dropped => Ok(ExitCode::SUCCESS),
        DropOutcome::Unreachable | DropOutcome::Failed => Ok(ExitCode::FAILURE),
      }
    }
  }
}
