//! Migration configuration, read from a TOML file and `HOSTFACTS_*`
//! environment variables.

use std::path::{Path, PathBuf};

use hostfacts_store_sqlite::LegacyDocStore;
use serde::Deserialize;

use crate::DEFAULT_BATCH_SIZE;

/// Settings for the `hostfacts-migrate` binary.
#[derive(Debug, Deserialize, Clone)]
pub struct MigrateConfig {
  /// The relational fact store.
  pub store_path:        PathBuf,
  /// The legacy document store. Absent or empty means "not configured",
  /// which is different from a configured path that cannot be opened.
  #[serde(default)]
  pub legacy_store_path: Option<PathBuf>,
  #[serde(default = "default_batch_size")]
  pub batch_size:        usize,
}

fn default_batch_size() -> usize { DEFAULT_BATCH_SIZE }

impl MigrateConfig {
  /// Layer the optional config file under the environment.
  pub fn load(file: &Path) -> Result<Self, config::ConfigError> {
    Self::from_builder(
      config::Config::builder()
        .add_source(config::File::from(file).required(false)),
    )
  }

  fn from_builder(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
  ) -> Result<Self, config::ConfigError> {
    builder
      .add_source(config::Environment::with_prefix("HOSTFACTS"))
      .build()?
      .try_deserialize()
  }

  /// The configured legacy store, or `None` if there is none.
  pub fn legacy_store(&self) -> Option<LegacyDocStore> {
    self
      .legacy_store_path
      .as_deref()
      .filter(|p| !p.as_os_str().is_empty())
      .map(|p| LegacyDocStore::new(expand_tilde(p)))
  }

  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
