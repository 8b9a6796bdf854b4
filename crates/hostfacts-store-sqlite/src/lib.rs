//! SQLite backends for host fact storage.
//!
//! [`SqliteStore`] is the relational fact store. [`LegacyDocStore`] reads the
//! legacy fact-version document collection that the migration drains.
//! Both wrap [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime.

mod encode;
mod legacy;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use legacy::LegacyDocStore;
pub use store::SqliteStore;
