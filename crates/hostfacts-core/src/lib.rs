//! Core types and trait definitions for host fact storage and the legacy fact
//! migration.
//!
//! No HTTP or database dependencies; every other crate in the workspace
//! builds on these types.

// Store traits spell out `Send` futures themselves.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod fact;
pub mod host;
pub mod keys;
pub mod store;

pub use error::{Error, Result};
