//! SQLite backend for Accolade.
//!
//! Implements both [`accolade_core::store::RecordStore`] and
//! [`accolade_core::store::AccountDirectory`] over one database file. Wraps
//! [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
