//! SQLite backend for the claimdesk stores.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread pool without blocking the async runtime. One [`SqliteStore`]
//! implements all four store traits from `claimdesk-core`.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
