//! Core types and trait definitions for the claimdesk engine.
//!
//! This crate is deliberately free of database dependencies. It holds the
//! domain model (claims, assignments, audit entries, actors), the store
//! traits the engines operate through, the pure permission evaluator, and
//! the shared error taxonomy. All other crates depend on it; it depends on
//! nothing proprietary.

pub mod access;
pub mod actor;
pub mod assignment;
pub mod audit;
pub mod claim;
pub mod error;
pub mod store;

pub use error::{Error, ErrorKind, Result};
