//! Assignment — the N:M link between a claim and its handlers.
//!
//! A `(claim_id, handler_id)` pair is unique, enforced atomically by the
//! storage backend (a UNIQUE index) so that two concurrent self-assign calls
//! cannot both win. Assignment rows are created and destroyed freely during
//! a claim's active life and wiped wholesale on area reassignment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single handler assigned to a claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
  pub claim_id:    Uuid,
  pub handler_id:  Uuid,
  /// Set for the handler who performed the original self-assignment.
  pub principal:   bool,
  pub assigned_at: DateTime<Utc>,
}

/// Outcome of an [`AssignmentStore::assign`](crate::store::AssignmentStore)
/// attempt.
///
/// The uniqueness constraint is the atomic arbiter for concurrent assigns;
/// a violation surfaces as `Duplicate`, never as a raw backend error, so the
/// engine can map the losing racer to a typed rejection.
#[derive(Debug, Clone)]
pub enum AssignOutcome {
  Created(Assignment),
  Duplicate,
}

impl AssignOutcome {
  pub fn is_duplicate(&self) -> bool { matches!(self, Self::Duplicate) }
}
