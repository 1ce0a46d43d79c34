//! Claim — the record routed through areas and handlers until closed.
//!
//! A claim's meaningful lifecycle lives in its status field, governed by a
//! small state machine: `Pending -> InReview -> Resolved | Rejected`. The
//! promotion to `InReview` is owned exclusively by assignment events; the
//! closing transitions require an explicit state-change request with a
//! resolution note.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Status ──────────────────────────────────────────────────────────────────

/// The lifecycle state of a claim.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ClaimStatus {
  /// Initial state; nobody has picked the claim up yet.
  Pending,
  /// At least one handler is assigned and working the claim.
  InReview,
  /// Closed successfully. Terminal.
  Resolved,
  /// Closed without a fix. Terminal.
  Rejected,
}

impl ClaimStatus {
  /// Terminal states admit no further transitions or assignment mutations.
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Resolved | Self::Rejected)
  }

  /// The full legality matrix of the state machine.
  ///
  /// `Pending -> InReview` is listed here for completeness but is only ever
  /// driven by assignment events, never by a direct state-change request.
  pub fn can_transition_to(self, target: ClaimStatus) -> bool {
    matches!(
      (self, target),
      (Self::Pending, Self::InReview)
        | (Self::InReview, Self::Resolved)
        | (Self::InReview, Self::Rejected)
    )
  }

  /// Whether closing into `target` demands a resolution note.
  pub fn requires_resolution_note(target: ClaimStatus) -> bool {
    target.is_terminal()
  }
}

// ─── Priority ────────────────────────────────────────────────────────────────

/// Client-declared urgency of a claim. Informational; no scheduling logic
/// hangs off it at this layer.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Priority {
  Low,
  Medium,
  High,
}

// ─── Claim ───────────────────────────────────────────────────────────────────

/// A customer-reported issue owned by exactly one area at a time.
///
/// Claims are never hard-deleted; `deleted_at` is a reversible soft-delete
/// marker. Reassigning the area resets `status` to [`ClaimStatus::Pending`]
/// and wipes all assignments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
  pub claim_id:      Uuid,
  pub title:         String,
  pub description:   String,
  pub priority:      Priority,
  pub critical:      bool,
  pub status:        ClaimStatus,
  /// The client who opened the claim.
  pub client_id:     Uuid,
  pub project_id:    Uuid,
  pub claim_type_id: Uuid,
  pub area_id:       Uuid,
  pub deleted_at:    Option<DateTime<Utc>>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

impl Claim {
  pub fn is_deleted(&self) -> bool { self.deleted_at.is_some() }
}

/// Input for claim creation. Status, ids, and timestamps are assigned by the
/// store; the area comes from the claim's project and is supplied by the
/// caller alongside the client id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClaim {
  pub title:         String,
  pub description:   String,
  pub priority:      Priority,
  pub critical:      bool,
  pub project_id:    Uuid,
  pub claim_type_id: Uuid,
}

/// Partial update restricted to non-sensitive fields. Status, area, owner,
/// and the soft-delete marker each have dedicated operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClaimPatch {
  pub title:         Option<String>,
  pub description:   Option<String>,
  pub priority:      Option<Priority>,
  pub critical:      Option<bool>,
  pub claim_type_id: Option<Uuid>,
}

impl ClaimPatch {
  pub fn is_empty(&self) -> bool {
    self.title.is_none()
      && self.description.is_none()
      && self.priority.is_none()
      && self.critical.is_none()
      && self.claim_type_id.is_none()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn terminal_states_admit_no_transitions() {
    for terminal in [ClaimStatus::Resolved, ClaimStatus::Rejected] {
      assert!(terminal.is_terminal());
      for target in [
        ClaimStatus::Pending,
        ClaimStatus::InReview,
        ClaimStatus::Resolved,
        ClaimStatus::Rejected,
      ] {
        assert!(!terminal.can_transition_to(target));
      }
    }
  }

  #[test]
  fn pending_only_promotes_to_in_review() {
    assert!(ClaimStatus::Pending.can_transition_to(ClaimStatus::InReview));
    assert!(!ClaimStatus::Pending.can_transition_to(ClaimStatus::Resolved));
    assert!(!ClaimStatus::Pending.can_transition_to(ClaimStatus::Rejected));
  }

  #[test]
  fn in_review_closes_both_ways() {
    assert!(ClaimStatus::InReview.can_transition_to(ClaimStatus::Resolved));
    assert!(ClaimStatus::InReview.can_transition_to(ClaimStatus::Rejected));
    assert!(!ClaimStatus::InReview.can_transition_to(ClaimStatus::Pending));
  }

  #[test]
  fn status_round_trips_through_discriminant() {
    use std::str::FromStr as _;
    for status in [
      ClaimStatus::Pending,
      ClaimStatus::InReview,
      ClaimStatus::Resolved,
      ClaimStatus::Rejected,
    ] {
      let s: &'static str = status.into();
      assert_eq!(ClaimStatus::from_str(s).unwrap(), status);
    }
    assert_eq!(
      ClaimStatus::from_str("IN_REVIEW").unwrap(),
      ClaimStatus::InReview
    );
  }
}
