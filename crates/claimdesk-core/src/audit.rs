//! Audit trail — the append-only history of everything done to a claim.
//!
//! Every state transition and assignment mutation produces exactly one
//! entry (self-assignment produces two: the assignment act, then the state
//! change it triggers). Entries are immutable once written and never
//! deleted; consumers read them most-recent-first to render a timeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::claim::ClaimStatus;

// ─── Kind ────────────────────────────────────────────────────────────────────

/// The closed set of recordable actions.
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
pub enum AuditKind {
  Created,
  SelfAssigned,
  HandlerAdded,
  HandlerRemoved,
  StateChanged,
  AreaChanged,
  Commented,
}

// ─── Entries ─────────────────────────────────────────────────────────────────

/// One immutable audit record tied to a claim and a responsible actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
  pub entry_id:    Uuid,
  pub claim_id:    Uuid,
  pub kind:        AuditKind,
  /// Free-text detail; for closing transitions this carries the resolution
  /// note, for comments the comment body.
  pub detail:      String,
  pub actor_id:    Uuid,
  pub recorded_at: DateTime<Utc>,
  /// Structured context, e.g. `{previous_state, new_state}` for transitions.
  pub metadata:    Option<Map<String, Value>>,
}

/// Input for appending an entry. Id and timestamp are assigned by the log.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
  pub claim_id: Uuid,
  pub kind:     AuditKind,
  pub detail:   String,
  pub actor_id: Uuid,
  pub metadata: Option<Map<String, Value>>,
}

impl NewAuditEntry {
  pub fn new(
    claim_id: Uuid,
    kind: AuditKind,
    actor_id: Uuid,
    detail: impl Into<String>,
  ) -> Self {
    Self {
      claim_id,
      kind,
      detail: detail.into(),
      actor_id,
      metadata: None,
    }
  }

  pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
    self.metadata = Some(metadata);
    self
  }
}

// ─── Metadata builders ───────────────────────────────────────────────────────

/// Metadata attached to every `StateChanged` entry.
pub fn transition_metadata(
  previous: ClaimStatus,
  new: ClaimStatus,
) -> Map<String, Value> {
  let mut map = Map::new();
  map.insert("previous_state".into(), Value::String(previous.to_string()));
  map.insert("new_state".into(), Value::String(new.to_string()));
  map
}

/// Metadata attached to every `AreaChanged` entry. Records the prior state
/// too, since reassignment resets it unconditionally.
pub fn area_change_metadata(
  previous_area: Uuid,
  new_area: Uuid,
  previous_state: ClaimStatus,
) -> Map<String, Value> {
  let mut map = Map::new();
  map.insert(
    "previous_area".into(),
    Value::String(previous_area.to_string()),
  );
  map.insert("new_area".into(), Value::String(new_area.to_string()));
  map.insert(
    "previous_state".into(),
    Value::String(previous_state.to_string()),
  );
  map
}
