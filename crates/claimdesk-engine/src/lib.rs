//! The claim lifecycle and assignment engines.
//!
//! [`Engine`] orchestrates every mutating operation on a claim: state
//! transitions, self-assignment, team management, and area reassignment. It
//! validates against the state machine and the permission rules, then writes
//! through the store traits and appends the mandatory audit entries. It is
//! request-scoped and stateless between invocations: every operation reads
//! current state, validates, and writes; storage failures propagate as fatal
//! errors.
//!
//! The caller (an HTTP layer, out of scope here) resolves actor identity and
//! role before invoking the engine; the engine trusts that input.

mod lifecycle;
mod team;

use claimdesk_core::{
  Error, Result,
  audit::{AuditKind, NewAuditEntry, transition_metadata},
  claim::{Claim, ClaimStatus},
  store::{AssignmentStore, AuditLog, ClaimStore, HandlerDirectory},
};
use uuid::Uuid;

pub use claimdesk_core::error::MIN_RESOLUTION_NOTE_LEN;

/// Everything the engine needs from a storage backend.
pub trait EngineStore:
  ClaimStore + AssignmentStore + AuditLog + HandlerDirectory
{
}

impl<T> EngineStore for T where
  T: ClaimStore + AssignmentStore + AuditLog + HandlerDirectory
{
}

/// Convert a backend error into the shared taxonomy.
pub(crate) fn store_err<E: Into<Error>>(err: E) -> Error { err.into() }

/// The claim lifecycle and assignment engine, generic over its backend.
///
/// Cheap to construct per request; holds no state of its own.
pub struct Engine<S> {
  store: S,
}

impl<S: EngineStore> Engine<S> {
  pub fn new(store: S) -> Self { Self { store } }

  pub fn store(&self) -> &S { &self.store }

  /// Load a claim or fail with [`Error::ClaimNotFound`].
  ///
  /// Soft-deleted claims are invisible here: every engine operation treats
  /// them as missing until [`ClaimStore::restore`] clears the marker.
  pub(crate) async fn load_claim(&self, claim_id: Uuid) -> Result<Claim> {
    self
      .store
      .get_claim(claim_id)
      .await
      .map_err(store_err)?
      .filter(|c| !c.is_deleted())
      .ok_or(Error::ClaimNotFound(claim_id))
  }

  /// Handler ids currently assigned to a claim.
  pub(crate) async fn assigned_ids(&self, claim_id: Uuid) -> Result<Vec<Uuid>> {
    Ok(
      self
        .store
        .assigned_handlers(claim_id)
        .await
        .map_err(store_err)?
        .into_iter()
        .map(|a| a.handler_id)
        .collect(),
    )
  }

  /// Persist a status change and append the matching `StateChanged` entry.
  ///
  /// Both engines funnel every transition through here, so every successful
  /// change produces exactly one audit entry with `{previous_state,
  /// new_state}` metadata. Status writes are last-writer-wins; there is no
  /// version token, so two concurrent transitions on the same claim can race
  /// (a known limitation of this layer).
  pub(crate) async fn transition(
    &self,
    claim: &Claim,
    target: ClaimStatus,
    actor_id: Uuid,
    detail: &str,
  ) -> Result<Claim> {
    let updated = self
      .store
      .set_status(claim.claim_id, target)
      .await
      .map_err(store_err)?
      .ok_or(Error::ClaimNotFound(claim.claim_id))?;

    self
      .store
      .append(
        NewAuditEntry::new(
          claim.claim_id,
          AuditKind::StateChanged,
          actor_id,
          detail,
        )
        .with_metadata(transition_metadata(claim.status, target)),
      )
      .await
      .map_err(store_err)?;

    tracing::info!(
      claim_id = %claim.claim_id,
      from = %claim.status,
      to = %target,
      "claim state changed"
    );

    Ok(updated)
  }
}
