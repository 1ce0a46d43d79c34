//! The lifecycle half of the engine: creation, explicit state changes, area
//! reassignment, comments, and the audit timeline.
//!
//! `change_state` only governs transitions out of `InReview`; the promotion
//! `Pending -> InReview` belongs exclusively to the assignment operations in
//! [`crate::team`].

use claimdesk_core::{
  Error, Result, access,
  actor::{Actor, Role},
  audit::{AuditEntry, AuditKind, NewAuditEntry, area_change_metadata},
  claim::{Claim, ClaimStatus, NewClaim},
  error::MIN_RESOLUTION_NOTE_LEN,
  store::{AssignmentStore as _, AuditLog as _, ClaimStore as _},
};
use uuid::Uuid;

use crate::{Engine, EngineStore, store_err};

impl<S: EngineStore> Engine<S> {
  /// Open a claim on behalf of a client. Status starts at `Pending`; the
  /// area is the one owning the claim's project, resolved by the caller.
  pub async fn create_claim(
    &self,
    input: NewClaim,
    client_id: Uuid,
    area_id: Uuid,
  ) -> Result<Claim> {
    let claim = self
      .store()
      .create_claim(input, client_id, area_id)
      .await
      .map_err(store_err)?;

    self
      .store()
      .append(NewAuditEntry::new(
        claim.claim_id,
        AuditKind::Created,
        client_id,
        "claim opened",
      ))
      .await
      .map_err(store_err)?;

    tracing::info!(claim_id = %claim.claim_id, area_id = %area_id, "claim created");
    Ok(claim)
  }

  /// Explicitly move a claim out of `InReview`.
  ///
  /// Managers may always act; handlers only on claims they are assigned to.
  /// Closing (`Resolved`/`Rejected`) demands a resolution note of at least
  /// [`MIN_RESOLUTION_NOTE_LEN`] characters, which becomes the audit detail.
  pub async fn change_state(
    &self,
    claim_id: Uuid,
    target: ClaimStatus,
    resolution_note: Option<&str>,
    actor: &Actor,
  ) -> Result<Claim> {
    let claim = self.load_claim(claim_id).await?;

    if claim.status.is_terminal() {
      return Err(Error::ClaimClosed { claim_id, status: claim.status });
    }

    let assigned = self.assigned_ids(claim_id).await?;
    match actor.role {
      Role::Manager => {}
      Role::Handler if assigned.contains(&actor.actor_id) => {}
      _ => {
        return Err(Error::Forbidden {
          actor_id: actor.actor_id,
          claim_id,
          action: "change state",
        });
      }
    }

    let note = resolution_note.map(str::trim).filter(|n| !n.is_empty());
    if ClaimStatus::requires_resolution_note(target)
      && note.is_none_or(|n| n.chars().count() < MIN_RESOLUTION_NOTE_LEN)
    {
      return Err(Error::MissingResolutionNote { min: MIN_RESOLUTION_NOTE_LEN });
    }

    if !(claim.status == ClaimStatus::InReview
      && claim.status.can_transition_to(target))
    {
      return Err(Error::IllegalTransition { from: claim.status, to: target });
    }

    let detail = match note {
      Some(n) => n.to_owned(),
      None => format!("state changed to {target}"),
    };
    self.transition(&claim, target, actor.actor_id, &detail).await
  }

  /// Re-route a misclassified claim to another area.
  ///
  /// This is a deliberate override path: it applies regardless of the
  /// claim's prior status, terminal included. All assignments are wiped and
  /// the status resets to `Pending`.
  pub async fn reassign_area(
    &self,
    claim_id: Uuid,
    new_area_id: Uuid,
    actor: &Actor,
  ) -> Result<Claim> {
    let claim = self.load_claim(claim_id).await?;

    let cleared = self
      .store()
      .clear_assignments(claim_id)
      .await
      .map_err(store_err)?;

    let updated = self
      .store()
      .set_area(claim_id, new_area_id)
      .await
      .map_err(store_err)?
      .ok_or(Error::ClaimNotFound(claim_id))?;

    self
      .store()
      .append(
        NewAuditEntry::new(
          claim_id,
          AuditKind::AreaChanged,
          actor.actor_id,
          format!("claim rerouted to area {new_area_id}"),
        )
        .with_metadata(area_change_metadata(
          claim.area_id,
          new_area_id,
          claim.status,
        )),
      )
      .await
      .map_err(store_err)?;

    tracing::info!(
      claim_id = %claim_id,
      from_area = %claim.area_id,
      to_area = %new_area_id,
      cleared_assignments = cleared,
      "claim rerouted"
    );

    Ok(updated)
  }

  /// Record a comment on a claim, gated by the permission evaluator:
  /// managers always, assigned handlers, or the owning client.
  pub async fn comment(
    &self,
    claim_id: Uuid,
    actor: &Actor,
    text: &str,
  ) -> Result<AuditEntry> {
    let claim = self.load_claim(claim_id).await?;

    let text = text.trim();
    if text.is_empty() {
      return Err(Error::EmptyComment);
    }

    let assigned = self.assigned_ids(claim_id).await?;
    access::check_access(actor, &claim, &assigned, "comment")?;

    let entry = self
      .store()
      .append(NewAuditEntry::new(
        claim_id,
        AuditKind::Commented,
        actor.actor_id,
        text,
      ))
      .await
      .map_err(store_err)?;

    Ok(entry)
  }

  /// The audit trail for a claim, most recent first.
  pub async fn history(&self, claim_id: Uuid) -> Result<Vec<AuditEntry>> {
    self.load_claim(claim_id).await?;
    self.store().history(claim_id).await.map_err(store_err)
  }
}
