//! The assignment half of the engine: self-assignment, bulk team updates,
//! and the stricter single-id add/remove operations.
//!
//! Assignment events own the `Pending <-> InReview` boundary: the first
//! handler promotes the claim, and losing the last handler demotes it (bulk
//! path) or is rejected outright (single path). That asymmetry mirrors the
//! upstream behavior and is covered by tests on both paths.

use claimdesk_core::{
  Error, Result,
  assignment::AssignOutcome,
  audit::{AuditKind, NewAuditEntry},
  claim::{Claim, ClaimStatus},
  store::{AssignmentStore as _, AuditLog as _, HandlerDirectory as _},
};
use uuid::Uuid;

use crate::{Engine, EngineStore, store_err};

fn id_list(ids: &[Uuid]) -> String {
  ids
    .iter()
    .map(Uuid::to_string)
    .collect::<Vec<_>>()
    .join(", ")
}

impl<S: EngineStore> Engine<S> {
  /// A handler volunteers to take a `Pending` claim.
  ///
  /// Idempotent for the handler who already holds the claim alone; any other
  /// existing assignment rejects the call — only one volunteer wins. The
  /// winner's assignment promotes the claim to `InReview` and produces two
  /// audit entries: the assignment act, then the state change.
  pub async fn self_assign(
    &self,
    claim_id: Uuid,
    handler_id: Uuid,
  ) -> Result<Claim> {
    let claim = self.load_claim(claim_id).await?;
    let assigned = self.assigned_ids(claim_id).await?;

    if assigned.len() == 1 && assigned[0] == handler_id {
      tracing::debug!(%claim_id, %handler_id, "self-assign no-op");
      return Ok(claim);
    }

    if claim.status != ClaimStatus::Pending {
      return Err(Error::ClaimNotClaimable { claim_id, status: claim.status });
    }

    if !self
      .store()
      .handler_exists(handler_id)
      .await
      .map_err(store_err)?
    {
      return Err(Error::HandlerNotFound(handler_id));
    }

    if !assigned.is_empty() {
      return Err(Error::AlreadyAssigned { claim_id, handler_id });
    }

    match self
      .store()
      .assign(claim_id, handler_id, true)
      .await
      .map_err(store_err)?
    {
      AssignOutcome::Created(_) => {}
      // Lost the race against a concurrent self-assign; the unique index
      // picked the other winner.
      AssignOutcome::Duplicate => {
        return Err(Error::AlreadyAssigned { claim_id, handler_id });
      }
    }

    self
      .store()
      .append(NewAuditEntry::new(
        claim_id,
        AuditKind::SelfAssigned,
        handler_id,
        format!("handler {handler_id} took the claim"),
      ))
      .await
      .map_err(store_err)?;

    self
      .transition(&claim, ClaimStatus::InReview, handler_id, "picked up for review")
      .await
  }

  /// Bulk team update: remove, then add, then settle the state machine.
  ///
  /// Removals of absent handlers and additions of already-assigned handlers
  /// are skipped silently. Audit entries are batched per group, not per id.
  /// Adding anyone to a `Pending` claim promotes it; ending with zero
  /// handlers on a non-`Pending` claim demotes it back to `Pending`.
  pub async fn update_team(
    &self,
    claim_id: Uuid,
    actor_id: Uuid,
    add: &[Uuid],
    remove: &[Uuid],
  ) -> Result<Claim> {
    let claim = self.load_claim(claim_id).await?;

    if claim.status.is_terminal() {
      return Err(Error::ClaimClosed { claim_id, status: claim.status });
    }

    // Validate every add id up front: once a removal is persisted there is
    // no clean way to bail, so nothing may fail after the first unassign.
    for &handler_id in add {
      if !self
        .store()
        .handler_exists(handler_id)
        .await
        .map_err(store_err)?
      {
        return Err(Error::HandlerNotFound(handler_id));
      }
    }

    let mut removed = Vec::new();
    for &handler_id in remove {
      if self
        .store()
        .unassign(claim_id, handler_id)
        .await
        .map_err(store_err)?
      {
        removed.push(handler_id);
      }
    }

    let mut added = Vec::new();
    for &handler_id in add {
      match self
        .store()
        .assign(claim_id, handler_id, false)
        .await
        .map_err(store_err)?
      {
        AssignOutcome::Created(_) => added.push(handler_id),
        AssignOutcome::Duplicate => {}
      }
    }

    if !removed.is_empty() {
      self
        .store()
        .append(NewAuditEntry::new(
          claim_id,
          AuditKind::HandlerRemoved,
          actor_id,
          format!("removed handlers: {}", id_list(&removed)),
        ))
        .await
        .map_err(store_err)?;
    }

    if !added.is_empty() {
      self
        .store()
        .append(NewAuditEntry::new(
          claim_id,
          AuditKind::HandlerAdded,
          actor_id,
          format!("added handlers: {}", id_list(&added)),
        ))
        .await
        .map_err(store_err)?;
    }

    let mut current = claim;
    if !added.is_empty() && current.status == ClaimStatus::Pending {
      current = self
        .transition(&current, ClaimStatus::InReview, actor_id, "team assigned")
        .await?;
    }

    let remaining = self
      .store()
      .assignment_count(claim_id)
      .await
      .map_err(store_err)?;
    if remaining == 0 && current.status != ClaimStatus::Pending {
      current = self
        .transition(
          &current,
          ClaimStatus::Pending,
          actor_id,
          "no handlers remain assigned",
        )
        .await?;
    }

    tracing::info!(
      %claim_id,
      added = added.len(),
      removed = removed.len(),
      remaining,
      "team updated"
    );

    Ok(current)
  }

  /// Add one handler to an `InReview` claim's team.
  ///
  /// Stricter than the bulk path: the acting handler must itself be on the
  /// team, and the newcomer must belong to the claim's area.
  pub async fn add_team_member(
    &self,
    claim_id: Uuid,
    actor_id: Uuid,
    handler_id: Uuid,
  ) -> Result<Claim> {
    let claim = self.team_gate(claim_id, actor_id).await?;

    if !self
      .store()
      .handler_exists(handler_id)
      .await
      .map_err(store_err)?
    {
      return Err(Error::HandlerNotFound(handler_id));
    }

    if !self
      .store()
      .handler_in_area(handler_id, claim.area_id)
      .await
      .map_err(store_err)?
    {
      return Err(Error::HandlerOutsideArea {
        handler_id,
        area_id: claim.area_id,
      });
    }

    match self
      .store()
      .assign(claim_id, handler_id, false)
      .await
      .map_err(store_err)?
    {
      AssignOutcome::Created(_) => {}
      AssignOutcome::Duplicate => {
        return Err(Error::AlreadyAssigned { claim_id, handler_id });
      }
    }

    self
      .store()
      .append(NewAuditEntry::new(
        claim_id,
        AuditKind::HandlerAdded,
        actor_id,
        format!("added handler {handler_id}"),
      ))
      .await
      .map_err(store_err)?;

    tracing::info!(%claim_id, %handler_id, "handler added");
    Ok(claim)
  }

  /// Remove one handler from an `InReview` claim's team.
  ///
  /// Rejects removing the last handler; the bulk path is the only one that
  /// tolerates an empty team (by demoting the claim).
  pub async fn remove_team_member(
    &self,
    claim_id: Uuid,
    actor_id: Uuid,
    handler_id: Uuid,
  ) -> Result<Claim> {
    let claim = self.team_gate(claim_id, actor_id).await?;

    let assigned = self.assigned_ids(claim_id).await?;
    if !assigned.contains(&handler_id) {
      return Err(Error::HandlerNotAssigned { claim_id, handler_id });
    }
    if assigned.len() <= 1 {
      return Err(Error::LastHandler { claim_id });
    }

    self
      .store()
      .unassign(claim_id, handler_id)
      .await
      .map_err(store_err)?;

    self
      .store()
      .append(NewAuditEntry::new(
        claim_id,
        AuditKind::HandlerRemoved,
        actor_id,
        format!("removed handler {handler_id}"),
      ))
      .await
      .map_err(store_err)?;

    tracing::info!(%claim_id, %handler_id, "handler removed");
    Ok(claim)
  }

  /// Shared gate for the single-id operations: the claim must be under
  /// review and the actor must be on its team.
  async fn team_gate(&self, claim_id: Uuid, actor_id: Uuid) -> Result<Claim> {
    let claim = self.load_claim(claim_id).await?;

    if claim.status != ClaimStatus::InReview {
      return Err(Error::ClaimNotUnderReview { claim_id, status: claim.status });
    }

    let assigned = self.assigned_ids(claim_id).await?;
    if !assigned.contains(&actor_id) {
      return Err(Error::Forbidden {
        actor_id,
        claim_id,
        action: "manage the team",
      });
    }

    Ok(claim)
  }
}
