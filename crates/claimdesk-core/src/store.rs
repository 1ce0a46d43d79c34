//! The store traits and supporting query types.
//!
//! Implemented by storage backends (e.g. `claimdesk-store-sqlite`). The
//! engines depend on these abstractions, not on any concrete backend. No
//! business validation happens behind them; they are thin persistence
//! boundaries the engines call after validating.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes. Backend errors convert into the shared
//! taxonomy via the `Into<Error>` bound on the associated error type.

use std::future::Future;

use uuid::Uuid;

use crate::{
  assignment::{AssignOutcome, Assignment},
  audit::{AuditEntry, NewAuditEntry},
  claim::{Claim, ClaimPatch, ClaimStatus, NewClaim, Priority},
  error::Error,
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Filters and paging for [`ClaimStore::list_claims`].
#[derive(Debug, Clone, Default)]
pub struct ClaimQuery {
  pub status:          Option<ClaimStatus>,
  pub priority:        Option<Priority>,
  pub critical:        Option<bool>,
  pub claim_type_id:   Option<Uuid>,
  /// Free-text filter over title and description.
  pub text:            Option<String>,
  /// Restrict to claims owned by this client.
  pub client_id:       Option<Uuid>,
  /// Restrict to claims in any of these areas. Empty = no restriction.
  pub area_ids:        Vec<Uuid>,
  /// Soft-deleted claims are excluded unless set.
  pub include_deleted: bool,
  pub limit:           Option<usize>,
  pub offset:          Option<usize>,
}

/// One page of results plus the total match count across all pages.
#[derive(Debug, Clone)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub total: u64,
}

// ─── Claim store ─────────────────────────────────────────────────────────────

/// Persistence boundary for claim records.
pub trait ClaimStore: Send + Sync {
  type Error: std::error::Error + Into<Error> + Send + Sync + 'static;

  /// Create a claim with status forced to [`ClaimStatus::Pending`], the area
  /// copied from the owning project, and server-assigned id and timestamps.
  fn create_claim(
    &self,
    input: NewClaim,
    client_id: Uuid,
    area_id: Uuid,
  ) -> impl Future<Output = Result<Claim, Self::Error>> + Send + '_;

  /// Retrieve a claim by id. Returns `None` if not found. Soft-deleted
  /// claims are still returned; callers check [`Claim::is_deleted`].
  fn get_claim(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Claim>, Self::Error>> + Send + '_;

  /// Patch non-sensitive fields and bump `updated_at`. Returns the updated
  /// claim, or `None` if it does not exist.
  fn update_claim(
    &self,
    id: Uuid,
    patch: ClaimPatch,
  ) -> impl Future<Output = Result<Option<Claim>, Self::Error>> + Send + '_;

  /// Move a claim to a new area. Also resets status to
  /// [`ClaimStatus::Pending`]; assignment cleanup is the engine's job.
  fn set_area(
    &self,
    id: Uuid,
    area_id: Uuid,
  ) -> impl Future<Output = Result<Option<Claim>, Self::Error>> + Send + '_;

  /// Overwrite the status field. Last-writer-wins; legality is validated by
  /// the engine before calling.
  fn set_status(
    &self,
    id: Uuid,
    status: ClaimStatus,
  ) -> impl Future<Output = Result<Option<Claim>, Self::Error>> + Send + '_;

  /// Mark a claim deleted. Reversible; never a hard delete. Returns `false`
  /// if the claim does not exist.
  fn soft_delete(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Clear the soft-delete marker. Returns `false` if the claim does not
  /// exist.
  fn restore(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// List claims matching `query`, newest first, with a total count. A
  /// `None` limit returns every match; callers wanting pages set one.
  fn list_claims<'a>(
    &'a self,
    query: &'a ClaimQuery,
  ) -> impl Future<Output = Result<Page<Claim>, Self::Error>> + Send + 'a;
}

// ─── Assignment store ────────────────────────────────────────────────────────

/// Persistence boundary for the claim-handler relation.
///
/// The `(claim_id, handler_id)` uniqueness constraint must be enforced
/// atomically by the backend; a duplicate insert surfaces as
/// [`AssignOutcome::Duplicate`], never as a backend error.
pub trait AssignmentStore: Send + Sync {
  type Error: std::error::Error + Into<Error> + Send + Sync + 'static;

  fn assign(
    &self,
    claim_id: Uuid,
    handler_id: Uuid,
    principal: bool,
  ) -> impl Future<Output = Result<AssignOutcome, Self::Error>> + Send + '_;

  /// Remove one assignment. Returns `false` if it did not exist.
  fn unassign(
    &self,
    claim_id: Uuid,
    handler_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// All assignments for a claim, in assignment order.
  fn assigned_handlers(
    &self,
    claim_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Assignment>, Self::Error>> + Send + '_;

  fn assignment_count(
    &self,
    claim_id: Uuid,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Remove every assignment for a claim, returning how many were removed.
  /// Used by area reassignment.
  fn clear_assignments(
    &self,
    claim_id: Uuid,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}

// ─── Audit log ───────────────────────────────────────────────────────────────

/// Append-only sink for audit entries.
///
/// Appends are awaited before an engine operation reports success: the trail
/// is a correctness requirement, not best-effort.
pub trait AuditLog: Send + Sync {
  type Error: std::error::Error + Into<Error> + Send + Sync + 'static;

  /// Append one entry with server-assigned id and timestamp.
  fn append(
    &self,
    input: NewAuditEntry,
  ) -> impl Future<Output = Result<AuditEntry, Self::Error>> + Send + '_;

  /// The full trail for a claim, most recent first. Same-instant entries
  /// come back in reverse insertion order.
  fn history(
    &self,
    claim_id: Uuid,
  ) -> impl Future<Output = Result<Vec<AuditEntry>, Self::Error>> + Send + '_;
}

// ─── Handler directory ───────────────────────────────────────────────────────

/// The user/area collaborator, consumed as synchronous existence and
/// membership checks. Production deployments may back this with an external
/// directory; the SQLite backend carries its own tables so tests are real.
pub trait HandlerDirectory: Send + Sync {
  type Error: std::error::Error + Into<Error> + Send + Sync + 'static;

  fn handler_exists(
    &self,
    handler_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn handler_in_area(
    &self,
    handler_id: Uuid,
    area_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
