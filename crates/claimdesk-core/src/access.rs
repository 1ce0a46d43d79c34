//! The permission evaluator — pure decision functions, no I/O.
//!
//! Used uniformly by every permission-gated feature (comments, state
//! changes, team management). Unknown combinations fail closed. Callers must
//! surface a failed check as an authorization error, never as a not-found;
//! [`check_access`] raises [`Error::Forbidden`] for that reason instead of
//! returning a silent `false`.

use uuid::Uuid;

use crate::{
  actor::{Actor, Role},
  claim::Claim,
  error::{Error, Result},
};

/// Whether `actor_id`, acting as `role`, may act on `claim`.
///
/// - A manager always passes.
/// - A handler passes only if currently assigned to the claim.
/// - A client passes only if they own the claim.
pub fn can_access(
  role: Role,
  actor_id: Uuid,
  claim: &Claim,
  assigned_handler_ids: &[Uuid],
) -> bool {
  match role {
    Role::Manager => true,
    Role::Handler => assigned_handler_ids.contains(&actor_id),
    Role::Client => actor_id == claim.client_id,
  }
}

/// [`can_access`], raising [`Error::Forbidden`] on failure.
///
/// `action` names the attempted operation and ends up in the error message.
pub fn check_access(
  actor: &Actor,
  claim: &Claim,
  assigned_handler_ids: &[Uuid],
  action: &'static str,
) -> Result<()> {
  if can_access(actor.role, actor.actor_id, claim, assigned_handler_ids) {
    Ok(())
  } else {
    Err(Error::Forbidden {
      actor_id: actor.actor_id,
      claim_id: claim.claim_id,
      action,
    })
  }
}
