//! Error taxonomy for the claim engine.
//!
//! Every rejection distinguishes "not found" from "not allowed" from "not a
//! legal transition". [`Error::kind`] exposes that split so outer layers can
//! map rejections to their transport (HTTP status, CLI exit code) without
//! string-matching messages. `Forbidden` is never downgraded to a not-found
//! and vice versa.

use thiserror::Error;
use uuid::Uuid;

use crate::claim::ClaimStatus;

/// Minimum length of the resolution note required to close a claim.
pub const MIN_RESOLUTION_NOTE_LEN: usize = 10;

/// Coarse classification of an [`Error`], mirroring the four rejection
/// classes callers care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// A referenced claim, handler, or assignment does not exist.
  NotFound,
  /// The actor lacks permission for this action on this claim.
  Forbidden,
  /// A state-machine or validation rule was violated. Never retried.
  BadRequest,
  /// A storage failure. Fatal at this layer; propagated unchanged.
  Storage,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("claim not found: {0}")]
  ClaimNotFound(Uuid),

  #[error("handler not found: {0}")]
  HandlerNotFound(Uuid),

  #[error("handler {handler_id} is not assigned to claim {claim_id}")]
  HandlerNotAssigned { claim_id: Uuid, handler_id: Uuid },

  #[error("actor {actor_id} is not allowed to {action} on claim {claim_id}")]
  Forbidden {
    actor_id: Uuid,
    claim_id: Uuid,
    action:   &'static str,
  },

  #[error("claim {claim_id} is closed ({status}); no further changes allowed")]
  ClaimClosed { claim_id: Uuid, status: ClaimStatus },

  #[error("claim {claim_id} cannot be self-assigned while {status}")]
  ClaimNotClaimable { claim_id: Uuid, status: ClaimStatus },

  #[error("claim {claim_id} is not under review (currently {status})")]
  ClaimNotUnderReview { claim_id: Uuid, status: ClaimStatus },

  #[error("handler {handler_id} is already assigned to claim {claim_id}")]
  AlreadyAssigned { claim_id: Uuid, handler_id: Uuid },

  #[error(
    "a resolution note of at least {min} characters is required to close a claim"
  )]
  MissingResolutionNote { min: usize },

  #[error("illegal claim state transition: {from} -> {to}")]
  IllegalTransition { from: ClaimStatus, to: ClaimStatus },

  #[error("claim {claim_id} must keep at least one handler assigned")]
  LastHandler { claim_id: Uuid },

  #[error("handler {handler_id} does not belong to area {area_id}")]
  HandlerOutsideArea { handler_id: Uuid, area_id: Uuid },

  #[error("a comment must not be empty")]
  EmptyComment,

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Classify this error for transport mapping.
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::ClaimNotFound(_)
      | Self::HandlerNotFound(_)
      | Self::HandlerNotAssigned { .. } => ErrorKind::NotFound,
      Self::Forbidden { .. } => ErrorKind::Forbidden,
      Self::ClaimClosed { .. }
      | Self::ClaimNotClaimable { .. }
      | Self::ClaimNotUnderReview { .. }
      | Self::AlreadyAssigned { .. }
      | Self::MissingResolutionNote { .. }
      | Self::IllegalTransition { .. }
      | Self::LastHandler { .. }
      | Self::HandlerOutsideArea { .. }
      | Self::EmptyComment => ErrorKind::BadRequest,
      Self::Storage(_) => ErrorKind::Storage,
    }
  }

  /// Wrap a backend error as a fatal storage failure.
  pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Storage(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
