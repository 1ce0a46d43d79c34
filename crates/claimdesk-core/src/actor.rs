//! Actors and roles.
//!
//! The surrounding identity layer hands the engine free-form role strings.
//! They are normalized into the closed [`Role`] enum once, at ingestion —
//! never compared inline inside the engine. Parsing is case-insensitive and
//! accepts the upstream system's Spanish role names as aliases.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The closed set of roles the engine reasons about.
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
pub enum Role {
  /// A customer; may only act on claims they own.
  #[strum(to_string = "client", serialize = "cliente")]
  Client,
  /// Staff eligible for assignment within their area(s).
  #[strum(to_string = "handler", serialize = "encargado")]
  Handler,
  /// Staff with unrestricted access across all claims and areas.
  #[strum(
    to_string = "manager",
    serialize = "gerente",
    serialize = "admin",
    serialize = "administrador"
  )]
  Manager,
}

/// A resolved identity: who is acting, and as what.
///
/// Supplied per call by the identity collaborator; the engine trusts it and
/// never re-authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub actor_id: Uuid,
  pub role:     Role,
}

impl Actor {
  pub fn new(actor_id: Uuid, role: Role) -> Self { Self { actor_id, role } }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr as _;

  use super::*;

  #[test]
  fn role_parses_english_and_spanish_aliases() {
    assert_eq!(Role::from_str("client").unwrap(), Role::Client);
    assert_eq!(Role::from_str("CLIENTE").unwrap(), Role::Client);
    assert_eq!(Role::from_str("Encargado").unwrap(), Role::Handler);
    assert_eq!(Role::from_str("handler").unwrap(), Role::Handler);
    assert_eq!(Role::from_str("manager").unwrap(), Role::Manager);
    assert_eq!(Role::from_str("GERENTE").unwrap(), Role::Manager);
    assert_eq!(Role::from_str("admin").unwrap(), Role::Manager);
  }

  #[test]
  fn role_displays_normalized_name() {
    assert_eq!(Role::Client.to_string(), "client");
    assert_eq!(Role::Handler.to_string(), "handler");
    assert_eq!(Role::Manager.to_string(), "manager");
  }

  #[test]
  fn unknown_role_is_rejected() {
    assert!(Role::from_str("intern").is_err());
    assert!(Role::from_str("").is_err());
  }
}
