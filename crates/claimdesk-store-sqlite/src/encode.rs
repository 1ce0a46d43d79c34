//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Enum discriminants use
//! the strum representation declared on the core types. Audit metadata is
//! stored as compact JSON. UUIDs are stored as hyphenated lowercase strings.

use std::str::FromStr as _;

use chrono::{DateTime, Utc};
use claimdesk_core::{
  assignment::Assignment,
  audit::{AuditEntry, AuditKind},
  claim::{Claim, ClaimStatus, Priority},
};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enum discriminants ──────────────────────────────────────────────────────

pub fn encode_status(s: ClaimStatus) -> &'static str { s.into() }

pub fn decode_status(s: &str) -> Result<ClaimStatus> {
  ClaimStatus::from_str(s).map_err(|_| Error::Decode {
    column: "status",
    value:  s.to_owned(),
  })
}

pub fn encode_priority(p: Priority) -> &'static str { p.into() }

pub fn decode_priority(s: &str) -> Result<Priority> {
  Priority::from_str(s).map_err(|_| Error::Decode {
    column: "priority",
    value:  s.to_owned(),
  })
}

pub fn encode_kind(k: AuditKind) -> &'static str { k.into() }

pub fn decode_kind(s: &str) -> Result<AuditKind> {
  AuditKind::from_str(s).map_err(|_| Error::Decode {
    column: "kind",
    value:  s.to_owned(),
  })
}

// ─── Audit metadata ──────────────────────────────────────────────────────────

pub fn encode_metadata(m: &Option<Map<String, Value>>) -> Result<Option<String>> {
  m.as_ref().map(|m| Ok(serde_json::to_string(m)?)).transpose()
}

pub fn decode_metadata(s: Option<&str>) -> Result<Option<Map<String, Value>>> {
  s.map(serde_json::from_str).transpose().map_err(Error::Json)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `claims` row.
pub struct RawClaim {
  pub claim_id:      String,
  pub title:         String,
  pub description:   String,
  pub priority:      String,
  pub critical:      bool,
  pub status:        String,
  pub client_id:     String,
  pub project_id:    String,
  pub claim_type_id: String,
  pub area_id:       String,
  pub deleted_at:    Option<String>,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawClaim {
  pub fn into_claim(self) -> Result<Claim> {
    Ok(Claim {
      claim_id:      decode_uuid(&self.claim_id)?,
      title:         self.title,
      description:   self.description,
      priority:      decode_priority(&self.priority)?,
      critical:      self.critical,
      status:        decode_status(&self.status)?,
      client_id:     decode_uuid(&self.client_id)?,
      project_id:    decode_uuid(&self.project_id)?,
      claim_type_id: decode_uuid(&self.claim_type_id)?,
      area_id:       decode_uuid(&self.area_id)?,
      deleted_at:    self.deleted_at.as_deref().map(decode_dt).transpose()?,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from an `assignments` row.
pub struct RawAssignment {
  pub claim_id:    String,
  pub handler_id:  String,
  pub principal:   bool,
  pub assigned_at: String,
}

impl RawAssignment {
  pub fn into_assignment(self) -> Result<Assignment> {
    Ok(Assignment {
      claim_id:    decode_uuid(&self.claim_id)?,
      handler_id:  decode_uuid(&self.handler_id)?,
      principal:   self.principal,
      assigned_at: decode_dt(&self.assigned_at)?,
    })
  }
}

/// Raw strings read directly from an `audit_log` row.
pub struct RawAuditEntry {
  pub entry_id:    String,
  pub claim_id:    String,
  pub kind:        String,
  pub detail:      String,
  pub actor_id:    String,
  pub recorded_at: String,
  pub metadata:    Option<String>,
}

impl RawAuditEntry {
  pub fn into_entry(self) -> Result<AuditEntry> {
    Ok(AuditEntry {
      entry_id:    decode_uuid(&self.entry_id)?,
      claim_id:    decode_uuid(&self.claim_id)?,
      kind:        decode_kind(&self.kind)?,
      detail:      self.detail,
      actor_id:    decode_uuid(&self.actor_id)?,
      recorded_at: decode_dt(&self.recorded_at)?,
      metadata:    decode_metadata(self.metadata.as_deref())?,
    })
  }
}
