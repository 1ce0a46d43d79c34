//! [`SqliteStore`] — the SQLite implementation of the store traits.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use claimdesk_core::{
  assignment::{AssignOutcome, Assignment},
  audit::{AuditEntry, NewAuditEntry},
  claim::{Claim, ClaimPatch, ClaimStatus, NewClaim},
  store::{AssignmentStore, AuditLog, ClaimQuery, ClaimStore, HandlerDirectory, Page},
};

use crate::{
  encode::{
    RawAssignment, RawAuditEntry, RawClaim, encode_dt, encode_kind,
    encode_metadata, encode_priority, encode_status, encode_uuid,
  },
  schema::SCHEMA,
  Error, Result,
};

const CLAIM_COLUMNS: &str = "claim_id, title, description, priority, critical, \
   status, client_id, project_id, claim_type_id, area_id, deleted_at, \
   created_at, updated_at";

fn raw_claim(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawClaim> {
  Ok(RawClaim {
    claim_id:      row.get(0)?,
    title:         row.get(1)?,
    description:   row.get(2)?,
    priority:      row.get(3)?,
    critical:      row.get(4)?,
    status:        row.get(5)?,
    client_id:     row.get(6)?,
    project_id:    row.get(7)?,
    claim_type_id: row.get(8)?,
    area_id:       row.get(9)?,
    deleted_at:    row.get(10)?,
    created_at:    row.get(11)?,
    updated_at:    row.get(12)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A claimdesk store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Handler directory registration ────────────────────────────────────────

  /// Register a handler in the local directory and return its id.
  pub async fn register_handler(&self, display_name: &str) -> Result<Uuid> {
    let handler_id = Uuid::new_v4();
    let id_str     = encode_uuid(handler_id);
    let at_str     = encode_dt(Utc::now());
    let name       = display_name.to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO handlers (handler_id, display_name, created_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, name, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(handler_id)
  }

  /// Record that a handler belongs to an area. Idempotent.
  pub async fn grant_area(&self, handler_id: Uuid, area_id: Uuid) -> Result<()> {
    let handler_str = encode_uuid(handler_id);
    let area_str    = encode_uuid(area_id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO handler_areas (handler_id, area_id)
           VALUES (?1, ?2)",
          rusqlite::params![handler_str, area_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(())
  }

  /// Re-fetch a claim after an UPDATE; `None` if the UPDATE matched no row.
  async fn claim_if_updated(&self, id: Uuid, rows: usize) -> Result<Option<Claim>> {
    if rows == 0 {
      return Ok(None);
    }
    self.get_claim(id).await
  }
}

// ─── ClaimStore impl ─────────────────────────────────────────────────────────

impl ClaimStore for SqliteStore {
  type Error = Error;

  async fn create_claim(
    &self,
    input: NewClaim,
    client_id: Uuid,
    area_id: Uuid,
  ) -> Result<Claim> {
    let now = Utc::now();
    let claim = Claim {
      claim_id: Uuid::new_v4(),
      title: input.title,
      description: input.description,
      priority: input.priority,
      critical: input.critical,
      // Status is forced by the store; callers cannot create a claim
      // anywhere else in the state machine.
      status: ClaimStatus::Pending,
      client_id,
      project_id: input.project_id,
      claim_type_id: input.claim_type_id,
      area_id,
      deleted_at: None,
      created_at: now,
      updated_at: now,
    };

    let id_str       = encode_uuid(claim.claim_id);
    let title        = claim.title.clone();
    let description  = claim.description.clone();
    let priority_str = encode_priority(claim.priority).to_owned();
    let critical     = claim.critical;
    let status_str   = encode_status(claim.status).to_owned();
    let client_str   = encode_uuid(claim.client_id);
    let project_str  = encode_uuid(claim.project_id);
    let type_str     = encode_uuid(claim.claim_type_id);
    let area_str     = encode_uuid(claim.area_id);
    let at_str       = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO claims (
             claim_id, title, description, priority, critical, status,
             client_id, project_id, claim_type_id, area_id, deleted_at,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, NULL, ?11, ?11)",
          rusqlite::params![
            id_str,
            title,
            description,
            priority_str,
            critical,
            status_str,
            client_str,
            project_str,
            type_str,
            area_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(claim)
  }

  async fn get_claim(&self, id: Uuid) -> Result<Option<Claim>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawClaim> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {CLAIM_COLUMNS} FROM claims WHERE claim_id = ?1"),
              rusqlite::params![id_str],
              raw_claim,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawClaim::into_claim).transpose()
  }

  async fn update_claim(
    &self,
    id: Uuid,
    patch: ClaimPatch,
  ) -> Result<Option<Claim>> {
    let Some(mut claim) = self.get_claim(id).await? else {
      return Ok(None);
    };

    if let Some(title) = patch.title {
      claim.title = title;
    }
    if let Some(description) = patch.description {
      claim.description = description;
    }
    if let Some(priority) = patch.priority {
      claim.priority = priority;
    }
    if let Some(critical) = patch.critical {
      claim.critical = critical;
    }
    if let Some(claim_type_id) = patch.claim_type_id {
      claim.claim_type_id = claim_type_id;
    }
    claim.updated_at = Utc::now();

    let id_str       = encode_uuid(id);
    let title        = claim.title.clone();
    let description  = claim.description.clone();
    let priority_str = encode_priority(claim.priority).to_owned();
    let critical     = claim.critical;
    let type_str     = encode_uuid(claim.claim_type_id);
    let at_str       = encode_dt(claim.updated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE claims
           SET title = ?2, description = ?3, priority = ?4, critical = ?5,
               claim_type_id = ?6, updated_at = ?7
           WHERE claim_id = ?1",
          rusqlite::params![
            id_str,
            title,
            description,
            priority_str,
            critical,
            type_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(Some(claim))
  }

  async fn set_area(&self, id: Uuid, area_id: Uuid) -> Result<Option<Claim>> {
    let id_str     = encode_uuid(id);
    let area_str   = encode_uuid(area_id);
    let status_str = encode_status(ClaimStatus::Pending).to_owned();
    let at_str     = encode_dt(Utc::now());

    let rows = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE claims SET area_id = ?2, status = ?3, updated_at = ?4
           WHERE claim_id = ?1",
          rusqlite::params![id_str, area_str, status_str, at_str],
        )?)
      })
      .await?;

    self.claim_if_updated(id, rows).await
  }

  async fn set_status(
    &self,
    id: Uuid,
    status: ClaimStatus,
  ) -> Result<Option<Claim>> {
    let id_str     = encode_uuid(id);
    let status_str = encode_status(status).to_owned();
    let at_str     = encode_dt(Utc::now());

    let rows = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE claims SET status = ?2, updated_at = ?3 WHERE claim_id = ?1",
          rusqlite::params![id_str, status_str, at_str],
        )?)
      })
      .await?;

    self.claim_if_updated(id, rows).await
  }

  async fn soft_delete(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());

    let rows = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE claims SET deleted_at = ?2, updated_at = ?2
           WHERE claim_id = ?1",
          rusqlite::params![id_str, at_str],
        )?)
      })
      .await?;

    Ok(rows > 0)
  }

  async fn restore(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());

    let rows = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE claims SET deleted_at = NULL, updated_at = ?2
           WHERE claim_id = ?1",
          rusqlite::params![id_str, at_str],
        )?)
      })
      .await?;

    Ok(rows > 0)
  }

  async fn list_claims(&self, query: &ClaimQuery) -> Result<Page<Claim>> {
    use rusqlite::types::Value;

    // Owned copies for the 'static closure.
    let status_str   = query.status.map(|s| encode_status(s).to_owned());
    let priority_str = query.priority.map(|p| encode_priority(p).to_owned());
    let critical     = query.critical;
    let type_str     = query.claim_type_id.map(encode_uuid);
    let text_pattern = query.text.as_deref().map(|t| format!("%{t}%"));
    let client_str   = query.client_id.map(encode_uuid);
    let area_strs: Vec<String> =
      query.area_ids.iter().copied().map(encode_uuid).collect();
    let include_deleted = query.include_deleted;
    // LIMIT -1 is SQLite's "no limit".
    let limit_val       = query.limit.map_or(-1, |l| l as i64);
    let offset_val      = query.offset.unwrap_or(0) as i64;

    let (total, raws): (i64, Vec<RawClaim>) = self
      .conn
      .call(move |conn| {
        // Build WHERE clause dynamically; values bind positionally.
        let mut conds: Vec<String> = vec![];
        let mut values: Vec<Value> = vec![];

        if let Some(s) = status_str {
          conds.push("status = ?".into());
          values.push(Value::Text(s));
        }
        if let Some(p) = priority_str {
          conds.push("priority = ?".into());
          values.push(Value::Text(p));
        }
        if let Some(c) = critical {
          conds.push("critical = ?".into());
          values.push(Value::Integer(c as i64));
        }
        if let Some(t) = type_str {
          conds.push("claim_type_id = ?".into());
          values.push(Value::Text(t));
        }
        if let Some(pat) = text_pattern {
          conds.push("(title LIKE ? OR description LIKE ?)".into());
          values.push(Value::Text(pat.clone()));
          values.push(Value::Text(pat));
        }
        if let Some(c) = client_str {
          conds.push("client_id = ?".into());
          values.push(Value::Text(c));
        }
        if !area_strs.is_empty() {
          let marks = vec!["?"; area_strs.len()].join(", ");
          conds.push(format!("area_id IN ({marks})"));
          values.extend(area_strs.into_iter().map(Value::Text));
        }
        if !include_deleted {
          conds.push("deleted_at IS NULL".into());
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM claims {where_clause}");
        let total: i64 = conn.query_row(
          &count_sql,
          rusqlite::params_from_iter(values.iter()),
          |row| row.get(0),
        )?;

        let page_sql = format!(
          "SELECT {CLAIM_COLUMNS} FROM claims {where_clause}
           ORDER BY created_at DESC, rowid DESC
           LIMIT ? OFFSET ?"
        );
        values.push(Value::Integer(limit_val));
        values.push(Value::Integer(offset_val));

        let mut stmt = conn.prepare(&page_sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(values.iter()), raw_claim)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((total, rows))
      })
      .await?;

    let items = raws
      .into_iter()
      .map(RawClaim::into_claim)
      .collect::<Result<Vec<_>>>()?;

    Ok(Page { items, total: total as u64 })
  }
}

// ─── AssignmentStore impl ────────────────────────────────────────────────────

impl AssignmentStore for SqliteStore {
  type Error = Error;

  async fn assign(
    &self,
    claim_id: Uuid,
    handler_id: Uuid,
    principal: bool,
  ) -> Result<AssignOutcome> {
    let assignment = Assignment {
      claim_id,
      handler_id,
      principal,
      assigned_at: Utc::now(),
    };

    let claim_str   = encode_uuid(claim_id);
    let handler_str = encode_uuid(handler_id);
    let at_str      = encode_dt(assignment.assigned_at);

    let created: bool = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "INSERT INTO assignments (claim_id, handler_id, principal, assigned_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![claim_str, handler_str, principal, at_str],
        );
        match result {
          Ok(_) => Ok(true),
          // The UNIQUE (claim_id, handler_id) index fired: a concurrent
          // assign already won. Surface as a typed outcome. Other
          // constraint failures (foreign keys included) stay errors.
          Err(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
          {
            Ok(false)
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if created {
      Ok(AssignOutcome::Created(assignment))
    } else {
      Ok(AssignOutcome::Duplicate)
    }
  }

  async fn unassign(&self, claim_id: Uuid, handler_id: Uuid) -> Result<bool> {
    let claim_str   = encode_uuid(claim_id);
    let handler_str = encode_uuid(handler_id);

    let rows = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM assignments WHERE claim_id = ?1 AND handler_id = ?2",
          rusqlite::params![claim_str, handler_str],
        )?)
      })
      .await?;

    Ok(rows > 0)
  }

  async fn assigned_handlers(&self, claim_id: Uuid) -> Result<Vec<Assignment>> {
    let claim_str = encode_uuid(claim_id);

    let raws: Vec<RawAssignment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT claim_id, handler_id, principal, assigned_at
           FROM assignments WHERE claim_id = ?1
           ORDER BY assigned_at, rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![claim_str], |row| {
            Ok(RawAssignment {
              claim_id:    row.get(0)?,
              handler_id:  row.get(1)?,
              principal:   row.get(2)?,
              assigned_at: row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAssignment::into_assignment).collect()
  }

  async fn assignment_count(&self, claim_id: Uuid) -> Result<usize> {
    let claim_str = encode_uuid(claim_id);

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM assignments WHERE claim_id = ?1",
          rusqlite::params![claim_str],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(count as usize)
  }

  async fn clear_assignments(&self, claim_id: Uuid) -> Result<usize> {
    let claim_str = encode_uuid(claim_id);

    let rows = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM assignments WHERE claim_id = ?1",
          rusqlite::params![claim_str],
        )?)
      })
      .await?;

    Ok(rows)
  }
}

// ─── AuditLog impl ───────────────────────────────────────────────────────────

impl AuditLog for SqliteStore {
  type Error = Error;

  async fn append(&self, input: NewAuditEntry) -> Result<AuditEntry> {
    let entry = AuditEntry {
      entry_id:    Uuid::new_v4(),
      claim_id:    input.claim_id,
      kind:        input.kind,
      detail:      input.detail,
      actor_id:    input.actor_id,
      recorded_at: Utc::now(),
      metadata:    input.metadata,
    };

    let entry_str    = encode_uuid(entry.entry_id);
    let claim_str    = encode_uuid(entry.claim_id);
    let kind_str     = encode_kind(entry.kind).to_owned();
    let detail       = entry.detail.clone();
    let actor_str    = encode_uuid(entry.actor_id);
    let at_str       = encode_dt(entry.recorded_at);
    let metadata_str = encode_metadata(&entry.metadata)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO audit_log (
             entry_id, claim_id, kind, detail, actor_id, recorded_at, metadata
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            entry_str,
            claim_str,
            kind_str,
            detail,
            actor_str,
            at_str,
            metadata_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(entry)
  }

  async fn history(&self, claim_id: Uuid) -> Result<Vec<AuditEntry>> {
    let claim_str = encode_uuid(claim_id);

    let raws: Vec<RawAuditEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT entry_id, claim_id, kind, detail, actor_id, recorded_at, metadata
           FROM audit_log WHERE claim_id = ?1
           ORDER BY recorded_at DESC, rowid DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![claim_str], |row| {
            Ok(RawAuditEntry {
              entry_id:    row.get(0)?,
              claim_id:    row.get(1)?,
              kind:        row.get(2)?,
              detail:      row.get(3)?,
              actor_id:    row.get(4)?,
              recorded_at: row.get(5)?,
              metadata:    row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAuditEntry::into_entry).collect()
  }
}

// ─── HandlerDirectory impl ───────────────────────────────────────────────────

impl HandlerDirectory for SqliteStore {
  type Error = Error;

  async fn handler_exists(&self, handler_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(handler_id);

    let exists: bool = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM handlers WHERE handler_id = ?1",
              rusqlite::params![id_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;

    Ok(exists)
  }

  async fn handler_in_area(&self, handler_id: Uuid, area_id: Uuid) -> Result<bool> {
    let handler_str = encode_uuid(handler_id);
    let area_str    = encode_uuid(area_id);

    let member: bool = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM handler_areas WHERE handler_id = ?1 AND area_id = ?2",
              rusqlite::params![handler_str, area_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;

    Ok(member)
  }
}
