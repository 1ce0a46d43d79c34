//! Integration tests for the engine against the in-memory SQLite backend.

use claimdesk_core::{
  Error, ErrorKind,
  actor::{Actor, Role},
  audit::AuditKind,
  claim::{Claim, ClaimStatus, NewClaim, Priority},
  store::{AssignmentStore as _, ClaimStore as _},
};
use claimdesk_engine::{Engine, MIN_RESOLUTION_NOTE_LEN};
use claimdesk_store_sqlite::SqliteStore;
use uuid::Uuid;

async fn engine() -> Engine<SqliteStore> {
  Engine::new(SqliteStore::open_in_memory().await.expect("in-memory store"))
}

fn new_claim(title: &str) -> NewClaim {
  NewClaim {
    title:         title.into(),
    description:   "something is wrong".into(),
    priority:      Priority::Medium,
    critical:      false,
    project_id:    Uuid::new_v4(),
    claim_type_id: Uuid::new_v4(),
  }
}

async fn open_claim(e: &Engine<SqliteStore>, client: Uuid, area: Uuid) -> Claim {
  e.create_claim(new_claim("no hot water"), client, area)
    .await
    .unwrap()
}

/// Register a handler in the directory and grant it `area`.
async fn area_handler(e: &Engine<SqliteStore>, area: Uuid) -> Uuid {
  let id = e.store().register_handler("handler").await.unwrap();
  e.store().grant_area(id, area).await.unwrap();
  id
}

fn manager() -> Actor { Actor::new(Uuid::new_v4(), Role::Manager) }

fn handler_actor(id: Uuid) -> Actor { Actor::new(id, Role::Handler) }

async fn kinds(e: &Engine<SqliteStore>, claim_id: Uuid) -> Vec<AuditKind> {
  e.history(claim_id)
    .await
    .unwrap()
    .into_iter()
    .map(|entry| entry.kind)
    .collect()
}

// ─── Creation ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_claim_starts_pending_and_is_audited() {
  let e = engine().await;
  let client = Uuid::new_v4();
  let claim = open_claim(&e, client, Uuid::new_v4()).await;

  assert_eq!(claim.status, ClaimStatus::Pending);
  assert_eq!(claim.client_id, client);

  let history = e.history(claim.claim_id).await.unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].kind, AuditKind::Created);
  assert_eq!(history[0].actor_id, client);
}

// ─── Self-assignment ─────────────────────────────────────────────────────────

#[tokio::test]
async fn self_assign_promotes_and_audits_twice() {
  let e = engine().await;
  let area = Uuid::new_v4();
  let claim = open_claim(&e, Uuid::new_v4(), area).await;
  let h1 = area_handler(&e, area).await;

  let updated = e.self_assign(claim.claim_id, h1).await.unwrap();
  assert_eq!(updated.status, ClaimStatus::InReview);

  let assignments = e.store().assigned_handlers(claim.claim_id).await.unwrap();
  assert_eq!(assignments.len(), 1);
  assert_eq!(assignments[0].handler_id, h1);
  assert!(assignments[0].principal);

  // most recent first: state change, then the assignment act, then creation
  let history = e.history(claim.claim_id).await.unwrap();
  assert_eq!(
    history.iter().map(|en| en.kind).collect::<Vec<_>>(),
    vec![AuditKind::StateChanged, AuditKind::SelfAssigned, AuditKind::Created]
  );
  let meta = history[0].metadata.as_ref().unwrap();
  assert_eq!(meta["previous_state"], "pending");
  assert_eq!(meta["new_state"], "in_review");
  assert_eq!(history[1].actor_id, h1);
}

#[tokio::test]
async fn self_assign_is_idempotent_for_the_same_handler() {
  let e = engine().await;
  let area = Uuid::new_v4();
  let claim = open_claim(&e, Uuid::new_v4(), area).await;
  let h1 = area_handler(&e, area).await;

  e.self_assign(claim.claim_id, h1).await.unwrap();
  let before = e.history(claim.claim_id).await.unwrap().len();

  // second call is a no-op, not an error, and writes no audit rows
  let again = e.self_assign(claim.claim_id, h1).await.unwrap();
  assert_eq!(again.status, ClaimStatus::InReview);
  assert_eq!(e.history(claim.claim_id).await.unwrap().len(), before);
  assert_eq!(e.store().assignment_count(claim.claim_id).await.unwrap(), 1);
}

#[tokio::test]
async fn self_assign_rejects_a_second_handler() {
  let e = engine().await;
  let area = Uuid::new_v4();
  let claim = open_claim(&e, Uuid::new_v4(), area).await;
  let h1 = area_handler(&e, area).await;
  let h2 = area_handler(&e, area).await;

  e.self_assign(claim.claim_id, h1).await.unwrap();
  let err = e.self_assign(claim.claim_id, h2).await.unwrap_err();
  assert!(matches!(err, Error::ClaimNotClaimable { .. }));
  assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[tokio::test]
async fn self_assign_rejects_unknown_handler_and_claim() {
  let e = engine().await;
  let claim = open_claim(&e, Uuid::new_v4(), Uuid::new_v4()).await;

  let err = e.self_assign(claim.claim_id, Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, Error::HandlerNotFound(_)));
  assert_eq!(err.kind(), ErrorKind::NotFound);

  let err = e.self_assign(Uuid::new_v4(), Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, Error::ClaimNotFound(_)));
}

// ─── State changes ───────────────────────────────────────────────────────────

async fn claim_under_review(
  e: &Engine<SqliteStore>,
  area: Uuid,
) -> (Claim, Uuid) {
  let claim = open_claim(e, Uuid::new_v4(), area).await;
  let h = area_handler(e, area).await;
  let claim = e.self_assign(claim.claim_id, h).await.unwrap();
  (claim, h)
}

#[tokio::test]
async fn change_state_resolves_with_note_and_metadata() {
  let e = engine().await;
  let (claim, _) = claim_under_review(&e, Uuid::new_v4()).await;

  let resolved = e
    .change_state(
      claim.claim_id,
      ClaimStatus::Resolved,
      Some("replaced the boiler valve"),
      &manager(),
    )
    .await
    .unwrap();
  assert_eq!(resolved.status, ClaimStatus::Resolved);

  let history = e.history(claim.claim_id).await.unwrap();
  assert_eq!(history[0].kind, AuditKind::StateChanged);
  assert_eq!(history[0].detail, "replaced the boiler valve");
  let meta = history[0].metadata.as_ref().unwrap();
  assert_eq!(meta["previous_state"], "in_review");
  assert_eq!(meta["new_state"], "resolved");
}

#[tokio::test]
async fn change_state_rejects_without_a_long_enough_note() {
  let e = engine().await;
  let (claim, _) = claim_under_review(&e, Uuid::new_v4()).await;

  for note in [None, Some(""), Some("   "), Some("too short")] {
    let err = e
      .change_state(claim.claim_id, ClaimStatus::Rejected, note, &manager())
      .await
      .unwrap_err();
    assert!(
      matches!(err, Error::MissingResolutionNote { min } if min == MIN_RESOLUTION_NOTE_LEN),
      "note {note:?} should have been rejected"
    );
  }
}

#[tokio::test]
async fn change_state_rejects_closed_claims() {
  let e = engine().await;
  let (claim, _) = claim_under_review(&e, Uuid::new_v4()).await;
  e.change_state(
    claim.claim_id,
    ClaimStatus::Rejected,
    Some("not reproducible"),
    &manager(),
  )
  .await
  .unwrap();

  let err = e
    .change_state(
      claim.claim_id,
      ClaimStatus::Resolved,
      Some("fixed after all"),
      &manager(),
    )
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::ClaimClosed { status: ClaimStatus::Rejected, .. }
  ));
}

#[tokio::test]
async fn change_state_cannot_skip_review() {
  let e = engine().await;
  let claim = open_claim(&e, Uuid::new_v4(), Uuid::new_v4()).await;

  // no direct Pending -> Resolved path, even for a manager with a note
  let err = e
    .change_state(
      claim.claim_id,
      ClaimStatus::Resolved,
      Some("closing this one early"),
      &manager(),
    )
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::IllegalTransition { from: ClaimStatus::Pending, to: ClaimStatus::Resolved }
  ));
}

#[tokio::test]
async fn change_state_cannot_target_in_review() {
  let e = engine().await;
  let (claim, _) = claim_under_review(&e, Uuid::new_v4()).await;

  // Pending -> InReview is owned by the assignment paths
  let err = e
    .change_state(claim.claim_id, ClaimStatus::InReview, None, &manager())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::IllegalTransition { .. }));
}

#[tokio::test]
async fn change_state_permissions_per_role() {
  let e = engine().await;
  let area = Uuid::new_v4();
  let (claim, assigned) = claim_under_review(&e, area).await;
  let outsider = area_handler(&e, area).await;

  // a handler not on the team is Forbidden, not NotFound
  let err = e
    .change_state(
      claim.claim_id,
      ClaimStatus::Resolved,
      Some("root cause found"),
      &handler_actor(outsider),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Forbidden { .. }));
  assert_eq!(err.kind(), ErrorKind::Forbidden);
  assert_ne!(err.kind(), ErrorKind::NotFound);

  // the owning client cannot drive transitions either
  let err = e
    .change_state(
      claim.claim_id,
      ClaimStatus::Resolved,
      Some("root cause found"),
      &Actor::new(claim.client_id, Role::Client),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Forbidden { .. }));

  // the assigned handler may close the claim
  let resolved = e
    .change_state(
      claim.claim_id,
      ClaimStatus::Resolved,
      Some("root cause found"),
      &handler_actor(assigned),
    )
    .await
    .unwrap();
  assert_eq!(resolved.status, ClaimStatus::Resolved);
}

// ─── Bulk team updates ───────────────────────────────────────────────────────

#[tokio::test]
async fn update_team_round_trip_promotes_then_demotes() {
  let e = engine().await;
  let area = Uuid::new_v4();
  let claim = open_claim(&e, Uuid::new_v4(), area).await;
  let h1 = area_handler(&e, area).await;
  let actor = manager();

  let promoted = e
    .update_team(claim.claim_id, actor.actor_id, &[h1], &[])
    .await
    .unwrap();
  assert_eq!(promoted.status, ClaimStatus::InReview);

  // removing the only handler demotes back to Pending in the same call
  let demoted = e
    .update_team(claim.claim_id, actor.actor_id, &[], &[h1])
    .await
    .unwrap();
  assert_eq!(demoted.status, ClaimStatus::Pending);
  assert_eq!(e.store().assignment_count(claim.claim_id).await.unwrap(), 0);

  assert_eq!(
    kinds(&e, claim.claim_id).await,
    vec![
      AuditKind::StateChanged,   // in_review -> pending
      AuditKind::HandlerRemoved, // batched removal
      AuditKind::StateChanged,   // pending -> in_review
      AuditKind::HandlerAdded,   // batched addition
      AuditKind::Created,
    ]
  );
}

#[tokio::test]
async fn update_team_batches_audit_entries_per_group() {
  let e = engine().await;
  let area = Uuid::new_v4();
  let claim = open_claim(&e, Uuid::new_v4(), area).await;
  let h1 = area_handler(&e, area).await;
  let h2 = area_handler(&e, area).await;

  e.update_team(claim.claim_id, manager().actor_id, &[h1, h2], &[])
    .await
    .unwrap();

  let added: Vec<_> = e
    .history(claim.claim_id)
    .await
    .unwrap()
    .into_iter()
    .filter(|en| en.kind == AuditKind::HandlerAdded)
    .collect();
  assert_eq!(added.len(), 1, "one entry per add group, not per id");
  assert!(added[0].detail.contains(&h1.to_string()));
  assert!(added[0].detail.contains(&h2.to_string()));
}

#[tokio::test]
async fn update_team_skips_duplicates_and_absent_removals() {
  let e = engine().await;
  let area = Uuid::new_v4();
  let claim = open_claim(&e, Uuid::new_v4(), area).await;
  let h1 = area_handler(&e, area).await;
  e.self_assign(claim.claim_id, h1).await.unwrap();
  let before = e.history(claim.claim_id).await.unwrap().len();

  let unchanged = e
    .update_team(claim.claim_id, manager().actor_id, &[h1], &[Uuid::new_v4()])
    .await
    .unwrap();
  assert_eq!(unchanged.status, ClaimStatus::InReview);
  assert_eq!(e.store().assignment_count(claim.claim_id).await.unwrap(), 1);
  // nothing actually changed, so nothing was audited
  assert_eq!(e.history(claim.claim_id).await.unwrap().len(), before);
}

#[tokio::test]
async fn update_team_rejects_closed_claims_and_unknown_handlers() {
  let e = engine().await;
  let area = Uuid::new_v4();
  let claim = open_claim(&e, Uuid::new_v4(), area).await;

  let err = e
    .update_team(claim.claim_id, manager().actor_id, &[Uuid::new_v4()], &[])
    .await
    .unwrap_err();
  assert!(matches!(err, Error::HandlerNotFound(_)));

  let (closed, _) = claim_under_review(&e, area).await;
  e.change_state(
    closed.claim_id,
    ClaimStatus::Resolved,
    Some("shipped the fix"),
    &manager(),
  )
  .await
  .unwrap();
  let err = e
    .update_team(closed.claim_id, manager().actor_id, &[], &[])
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ClaimClosed { .. }));
}

#[tokio::test]
async fn update_team_with_unknown_add_leaves_removals_untouched() {
  let e = engine().await;
  let area = Uuid::new_v4();
  let (claim, h1) = claim_under_review(&e, area).await;
  let before = e.history(claim.claim_id).await.unwrap().len();

  // the unknown add id must reject the whole call before any removal runs,
  // or the claim would be stranded InReview with an empty team
  let err = e
    .update_team(claim.claim_id, manager().actor_id, &[Uuid::new_v4()], &[h1])
    .await
    .unwrap_err();
  assert!(matches!(err, Error::HandlerNotFound(_)));

  let current = e.store().get_claim(claim.claim_id).await.unwrap().unwrap();
  assert_eq!(current.status, ClaimStatus::InReview);
  assert_eq!(e.store().assignment_count(claim.claim_id).await.unwrap(), 1);
  assert_eq!(e.history(claim.claim_id).await.unwrap().len(), before);
}

// ─── Single-id team operations ───────────────────────────────────────────────

#[tokio::test]
async fn add_team_member_happy_path() {
  let e = engine().await;
  let area = Uuid::new_v4();
  let (claim, h1) = claim_under_review(&e, area).await;
  let h2 = area_handler(&e, area).await;

  e.add_team_member(claim.claim_id, h1, h2).await.unwrap();
  assert_eq!(e.store().assignment_count(claim.claim_id).await.unwrap(), 2);

  let history = e.history(claim.claim_id).await.unwrap();
  assert_eq!(history[0].kind, AuditKind::HandlerAdded);
  assert!(history[0].detail.contains(&h2.to_string()));
}

#[tokio::test]
async fn add_team_member_requires_review_state() {
  let e = engine().await;
  let area = Uuid::new_v4();
  let claim = open_claim(&e, Uuid::new_v4(), area).await;
  let h1 = area_handler(&e, area).await;

  let err = e.add_team_member(claim.claim_id, h1, h1).await.unwrap_err();
  assert!(matches!(
    err,
    Error::ClaimNotUnderReview { status: ClaimStatus::Pending, .. }
  ));
}

#[tokio::test]
async fn add_team_member_requires_actor_on_the_team() {
  let e = engine().await;
  let area = Uuid::new_v4();
  let (claim, _) = claim_under_review(&e, area).await;
  let outsider = area_handler(&e, area).await;
  let newcomer = area_handler(&e, area).await;

  let err = e
    .add_team_member(claim.claim_id, outsider, newcomer)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Forbidden { .. }));
}

#[tokio::test]
async fn add_team_member_enforces_area_membership() {
  let e = engine().await;
  let area = Uuid::new_v4();
  let (claim, h1) = claim_under_review(&e, area).await;
  let elsewhere = area_handler(&e, Uuid::new_v4()).await;

  let err = e
    .add_team_member(claim.claim_id, h1, elsewhere)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::HandlerOutsideArea { .. }));
  assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[tokio::test]
async fn add_team_member_rejects_duplicates() {
  let e = engine().await;
  let area = Uuid::new_v4();
  let (claim, h1) = claim_under_review(&e, area).await;

  let err = e.add_team_member(claim.claim_id, h1, h1).await.unwrap_err();
  assert!(matches!(err, Error::AlreadyAssigned { .. }));
}

#[tokio::test]
async fn remove_team_member_keeps_at_least_one_handler() {
  let e = engine().await;
  let area = Uuid::new_v4();
  let (claim, h1) = claim_under_review(&e, area).await;

  // the single-id path hard-rejects where the bulk path would demote
  let err = e
    .remove_team_member(claim.claim_id, h1, h1)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::LastHandler { .. }));
  assert_eq!(err.kind(), ErrorKind::BadRequest);

  let h2 = area_handler(&e, area).await;
  e.add_team_member(claim.claim_id, h1, h2).await.unwrap();
  e.remove_team_member(claim.claim_id, h1, h1).await.unwrap();
  assert_eq!(e.store().assignment_count(claim.claim_id).await.unwrap(), 1);

  let history = e.history(claim.claim_id).await.unwrap();
  assert_eq!(history[0].kind, AuditKind::HandlerRemoved);
}

#[tokio::test]
async fn remove_team_member_rejects_unassigned_target() {
  let e = engine().await;
  let area = Uuid::new_v4();
  let (claim, h1) = claim_under_review(&e, area).await;
  let stranger = area_handler(&e, area).await;

  let err = e
    .remove_team_member(claim.claim_id, h1, stranger)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::HandlerNotAssigned { .. }));
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ─── Area reassignment ───────────────────────────────────────────────────────

#[tokio::test]
async fn reassign_area_resets_from_any_status() {
  let e = engine().await;
  let area = Uuid::new_v4();

  // pending, under review, and closed claims all reset the same way
  let pending = open_claim(&e, Uuid::new_v4(), area).await;
  let (reviewing, _) = claim_under_review(&e, area).await;
  let (closed, _) = claim_under_review(&e, area).await;
  let closed = e
    .change_state(
      closed.claim_id,
      ClaimStatus::Resolved,
      Some("wrong area anyway"),
      &manager(),
    )
    .await
    .unwrap();

  for claim in [pending, reviewing, closed] {
    let new_area = Uuid::new_v4();
    let moved = e
      .reassign_area(claim.claim_id, new_area, &manager())
      .await
      .unwrap();
    assert_eq!(moved.status, ClaimStatus::Pending);
    assert_eq!(moved.area_id, new_area);
    assert_eq!(e.store().assignment_count(claim.claim_id).await.unwrap(), 0);

    let history = e.history(claim.claim_id).await.unwrap();
    assert_eq!(history[0].kind, AuditKind::AreaChanged);
    let meta = history[0].metadata.as_ref().unwrap();
    assert_eq!(meta["previous_area"], claim.area_id.to_string());
    assert_eq!(meta["new_area"], new_area.to_string());
    assert_eq!(meta["previous_state"], claim.status.to_string());
  }
}

// ─── Comments ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn comment_is_gated_by_the_permission_evaluator() {
  let e = engine().await;
  let area = Uuid::new_v4();
  let owner = Uuid::new_v4();
  let claim = e
    .create_claim(new_claim("leaky faucet"), owner, area)
    .await
    .unwrap();
  let h1 = area_handler(&e, area).await;
  e.self_assign(claim.claim_id, h1).await.unwrap();

  // owner, assigned handler, and manager all pass
  e.comment(claim.claim_id, &Actor::new(owner, Role::Client), "any update?")
    .await
    .unwrap();
  e.comment(claim.claim_id, &handler_actor(h1), "plumber booked")
    .await
    .unwrap();
  e.comment(claim.claim_id, &manager(), "escalating").await.unwrap();

  // strangers fail closed, as Forbidden
  let err = e
    .comment(
      claim.claim_id,
      &Actor::new(Uuid::new_v4(), Role::Client),
      "me too",
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Forbidden { .. }));
  let err = e
    .comment(
      claim.claim_id,
      &handler_actor(area_handler(&e, area).await),
      "on it",
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Forbidden { .. }));

  let err = e
    .comment(claim.claim_id, &manager(), "   ")
    .await
    .unwrap_err();
  assert!(matches!(err, Error::EmptyComment));

  let comments = e
    .history(claim.claim_id)
    .await
    .unwrap()
    .into_iter()
    .filter(|en| en.kind == AuditKind::Commented)
    .count();
  assert_eq!(comments, 3);
}

#[tokio::test]
async fn history_requires_an_existing_claim() {
  let e = engine().await;
  let err = e.history(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, Error::ClaimNotFound(_)));
}

// ─── Soft deletion ───────────────────────────────────────────────────────────

#[tokio::test]
async fn soft_deleted_claims_are_invisible_until_restored() {
  let e = engine().await;
  let area = Uuid::new_v4();
  let client = Uuid::new_v4();
  let claim = open_claim(&e, client, area).await;
  let h1 = area_handler(&e, area).await;

  assert!(e.store().soft_delete(claim.claim_id).await.unwrap());

  let err = e.self_assign(claim.claim_id, h1).await.unwrap_err();
  assert!(matches!(err, Error::ClaimNotFound(_)));
  let err = e
    .comment(claim.claim_id, &Actor::new(client, Role::Client), "still broken")
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ClaimNotFound(_)));
  let err = e.history(claim.claim_id).await.unwrap_err();
  assert!(matches!(err, Error::ClaimNotFound(_)));

  assert!(e.store().restore(claim.claim_id).await.unwrap());
  let restored = e.self_assign(claim.claim_id, h1).await.unwrap();
  assert_eq!(restored.status, ClaimStatus::InReview);
}

// ─── End-to-end scenario ─────────────────────────────────────────────────────

#[tokio::test]
async fn full_lifecycle_scenario() {
  let e = engine().await;
  let area = Uuid::new_v4();
  let client = Uuid::new_v4();

  let claim = e
    .create_claim(new_claim("config drift on node 12"), client, area)
    .await
    .unwrap();
  assert_eq!(claim.status, ClaimStatus::Pending);

  let h1 = area_handler(&e, area).await;
  let claimed = e.self_assign(claim.claim_id, h1).await.unwrap();
  assert_eq!(claimed.status, ClaimStatus::InReview);
  assert_eq!(e.store().assigned_handlers(claim.claim_id).await.unwrap().len(), 1);

  let resolved = e
    .change_state(
      claim.claim_id,
      ClaimStatus::Resolved,
      Some("fixed the configuration"),
      &manager(),
    )
    .await
    .unwrap();
  assert_eq!(resolved.status, ClaimStatus::Resolved);

  let history = e.history(claim.claim_id).await.unwrap();
  assert_eq!(
    history.iter().map(|en| en.kind).collect::<Vec<_>>(),
    vec![
      AuditKind::StateChanged, // in_review -> resolved
      AuditKind::StateChanged, // pending -> in_review
      AuditKind::SelfAssigned,
      AuditKind::Created,
    ]
  );
  let meta = history[0].metadata.as_ref().unwrap();
  assert_eq!(meta["previous_state"], "in_review");
  assert_eq!(meta["new_state"], "resolved");

  let err = e
    .change_state(
      claim.claim_id,
      ClaimStatus::Rejected,
      Some("changed our minds"),
      &manager(),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ClaimClosed { .. }));
}
