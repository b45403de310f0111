//! Commit-boundary behavior of the unit of work over the memory store.

mod common;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use common::Fixture;
use tickethub_core::config::PaginationConfig;
use tickethub_core::error::ErrorKind;
use tickethub_core::traits::{Entity, Repository};
use tickethub_core::types::filter::Filter;
use tickethub_database::{MemoryStore, UnitOfWork};
use tickethub_entity::{Incident, IncidentStatus, tables};

#[tokio::test]
async fn test_identity_is_assigned_on_save() {
    let fx = Fixture::new().await;
    let repo = fx.uow.incidents();

    let pending = repo.add(fx.incident("Torn wrap", 2, 0)).await.expect("stage");
    assert!(pending.id().is_none());
    assert_eq!(fx.uow.pending_changes().await, 1);
    assert!(repo.get_all().await.expect("read").is_empty());

    assert_eq!(fx.uow.save_changes().await.expect("save"), 1);
    let id = pending.id().expect("assigned");
    let stored = repo.get_by_id(id).await.expect("read").expect("present");
    assert_eq!(stored.id(), id);
    assert_eq!(stored.version(), 1);
    assert_eq!(stored.title, "Torn wrap");
    assert_eq!(pending.saved().expect("saved").id(), id);
}

#[tokio::test]
async fn test_adding_a_persisted_entity_is_rejected() {
    let fx = Fixture::new().await;
    let ids = fx.seed_incidents(1).await;
    let repo = fx.uow.incidents();
    let stored = repo.get_by_id(ids[0]).await.expect("read").expect("present");
    let err = repo.add(stored).await.expect_err("already persisted");
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_update_bumps_version_and_timestamp() {
    let fx = Fixture::new().await;
    let ids = fx.seed_incidents(1).await;
    let repo = fx.uow.incidents();

    let mut incident = repo.get_by_id(ids[0]).await.expect("read").expect("present");
    let before = incident.updated_at();
    incident.start().expect("start");
    let staged = repo.update(incident).await.expect("stage");
    assert!(staged.entity().updated_at() >= before);
    assert!(!staged.is_saved());
    fx.uow.save_changes().await.expect("save");
    assert_eq!(staged.saved().expect("saved").version(), 2);

    let stored = repo.get_by_id(ids[0]).await.expect("read").expect("present");
    assert_eq!(stored.version(), 2);
    assert_eq!(stored.status, IncidentStatus::InProgress);
    assert!(stored.updated_at() >= stored.created_at());
}

#[tokio::test]
async fn test_saved_update_can_be_updated_again() {
    let fx = Fixture::new().await;
    let ids = fx.seed_incidents(1).await;
    let repo = fx.uow.incidents();

    let mut incident = repo.get_by_id(ids[0]).await.expect("read").expect("present");
    incident.start().expect("start");
    let first = repo.update(incident).await.expect("stage");
    fx.uow.save_changes().await.expect("save");

    let mut current = first.saved().expect("saved");
    current.resolve("Re-packed at dock").expect("resolve");
    let second = repo.update(current).await.expect("stage");
    fx.uow.save_changes().await.expect("own write is not a conflict");
    assert_eq!(second.saved().expect("saved").version(), 3);

    let stored = repo.get_by_id(ids[0]).await.expect("read").expect("present");
    assert_eq!(stored.version(), 3);
    assert_eq!(stored.status, IncidentStatus::Resolved);
}

#[tokio::test]
async fn test_stale_update_is_a_concurrency_conflict() {
    let fx = Fixture::new().await;
    let ids = fx.seed_incidents(1).await;
    let other = fx.other_uow();

    let mut mine = fx.uow.incidents().get_by_id(ids[0]).await.expect("read").expect("present");
    let mut theirs = other.incidents().get_by_id(ids[0]).await.expect("read").expect("present");

    theirs.start().expect("start");
    other.incidents().update(theirs).await.expect("stage");
    other.save_changes().await.expect("first writer wins");

    mine.resolve("Re-shipped").expect("resolve");
    fx.uow.incidents().update(mine).await.expect("stage");
    let err = fx.uow.save_changes().await.expect_err("stale");
    assert_eq!(err.kind, ErrorKind::ConcurrencyConflict);

    let stored = other.incidents().get_by_id(ids[0]).await.expect("read").expect("present");
    assert_eq!(stored.status, IncidentStatus::InProgress);
    assert_eq!(stored.version(), 2);
}

#[tokio::test]
async fn test_update_of_unknown_identity_is_not_found() {
    let fx = Fixture::new().await;
    let ghost = fx.incident("Ghost", 1, 0);
    fx.uow.incidents().update(ghost).await.expect("stage");
    let err = fx.uow.save_changes().await.expect_err("unknown");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_failed_save_applies_nothing() {
    let fx = Fixture::new().await;
    let repo = fx.uow.incidents();
    repo.add(fx.incident("Valid", 1, 0)).await.expect("stage");
    repo.update(fx.incident("Never stored", 1, 0)).await.expect("stage");

    assert!(fx.uow.save_changes().await.is_err());
    assert_eq!(fx.store.len(tables::INCIDENTS).await, 0);
    assert_eq!(fx.uow.pending_changes().await, 0);
}

#[tokio::test]
async fn test_delete_semantics() {
    let fx = Fixture::new().await;
    let ids = fx.seed_incidents(2).await;
    let repo = fx.uow.incidents();
    let first = repo.get_by_id(ids[0]).await.expect("read").expect("present");

    repo.delete(&first).await.expect("stage");
    assert_eq!(fx.uow.save_changes().await.expect("save"), 1);
    assert!(repo.get_by_id(ids[0]).await.expect("read").is_none());

    repo.delete(&first).await.expect("stage");
    let err = fx.uow.save_changes().await.expect_err("already gone");
    assert_eq!(err.kind, ErrorKind::NotFound);

    repo.delete_by_id(ids[0]).await.expect("stage");
    assert_eq!(fx.uow.save_changes().await.expect("no-op"), 0);
    assert_eq!(fx.store.len(tables::INCIDENTS).await, 1);
}

#[tokio::test]
async fn test_rollback_discards_saved_changes() {
    let fx = Fixture::new().await;
    let repo = fx.uow.incidents();

    fx.uow.begin_transaction().await.expect("begin");
    repo.add(fx.incident("Dented drum", 4, 0)).await.expect("stage");
    repo.add(fx.incident("Leaking drum", 6, 1)).await.expect("stage");
    assert_eq!(fx.uow.save_changes().await.expect("save"), 2);
    assert_eq!(repo.count(&Filter::new()).await.expect("count"), 2);
    assert_eq!(fx.other_uow().incidents().get_all().await.expect("read").len(), 0);

    fx.uow.rollback_transaction().await;
    assert!(!fx.uow.in_transaction().await);
    assert_eq!(repo.count(&Filter::new()).await.expect("count"), 0);
    assert_eq!(fx.store.len(tables::INCIDENTS).await, 0);
}

#[tokio::test]
async fn test_rollback_withdraws_identities_from_saves() {
    let fx = Fixture::new().await;
    let ids = fx.seed_incidents(1).await;
    let repo = fx.uow.incidents();
    let mut existing = repo.get_by_id(ids[0]).await.expect("read").expect("present");
    existing.start().expect("start");

    fx.uow.begin_transaction().await.expect("begin");
    let added = repo.add(fx.incident("Crushed crate", 2, 0)).await.expect("stage");
    let updated = repo.update(existing).await.expect("stage");
    fx.uow.save_changes().await.expect("save");
    let provisional = added.id().expect("visible inside the transaction");
    assert!(updated.is_saved());

    fx.uow.rollback_transaction().await;
    assert!(!added.is_saved());
    assert!(added.id().is_none());
    assert!(updated.saved().is_none());
    assert!(repo.get_by_id(provisional).await.expect("read").is_none());
    let stored = repo.get_by_id(ids[0]).await.expect("read").expect("present");
    assert_eq!(stored.version(), 1);
}

#[tokio::test]
async fn test_commit_without_transaction_keeps_staged_changes() {
    let fx = Fixture::new().await;
    let pending = fx
        .uow
        .incidents()
        .add(fx.incident("Missing pallet", 1, 0))
        .await
        .expect("stage");

    let err = fx.uow.commit_transaction().await.expect_err("none active");
    assert_eq!(err.kind, ErrorKind::Transaction);
    assert_eq!(fx.uow.pending_changes().await, 1);

    assert_eq!(fx.uow.save_changes().await.expect("save"), 1);
    assert!(pending.is_saved());
    assert_eq!(fx.store.len(tables::INCIDENTS).await, 1);
}

#[tokio::test]
async fn test_commit_makes_transaction_writes_durable() {
    let fx = Fixture::new().await;
    let repo = fx.uow.incidents();

    fx.uow.begin_transaction().await.expect("begin");
    let pending = repo.add(fx.incident("Wet carton", 1, 0)).await.expect("stage");
    fx.uow.commit_transaction().await.expect("commit");

    assert!(!fx.uow.in_transaction().await);
    let id = pending.id().expect("assigned");
    let seen = fx.other_uow().incidents().get_by_id(id).await.expect("read");
    assert!(seen.is_some());
}

#[tokio::test]
async fn test_commit_failure_rolls_back_and_returns_original_error() {
    let fx = Fixture::new().await;
    fx.uow.begin_transaction().await.expect("begin");
    fx.uow
        .incidents()
        .add(fx.incident("Lost parcel", 1, 0))
        .await
        .expect("stage");

    fx.store.fail_next_commit("replica unavailable");
    fx.store.fail_next_rollback("connection reset");
    let err = fx.uow.commit_transaction().await.expect_err("injected");
    assert_eq!(err.kind, ErrorKind::Transaction);
    assert!(err.message.contains("replica unavailable"));

    assert!(!fx.uow.in_transaction().await);
    assert_eq!(fx.store.len(tables::INCIDENTS).await, 0);
}

#[tokio::test]
async fn test_failed_save_inside_transaction_forces_rollback() {
    let fx = Fixture::new().await;
    let repo = fx.uow.incidents();

    fx.uow.begin_transaction().await.expect("begin");
    repo.add(fx.incident("Valid", 1, 0)).await.expect("stage");
    repo.update(fx.incident("Unknown", 1, 0)).await.expect("stage");
    assert!(fx.uow.save_changes().await.is_err());

    let err = fx.uow.commit_transaction().await.expect_err("doomed");
    assert_eq!(err.kind, ErrorKind::Transaction);
    assert_eq!(fx.store.len(tables::INCIDENTS).await, 0);
}

#[tokio::test]
async fn test_transaction_state_errors() {
    let fx = Fixture::new().await;

    fx.uow.rollback_transaction().await;
    let err = fx.uow.commit_transaction().await.expect_err("none active");
    assert_eq!(err.kind, ErrorKind::Transaction);

    fx.uow.begin_transaction().await.expect("begin");
    let err = fx.uow.begin_transaction().await.expect_err("nested");
    assert_eq!(err.kind, ErrorKind::Transaction);
    assert!(fx.uow.in_transaction().await);

    fx.store.fail_next_rollback("connection reset");
    fx.uow.rollback_transaction().await;
    assert!(!fx.uow.in_transaction().await);
}

#[tokio::test]
async fn test_cancelled_unit_of_work_refuses_store_calls() {
    let cancel = CancellationToken::new();
    let uow = UnitOfWork::with_options(
        Arc::new(MemoryStore::new()),
        cancel.clone(),
        &PaginationConfig::default(),
    );
    assert!(uow.incidents().get_all().await.expect("read").is_empty());

    cancel.cancel();
    let err = uow.incidents().get_all().await.expect_err("cancelled");
    assert_eq!(err.kind, ErrorKind::Cancelled);
    let err = uow.save_changes().await.expect_err("cancelled");
    assert_eq!(err.kind, ErrorKind::Cancelled);
}

#[tokio::test]
async fn test_repositories_share_one_commit_boundary() {
    let fx = Fixture::new().await;
    let incidents = fx.uow.repository::<Incident>();
    assert!(Arc::ptr_eq(&incidents, &fx.uow.incidents()));

    fx.uow.begin_transaction().await.expect("begin");
    incidents.add(fx.incident("Broken seal", 1, 0)).await.expect("stage");
    fx.uow
        .warehouses()
        .add(tickethub_entity::Warehouse::new("kbe-2", "Kobe Port", None).expect("valid"))
        .await
        .expect("stage");
    fx.uow.rollback_transaction().await;

    assert_eq!(fx.uow.pending_changes().await, 0);
    assert_eq!(fx.store.len(tables::INCIDENTS).await, 0);
    assert_eq!(fx.store.len(tables::WAREHOUSES).await, 1);
}
