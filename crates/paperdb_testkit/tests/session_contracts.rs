//! Integration coverage for the session-layer contracts.

use paperdb_core::{DocId, SessionError};
use paperdb_testkit::fixtures::{Invoice, Note, User};
use paperdb_testkit::TestStore;
use std::sync::Arc;

#[test]
fn identity_uniqueness_across_repeated_loads() {
    let harness = TestStore::memory();

    let mut seeder = harness.store.open_session();
    seeder.store(Note::new("n1", "first", "body")).unwrap();
    seeder.save_changes().unwrap();

    let mut session = harness.store.open_session();
    let first = session.load::<Note>("n1").unwrap().unwrap();
    let second = session.load::<Note>("n1").unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    // A different session deserializes its own instance.
    let mut other = harness.store.open_session();
    let foreign = other.load::<Note>("n1").unwrap().unwrap();
    assert!(!Arc::ptr_eq(&first, &foreign));
    assert_eq!(*first, *foreign);
}

#[test]
fn store_then_load_before_commit_returns_the_same_document() {
    let harness = TestStore::memory();
    let mut session = harness.store.open_session();

    let stored = session.store(Invoice::sample(42)).unwrap();
    let loaded = session.load::<Invoice>(42i64).unwrap().unwrap();

    assert!(Arc::ptr_eq(&stored, &loaded));
    // Nothing hit the store yet.
    assert_eq!(harness.backend.row_count("invoices"), 0);
}

#[test]
fn commit_atomicity_under_a_mid_sequence_failure() {
    // Three of six inserts succeed, the fourth raises.
    let harness = TestStore::failing_after_writes(3);
    let mut session = harness.store.open_session();

    for invoice in Invoice::batch(6) {
        session.store(invoice).unwrap();
    }

    let err = session.save_changes().unwrap_err();
    assert!(matches!(err, SessionError::Transaction { .. }));

    // Verify through a fresh session: none of the six are persisted.
    harness.backend.clear_fault();
    let mut verifier = harness.store.open_session();
    for id in 1..=6i64 {
        assert!(verifier.load::<Invoice>(id).unwrap().is_none());
    }

    // The failed changes are still pending; a retry commits all of them.
    assert_eq!(session.pending_count(), 6);
    assert_eq!(session.save_changes().unwrap(), 6);
    assert_eq!(harness.backend.row_count("invoices"), 6);
}

#[test]
fn bulk_partial_success_across_batches() {
    let harness = TestStore::memory();
    let mut session = harness.store.open_session();

    // 2500 documents in batches of 1000; the third batch fails.
    harness.backend.fail_after_writes(2000);
    let err = session
        .bulk_insert_with(Invoice::batch(2500), 1000)
        .unwrap_err();
    assert!(matches!(err, SessionError::Transaction { .. }));

    // Records 1..=2000 are persisted and queryable.
    harness.backend.clear_fault();
    assert_eq!(harness.backend.row_count("invoices"), 2000);

    let mut verifier = harness.store.open_session();
    let all = verifier
        .query::<Invoice>("where id >= @0", vec![1.into()])
        .unwrap();
    assert_eq!(all.len(), 2000);
    assert!(verifier.load::<Invoice>(1999i64).unwrap().is_some());

    // Records 2001..=2500 are not.
    assert!(verifier.load::<Invoice>(2001i64).unwrap().is_none());
    assert!(verifier.load::<Invoice>(2500i64).unwrap().is_none());
}

#[test]
fn bulk_loaded_documents_are_not_tracked() {
    let harness = TestStore::memory();
    let mut session = harness.store.open_session();

    session.bulk_insert(Invoice::batch(50)).unwrap();
    assert_eq!(session.tracked_count(), 0);

    // Loading afterwards fetches from the store and starts tracking.
    let loaded = session.load::<Invoice>(7i64).unwrap().unwrap();
    assert_eq!(loaded.id, 7);
    assert_eq!(session.tracked_count(), 1);
}

#[test]
fn delete_without_load_commits_exactly_one_delete() {
    let harness = TestStore::memory();

    let mut seeder = harness.store.open_session();
    seeder.store(Note::new("gone", "title", "body")).unwrap();
    seeder.save_changes().unwrap();

    let mut session = harness.store.open_session();
    session.delete_by_id::<Note>("gone").unwrap();
    assert_eq!(session.pending_count(), 1);

    assert_eq!(session.save_changes().unwrap(), 1);
    assert_eq!(harness.backend.row_count("notes"), 0);
}

#[test]
fn raw_text_fragments_are_wrapped_and_bound_positionally() {
    let harness = TestStore::memory();

    let mut seeder = harness.store.open_session();
    seeder.store(User::new("Ann", 30)).unwrap();
    seeder.store(User::new("Ben", 17)).unwrap();
    seeder.store(User::new("Cle", 45)).unwrap();
    seeder.save_changes().unwrap();

    let mut session = harness.store.open_session();
    let adults = session
        .query::<User>("where age > @0", vec![18.into()])
        .unwrap();
    assert_eq!(adults.len(), 2);
    assert!(adults.iter().all(|u| u.age > 18));

    // A complete query passes through untouched.
    let same = session
        .query::<User>("select data from users where age > @0", vec![18.into()])
        .unwrap();
    assert_eq!(same.len(), 2);
}

#[test]
fn queryable_translation_matches_the_wrapped_form() {
    let harness = TestStore::memory();
    let session = harness.store.open_session();

    let q = session
        .queryable::<User>()
        .filter("age > @0", vec![18.into()]);
    let command = session.diagnostics().command_for(&q).unwrap();

    assert_eq!(command.text, "select data from users where age > @0");
    assert_eq!(command.params.len(), 1);
}

#[test]
fn generated_identities_round_trip_through_commit() {
    let harness = TestStore::memory();
    let mut session = harness.store.open_session();

    let user = session.store(User::new("Ann", 30)).unwrap();
    assert!(!user.id.is_nil());
    session.save_changes().unwrap();

    let mut fresh = harness.store.open_session();
    let reloaded = fresh.load::<User>(user.id).unwrap().unwrap();
    assert_eq!(*user, *reloaded);
}

#[test]
fn loaded_then_edited_documents_upsert_on_commit() {
    let harness = TestStore::memory();

    let mut seeder = harness.store.open_session();
    seeder.store(Invoice::sample(9)).unwrap();
    seeder.save_changes().unwrap();

    let mut session = harness.store.open_session();
    let loaded = session.load::<Invoice>(9i64).unwrap().unwrap();
    let mut edited = (*loaded).clone();
    edited.paid = true;
    edited.total_cents = 12_345;
    session.store(edited).unwrap();
    session.save_changes().unwrap();

    let mut verifier = harness.store.open_session();
    let after = verifier.load::<Invoice>(9i64).unwrap().unwrap();
    assert!(after.paid);
    assert_eq!(after.total_cents, 12_345);
}

#[test]
fn load_many_follows_store_order_and_deduplicates() {
    let harness = TestStore::memory();

    let mut seeder = harness.store.open_session();
    for note in ["a", "b", "c"]
        .iter()
        .map(|id| Note::new(*id, "t", "b"))
    {
        seeder.store(note).unwrap();
    }
    seeder.save_changes().unwrap();

    let mut session = harness.store.open_session();
    let tracked = session.load::<Note>("c").unwrap().unwrap();

    // Requested out of input order; results come back in store order.
    let ids = vec![DocId::from("c"), DocId::from("a")];
    let loaded = session.load_many::<Note>(&ids).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].id, "a");
    assert_eq!(loaded[1].id, "c");
    assert!(Arc::ptr_eq(&tracked, &loaded[1]));
}
