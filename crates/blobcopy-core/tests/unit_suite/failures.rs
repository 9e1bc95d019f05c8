//! Failure, cancellation and integrity scenarios.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use bytes::Bytes;

use blobcopy_core::{CopyEngine, Error, StorageError};

use super::helpers::{
    generate_bytes, memory_store, seed_objects, test_options, CountingStore, FailingListStore,
    FailingPutStore, TruncatingStore,
};

#[tokio::test]
async fn test_permanent_error_does_not_abort_run() {
    let source = memory_store();
    seed_objects(&source, "in", 100).await;

    // One object out of 100 is rejected with a permanent error.
    let dest = Arc::new(FailingPutStore::new(memory_store(), "in/obj-0042"));

    let engine = CopyEngine::new(source, dest, "in", "in", test_options()).unwrap();
    let report = engine.run().await.unwrap();

    assert_eq!(report.snapshot.objects_done, 99);
    assert_eq!(report.snapshot.objects_failed, 1);
    assert!(!report.aborted);
    assert!(!report.fully_successful());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].key, "in/obj-0042");
}

#[tokio::test]
async fn test_permanent_put_error_is_not_retried() {
    let source = memory_store();
    source.put("in/only", Bytes::from("data")).await.unwrap();

    let dest = Arc::new(FailingPutStore::new(memory_store(), "in/only"));
    let dest_handle = dest.clone();

    let engine = CopyEngine::new(source, dest, "in", "in", test_options()).unwrap();
    let report = engine.run().await.unwrap();

    assert_eq!(report.snapshot.objects_failed, 1);
    // Auth-style failures short-circuit both retry levels.
    assert_eq!(dest_handle.put_attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_multipart_is_always_aborted() {
    let source = memory_store();
    let options = test_options();
    let payload = generate_bytes(options.chunk_size as usize * 4);
    source.put("in/big", payload).await.unwrap();

    let mut dest = CountingStore::new(memory_store());
    dest.fail_parts = Some(|| {
        Error::Storage(StorageError::PermissionDenied("part rejected".to_string()))
    });
    let dest = Arc::new(dest);
    let ledger = dest.ledger.clone();

    let engine = CopyEngine::new(source, dest, "in", "in", options).unwrap();
    let report = engine.run().await.unwrap();

    assert_eq!(report.snapshot.objects_failed, 1);
    assert_eq!(ledger.completed.load(Ordering::SeqCst), 0);
    ledger.assert_no_dangling();
}

#[tokio::test]
async fn test_transient_part_failures_redo_the_object() {
    let source = memory_store();
    let options = test_options();
    let payload = generate_bytes(options.chunk_size as usize * 2);
    source.put("in/big", payload).await.unwrap();

    let mut dest = CountingStore::new(memory_store());
    dest.fail_parts =
        Some(|| Error::Storage(StorageError::Timeout("part timed out".to_string())));
    let dest = Arc::new(dest);
    let ledger = dest.ledger.clone();

    let engine = CopyEngine::new(source, dest, "in", "in", options).unwrap();
    let report = engine.run().await.unwrap();

    assert_eq!(report.snapshot.objects_failed, 1);
    // retries=1 means two whole-object attempts, each aborted.
    assert_eq!(ledger.created.load(Ordering::SeqCst), 2);
    assert_eq!(ledger.aborted.load(Ordering::SeqCst), 2);
    ledger.assert_no_dangling();
}

#[tokio::test]
async fn test_cancellation_leaves_no_dangling_multipart() {
    let source = memory_store();
    let options = test_options();
    for i in 0..6 {
        source
            .put(
                &format!("in/big-{}", i),
                generate_bytes(options.chunk_size as usize * 3),
            )
            .await
            .unwrap();
    }

    let dest = Arc::new(CountingStore::new(memory_store()));
    let ledger = dest.ledger.clone();

    let engine = CopyEngine::new(source, dest.clone(), "in", "in", options).unwrap();
    // The first uploaded part anywhere fires the run's cancellation signal.
    dest.cancel_on_first_part(engine.cancel_token());

    let report = engine.run().await.unwrap();

    assert!(report.aborted);
    // Whatever was started was either completed or actively aborted.
    ledger.assert_no_dangling();
}

#[tokio::test]
async fn test_listing_rejection_is_fatal_when_nothing_enumerated() {
    let source = Arc::new(FailingListStore::new(memory_store()));
    let dest = memory_store();

    let engine = CopyEngine::new(source, dest, "in", "in", test_options()).unwrap();
    let err = engine.run().await.unwrap_err();

    assert!(matches!(
        err,
        Error::Storage(StorageError::PermissionDenied(_))
    ));
}

#[tokio::test]
async fn test_integrity_mismatch_fails_after_one_redo() {
    let source = memory_store();
    source.put("in/short", Bytes::from("12345678")).await.unwrap();

    // Every put silently drops a byte, so verification can never pass.
    let dest = Arc::new(TruncatingStore::new(memory_store()));
    let dest_handle = dest.clone();

    let engine = CopyEngine::new(source, dest, "in", "in", test_options()).unwrap();
    let report = engine.run().await.unwrap();

    assert_eq!(report.snapshot.objects_failed, 1);
    // Initial attempt plus exactly one integrity redo.
    assert_eq!(dest_handle.put_attempts.load(Ordering::SeqCst), 2);
    assert!(report.failures[0].error.contains("Integrity"));
}

#[tokio::test]
async fn test_failed_objects_are_retried_on_rerun() {
    let source = memory_store();
    source.put("in/flaky", Bytes::from("payload")).await.unwrap();

    // First run fails the object permanently.
    let failing_dest = Arc::new(FailingPutStore::new(memory_store(), "in/flaky"));
    let engine =
        CopyEngine::new(source.clone(), failing_dest, "in", "in", test_options()).unwrap();
    let report = engine.run().await.unwrap();
    assert_eq!(report.snapshot.objects_failed, 1);

    // A rerun against a healthy destination picks the object back up, since
    // the diff stage re-checks destination state.
    let dest = memory_store();
    let engine = CopyEngine::new(source, dest.clone(), "in", "in", test_options()).unwrap();
    let report = engine.run().await.unwrap();
    assert_eq!(report.snapshot.objects_done, 1);
    assert_eq!(dest.get("in/flaky").await.unwrap(), Bytes::from("payload"));
}
