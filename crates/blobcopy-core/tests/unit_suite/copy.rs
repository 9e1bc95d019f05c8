//! End-to-end copy scenarios against the in-memory store.

use std::sync::Arc;

use bytes::Bytes;

use blobcopy_core::CopyEngine;

use super::helpers::{generate_bytes, memory_store, seed_objects, test_options, CountingStore};

#[tokio::test]
async fn test_copy_moves_everything_under_prefix() {
    let source = memory_store();
    let dest = memory_store();
    seed_objects(&source, "in", 12).await;

    let engine = CopyEngine::new(source, dest.clone(), "in", "out", test_options()).unwrap();
    let report = engine.run().await.unwrap();

    assert_eq!(report.snapshot.objects_done, 12);
    assert_eq!(report.snapshot.objects_failed, 0);
    assert!(report.fully_successful());

    // Keys are remapped onto the destination prefix.
    let page = dest.list_page("out", None, 100).await.unwrap();
    assert_eq!(page.objects.len(), 12);
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let source = memory_store();
    let dest = memory_store();
    seed_objects(&source, "data", 8).await;

    let engine =
        CopyEngine::new(source.clone(), dest.clone(), "data", "data", test_options()).unwrap();
    let first = engine.run().await.unwrap();
    assert_eq!(first.snapshot.objects_done, 8);

    // Nothing changed at the source, so the second run only skips.
    let engine = CopyEngine::new(source, dest, "data", "data", test_options()).unwrap();
    let second = engine.run().await.unwrap();
    assert_eq!(second.snapshot.objects_done, 0);
    assert_eq!(second.snapshot.objects_skipped, 8);
    assert_eq!(second.snapshot.bytes_copied, 0);
}

#[tokio::test]
async fn test_copied_content_matches_source() {
    let source = memory_store();
    let dest = memory_store();

    // A mix of sizes: well below, exactly at, and above the chunk threshold.
    let options = test_options();
    let sizes = [
        10usize,
        options.chunk_size as usize - 1,
        options.chunk_size as usize,
        options.chunk_size as usize * 3 + 1234,
    ];
    for (i, size) in sizes.iter().enumerate() {
        source
            .put(&format!("in/blob-{}", i), generate_bytes(*size))
            .await
            .unwrap();
    }

    let engine = CopyEngine::new(source.clone(), dest.clone(), "in", "in", options).unwrap();
    let report = engine.run().await.unwrap();
    assert_eq!(report.snapshot.objects_done, sizes.len() as u64);

    for (i, size) in sizes.iter().enumerate() {
        let key = format!("in/blob-{}", i);
        let original = source.get(&key).await.unwrap();
        let copied = dest.get(&key).await.unwrap();
        assert_eq!(original.len(), *size);
        assert_eq!(original, copied, "content mismatch for {}", key);
    }
}

#[tokio::test]
async fn test_multipart_reassembly_is_exact() {
    let source = memory_store();
    let dest_inner = memory_store();
    let dest = Arc::new(CountingStore::new(dest_inner.clone()));
    let ledger = dest.ledger.clone();

    // 100_000 bytes against 16 KiB chunks: 7 parts, uneven tail.
    let payload = generate_bytes(100_000);
    source.put("big/object.bin", payload.clone()).await.unwrap();

    let engine = CopyEngine::new(source, dest, "big", "big", test_options()).unwrap();
    let report = engine.run().await.unwrap();

    assert_eq!(report.snapshot.objects_done, 1);
    assert_eq!(ledger.created.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(ledger.completed.load(std::sync::atomic::Ordering::SeqCst), 1);

    let copied = dest_inner.get("big/object.bin").await.unwrap();
    assert_eq!(copied, payload);
}

#[tokio::test]
async fn test_three_object_scenario() {
    let source = memory_store();
    let dest = memory_store();
    let options = test_options();

    // A: new at the destination.
    source.put("in/a", Bytes::from("ten bytes!")).await.unwrap();
    // B: already present and identical (written after the source copy, so
    // the destination is not older).
    let b_payload = Bytes::from("same bytes");
    source.put("in/b", b_payload.clone()).await.unwrap();
    dest.put("in/b", b_payload).await.unwrap();
    // C: large enough to force a chunked transfer.
    let c_payload = generate_bytes(options.chunk_size as usize * 12 + 57);
    source.put("in/c", c_payload.clone()).await.unwrap();

    let engine = CopyEngine::new(source, dest.clone(), "in", "in", options).unwrap();
    let report = engine.run().await.unwrap();

    assert_eq!(report.snapshot.objects_found, 3);
    assert_eq!(report.snapshot.objects_done, 2);
    assert_eq!(report.snapshot.objects_skipped, 1);
    assert_eq!(report.snapshot.objects_failed, 0);

    assert_eq!(dest.get("in/a").await.unwrap(), Bytes::from("ten bytes!"));
    assert_eq!(dest.get("in/c").await.unwrap(), c_payload);
}

#[tokio::test]
async fn test_empty_source_completes_cleanly() {
    let source = memory_store();
    let dest = memory_store();

    let engine = CopyEngine::new(source, dest, "nothing/here", "out", test_options()).unwrap();
    let report = engine.run().await.unwrap();

    assert_eq!(report.snapshot.objects_found, 0);
    assert!(report.fully_successful());
}

#[tokio::test]
async fn test_bytes_copied_accumulates() {
    let source = memory_store();
    let dest = memory_store();
    source.put("in/x", Bytes::from(vec![0u8; 300])).await.unwrap();
    source.put("in/y", Bytes::from(vec![0u8; 700])).await.unwrap();

    let engine = CopyEngine::new(source, dest, "in", "in", test_options()).unwrap();
    let report = engine.run().await.unwrap();

    assert_eq!(report.snapshot.bytes_copied, 1000);
}
