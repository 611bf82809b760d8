//! Startup, persistence and recovery of the on-disk cache.

use std::fs;
use std::sync::Arc;

use pretty_assertions::assert_eq;

use aicmd_cache::{CacheConfig, CacheError, RebuildStats, SemanticCache};
use aicmd_embeddings::MockEmbedder;
use e2e_tests::{exists_on_disk, RenamedEmbedder, TestHarness, DIM};

/// Starting with no files: the first lookup misses and the first insert
/// creates both the index file and the value store.
#[tokio::test]
async fn test_empty_state_startup() {
    let harness = TestHarness::new();
    assert!(!harness.data_dir.exists());

    let mut cache = harness.open_cache().await;
    assert!(cache.lookup("list files").await.is_none());

    cache.insert("list files", "ls -la").await.unwrap();
    assert!(exists_on_disk(&harness.index_file()));
    assert!(exists_on_disk(&harness.store_dir()));
}

/// Two cached instructions, then a paraphrase of the first.
#[tokio::test]
async fn test_paraphrase_resolves_to_nearest_entry() {
    let harness = TestHarness::new();
    let mut cache = harness.open_cache().await;
    cache.insert("list files", "ls -la").await.unwrap();
    cache.insert("show me process list", "ps aux").await.unwrap();

    let hit = cache.lookup("list every file here").await.unwrap();
    assert_eq!(hit.command, "ls -la");
    assert_eq!(hit.instruction, "list files");
    assert!(hit.distance <= 0.5);
}

#[tokio::test]
async fn test_entries_survive_restart() {
    let harness = TestHarness::new();
    {
        let mut cache = harness.open_cache().await;
        cache.insert("list files", "ls -la").await.unwrap();
        cache.insert("show me process list", "ps aux").await.unwrap();
        cache.close().unwrap();
    }

    let cache = harness.open_cache().await;
    let stats = cache.stats().unwrap();
    assert_eq!(stats.entries, 2);
    assert_eq!(stats.indexed, 2);
    assert_eq!(cache.lookup("show me process list").await.unwrap().command, "ps aux");
}

#[tokio::test]
async fn test_eviction_survives_restart() {
    let harness = TestHarness::new();
    {
        let mut cache = harness.open_cache().await;
        cache.insert("list files", "ls -la").await.unwrap();
        assert!(cache.forget("list files"));
    }

    let cache = harness.open_cache().await;
    assert_eq!(cache.stats().unwrap().entries, 0);
    assert!(cache.lookup("list files").await.is_none());
}

/// A lost index is rebuilt from stored vectors without calling the provider.
#[tokio::test]
async fn test_lost_index_rebuilt_from_store() {
    let harness = TestHarness::new();
    {
        let mut cache = harness.open_cache().await;
        cache.insert("list files", "ls -la").await.unwrap();
        cache.insert("show me process list", "ps aux").await.unwrap();
    }
    fs::remove_file(harness.index_file()).unwrap();

    let calls_before = harness.embedder.calls();
    let cache = harness.open_cache().await;
    assert_eq!(harness.embedder.calls(), calls_before);
    assert_eq!(cache.stats().unwrap().indexed, 2);
    assert_eq!(cache.lookup("list files").await.unwrap().command, "ls -la");
}

#[tokio::test]
async fn test_corrupt_index_rebuilt_from_store() {
    let harness = TestHarness::new();
    {
        let mut cache = harness.open_cache().await;
        cache.insert("list files", "ls -la").await.unwrap();
    }
    fs::write(harness.index_file(), b"not an index").unwrap();

    let cache = harness.open_cache().await;
    assert_eq!(cache.stats().unwrap().indexed, 1);
    assert_eq!(cache.lookup("list files").await.unwrap().command, "ls -la");
}

/// Switching embedding models re-embeds every stored instruction once.
#[tokio::test]
async fn test_model_change_reembeds_records() {
    let harness = TestHarness::new();
    {
        let mut cache = harness.open_cache().await;
        cache.insert("list files", "ls -la").await.unwrap();
        cache.insert("show me process list", "ps aux").await.unwrap();
    }

    let renamed = Arc::new(RenamedEmbedder::new(DIM, "ollama", "bge-m3"));
    let mut cache = SemanticCache::open(harness.config(), renamed.clone())
        .await
        .unwrap();
    assert_eq!(renamed.calls(), 2);
    assert!(cache
        .entries()
        .unwrap()
        .iter()
        .all(|r| r.model.as_deref() == Some("ollama/bge-m3")));

    let stats = cache.rebuild_index().await.unwrap();
    assert_eq!(
        stats,
        RebuildStats {
            records: 2,
            reused: 2,
            embedded: 0,
            failed: 0
        }
    );
}

/// A store created for one dimension refuses to open with another.
#[tokio::test]
async fn test_dimension_mismatch_is_fatal() {
    let harness = TestHarness::new();
    {
        let mut cache = harness.open_cache().await;
        cache.insert("list files", "ls -la").await.unwrap();
    }

    let result = SemanticCache::open(
        CacheConfig::new(harness.data_dir.clone(), 512),
        Arc::new(MockEmbedder::new(512)),
    )
    .await;
    assert!(matches!(result, Err(CacheError::Storage(_))));

    let cache = harness.open_cache().await;
    assert_eq!(cache.stats().unwrap().entries, 1);
}

#[tokio::test]
async fn test_clear_leaves_usable_cache() {
    let harness = TestHarness::new();
    let mut cache = harness.open_cache().await;
    cache.insert("list files", "ls -la").await.unwrap();
    cache.insert("show me process list", "ps aux").await.unwrap();

    assert_eq!(cache.clear().unwrap(), 2);
    assert!(cache.lookup("list files").await.is_none());

    cache.insert("list files", "ls -1").await.unwrap();
    assert_eq!(cache.lookup("list files").await.unwrap().command, "ls -1");
}
