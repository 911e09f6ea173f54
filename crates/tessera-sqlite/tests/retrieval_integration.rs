//! End-to-end store and retrieve through the facade

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tempfile::TempDir;
use tessera_config::{EmbeddingConfig, StorageConfig, TesseraConfig};
use tessera_core::test_support::{FnTokenizer, ManualClock, MockEmbeddingProvider};
use tessera_core::{RetrievalMode, TesseraError, Tokenizer};
use tessera_sqlite::RagStore;

fn config(dir: &TempDir) -> TesseraConfig {
    TesseraConfig {
        storage: StorageConfig::new(dir.path().join("rag.db")),
        embedding: EmbeddingConfig::mock(32),
        ..TesseraConfig::default()
    }
}

fn rag(dir: &TempDir, embedder: MockEmbeddingProvider) -> RagStore {
    RagStore::new(config(dir), Arc::new(embedder), None).with_clock(Arc::new(ManualClock::new()))
}

fn documents(values: &[Value]) -> Vec<Map<String, Value>> {
    values
        .iter()
        .filter_map(|v| v.as_object().cloned())
        .collect()
}

fn ids(outcome: &tessera_sqlite::RetrievalOutcome) -> Vec<&str> {
    outcome.results.iter().map(|r| r.id.as_str()).collect()
}

#[tokio::test]
async fn fulltext_matches_only_the_containing_document() {
    let dir = TempDir::new().unwrap();
    let store = rag(&dir, MockEmbeddingProvider::with_dimensions(32));
    store
        .store(documents(&[
            json!({"id": "1", "content": "Eino is great"}),
            json!({"id": "2", "content": "Hello world"}),
        ]))
        .await
        .unwrap();

    let outcome = store.retrieve("Eino", Some("fulltext"), 10).await.unwrap();
    assert_eq!(ids(&outcome), vec!["1"]);
    assert_eq!(outcome.results[0].score, 1.0);
}

#[tokio::test]
async fn graph_mode_follows_related_links() {
    let dir = TempDir::new().unwrap();
    let store = rag(&dir, MockEmbeddingProvider::with_dimensions(32));
    store
        .store(documents(&[
            json!({"id": "rust", "content": "ownership and borrowing"}),
            json!({"id": "arena", "content": "bump allocation"}),
            json!({"id": "gc", "content": "tracing collectors"}),
        ]))
        .await
        .unwrap();
    let triples = store.triples().await.unwrap();
    triples.link("rust", "related", "arena").await.unwrap();
    triples.link("gc", "cites", "rust").await.unwrap();

    let outcome = store.retrieve("borrowing", Some("graph"), 10).await.unwrap();
    assert_eq!(ids(&outcome), vec!["rust", "arena"]);
    assert!(outcome.results.iter().all(|r| r.score == 0.5));
}

#[tokio::test]
async fn unknown_mode_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = rag(&dir, MockEmbeddingProvider::with_dimensions(32));
    let err = store.retrieve("anything", Some("bm25"), 5).await.unwrap_err();
    assert!(matches!(err, TesseraError::UnknownMode(_)));
}

#[tokio::test]
async fn hybrid_reports_failed_vector_search() {
    let dir = TempDir::new().unwrap();
    // Call 1 embeds the stored documents, call 2 is the query
    let store = rag(&dir, MockEmbeddingProvider::with_dimensions(32).fail_on_call(2));
    store
        .store(documents(&[
            json!({"id": "a", "content": "vector search"}),
            json!({"id": "b", "content": "keyword search"}),
        ]))
        .await
        .unwrap();

    let outcome = store.retrieve("keyword", None, 5).await.unwrap();
    assert!(outcome.is_partial());
    assert_eq!(outcome.partial_errors[0].mode, RetrievalMode::Vector);
    assert_eq!(ids(&outcome), vec!["b"]);
    assert!((outcome.results[0].score - 0.4).abs() < 1e-9);
}

#[tokio::test]
async fn hybrid_ranks_exact_match_first() {
    let dir = TempDir::new().unwrap();
    let store = rag(&dir, MockEmbeddingProvider::with_dimensions(64));
    store
        .store(documents(&[
            json!({"id": "a", "content": "async runtime scheduling"}),
            json!({"id": "b", "content": "garbage collection pauses"}),
            json!({"id": "c", "content": "async await syntax"}),
        ]))
        .await
        .unwrap();

    let outcome = store
        .retrieve("async runtime scheduling", Some("hybrid"), 2)
        .await
        .unwrap();
    assert!(!outcome.is_partial());
    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.results[0].id, "a");
    assert!((outcome.results[0].score - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn injected_tokenizer_segments_unspaced_text() {
    let dir = TempDir::new().unwrap();
    let per_char: Arc<dyn Tokenizer> = Arc::new(FnTokenizer::new(|text: &str| {
        text.chars()
            .filter(|c| !c.is_whitespace())
            .map(String::from)
            .collect::<Vec<_>>()
            .join(" ")
    }));
    let store = RagStore::new(
        config(&dir),
        Arc::new(MockEmbeddingProvider::with_dimensions(32)),
        Some(per_char),
    );
    store
        .store(documents(&[
            json!({"id": "db", "content": "图数据库系统"}),
            json!({"id": "math", "content": "数学"}),
        ]))
        .await
        .unwrap();

    // Not a substring of either document, but every character of it is in "db"
    let outcome = store.retrieve("系统数据", Some("fulltext"), 10).await.unwrap();
    assert_eq!(ids(&outcome), vec!["db"]);
}

#[tokio::test]
async fn data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = rag(&dir, MockEmbeddingProvider::with_dimensions(32));
        store
            .store(documents(&[json!({"id": "keep", "content": "durable row"})]))
            .await
            .unwrap();
    }

    let store = rag(&dir, MockEmbeddingProvider::with_dimensions(32));
    let outcome = store.retrieve("durable", Some("vector"), 1).await.unwrap();
    assert_eq!(ids(&outcome), vec!["keep"]);
}
