use super::*;
use crate::store::CorpusRow;
use crate::test_support::{FailingEmbedder, KeywordEmbedder};

const VOCABULARY: [&str; 4] = ["attention", "image", "policy", "reward"];

fn corpus() -> Vec<CorpusRow> {
    vec![
        CorpusRow::new("Attention", "https://a", "attention attention transformer"),
        CorpusRow::new("Vision", "https://b", "image image image classification"),
        CorpusRow::new("Control", "https://c", "policy reward reward agent"),
    ]
}

fn build_retriever<E: Embedder>(embedder: E, rows: &[CorpusRow]) -> Retriever<E> {
    let mut store = DocumentStore::new();
    store.ingest(rows, 500).expect("should ingest");
    let vectors = embedder
        .embed_batch(store.documents())
        .expect("should embed");
    let index = FlatIndex::build(embedder.dimension(), &vectors).expect("should build");
    Retriever::new(store, index, embedder).expect("should align")
}

#[test]
fn retrieves_closest_chunks_first() {
    let retriever = build_retriever(KeywordEmbedder::new(&VOCABULARY), &corpus());
    let retrieval = retriever
        .retrieve("how does the reward shape a policy", 2)
        .expect("should retrieve");

    assert!(!retrieval.used_fallback());
    assert_eq!(retrieval.hits.len(), 2);
    assert_eq!(retrieval.hits[0].metadata.title, "Control");
    assert_eq!(retrieval.hits[0].position, 2);
    assert_eq!(retrieval.hits[0].chunk, "policy reward reward agent");
    assert!(retrieval.hits[0].distance <= retrieval.hits[1].distance);
}

#[test]
fn k_beyond_corpus_returns_everything() {
    let retriever = build_retriever(KeywordEmbedder::new(&VOCABULARY), &corpus());
    let retrieval = retriever.retrieve("attention", 10).expect("should retrieve");

    assert_eq!(retrieval.hits.len(), 3);
    assert_eq!(retrieval.hits[0].metadata.url, "https://a");
}

#[test]
fn long_chunks_are_truncated_to_the_limit() {
    let long_body = format!("attention {}", "x".repeat(1500));
    let rows = vec![
        CorpusRow::new("Long", "https://long", long_body.clone()),
        CorpusRow::new("Short", "https://short", "image classification"),
    ];
    let retriever = build_retriever(KeywordEmbedder::new(&VOCABULARY), &rows);
    assert_eq!(retriever.max_chunk_chars(), DEFAULT_MAX_CHUNK_CHARS);

    let retrieval = retriever.retrieve("attention", 2).expect("should retrieve");
    let long = &retrieval.hits[0];
    assert_eq!(long.metadata.title, "Long");
    assert_eq!(long.chunk.chars().count(), 1000);
    assert!(long_body.starts_with(&long.chunk));

    let short = &retrieval.hits[1];
    assert_eq!(short.chunk, "image classification");
}

#[test]
fn truncation_limit_is_configurable() {
    let retriever = build_retriever(KeywordEmbedder::new(&VOCABULARY), &corpus())
        .with_max_chunk_chars(9);
    let retrieval = retriever.retrieve("attention", 1).expect("should retrieve");

    assert_eq!(retrieval.hits[0].chunk, "attention");
}

#[test]
fn fallback_embedding_is_flagged() {
    let retriever = build_retriever(KeywordEmbedder::new(&VOCABULARY), &corpus());
    let store = retriever.store().clone();
    let index = retriever.index().clone();

    let degraded = Retriever::new(store, index, FailingEmbedder { dimension: 4 })
        .expect("dimensions agree");
    let retrieval = degraded.retrieve("anything", 2).expect("should still search");

    assert!(retrieval.used_fallback());
    assert_eq!(retrieval.hits.len(), 2);
    assert!(matches!(
        retrieval.embedding,
        EmbeddingStatus::Fallback { .. }
    ));
}

#[test]
fn misaligned_store_is_rejected() {
    let mut store = DocumentStore::new();
    store.ingest(&corpus(), 500).expect("should ingest");
    let index = FlatIndex::build(4, &[vec![0.0; 4], vec![1.0; 4]]).expect("should build");

    let error = Retriever::new(store, index, KeywordEmbedder::new(&VOCABULARY))
        .expect_err("lengths differ");
    assert!(matches!(
        error,
        RetrievalError::Misaligned {
            documents: 3,
            vectors: 2
        }
    ));
}

#[test]
fn embedder_dimension_must_match_index() {
    let mut store = DocumentStore::new();
    store.ingest(&corpus(), 500).expect("should ingest");
    let index = FlatIndex::build(3, &[vec![0.0; 3], vec![0.0; 3], vec![0.0; 3]])
        .expect("should build");

    let error = Retriever::new(store, index, KeywordEmbedder::new(&VOCABULARY))
        .expect_err("dimensions differ");
    assert!(matches!(
        error,
        RetrievalError::DimensionMismatch {
            index: 3,
            embedder: 4
        }
    ));
}

#[test]
fn truncate_respects_char_boundaries() {
    assert_eq!(truncate_chars("héllo wörld", 4), "héll");
    assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
    assert_eq!(truncate_chars("short", 10), "short");
    assert_eq!(truncate_chars("exact", 5), "exact");
    assert_eq!(truncate_chars("anything", 0), "");
}
