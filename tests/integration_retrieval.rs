#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end retrieval over a CSV corpus with a deterministic local embedder

use std::fs;
use tempfile::TempDir;

use ai_knower::KnowerError;
use ai_knower::config::Config;
use ai_knower::embeddings::Embedder;
use ai_knower::index::FlatIndex;
use ai_knower::retrieval::{IndexManifest, IndexPipeline, KnowledgeBase, PipelineState};
use ai_knower::store::{CorpusRow, DocumentStore, Metadata};

const TOPICS: [&str; 6] = ["attention", "convolution", "reward", "graph", "word", "diffusion"];

/// Counts topic words, giving one axis per topic
#[derive(Debug)]
struct TopicEmbedder;

impl Embedder for TopicEmbedder {
    fn dimension(&self) -> usize {
        TOPICS.len()
    }

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let lower = text.to_lowercase();
        Ok(TOPICS
            .iter()
            .map(|topic| lower.matches(topic).count() as f32)
            .collect())
    }
}

fn corpus_csv() -> String {
    let long_abstract = "word ".repeat(1050);
    format!(
        "title,url,abstract\n\
         Doc1,u1,{}\n\
         \"Attention, Please\",https://arxiv.org/abs/1,\"Self attention replaces recurrence; attention everywhere.\"\n\
         Convolutional Nets,https://arxiv.org/abs/2,Convolution kernels slide over images with convolution\n\
         Reward Shaping,https://arxiv.org/abs/3,An agent maximizes reward with shaped reward signals\n\
         Message Passing,https://arxiv.org/abs/4,Graph networks pass messages along graph edges\n",
        long_abstract.trim_end()
    )
}

fn setup() -> (TempDir, Config) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config::with_base_dir(temp_dir.path());
    config.corpus.dataset_path = "papers.csv".into();
    config.corpus.index_path = "index/papers.index".into();

    fs::write(config.dataset_path(), corpus_csv()).expect("should write corpus");
    (temp_dir, config)
}

#[test]
fn long_abstract_is_split_with_shared_metadata() {
    let (_temp_dir, config) = setup();
    let mut store = DocumentStore::new();
    store
        .ingest_path(&config.dataset_path(), 500)
        .expect("should ingest");

    assert_eq!(store.len(), 7);
    assert_eq!(store.documents().len(), store.metadata().len());

    let doc1 = Metadata {
        title: "Doc1".to_string(),
        url: "u1".to_string(),
    };
    assert!(store.metadata()[..3].iter().all(|meta| *meta == doc1));
    assert_eq!(store.metadata()[3].title, "Attention, Please");
}

#[test]
fn build_then_open_answers_the_same() {
    let (_temp_dir, config) = setup();

    let built = KnowledgeBase::build(&config, TopicEmbedder).expect("should build");
    assert_eq!(built.len(), 7);
    assert!(config.index_path().exists());

    let manifest = IndexManifest::load(&config.index_path())
        .expect("should read manifest")
        .expect("manifest written");
    assert_eq!(manifest.chunk_count, 7);
    assert_eq!(manifest.dimension, TOPICS.len());

    let opened = KnowledgeBase::open(&config, TopicEmbedder).expect("should open");
    for query in ["how does attention work", "graph learning", "reward design"] {
        assert_eq!(
            opened.retrieve(query, 3).expect("should retrieve"),
            built.retrieve(query, 3).expect("should retrieve")
        );
    }

    let retrieval = opened.retrieve("graph learning", 1).expect("should retrieve");
    assert!(!retrieval.used_fallback());
    assert_eq!(retrieval.hits[0].metadata.title, "Message Passing");
}

#[test]
fn retrieved_chunks_are_truncated() {
    let (_temp_dir, config) = setup();
    let kb = KnowledgeBase::build(&config, TopicEmbedder).expect("should build");

    let query = "word ".repeat(300);
    let retrieval = kb.retrieve(&query, 3).expect("should retrieve");
    let doc1_hits = retrieval
        .hits
        .iter()
        .filter(|hit| hit.metadata.title == "Doc1")
        .collect::<Vec<_>>();

    // 500 words of "word " is 2499 characters; the 50-word tail is 249
    assert_eq!(doc1_hits.len(), 3);
    assert!(
        doc1_hits
            .iter()
            .any(|hit| hit.chunk.chars().count() == 1000)
    );
    assert!(
        doc1_hits
            .iter()
            .all(|hit| hit.chunk.chars().count() <= 1000)
    );
    let tail = doc1_hits
        .iter()
        .find(|hit| hit.position == 2)
        .expect("tail chunk retrieved");
    assert_eq!(tail.chunk.chars().count(), 249);
}

#[test]
fn open_before_build_names_the_index() {
    let (_temp_dir, config) = setup();

    let error = KnowledgeBase::open(&config, TopicEmbedder).expect_err("nothing built");
    assert!(matches!(error, KnowerError::Index(_)));
    assert!(error.to_string().contains("papers.index"));
}

#[test]
fn manual_pipeline_matches_knowledge_base() {
    let (_temp_dir, config) = setup();
    let rows = vec![
        CorpusRow::new("A", "https://a", "attention attention"),
        CorpusRow::new("B", "https://b", "diffusion models"),
    ];

    let mut pipeline = IndexPipeline::new(config.chunking.corpus_chunk_size);
    pipeline.ingest_rows(&rows).expect("should ingest");
    pipeline.build_index(&TopicEmbedder).expect("should build");
    assert_eq!(pipeline.state(), PipelineState::Indexed);

    let path = config.index_path();
    pipeline.persist(&path).expect("should persist");
    let loaded = FlatIndex::load(&path).expect("should load");
    assert_eq!(Some(&loaded), pipeline.index());

    let retriever = pipeline.into_retriever(TopicEmbedder).expect("should open");
    let retrieval = retriever.retrieve("diffusion", 1).expect("should retrieve");
    assert_eq!(retrieval.hits[0].metadata.url, "https://b");
}
