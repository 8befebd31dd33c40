//! End-to-end chunk → build → search runs with the hashing embedder

use std::path::Path;

use healthrag_core::embedding::EmbeddingProvider;
use healthrag_core::{
    read_records, ChunkConfig, Chunker, EmbeddingEngine, HashEmbedder, IndexStore, Indexer, RagError,
    Retriever, SearchConfig, SearchSettings,
};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn corpus(root: &Path) {
    write(
        root,
        "en/malaria.txt",
        "Malaria is caused by parasites transmitted through the bites of infected mosquitoes. \
         Symptoms include fever, chills and headache. Sleep under treated bed nets.",
    );
    write(
        root,
        "ta/fever.txt",
        "காய்ச்சல் உடல் வெப்பநிலை அதிகரிப்பு. நிறைய தண்ணீர் குடிக்கவும் ஓய்வு எடுக்கவும்.",
    );
    write(
        root,
        "docs/en_general/handwashing.txt",
        "Wash hands with soap and clean water for twenty seconds before eating and after using the toilet.",
    );
    write(root, "hi/blank.txt", "   \n\t  \n");
}

fn engine() -> EmbeddingEngine {
    EmbeddingEngine::new(Box::new(HashEmbedder::new(256)), 4)
}

struct Fixture {
    _dir: TempDir,
    chunk_path: std::path::PathBuf,
    store: IndexStore,
}

fn build(config: ChunkConfig) -> Fixture {
    let dir = TempDir::new().unwrap();
    let text_dir = dir.path().join("data_text");
    corpus(&text_dir);
    let chunk_path = dir.path().join("data_chunks").join("chunks.jsonl");
    let store = IndexStore::new(dir.path().join("vector_index"));

    Chunker::new(config).unwrap().run(&text_dir, &chunk_path).unwrap();
    let engine = engine();
    Indexer::new(&engine)
        .build_and_publish(&chunk_path, None, &store)
        .unwrap();

    Fixture {
        _dir: dir,
        chunk_path,
        store,
    }
}

#[test]
fn every_chunk_retrieves_itself_first() {
    let fx = build(ChunkConfig::new(8, 2).unwrap());
    let engine = engine();
    let retriever = Retriever::open(&fx.store, &engine, &SearchSettings::default()).unwrap();
    let records = read_records(&fx.chunk_path, None).unwrap();
    assert!(records.len() > 3);

    for (row, record) in records.iter().enumerate() {
        let hits = retriever.search(&record.text, 5).unwrap();
        assert_eq!(hits[0].record.text, record.text, "row {row}");
        assert!((hits[0].score - 1.0).abs() < 1e-4);
    }
}

#[test]
fn metadata_rows_match_vector_rows() {
    let fx = build(ChunkConfig::new(8, 2).unwrap());
    let loaded = fx.store.load().unwrap();
    let chunks = read_records(&fx.chunk_path, None).unwrap();
    assert_eq!(loaded.records, chunks);

    let embedder = HashEmbedder::new(256);
    for (row, record) in loaded.records.iter().enumerate() {
        let expected = &embedder.embed(&[record.text.as_str()]).unwrap()[0];
        let stored = loaded.index.row(row).unwrap();
        let diff: f32 = expected.iter().zip(stored).map(|(a, b)| (a - b).abs()).sum();
        assert!(diff < 1e-5, "row {row} does not match its record");
    }
}

#[test]
fn languages_and_blank_files() {
    let fx = build(ChunkConfig::default());
    let records = read_records(&fx.chunk_path, None).unwrap();

    // One chunk per non-blank document at the default window size
    assert_eq!(records.len(), 3);
    let lang = |source: &str| {
        records
            .iter()
            .find(|r| r.source == source)
            .map(|r| r.language.clone())
    };
    assert_eq!(lang("ta/fever.txt").as_deref(), Some("ta"));
    assert_eq!(lang("en/malaria.txt").as_deref(), Some("en"));
    assert_eq!(lang("docs/en_general/handwashing.txt").as_deref(), Some("en"));
    assert!(lang("hi/blank.txt").is_none());
}

#[test]
fn tamil_query_finds_tamil_chunk() {
    let fx = build(ChunkConfig::default());
    let engine = engine();
    let retriever = Retriever::open(&fx.store, &engine, &SearchSettings::default()).unwrap();
    let hits = retriever.search("காய்ச்சல் தண்ணீர்", 1).unwrap();
    assert_eq!(hits[0].record.source, "ta/fever.txt");
}

#[test]
fn min_score_drops_weak_hits() {
    let fx = build(ChunkConfig::default());
    let engine = engine();
    let retriever = Retriever::open(&fx.store, &engine, &SearchSettings::default()).unwrap();

    let all = retriever.search("soap water hands", 3).unwrap();
    assert_eq!(all.len(), 3);
    let filtered = retriever
        .search_with(
            "soap water hands",
            &SearchConfig {
                top_k: 3,
                min_score: Some(all[0].score - 1e-3),
            },
        )
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].record.source, "docs/en_general/handwashing.txt");
}

#[test]
fn stale_metadata_is_refused() {
    let fx = build(ChunkConfig::new(8, 2).unwrap());

    // Drop the last metadata line, as a crash between two unbound writes would
    let meta = std::fs::read_to_string(fx.store.metadata_path()).unwrap();
    let mut lines: Vec<&str> = meta.lines().collect();
    lines.pop();
    std::fs::write(fx.store.metadata_path(), lines.join("\n") + "\n").unwrap();

    let engine = engine();
    let err = Retriever::open(&fx.store, &engine, &SearchSettings::default())
        .err()
        .unwrap();
    assert!(matches!(err, RagError::SchemaMismatch(_)));
}

#[test]
fn different_model_is_refused() {
    let fx = build(ChunkConfig::default());
    let other = EmbeddingEngine::new(Box::new(HashEmbedder::new(64)), 4);
    let err = Retriever::open(&fx.store, &other, &SearchSettings::default())
        .err()
        .unwrap();
    assert!(matches!(err, RagError::SchemaMismatch(_)));
}

/// Returns one vector too few for every batch
struct ShortBatch;

impl EmbeddingProvider for ShortBatch {
    fn embed(&self, texts: &[&str]) -> healthrag_core::Result<Vec<Vec<f32>>> {
        Ok(vec![vec![1.0, 0.0]; texts.len().saturating_sub(1)])
    }
    fn dimension(&self) -> usize {
        2
    }
    fn model_name(&self) -> &str {
        "short-batch"
    }
}

#[test]
fn provider_failure_publishes_nothing() {
    let dir = TempDir::new().unwrap();
    let text_dir = dir.path().join("data_text");
    corpus(&text_dir);
    let chunk_path = dir.path().join("chunks.jsonl");
    Chunker::new(ChunkConfig::default())
        .unwrap()
        .run(&text_dir, &chunk_path)
        .unwrap();

    let store = IndexStore::new(dir.path().join("vector_index"));
    let engine = EmbeddingEngine::new(Box::new(ShortBatch), 64);
    let err = Indexer::new(&engine)
        .build_and_publish(&chunk_path, None, &store)
        .unwrap_err();

    assert!(matches!(err, RagError::Provider(_)));
    assert!(!store.exists());
    assert!(!store.metadata_path().exists());
}

#[test]
fn rebuild_replaces_previous_index() {
    let fx = build(ChunkConfig::new(8, 2).unwrap());
    let before = fx.store.info().unwrap();

    let records = read_records(&fx.chunk_path, Some(2)).unwrap();
    let engine = engine();
    let index = Indexer::new(&engine).build(&records).unwrap();
    fx.store.publish(&index, &records, engine.model_name()).unwrap();

    let after = fx.store.info().unwrap();
    assert!(before.rows > 2);
    assert_eq!(after.rows, 2);
    assert_ne!(before.metadata_sha256, after.metadata_sha256);
}
