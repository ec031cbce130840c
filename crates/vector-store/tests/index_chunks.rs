use context_cache::EmbeddingCache;
use context_code_chunker::{Chunker, ChunkerConfig};
use context_vector_store::{Embedder, ResilientEmbedder, VectorIndex, VectorRecord};
use pretty_assertions::assert_eq;
use std::time::Duration;

#[tokio::test]
async fn chunks_are_searchable_by_their_own_text() {
    let mut chunker = Chunker::new(ChunkerConfig::default()).unwrap();
    let chunks = chunker
        .chunk_str(
            "export function parseConfig() {\n  return {};\n}\n\nexport class Server {\n  start() {}\n}\n",
            "src/server.ts",
        )
        .unwrap();
    assert_eq!(chunks.len(), 2);

    let embedder = ResilientEmbedder::hash_only(64, EmbeddingCache::new(32, Duration::from_secs(60)));
    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let vectors = embedder.embed(&texts).await.unwrap();

    let mut index = VectorIndex::new();
    index
        .upsert_many(
            chunks
                .iter()
                .zip(vectors)
                .map(|(chunk, vector)| VectorRecord::from_chunk(chunk, vector)),
        )
        .unwrap();

    let query = embedder.embed(&[texts[1].clone()]).await.unwrap();
    let hits = index.query(&query[0], 2).unwrap();

    assert_eq!(hits[0].record.id, "src/server.ts:5:7");
    assert_eq!(hits[0].record.metadata["symbol"], "Server");
    assert_eq!(hits[0].record.metadata["file_path"], "src/server.ts");
    assert!(hits[0].score > hits[1].score);
}
