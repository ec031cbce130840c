use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] context_vector_store::VectorStoreError),

    #[error("Graph error: {0}")]
    GraphError(#[from] context_graph::GraphError),

    #[error("Chunker error: {0}")]
    ChunkerError(#[from] context_code_chunker::ChunkerError),

    #[error("Cache error: {0}")]
    CacheError(#[from] context_cache::CacheError),

    #[error("Invalid config: {0}")]
    ConfigError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Empty query")]
    EmptyQuery,

    #[error("{0}")]
    Other(String),
}
