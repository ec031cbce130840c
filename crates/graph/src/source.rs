use crate::error::{GraphError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Where the graph builder reads file contents from
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// `Ok(None)` when the file does not exist
    async fn read_source(&self, path: &str) -> Result<Option<String>>;
}

/// Reads files relative to a project root
#[derive(Debug, Clone)]
pub struct FsSourceReader {
    root: PathBuf,
}

impl FsSourceReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

#[async_trait]
impl SourceReader for FsSourceReader {
    async fn read_source(&self, path: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.root.join(path)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GraphError::read(path, e)),
        }
    }
}

/// In-memory file set
#[derive(Debug, Clone, Default)]
pub struct MemorySourceReader {
    files: HashMap<String, String>,
}

impl MemorySourceReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.files.keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl SourceReader for MemorySourceReader {
    async fn read_source(&self, path: &str) -> Result<Option<String>> {
        Ok(self.files.get(path).cloned())
    }
}
