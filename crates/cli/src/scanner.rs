use context_code_chunker::Language;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Files bigger than this are not worth parsing
const MAX_FILE_SIZE_BYTES: u64 = 1024 * 1024;

const IGNORED_SCOPES: &[&str] = &[
    ".git",
    ".context",
    "node_modules",
    ".next",
    ".turbo",
    ".cache",
    "build",
    "dist",
    "coverage",
    "out",
    "target",
    "vendor",
];

/// Finds TypeScript / JavaScript sources under a project root
pub struct FileScanner {
    root: PathBuf,
}

impl FileScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Sorted project-relative paths with `/` separators (.gitignore aware)
    pub fn scan(&self) -> Vec<String> {
        let mut files = Vec::new();

        let root = self.root.clone();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true);
        builder.filter_entry(move |entry| !is_ignored_scope(entry.path(), &root));

        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Failed to read entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let path = entry.path();
            if !Language::from_path(path).supports_ast() {
                continue;
            }
            if let Ok(meta) = entry.metadata() {
                if meta.len() > MAX_FILE_SIZE_BYTES {
                    log::debug!("Skipping large file {} ({} bytes)", path.display(), meta.len());
                    continue;
                }
            }

            if let Some(relative) = self.relative(path) {
                files.push(relative);
            }
        }

        files.sort();
        log::info!("Found {} source files", files.len());
        files
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

fn is_ignored_scope(path: &Path, root: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    relative.components().any(|component| match component {
        std::path::Component::Normal(name) => {
            let lowered = name.to_string_lossy().to_lowercase();
            IGNORED_SCOPES.contains(&lowered.as_str())
        }
        _ => false,
    })
}
