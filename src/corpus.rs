// Corpus enumeration

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Result, SweepError};

/// A source file found under the corpus root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusFile {
    /// Path handed to the extractor
    pub path: PathBuf,
    /// Path relative to the corpus root, as stored in `fs`
    pub relative: PathBuf,
}

impl CorpusFile {
    pub fn display_path(&self) -> String {
        self.relative.to_string_lossy().to_string()
    }
}

/// Walks a root directory for files with the configured suffixes
///
/// Entries are visited sorted by file name, so a fixed directory snapshot
/// always yields the same order and therefore the same file ids.
pub struct CorpusEnumerator {
    root: PathBuf,
    suffixes: Vec<String>,
}

impl CorpusEnumerator {
    pub fn new(root: impl Into<PathBuf>, suffixes: Vec<String>) -> Self {
        Self {
            root: root.into(),
            suffixes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.dir, config.suffixes.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn enumeration_error(&self, reason: impl Into<String>) -> SweepError {
        SweepError::Enumeration {
            root: self.root.clone(),
            reason: reason.into(),
        }
    }

    /// Whether a path carries one of the source suffixes
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.suffixes.iter().any(|s| s == ext))
            .unwrap_or(false)
    }

    /// Lazily walk the corpus
    ///
    /// Fails up front if the root is missing or not a directory; read errors
    /// further down surface as `Err` items.
    pub fn iter(&self) -> Result<impl Iterator<Item = Result<CorpusFile>> + '_> {
        let metadata = std::fs::metadata(&self.root).map_err(|e| self.enumeration_error(e.to_string()))?;
        if !metadata.is_dir() {
            return Err(self.enumeration_error("not a directory"));
        }

        let walker = WalkDir::new(&self.root).sort_by_file_name().into_iter();

        Ok(walker.filter_map(move |entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => return Some(Err(self.enumeration_error(e.to_string()))),
            };

            // Follows links for the entry itself, so symlinked sources count
            if !entry.path().is_file() || !self.matches(entry.path()) {
                return None;
            }

            let path = entry.into_path();
            let relative = path
                .strip_prefix(&self.root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.clone());

            if relative.to_string_lossy().trim().is_empty() {
                debug!("Skipping blank path under {}", self.root.display());
                return None;
            }

            Some(Ok(CorpusFile { path, relative }))
        }))
    }

    /// Walk the whole corpus, failing if any part of it cannot be read
    pub fn collect_files(&self) -> Result<Vec<CorpusFile>> {
        let files = self.iter()?.collect::<Result<Vec<_>>>()?;
        info!("Found {} source files under {}", files.len(), self.root.display());
        Ok(files)
    }
}
