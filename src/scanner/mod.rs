//! Dataset discovery.
//!
//! Finds dataset files under a directory, honoring the configured excludes
//! and file limit.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Extensions recognized as dataset files.
pub const DATASET_EXTENSIONS: &[&str] = &["json", "toml"];

/// Configuration for dataset scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Directory or file names to skip (e.g. ["node_modules", "target"])
    pub excludes: Vec<String>,
    /// Maximum number of datasets to return
    pub max_files: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            excludes: vec!["target", "node_modules", "dist", "build"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_files: None,
        }
    }
}

impl From<&crate::config::ScannerConfig> for ScanConfig {
    fn from(config: &crate::config::ScannerConfig) -> Self {
        Self {
            excludes: config.excludes.clone(),
            max_files: Some(config.max_files),
        }
    }
}

/// Scanner for dataset files.
pub struct DatasetScanner {
    config: ScanConfig,
    root: PathBuf,
}

impl DatasetScanner {
    /// Create a new scanner rooted at a file or directory.
    pub fn new(root: PathBuf, config: ScanConfig) -> Self {
        Self { config, root }
    }

    /// Return dataset paths, sorted.
    ///
    /// A file root is returned as-is, whatever its extension, so a wrong
    /// path surfaces as a load error instead of an empty run.
    pub fn scan(&self) -> Result<Vec<PathBuf>> {
        if self.root.is_file() {
            return Ok(vec![self.root.clone()]);
        }

        if !self.root.is_dir() {
            anyhow::bail!("Data path not found: {}", self.root.display());
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_excluded(e));

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if entry.file_type().is_file() && is_dataset(entry.path()) {
                files.push(entry.into_path());
            }
        }

        files.sort();

        if let Some(max) = self.config.max_files {
            if files.len() > max {
                debug!("Limiting {} datasets to {}", files.len(), max);
                files.truncate(max);
            }
        }

        Ok(files)
    }

    /// Path relative to the scan root, for display.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }

    /// Check if an entry matches exclusion patterns.
    fn is_excluded(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();

        // Hidden files and directories
        if name.starts_with('.') {
            return true;
        }

        self.config.excludes.iter().any(|pattern| name == pattern.as_str())
    }
}

/// Check whether a path has a dataset extension.
pub fn is_dataset(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| DATASET_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Scan `root` and fail when nothing is found.
pub fn discover(root: &Path, config: &ScanConfig) -> Result<Vec<PathBuf>> {
    let scanner = DatasetScanner::new(root.to_path_buf(), config.clone());
    let files = scanner
        .scan()
        .with_context(|| format!("Failed to scan {}", root.display()))?;

    if files.is_empty() {
        anyhow::bail!("No dataset files (.json, .toml) found in {}", root.display());
    }

    Ok(files)
}
