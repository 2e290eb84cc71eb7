//! Report discovery and text extraction.
//!
//! Walks a directory tree for simulation reports and turns each one into
//! plain text for the extraction step.

mod text;

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

pub use text::{DocumentTextExtractor, TextExtractor};

// ---------------------------------------------------------------------------
// Discovery options
// ---------------------------------------------------------------------------

/// Configuration for the discovery walk.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// File extensions treated as reports, without the dot. Matched case-insensitively.
    pub extensions: Vec<String>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["pdf".into()],
        }
    }
}

impl From<&simreport_shared::DiscoveryConfig> for DiscoveryOptions {
    fn from(config: &simreport_shared::DiscoveryConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
        }
    }
}

impl DiscoveryOptions {
    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Find every report file under `root`, recursively.
///
/// Results are sorted by path so processing order is stable across runs.
/// A missing root yields an empty list; unreadable entries are skipped.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn discover(root: &Path, opts: &DiscoveryOptions) -> Vec<PathBuf> {
    if !root.is_dir() {
        warn!(root = %root.display(), "reports directory does not exist or is not a directory");
        return Vec::new();
    }

    let mut reports: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| opts.matches(path))
        .collect();

    reports.sort();

    for path in &reports {
        debug!(path = %path.display(), "found report");
    }
    info!(count = reports.len(), "report discovery complete");

    reports
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, b"x").unwrap();
    }

    #[test]
    fn discovers_nested_reports_sorted() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b_report.pdf"));
        touch(&dir.path().join("a/deep/report.pdf"));
        touch(&dir.path().join("a/notes.txt"));
        touch(&dir.path().join("c_report.PDF"));

        let found = discover(dir.path(), &DiscoveryOptions::default());
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();

        assert_eq!(names, vec!["a/deep/report.pdf", "b_report.pdf", "c_report.PDF"]);
    }

    #[test]
    fn custom_extensions() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("one.txt"));
        touch(&dir.path().join("two.pdf"));

        let opts = DiscoveryOptions {
            extensions: vec![".txt".into()],
        };
        let found = discover(dir.path(), &opts);
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("one.txt"));
    }

    #[test]
    fn missing_root_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let found = discover(&dir.path().join("absent"), &DiscoveryOptions::default());
        assert!(found.is_empty());
    }
}
