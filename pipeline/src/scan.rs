//! Input tree scanning.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::{PipelineError, Result};

/// Rules for selecting report files under an input directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub recursive: bool,
    /// Lowercase extensions without the dot.
    pub extensions: Vec<String>,
    /// Directory names skipped wherever they appear.
    pub ignored_directories: Vec<String>,
    /// Paths skipped entirely, such as an output tree inside the input tree.
    pub excluded_paths: Vec<PathBuf>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            extensions: vec!["md".to_string()],
            ignored_directories: Vec::new(),
            excluded_paths: Vec::new(),
        }
    }
}

/// A report file found during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedDocument {
    /// Location on disk.
    pub path: PathBuf,
    /// Path relative to the scan root with `/` separators.
    pub name: String,
}

impl ScannedDocument {
    /// Final path component of [`name`](Self::name).
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// Result of scanning one input directory.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Matching documents sorted by relative name.
    pub documents: Vec<ScannedDocument>,
    /// Regular files skipped because of their extension.
    pub ignored_files: usize,
}

/// Collects report files under `root`.
///
/// # Errors
///
/// Returns [`InvalidInput`](PipelineError::InvalidInput) if `root` is not an
/// existing directory. Unreadable entries below the root are logged and
/// skipped.
pub fn collect_documents(root: &Path, options: &ScanOptions) -> Result<ScanOutcome> {
    if !root.is_dir() {
        return Err(PipelineError::InvalidInput(format!(
            "input directory does not exist: {}",
            root.display()
        )));
    }

    let canonical_root = canonical(root);
    let excluded: Vec<PathBuf> = options.excluded_paths.iter().map(|p| canonical(p)).collect();
    let skip = |entry: &DirEntry| -> bool {
        if entry.depth() == 0 {
            return false;
        }
        if entry.file_type().is_dir() && is_ignored_dir(entry, &options.ignored_directories) {
            return true;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let resolved = canonical_root.join(relative);
        excluded.iter().any(|path| resolved.starts_with(path))
    };

    let walker = WalkDir::new(root)
        .follow_links(false)
        .max_depth(if options.recursive { usize::MAX } else { 1 })
        .into_iter()
        .filter_entry(|entry| !skip(entry));

    let mut outcome = ScanOutcome::default();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        if has_extension(entry.path(), &options.extensions) {
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            outcome.documents.push(ScannedDocument {
                path: entry.path().to_path_buf(),
                name: relative_name(relative),
            });
        } else {
            outcome.ignored_files += 1;
        }
    }

    outcome.documents.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(
        root = %root.display(),
        documents = outcome.documents.len(),
        ignored = outcome.ignored_files,
        "scan complete"
    );
    Ok(outcome)
}

/// Joins the normal components of `path` with `/`.
pub fn relative_name(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext)))
}

fn is_ignored_dir(entry: &DirEntry, ignored: &[String]) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| ignored.iter().any(|dir| dir == name))
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    fn names(outcome: &ScanOutcome) -> Vec<&str> {
        outcome.documents.iter().map(|doc| doc.name.as_str()).collect()
    }

    #[test]
    fn test_collects_matching_extensions_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.md");
        touch(dir.path(), "a.MD");
        touch(dir.path(), "notes.txt");

        let outcome = collect_documents(dir.path(), &ScanOptions::default()).unwrap();
        assert_eq!(names(&outcome), vec!["a.MD", "b.md"]);
        assert_eq!(outcome.ignored_files, 1);
    }

    #[test]
    fn test_recursive_and_flat_scans() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "top.md");
        touch(dir.path(), "2024/march/240313_Cams.md");

        let deep = collect_documents(dir.path(), &ScanOptions::default()).unwrap();
        assert_eq!(names(&deep), vec!["2024/march/240313_Cams.md", "top.md"]);

        let flat = ScanOptions {
            recursive: false,
            ..ScanOptions::default()
        };
        let shallow = collect_documents(dir.path(), &flat).unwrap();
        assert_eq!(names(&shallow), vec!["top.md"]);
    }

    #[test]
    fn test_skips_ignored_directories_anywhere() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "keep.md");
        touch(dir.path(), "drafts/skip.md");
        touch(dir.path(), "site/drafts/skip.md");

        let options = ScanOptions {
            ignored_directories: vec!["drafts".to_string()],
            ..ScanOptions::default()
        };
        let outcome = collect_documents(dir.path(), &options).unwrap();
        assert_eq!(names(&outcome), vec!["keep.md"]);
    }

    #[test]
    fn test_skips_excluded_output_tree() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.md");
        touch(dir.path(), "_out/validated/valid/a.md");

        let options = ScanOptions {
            excluded_paths: vec![dir.path().join("_out")],
            ..ScanOptions::default()
        };
        let outcome = collect_documents(dir.path(), &options).unwrap();
        assert_eq!(names(&outcome), vec!["a.md"]);
    }

    #[test]
    fn test_missing_root_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = collect_documents(&dir.path().join("absent"), &ScanOptions::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[test]
    fn test_empty_directory_yields_no_documents() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = collect_documents(dir.path(), &ScanOptions::default()).unwrap();
        assert!(outcome.documents.is_empty());
        assert_eq!(outcome.ignored_files, 0);
    }
}
