//! Collect phase: turn the configured sources into upload entries.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use super::SourceSet;

/// Kind of dataset file, which fixes both its extension filter and its key
/// layout under the prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Images,
    Captions,
    Meta,
}

impl Category {
    pub fn key_segment(self) -> &'static str {
        match self {
            Category::Images => "outputs/faceswapped",
            Category::Captions => "captions",
            Category::Meta => "meta",
        }
    }

    fn extensions(self) -> &'static [&'static str] {
        match self {
            Category::Images => &["jpg", "jpeg"],
            Category::Captions => &["txt"],
            Category::Meta => &["jsonl"],
        }
    }

    /// Whether `path` carries one of this category's extensions (case-insensitive).
    pub fn accepts(self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.extensions()
                    .iter()
                    .any(|allowed| ext.eq_ignore_ascii_case(allowed))
            })
            .unwrap_or(false)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Images => write!(f, "images"),
            Category::Captions => write!(f, "captions"),
            Category::Meta => write!(f, "meta"),
        }
    }
}

/// A local file paired with the object key it is uploaded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub local_path: PathBuf,
    pub object_key: String,
    pub category: Category,
}

/// What one source contributed to the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    Found(Vec<FileEntry>),
    Skipped(String),
}

/// Collect every file to upload, in category order (images, captions, meta).
///
/// Missing sources are logged and skipped. When two files map to the same
/// key only the first is kept.
pub fn collect_sources(key_prefix: &str, sources: &SourceSet) -> Vec<FileEntry> {
    let outcomes = [
        (
            Category::Images,
            collect_dir(key_prefix, sources.images_dir.as_deref(), Category::Images),
        ),
        (
            Category::Captions,
            collect_dir(key_prefix, sources.captions_dir.as_deref(), Category::Captions),
        ),
        (
            Category::Meta,
            collect_meta(key_prefix, sources.meta_file.as_deref()),
        ),
    ];

    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for (category, outcome) in outcomes {
        match outcome {
            SourceOutcome::Found(found) => {
                info!(category = %category, count = found.len(), "Collected files");
                for entry in found {
                    if seen.insert(entry.object_key.clone()) {
                        entries.push(entry);
                    } else {
                        warn!(
                            key = %entry.object_key,
                            path = %entry.local_path.display(),
                            "Duplicate object key, skipping file"
                        );
                    }
                }
            }
            SourceOutcome::Skipped(reason) => {
                warn!(category = %category, reason = %reason, "Source skipped");
            }
        }
    }
    entries
}

/// Walk `dir` recursively for files accepted by `category`.
///
/// Images keep their path relative to `dir`; captions are flattened to their
/// file name.
pub fn collect_dir(key_prefix: &str, dir: Option<&Path>, category: Category) -> SourceOutcome {
    let Some(dir) = dir else {
        return SourceOutcome::Skipped("not configured".to_string());
    };
    if !dir.is_dir() {
        return SourceOutcome::Skipped(format!("directory not found: {}", dir.display()));
    }

    let mut entries = Vec::new();
    for entry_result in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Failed to read directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() || !category.accepts(entry.path()) {
            continue;
        }

        let name = match category {
            Category::Images => relative_key(dir, entry.path()),
            _ => entry.file_name().to_str().map(str::to_string),
        };
        let Some(name) = name else {
            warn!(path = %entry.path().display(), "Skipping file with non UTF-8 name");
            continue;
        };

        entries.push(FileEntry {
            local_path: entry.path().to_path_buf(),
            object_key: format!("{}{}/{}", key_prefix, category.key_segment(), name),
            category,
        });
    }
    SourceOutcome::Found(entries)
}

/// The single metadata file, uploaded under a fixed key.
pub fn collect_meta(key_prefix: &str, meta_file: Option<&Path>) -> SourceOutcome {
    let Some(path) = meta_file else {
        return SourceOutcome::Skipped("not configured".to_string());
    };
    if !path.is_file() {
        return SourceOutcome::Skipped(format!("file not found: {}", path.display()));
    }
    SourceOutcome::Found(vec![FileEntry {
        local_path: path.to_path_buf(),
        object_key: format!("{}{}/meta.jsonl", key_prefix, Category::Meta.key_segment()),
        category: Category::Meta,
    }])
}

/// `path` relative to `root`, joined with `/` whatever the platform.
fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    parts.map(|parts| parts.join("/"))
}
