//! Upload phase helpers.

use std::path::Path;
use tracing::debug;

use super::FileEntry;
use crate::storage::ObjectStore;

pub const IMAGE_JPEG: &str = "image/jpeg";
pub const TEXT_PLAIN: &str = "text/plain";
pub const APPLICATION_JSONL: &str = "application/jsonl";
pub const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";

/// Result of uploading a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded,
    Failed(String),
}

/// Content type for `path`, decided by extension alone.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => IMAGE_JPEG,
        Some("txt") => TEXT_PLAIN,
        Some("jsonl") => APPLICATION_JSONL,
        _ => APPLICATION_OCTET_STREAM,
    }
}

/// Read `entry` from disk and put it. Errors never escape; they become
/// [`UploadOutcome::Failed`].
pub async fn upload_entry(store: &dyn ObjectStore, entry: &FileEntry) -> UploadOutcome {
    let content = match tokio::fs::read(&entry.local_path).await {
        Ok(content) => content,
        Err(e) => {
            return UploadOutcome::Failed(format!(
                "failed to read {}: {}",
                entry.local_path.display(),
                e
            ))
        }
    };

    let content_type = content_type_for(&entry.local_path);
    debug!(
        key = %entry.object_key,
        bytes = content.len(),
        content_type,
        "Putting object"
    );

    match store.put_object(&entry.object_key, &content, content_type).await {
        Ok(()) => UploadOutcome::Uploaded,
        Err(e) => UploadOutcome::Failed(e.to_string()),
    }
}
