//! Dataset sync
//!
//! Mirrors a local dataset (face-swapped images, caption files and one
//! `meta.jsonl`) into an object store under a key prefix. A run goes through
//! three phases in strict order:
//!
//! 1. **delete** every object already under the prefix, page by page;
//! 2. **collect** the local files to upload and derive their object keys;
//! 3. **upload** them one at a time.
//!
//! A listing or delete failure aborts the run before anything is uploaded.
//! Upload failures are recorded per file and the loop carries on.

pub mod collect;
pub mod delete;
pub mod report;
pub mod upload;

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::{ConfigError, StorageConfig};
use crate::storage::{ObjectStore, StorageError};

pub use collect::{collect_sources, Category, FileEntry, SourceOutcome};
pub use delete::delete_prefix;
pub use report::{SyncReport, UploadFailure};
pub use upload::{content_type_for, upload_entry, UploadOutcome};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("failed to clear existing objects: {0}")]
    Delete(#[source] StorageError),
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Where a run writes to. Built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub bucket: String,
    /// Always non-empty and ending in `/`.
    pub key_prefix: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub credentials: Credentials,
}

impl SyncTarget {
    pub fn new(
        bucket: impl Into<String>,
        key_prefix: &str,
        region: impl Into<String>,
        endpoint: Option<String>,
        credentials: Credentials,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            bucket: bucket.into(),
            key_prefix: normalize_prefix(key_prefix)?,
            region: region.into(),
            endpoint,
            credentials,
        })
    }

    /// Resolve a target from storage settings, failing when credentials are absent.
    pub fn from_storage_config(
        storage: &StorageConfig,
        bucket: Option<String>,
        key_prefix: &str,
    ) -> Result<Self, ConfigError> {
        let (Some(access_key), Some(secret_key)) = (
            storage.s3_access_key_id.as_ref(),
            storage.s3_secret_access_key.as_ref(),
        ) else {
            return Err(ConfigError::MissingCredentials);
        };

        Self::new(
            bucket.unwrap_or_else(|| storage.s3_bucket.clone()),
            key_prefix,
            storage.s3_region.clone(),
            storage.s3_endpoint.clone(),
            Credentials::new(access_key.clone(), secret_key.clone()),
        )
    }

    pub fn location(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key_prefix)
    }
}

/// Trim surrounding slashes and append exactly one. An empty prefix would
/// make the delete phase clear the whole bucket, so it is refused.
fn normalize_prefix(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyPrefix);
    }
    Ok(format!("{}/", trimmed))
}

/// Local inputs. Any of them may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet {
    pub images_dir: Option<PathBuf>,
    pub captions_dir: Option<PathBuf>,
    pub meta_file: Option<PathBuf>,
}

impl SourceSet {
    /// Per-model layout: images live with the model, captions and meta
    /// under the shared dataset tree.
    pub fn for_model(models_root: &Path, model: &str) -> Self {
        let dataset = models_root.join("dataset").join(model);
        Self {
            images_dir: Some(models_root.join(model).join("outputs").join("faceswapped")),
            captions_dir: Some(dataset.join("captions")),
            meta_file: Some(dataset.join("meta").join("meta.jsonl")),
        }
    }

    /// Single dataset root holding all three categories.
    pub fn for_dataset(dataset_root: &Path) -> Self {
        Self {
            images_dir: Some(dataset_root.join("outputs").join("faceswapped")),
            captions_dir: Some(dataset_root.join("captions")),
            meta_file: Some(dataset_root.join("meta").join("meta.jsonl")),
        }
    }
}

/// Run a full sync: delete, collect, upload.
///
/// Returns an error only when the delete phase fails; per-file upload
/// failures end up in [`SyncReport::failures`].
pub async fn sync(
    store: &dyn ObjectStore,
    target: &SyncTarget,
    sources: &SourceSet,
) -> Result<SyncReport, SyncError> {
    info!(
        bucket = %store.bucket(),
        prefix = %target.key_prefix,
        region = %target.region,
        "Starting sync"
    );

    let mut report = SyncReport::default();

    report.deleted_count = delete_prefix(store, &target.key_prefix)
        .await
        .map_err(SyncError::Delete)?;
    info!(deleted = report.deleted_count, "Cleared existing objects");

    let entries = collect_sources(&target.key_prefix, sources);
    if entries.is_empty() {
        warn!("No files to upload");
        return Ok(report);
    }

    info!(count = entries.len(), "Uploading files");
    let total = entries.len();
    for (index, entry) in entries.iter().enumerate() {
        let outcome = upload_entry(store, entry).await;
        match &outcome {
            UploadOutcome::Uploaded => info!(
                index = index + 1,
                total,
                key = %entry.object_key,
                "Uploaded"
            ),
            UploadOutcome::Failed(reason) => warn!(
                index = index + 1,
                total,
                key = %entry.object_key,
                error = %reason,
                "Upload failed"
            ),
        }
        report.record(entry, outcome);
    }

    info!(
        uploaded = report.uploaded_count,
        failed = report.failed_count,
        "Sync complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials::new("AKIDEXAMPLE", "secret")
    }

    #[test]
    fn test_prefix_normalization() {
        let target = SyncTarget::new("b", "blondie", "us-east-2", None, credentials()).unwrap();
        assert_eq!(target.key_prefix, "blondie/");

        let target = SyncTarget::new("b", "/models/blondie//", "us-east-2", None, credentials()).unwrap();
        assert_eq!(target.key_prefix, "models/blondie/");
        assert_eq!(target.location(), "s3://b/models/blondie/");
    }

    #[test]
    fn test_empty_prefix_is_rejected() {
        for raw in ["", "/", "  ", "//"] {
            let err = SyncTarget::new("b", raw, "us-east-2", None, credentials()).unwrap_err();
            assert!(matches!(err, ConfigError::EmptyPrefix), "{:?}", raw);
        }
    }

    #[test]
    fn test_missing_credentials() {
        let storage = StorageConfig {
            s3_bucket: "modelcrew".to_string(),
            s3_region: "us-east-2".to_string(),
            s3_access_key_id: Some("AKIDEXAMPLE".to_string()),
            s3_secret_access_key: None,
            s3_endpoint: None,
            s3_prefix: None,
        };
        let err = SyncTarget::from_storage_config(&storage, None, "blondie").unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials));
    }

    #[test]
    fn test_bucket_override() {
        let storage = StorageConfig {
            s3_bucket: "modelcrew".to_string(),
            s3_region: "us-east-2".to_string(),
            s3_access_key_id: Some("AKIDEXAMPLE".to_string()),
            s3_secret_access_key: Some("secret".to_string()),
            s3_endpoint: None,
            s3_prefix: None,
        };
        let target =
            SyncTarget::from_storage_config(&storage, Some("other".to_string()), "blondie").unwrap();
        assert_eq!(target.bucket, "other");
        assert_eq!(target.credentials, credentials());
    }

    #[test]
    fn test_credentials_debug_hides_secret() {
        let rendered = format!("{:?}", Credentials::new("AKIDEXAMPLE", "hunter2"));
        assert!(rendered.contains("AKIDEXAMPLE"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_model_layout() {
        let sources = SourceSet::for_model(Path::new("/workspaces/models"), "blondie");
        assert_eq!(
            sources.images_dir.unwrap(),
            PathBuf::from("/workspaces/models/blondie/outputs/faceswapped")
        );
        assert_eq!(
            sources.captions_dir.unwrap(),
            PathBuf::from("/workspaces/models/dataset/blondie/captions")
        );
        assert_eq!(
            sources.meta_file.unwrap(),
            PathBuf::from("/workspaces/models/dataset/blondie/meta/meta.jsonl")
        );
    }
}
