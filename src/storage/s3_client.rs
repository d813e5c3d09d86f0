// S3 client backed by rust-s3

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use tracing::debug;

use super::{ObjectPage, ObjectStore, StorageError, MAX_LIST_KEYS};
use crate::sync::SyncTarget;

pub struct S3Store {
    bucket: Bucket,
}

impl S3Store {
    /// Open the bucket named by `target`. No request is sent yet.
    pub fn connect(target: &SyncTarget) -> Result<Self, StorageError> {
        let setup_error = |reason: String| StorageError::Setup {
            bucket: target.bucket.clone(),
            reason,
        };

        let credentials = Credentials::new(
            Some(&target.credentials.access_key),
            Some(&target.credentials.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| setup_error(e.to_string()))?;

        let region = match &target.endpoint {
            Some(endpoint) => Region::Custom {
                region: target.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => target
                .region
                .parse::<Region>()
                .map_err(|e| setup_error(format!("invalid region {}: {}", target.region, e)))?,
        };

        let mut bucket = Bucket::new(&target.bucket, region, credentials)
            .map_err(|e| setup_error(e.to_string()))?;
        // S3-compatible endpoints (MinIO, R2) generally want path-style addressing.
        if target.endpoint.is_some() {
            bucket = bucket.with_path_style();
        }

        Ok(Self { bucket })
    }

    pub fn is_path_style(&self) -> bool {
        self.bucket.is_path_style()
    }
}

fn check_status(code: u16) -> Result<(), String> {
    if (200..300).contains(&code) {
        Ok(())
    } else {
        Err(format!("unexpected status {}", code))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn bucket(&self) -> &str {
        &self.bucket.name
    }

    async fn list_page(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage, StorageError> {
        let list_error = |reason: String| StorageError::List {
            bucket: self.bucket.name.clone(),
            prefix: prefix.to_string(),
            reason,
        };

        let (result, status) = self
            .bucket
            .list_page(
                prefix.to_string(),
                None,
                continuation_token,
                None,
                Some(MAX_LIST_KEYS),
            )
            .await
            .map_err(|e| list_error(e.to_string()))?;
        check_status(status).map_err(list_error)?;

        debug!(
            prefix = %prefix,
            count = result.contents.len(),
            truncated = result.is_truncated,
            "Listed object page"
        );

        Ok(ObjectPage {
            keys: result.contents.into_iter().map(|object| object.key).collect(),
            next_continuation_token: result.next_continuation_token,
        })
    }

    /// Delete `keys` with one `DeleteObject` request each.
    ///
    /// rust-s3 0.34 has no multi-object delete, so a full page costs up to
    /// [`MAX_LIST_KEYS`] round trips. Keys are deleted in order and the first
    /// failure is returned; the keys before it stay deleted.
    async fn delete_keys(&self, keys: &[String]) -> Result<usize, StorageError> {
        let mut deleted = 0;
        for key in keys {
            let delete_error = |reason: String| StorageError::Delete {
                bucket: self.bucket.name.clone(),
                key: key.clone(),
                reason,
            };
            let response = self
                .bucket
                .delete_object(key)
                .await
                .map_err(|e| delete_error(e.to_string()))?;
            check_status(response.status_code()).map_err(delete_error)?;
            deleted += 1;
        }
        Ok(deleted)
    }

    async fn put_object(
        &self,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError> {
        let put_error = |reason: String| StorageError::Put {
            bucket: self.bucket.name.clone(),
            key: key.to_string(),
            reason,
        };
        let response = self
            .bucket
            .put_object_with_content_type(key, content, content_type)
            .await
            .map_err(|e| put_error(e.to_string()))?;
        check_status(response.status_code()).map_err(put_error)
    }
}
