//! Object storage seam used by the dataset sync.
//!
//! [`S3Store`] talks to a real bucket through `rust-s3`; [`MemoryStore`]
//! keeps objects in process and backs dry runs and tests.

use async_trait::async_trait;
use thiserror::Error;

pub mod memory;
pub mod s3_client;

pub use memory::*;
pub use s3_client::*;

/// Upper bound S3 applies to a single ListObjectsV2 page.
pub const MAX_LIST_KEYS: usize = 1000;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to open bucket {bucket}: {reason}")]
    Setup { bucket: String, reason: String },

    #[error("failed to list s3://{bucket}/{prefix}: {reason}")]
    List {
        bucket: String,
        prefix: String,
        reason: String,
    },

    #[error("failed to delete s3://{bucket}/{key}: {reason}")]
    Delete {
        bucket: String,
        key: String,
        reason: String,
    },

    #[error("failed to upload s3://{bucket}/{key}: {reason}")]
    Put {
        bucket: String,
        key: String,
        reason: String,
    },
}

/// One page of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPage {
    pub keys: Vec<String>,
    /// Present while more pages remain.
    pub next_continuation_token: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn bucket(&self) -> &str;

    async fn list_page(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage, StorageError>;

    /// Delete `keys`, returning how many were removed.
    async fn delete_keys(&self, keys: &[String]) -> Result<usize, StorageError>;

    async fn put_object(
        &self,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError>;
}
