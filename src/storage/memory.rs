//! In-process object store.
//!
//! Listing follows S3 semantics closely enough for the sync procedure:
//! keys come back in lexicographic order, at most `page_size` at a time, and
//! the continuation token is the last key of the page. Failures can be
//! injected per operation, and every call is recorded so callers can assert
//! on ordering.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use std::sync::{Mutex, MutexGuard};

use super::{ObjectPage, ObjectStore, StorageError, MAX_LIST_KEYS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content: Bytes,
    pub content_type: String,
}

/// A call made against a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOperation {
    List { prefix: String },
    Delete { keys: Vec<String> },
    Put { key: String },
}

#[derive(Debug, Default)]
struct FailurePlan {
    list: bool,
    delete: bool,
    put_keys: HashSet<String>,
}

#[derive(Debug, Default)]
struct Inner {
    objects: BTreeMap<String, StoredObject>,
    operations: Vec<StoreOperation>,
    failures: FailurePlan,
}

pub struct MemoryStore {
    bucket: String,
    page_size: usize,
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            page_size: MAX_LIST_KEYS,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Override the listing page size (clamped to 1..=1000).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_LIST_KEYS);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves the map intact; keep serving it.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed an object without recording an operation.
    pub fn insert(&self, key: impl Into<String>, content: impl Into<Bytes>) {
        self.lock().objects.insert(
            key.into(),
            StoredObject {
                content: content.into(),
                content_type: crate::sync::upload::APPLICATION_OCTET_STREAM.to_string(),
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.lock().objects.get(key).cloned()
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.lock().objects.keys().cloned().collect()
    }

    pub fn operations(&self) -> Vec<StoreOperation> {
        self.lock().operations.clone()
    }

    pub fn fail_listing(&self) {
        self.lock().failures.list = true;
    }

    pub fn fail_deletes(&self) {
        self.lock().failures.delete = true;
    }

    pub fn fail_put(&self, key: impl Into<String>) {
        self.lock().failures.put_keys.insert(key.into());
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_page(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage, StorageError> {
        let mut inner = self.lock();
        inner.operations.push(StoreOperation::List {
            prefix: prefix.to_string(),
        });
        if inner.failures.list {
            return Err(StorageError::List {
                bucket: self.bucket.clone(),
                prefix: prefix.to_string(),
                reason: "injected listing failure".to_string(),
            });
        }

        let lower = match continuation_token {
            Some(token) => Bound::Excluded(token),
            None => Bound::Unbounded,
        };
        let mut matching = inner
            .objects
            .range((lower, Bound::Unbounded))
            .map(|(key, _)| key)
            .filter(|key| key.starts_with(prefix));

        let keys: Vec<String> = matching.by_ref().take(self.page_size).cloned().collect();
        let next_continuation_token = match matching.next() {
            Some(_) => keys.last().cloned(),
            None => None,
        };

        Ok(ObjectPage {
            keys,
            next_continuation_token,
        })
    }

    async fn delete_keys(&self, keys: &[String]) -> Result<usize, StorageError> {
        let mut inner = self.lock();
        inner.operations.push(StoreOperation::Delete {
            keys: keys.to_vec(),
        });
        if inner.failures.delete {
            return Err(StorageError::Delete {
                bucket: self.bucket.clone(),
                key: keys.first().cloned().unwrap_or_default(),
                reason: "injected delete failure".to_string(),
            });
        }
        Ok(keys
            .iter()
            .filter(|key| inner.objects.remove(key.as_str()).is_some())
            .count())
    }

    async fn put_object(
        &self,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError> {
        let mut inner = self.lock();
        inner.operations.push(StoreOperation::Put {
            key: key.to_string(),
        });
        if inner.failures.put_keys.contains(key) {
            return Err(StorageError::Put {
                bucket: self.bucket.clone(),
                key: key.to_string(),
                reason: "injected upload failure".to_string(),
            });
        }
        inner.objects.insert(
            key.to_string(),
            StoredObject {
                content: Bytes::copy_from_slice(content),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}
