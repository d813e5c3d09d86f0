//! Delete phase: clear every object under the prefix before uploading.

use tracing::{debug, info};

use crate::storage::{ObjectStore, StorageError};

/// List the prefix page by page, deleting each page as soon as it is listed.
///
/// Returns the number of deleted objects. The first listing or delete error
/// is returned as-is; nothing is retried.
pub async fn delete_prefix(store: &dyn ObjectStore, prefix: &str) -> Result<usize, StorageError> {
    info!(bucket = %store.bucket(), prefix = %prefix, "Deleting existing objects");

    let mut total_deleted = 0;
    let mut continuation_token = None;
    loop {
        let page = store.list_page(prefix, continuation_token.take()).await?;

        if !page.keys.is_empty() {
            let deleted = store.delete_keys(&page.keys).await?;
            total_deleted += deleted;
            info!(deleted, listed = page.keys.len(), "Deleted page");
        }

        match page.next_continuation_token {
            Some(token) => {
                debug!(token = %token, "Fetching next page");
                continuation_token = Some(token);
            }
            None => break,
        }
    }

    Ok(total_deleted)
}
