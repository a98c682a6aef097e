//! Storage client boundary
//!
//! [`ObjectStore`] is the one seam between the core and a concrete object
//! store. Implementations issue exactly the request named, return raw errors
//! unclassified, and never cache.

use async_trait::async_trait;

use crate::error::RawError;
use crate::model::{BucketInfo, BucketRef, ObjectData, ObjectInfo, ObjectKey};

/// Result type returned by backends
pub type BackendResult<T> = std::result::Result<T, RawError>;

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Token for the next page; `None` on the last page
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }
}

/// Primitive operations of an object store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List one page of buckets visible to the caller
    async fn list_buckets(&self, continuation_token: Option<String>)
    -> BackendResult<Page<BucketInfo>>;

    /// Create a bucket, in `region` when given
    async fn create_bucket(&self, bucket: &BucketRef, region: Option<String>) -> BackendResult<()>;

    /// Delete an empty bucket
    async fn delete_bucket(&self, bucket: &BucketRef) -> BackendResult<()>;

    /// Store an object, replacing any existing one under the same key
    async fn put_object(&self, key: &ObjectKey, object: ObjectData) -> BackendResult<()>;

    /// Fetch an object body with its metadata
    async fn get_object(&self, key: &ObjectKey) -> BackendResult<ObjectData>;

    /// Delete an object
    async fn delete_object(&self, key: &ObjectKey) -> BackendResult<()>;

    /// List one page of objects in a bucket
    async fn list_objects(
        &self,
        bucket: &BucketRef,
        continuation_token: Option<String>,
        max_keys: i32,
    ) -> BackendResult<Page<ObjectInfo>>;
}
