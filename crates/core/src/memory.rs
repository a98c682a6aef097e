//! In-memory [`ObjectStore`]
//!
//! Mirrors S3 semantics closely enough for tests and embedding: paged
//! listings keyed by the last returned name, `BucketAlreadyOwnedByYou` on a
//! repeated create, `BucketNotEmpty` on deleting a non-empty bucket, and
//! silent success when deleting an absent key. Faults can be injected per
//! operation and key, and every call is counted.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use jiff::Timestamp;

use crate::error::{Operation, RawError};
use crate::model::{BucketInfo, BucketRef, ObjectData, ObjectInfo, ObjectKey};
use crate::traits::{BackendResult, ObjectStore, Page};

const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug)]
struct StoredBucket {
    region: Option<String>,
    created: Timestamp,
    objects: BTreeMap<String, ObjectData>,
}

#[derive(Debug)]
struct Fault {
    operation: Operation,
    /// Bucket name or object key to match; `None` matches every call
    name: Option<String>,
    error: RawError,
    /// Failures left to inject; `None` injects forever
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct State {
    buckets: BTreeMap<String, StoredBucket>,
    faults: Vec<Fault>,
    calls: HashMap<Operation, usize>,
}

/// Object store held entirely in memory
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
    page_size: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Cap every listing page at `page_size` items, whatever the caller asks for
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a bucket directly, bypassing faults and counters
    pub fn insert_bucket(&self, name: &str) {
        self.state()
            .buckets
            .entry(name.to_string())
            .or_insert_with(|| StoredBucket {
                region: None,
                created: Timestamp::now(),
                objects: BTreeMap::new(),
            });
    }

    /// Store an object directly, creating the bucket if needed
    pub fn insert_object(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        self.insert_bucket(bucket);
        if let Some(stored) = self.state().buckets.get_mut(bucket) {
            stored
                .objects
                .insert(key.to_string(), ObjectData::new(data));
        }
    }

    /// Fail every `operation` call on `name` (or on anything when `None`)
    pub fn fail(&self, operation: Operation, name: Option<&str>, error: RawError) {
        self.push_fault(operation, name, error, None);
    }

    /// Fail the next `times` matching calls, then behave normally
    pub fn fail_times(
        &self,
        operation: Operation,
        name: Option<&str>,
        error: RawError,
        times: usize,
    ) {
        self.push_fault(operation, name, error, Some(times));
    }

    fn push_fault(
        &self,
        operation: Operation,
        name: Option<&str>,
        error: RawError,
        remaining: Option<usize>,
    ) {
        self.state().faults.push(Fault {
            operation,
            name: name.map(str::to_string),
            error,
            remaining,
        });
    }

    /// Number of backend calls made for `operation`, failed ones included
    pub fn calls(&self, operation: Operation) -> usize {
        self.state().calls.get(&operation).copied().unwrap_or(0)
    }

    pub fn has_bucket(&self, name: &str) -> bool {
        self.state().buckets.contains_key(name)
    }

    pub fn bucket_region(&self, name: &str) -> Option<String> {
        self.state().buckets.get(name).and_then(|b| b.region.clone())
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<ObjectData> {
        self.state()
            .buckets
            .get(bucket)
            .and_then(|b| b.objects.get(key).cloned())
    }

    pub fn object_count(&self, bucket: &str) -> usize {
        self.state()
            .buckets
            .get(bucket)
            .map(|b| b.objects.len())
            .unwrap_or(0)
    }

    /// Count the call and return the injected fault, if one matches
    fn enter(&self, state: &mut State, operation: Operation, name: &str) -> BackendResult<()> {
        *state.calls.entry(operation).or_default() += 1;

        let fault = state.faults.iter_mut().find(|f| {
            f.operation == operation
                && f.name.as_deref().is_none_or(|n| n == name)
                && f.remaining != Some(0)
        });

        match fault {
            Some(fault) => {
                if let Some(remaining) = fault.remaining.as_mut() {
                    *remaining -= 1;
                }
                Err(fault.error.clone())
            }
            None => Ok(()),
        }
    }

    fn page_after<'a, V>(
        &self,
        map: &'a BTreeMap<String, V>,
        token: Option<&str>,
        limit: usize,
    ) -> (Vec<(&'a String, &'a V)>, Option<String>) {
        let start = match token {
            Some(token) => Bound::Excluded(token.to_string()),
            None => Bound::Unbounded,
        };
        let mut range = map.range::<String, _>((start, Bound::Unbounded));
        let items: Vec<_> = range.by_ref().take(limit).collect();
        let next = match (range.next(), items.last()) {
            (Some(_), Some((last, _))) => Some(last.to_string()),
            _ => None,
        };
        (items, next)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn no_such_bucket(bucket: &str) -> RawError {
    RawError::service(
        "NoSuchBucket",
        404,
        format!("The specified bucket does not exist: {bucket}"),
    )
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_buckets(
        &self,
        continuation_token: Option<String>,
    ) -> BackendResult<Page<BucketInfo>> {
        let mut state = self.state();
        self.enter(&mut state, Operation::ListBuckets, "")?;

        let (items, next_token) =
            self.page_after(&state.buckets, continuation_token.as_deref(), self.page_size);
        let items = items
            .into_iter()
            .map(|(name, bucket)| {
                let mut info = BucketInfo::new(name.as_str());
                info.created = Some(bucket.created);
                info.region = bucket.region.clone();
                info
            })
            .collect();

        Ok(Page { items, next_token })
    }

    async fn create_bucket(&self, bucket: &BucketRef, region: Option<String>) -> BackendResult<()> {
        let mut state = self.state();
        self.enter(&mut state, Operation::CreateBucket, bucket.name())?;

        if state.buckets.contains_key(bucket.name()) {
            return Err(RawError::service(
                "BucketAlreadyOwnedByYou",
                409,
                format!("Bucket {bucket} already exists and is owned by you"),
            ));
        }

        state.buckets.insert(
            bucket.name().to_string(),
            StoredBucket {
                region,
                created: Timestamp::now(),
                objects: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &BucketRef) -> BackendResult<()> {
        let mut state = self.state();
        self.enter(&mut state, Operation::DeleteBucket, bucket.name())?;

        match state.buckets.get(bucket.name()) {
            None => Err(no_such_bucket(bucket.name())),
            Some(stored) if !stored.objects.is_empty() => Err(RawError::service(
                "BucketNotEmpty",
                409,
                format!("The bucket you tried to delete is not empty: {bucket}"),
            )),
            Some(_) => {
                state.buckets.remove(bucket.name());
                Ok(())
            }
        }
    }

    async fn put_object(&self, key: &ObjectKey, object: ObjectData) -> BackendResult<()> {
        let mut state = self.state();
        self.enter(&mut state, Operation::PutObject, key.key())?;

        let stored = state
            .buckets
            .get_mut(key.bucket().name())
            .ok_or_else(|| no_such_bucket(key.bucket().name()))?;
        stored.objects.insert(key.key().to_string(), object);
        Ok(())
    }

    async fn get_object(&self, key: &ObjectKey) -> BackendResult<ObjectData> {
        let mut state = self.state();
        self.enter(&mut state, Operation::GetObject, key.key())?;

        let stored = state
            .buckets
            .get(key.bucket().name())
            .ok_or_else(|| no_such_bucket(key.bucket().name()))?;
        stored.objects.get(key.key()).cloned().ok_or_else(|| {
            RawError::service("NoSuchKey", 404, format!("The specified key does not exist: {key}"))
        })
    }

    async fn delete_object(&self, key: &ObjectKey) -> BackendResult<()> {
        let mut state = self.state();
        self.enter(&mut state, Operation::DeleteObject, key.key())?;

        let stored = state
            .buckets
            .get_mut(key.bucket().name())
            .ok_or_else(|| no_such_bucket(key.bucket().name()))?;
        stored.objects.remove(key.key());
        Ok(())
    }

    async fn list_objects(
        &self,
        bucket: &BucketRef,
        continuation_token: Option<String>,
        max_keys: i32,
    ) -> BackendResult<Page<ObjectInfo>> {
        let mut state = self.state();
        self.enter(&mut state, Operation::ListObjects, bucket.name())?;

        let stored = state
            .buckets
            .get(bucket.name())
            .ok_or_else(|| no_such_bucket(bucket.name()))?;
        let limit = usize::try_from(max_keys).unwrap_or(1).clamp(1, self.page_size);
        let (items, next_token) =
            self.page_after(&stored.objects, continuation_token.as_deref(), limit);
        let items = items
            .into_iter()
            .map(|(key, object)| ObjectInfo::new(bucket, key.as_str(), object.len() as i64))
            .collect();

        Ok(Page { items, next_token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(name: &str) -> BucketRef {
        BucketRef::new(name).unwrap()
    }

    #[tokio::test]
    async fn test_create_twice_conflicts() {
        let store = MemoryStore::new();
        let b = bucket("photos");

        store.create_bucket(&b, Some("eu-west-1".into())).await.unwrap();
        let err = store.create_bucket(&b, None).await.unwrap_err();

        assert_eq!(err.code.as_deref(), Some("BucketAlreadyOwnedByYou"));
        assert_eq!(store.bucket_region("photos").as_deref(), Some("eu-west-1"));
        assert_eq!(store.calls(Operation::CreateBucket), 2);
    }

    #[tokio::test]
    async fn test_delete_non_empty_bucket_fails() {
        let store = MemoryStore::new();
        store.insert_object("photos", "cat.jpg", "meow");

        let err = store.delete_bucket(&bucket("photos")).await.unwrap_err();
        assert_eq!(err.code.as_deref(), Some("BucketNotEmpty"));
        assert!(store.has_bucket("photos"));
    }

    #[tokio::test]
    async fn test_object_roundtrip_and_absent_delete() {
        let store = MemoryStore::new();
        store.insert_bucket("photos");
        let key = bucket("photos").object("cat.jpg").unwrap();

        let mut object = ObjectData::new("meow");
        object.metadata.insert("title".into(), "the title".into());
        store.put_object(&key, object.clone()).await.unwrap();
        assert_eq!(store.get_object(&key).await.unwrap(), object);

        store.delete_object(&key).await.unwrap();
        // Deleting again is not an error
        store.delete_object(&key).await.unwrap();
        let err = store.get_object(&key).await.unwrap_err();
        assert_eq!(err.code.as_deref(), Some("NoSuchKey"));
    }

    #[tokio::test]
    async fn test_paged_listing() {
        let store = MemoryStore::new().with_page_size(2);
        for key in ["a", "b", "c", "d", "e"] {
            store.insert_object("letters", key, key);
        }
        let b = bucket("letters");

        let first = store.list_objects(&b, None, 1000).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next_token.as_deref(), Some("b"));

        let second = store.list_objects(&b, first.next_token, 1000).await.unwrap();
        assert_eq!(second.items[0].key.key(), "c");

        let last = store
            .list_objects(&b, Some("d".to_string()), 1000)
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.next_token, None);
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let store = MemoryStore::new();
        store.insert_bucket("photos");
        let key = bucket("photos").object("cat.jpg").unwrap();
        store.fail_times(
            Operation::PutObject,
            Some("cat.jpg"),
            RawError::service("SlowDown", 503, "slow down"),
            2,
        );

        assert!(store.put_object(&key, ObjectData::new("1")).await.is_err());
        assert!(store.put_object(&key, ObjectData::new("2")).await.is_err());
        assert!(store.put_object(&key, ObjectData::new("3")).await.is_ok());
        assert_eq!(store.calls(Operation::PutObject), 3);
    }
}
