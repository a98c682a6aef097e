//! Bulk operations
//!
//! A bulk call validates every key up front, then dispatches one primitive
//! per key through the retry policy with at most `concurrency` calls in
//! flight. A failed item never stops the batch, with one exception: an
//! Unauthorized failure stops dispatch, since every later call would fail
//! the same way. Cancellation also stops dispatch. In both cases the items
//! never attempted are reported as skipped.
//!
//! Repeated keys in one call are grouped and run one after another in
//! submission order, so the last upload of a key wins.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;

use crate::config::BulkConfig;
use crate::error::{ErrorKind, Operation, Result, StorageError};
use crate::listing;
use crate::model::{BucketRef, ObjectData, ObjectInfo, ObjectKey};
use crate::report::{BucketDeletion, BulkReport, BulkStatus, OperationOutcome, ReportBuilder};
use crate::retry::RetryPolicy;
use crate::traits::ObjectStore;

#[derive(Debug, Clone, PartialEq, Eq)]
enum SourceBody {
    Bytes(Bytes),
    File(PathBuf),
}

/// Content to upload under a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSource {
    key: String,
    body: SourceBody,
    content_type: Option<String>,
    metadata: BTreeMap<String, String>,
}

impl UploadSource {
    pub fn from_bytes(key: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            body: SourceBody::Bytes(data.into()),
            content_type: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Upload a local file; the content type is guessed from its extension
    pub fn from_file(key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let content_type = mime_guess::from_path(&path).first_raw().map(str::to_string);
        Self {
            key: key.into(),
            body: SourceBody::File(path),
            content_type,
            metadata: BTreeMap::new(),
        }
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Attach a user metadata entry
    pub fn metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(name.into(), value.into());
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    async fn load(self) -> std::io::Result<ObjectData> {
        let data = match self.body {
            SourceBody::Bytes(data) => data,
            SourceBody::File(path) => Bytes::from(tokio::fs::read(&path).await?),
        };
        Ok(ObjectData {
            data,
            content_type: self.content_type,
            metadata: self.metadata,
        })
    }
}

/// Shared slot a download writes into
#[derive(Debug, Clone, Default)]
pub struct MemoryBuffer(Arc<Mutex<Option<ObjectData>>>);

impl MemoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return the downloaded object
    pub fn take(&self) -> Option<ObjectData> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    fn store(&self, object: ObjectData) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(object);
    }
}

/// Where a downloaded object goes
#[derive(Debug, Clone)]
pub enum Destination {
    /// Local file; missing parent directories are created
    File(PathBuf),
    Memory(MemoryBuffer),
}

impl Destination {
    async fn write(&self, object: ObjectData) -> std::io::Result<()> {
        match self {
            Destination::File(path) => {
                if let Some(parent) = path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(path, &object.data).await
            }
            Destination::Memory(buffer) => {
                buffer.store(object);
                Ok(())
            }
        }
    }
}

/// One object to fetch and where to put it
#[derive(Debug, Clone)]
pub struct Download {
    key: String,
    destination: Destination,
}

impl Download {
    pub fn new(key: impl Into<String>, destination: Destination) -> Self {
        Self {
            key: key.into(),
            destination,
        }
    }

    pub fn to_file(key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::new(key, Destination::File(path.into()))
    }

    /// Download into memory; read the result from the returned buffer
    pub fn to_memory(key: impl Into<String>) -> (Self, MemoryBuffer) {
        let buffer = MemoryBuffer::new();
        (Self::new(key, Destination::Memory(buffer.clone())), buffer)
    }

    /// Mirror `keys` under `dir`, one file per key
    pub fn into_dir<I, K>(dir: &Path, keys: I) -> Vec<Self>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        keys.into_iter()
            .map(|key| {
                let key = key.into();
                let path = dir.join(local_path(&key));
                Self::to_file(key, path)
            })
            .collect()
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Relative path for a key, keeping only plain components so the file cannot
/// land outside the target directory
fn local_path(key: &str) -> PathBuf {
    Path::new(key)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect()
}

enum Step {
    Skipped(ObjectKey),
    Done(ObjectKey, std::result::Result<(), StorageError>),
}

/// Runs bulk operations against one store
pub struct BulkOrchestrator<'a> {
    store: &'a dyn ObjectStore,
    policy: &'a RetryPolicy,
    config: &'a BulkConfig,
    cancel: &'a CancellationToken,
}

impl<'a> BulkOrchestrator<'a> {
    pub fn new(
        store: &'a dyn ObjectStore,
        policy: &'a RetryPolicy,
        config: &'a BulkConfig,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            store,
            policy,
            config,
            cancel,
        }
    }

    /// Upload every source into `bucket`
    pub async fn put(&self, bucket: &BucketRef, sources: Vec<UploadSource>) -> Result<BulkReport> {
        let items = sources
            .into_iter()
            .map(|source| Ok((bucket.object(source.key.clone())?, source)))
            .collect::<Result<Vec<_>>>()?;

        Ok(self
            .run(Operation::PutObject, items, |key, source| async move {
                self.put_one(&key, source).await
            })
            .await)
    }

    /// Download every key to its destination
    pub async fn get(&self, bucket: &BucketRef, downloads: Vec<Download>) -> Result<BulkReport> {
        let items = downloads
            .into_iter()
            .map(|d| Ok((bucket.object(d.key)?, d.destination)))
            .collect::<Result<Vec<_>>>()?;

        Ok(self
            .run(Operation::GetObject, items, |key, destination| async move {
                self.get_one(&key, &destination).await
            })
            .await)
    }

    /// Delete every key in `bucket`
    pub async fn delete(&self, bucket: &BucketRef, keys: Vec<String>) -> Result<BulkReport> {
        let keys = keys
            .into_iter()
            .map(|key| bucket.object(key))
            .collect::<Result<Vec<_>>>()?;

        Ok(self.delete_keys(keys).await)
    }

    /// Delete every object in `bucket`, then the bucket itself.
    ///
    /// The bucket is only deleted when every object deletion succeeded;
    /// otherwise the returned report names the objects left behind.
    pub async fn empty_and_delete_bucket(&self, bucket: &BucketRef) -> Result<BucketDeletion> {
        let listing: std::result::Result<Vec<ObjectInfo>, StorageError> = listing::objects(
            self.store,
            self.policy,
            bucket.clone(),
            None,
            self.config.page_size,
        )
        .try_collect()
        .await;

        let keys: Vec<ObjectKey> = match listing {
            Ok(objects) => objects.into_iter().map(|o| o.key).collect(),
            Err(e) if e.kind.propagates() => return Err(e.into()),
            Err(e) => {
                return Ok(BucketDeletion {
                    bucket: bucket.clone(),
                    deleted: false,
                    outcome: Some(OperationOutcome::failed(bucket.clone(), &e)),
                    objects: BulkReport::empty(),
                });
            }
        };

        let objects = self.delete_keys(keys).await;
        if !objects.is_clean() {
            tracing::warn!(
                bucket = %bucket,
                failed = objects.failed.len(),
                skipped = objects.skipped.len(),
                "Bucket not deleted: objects remain"
            );
            return Ok(BucketDeletion {
                bucket: bucket.clone(),
                deleted: false,
                outcome: None,
                objects,
            });
        }

        let result = self
            .policy
            .call(Operation::DeleteBucket, bucket, || {
                self.store.delete_bucket(bucket)
            })
            .await;
        let outcome = OperationOutcome::settle(bucket.clone(), result)?;

        if outcome.is_success() {
            tracing::info!(bucket = %bucket, objects = objects.succeeded.len(), "Bucket emptied and deleted");
        }

        Ok(BucketDeletion {
            bucket: bucket.clone(),
            deleted: outcome.is_success(),
            outcome: Some(outcome),
            objects,
        })
    }

    pub(crate) async fn put_one(
        &self,
        key: &ObjectKey,
        source: UploadSource,
    ) -> std::result::Result<(), StorageError> {
        let object = source
            .load()
            .await
            .map_err(|e| StorageError::local(Operation::PutObject, key, &e))?;

        self.policy
            .call(Operation::PutObject, key, || {
                self.store.put_object(key, object.clone())
            })
            .await
    }

    pub(crate) async fn get_one(
        &self,
        key: &ObjectKey,
        destination: &Destination,
    ) -> std::result::Result<(), StorageError> {
        let object = self
            .policy
            .call(Operation::GetObject, key, || self.store.get_object(key))
            .await?;

        destination
            .write(object)
            .await
            .map_err(|e| StorageError::local(Operation::GetObject, key, &e))
    }

    pub(crate) async fn delete_one(&self, key: &ObjectKey) -> std::result::Result<(), StorageError> {
        self.policy
            .call(Operation::DeleteObject, key, || self.store.delete_object(key))
            .await
    }

    async fn delete_keys(&self, keys: Vec<ObjectKey>) -> BulkReport {
        let items = keys.into_iter().map(|key| (key, ())).collect();
        self.run(Operation::DeleteObject, items, |key, ()| async move {
            self.delete_one(&key).await
        })
        .await
    }

    async fn run<I, F, Fut>(&self, operation: Operation, items: Vec<(ObjectKey, I)>, work: F) -> BulkReport
    where
        F: Fn(ObjectKey, I) -> Fut,
        Fut: Future<Output = std::result::Result<(), StorageError>>,
    {
        if items.is_empty() {
            return BulkReport::empty();
        }

        let total = items.len();
        let concurrency = self.config.concurrency.max(1);
        tracing::debug!(operation = %operation, items = total, concurrency, "Bulk operation started");

        // Cancelled by the caller, or by an Unauthorized failure
        let stop = self.cancel.child_token();
        let mut builder = ReportBuilder::new();
        builder.start();

        let work = &work;
        let stop = &stop;
        let mut groups = stream::iter(group_by_key(items))
            .map(|group| async move {
                let mut steps = Vec::with_capacity(group.len());
                for (key, item) in group {
                    if stop.is_cancelled() {
                        steps.push(Step::Skipped(key));
                        continue;
                    }

                    let result = work(key.clone(), item).await;
                    if let Err(e) = &result {
                        tracing::warn!(
                            operation = %operation,
                            target = %key,
                            kind = %e.kind,
                            attempts = e.attempts,
                            "Bulk item failed: {}",
                            e.message
                        );
                        if e.kind == ErrorKind::Unauthorized {
                            stop.cancel();
                        }
                    }
                    steps.push(Step::Done(key, result));
                }
                steps
            })
            .buffer_unordered(concurrency);

        let mut any_skipped = false;
        while let Some(steps) = groups.next().await {
            for step in steps {
                match step {
                    Step::Skipped(key) => {
                        any_skipped = true;
                        builder.skip(key);
                    }
                    Step::Done(key, result) => {
                        builder.record(OperationOutcome::from_result(key, result))
                    }
                }
            }
        }

        let status = if builder.has_failure(ErrorKind::Unauthorized) {
            BulkStatus::Aborted
        } else if any_skipped {
            BulkStatus::Cancelled
        } else {
            BulkStatus::Completed
        };
        let report = builder.finish(status);

        tracing::info!(
            operation = %operation,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            status = ?report.status,
            "Bulk operation finished"
        );

        if self.config.sort_reports {
            report.sorted()
        } else {
            report
        }
    }
}

/// Group items by key, keeping first-appearance order of keys and submission
/// order within each key
fn group_by_key<I>(items: Vec<(ObjectKey, I)>) -> Vec<Vec<(ObjectKey, I)>> {
    let mut index: HashMap<ObjectKey, usize> = HashMap::new();
    let mut groups: Vec<Vec<(ObjectKey, I)>> = Vec::new();

    for (key, item) in items {
        match index.get(&key) {
            Some(&i) => groups[i].push((key, item)),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(vec![(key, item)]);
            }
        }
    }

    groups
}
