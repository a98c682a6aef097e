//! Object client facade
//!
//! [`ObjectClient`] is the entry point callers use. It validates names,
//! routes every primitive through the retry policy and returns outcomes or
//! reports. Only Unauthorized and Fatal failures come back as `Err`. It
//! never prints.

use std::sync::Arc;

use futures::stream::{BoxStream, TryStreamExt};
use tokio_util::sync::CancellationToken;

use crate::bulk::{BulkOrchestrator, Download, UploadSource};
use crate::config::{BulkConfig, ClientConfig};
use crate::error::{Operation, Result, StorageError};
use crate::listing;
use crate::model::{BucketInfo, BucketRef, ObjectInfo, Target};
use crate::report::{BucketDeletion, BulkReport, Listing, OperationOutcome};
use crate::retry::RetryPolicy;
use crate::traits::{ObjectStore, Page};

/// Resilient bucket and object operations over an [`ObjectStore`]
#[derive(Clone)]
pub struct ObjectClient {
    store: Arc<dyn ObjectStore>,
    policy: RetryPolicy,
    bulk: BulkConfig,
    region: String,
    cancel: CancellationToken,
}

impl std::fmt::Debug for ObjectClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectClient")
            .field("policy", &self.policy)
            .field("bulk", &self.bulk)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl ObjectClient {
    pub fn new(store: Arc<dyn ObjectStore>, config: &ClientConfig) -> Self {
        Self {
            store,
            policy: RetryPolicy::new(config.retry.clone()),
            bulk: config.bulk.clone(),
            region: config.connection.region.clone(),
            cancel: CancellationToken::new(),
        }
    }

    /// A client whose bulk calls stop dispatching once `cancel` fires
    pub fn with_cancellation(&self, cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..self.clone()
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    fn orchestrator(&self) -> BulkOrchestrator<'_> {
        BulkOrchestrator::new(self.store.as_ref(), &self.policy, &self.bulk, &self.cancel)
    }

    /// Lazily list every bucket
    pub fn buckets(&self) -> BoxStream<'_, std::result::Result<BucketInfo, StorageError>> {
        listing::buckets(self.store.as_ref(), &self.policy)
    }

    /// Collect every bucket; a listing that runs out of retries comes back
    /// as [`Listing::Failed`]
    pub async fn list_buckets(&self) -> Result<Listing<BucketInfo>> {
        let result = self.buckets().try_collect().await;
        Ok(Listing::settle(Target::Account, result)?)
    }

    /// Create a bucket in the configured region.
    ///
    /// Creating a bucket that already exists yields a Conflict outcome.
    pub async fn create_bucket(&self, name: &str) -> Result<OperationOutcome> {
        self.create_bucket_in(name, &self.region).await
    }

    pub async fn create_bucket_in(&self, name: &str, region: &str) -> Result<OperationOutcome> {
        let bucket = BucketRef::new(name)?;
        let result = self
            .policy
            .call(Operation::CreateBucket, &bucket, || {
                self.store.create_bucket(&bucket, Some(region.to_string()))
            })
            .await;

        let outcome = OperationOutcome::settle(bucket, result)?;
        if outcome.is_success() {
            tracing::info!(bucket = name, region, "Bucket created");
        }
        Ok(outcome)
    }

    /// Delete every object in the bucket, then the bucket itself
    pub async fn delete_bucket(&self, name: &str) -> Result<BucketDeletion> {
        let bucket = BucketRef::new(name)?;
        self.orchestrator().empty_and_delete_bucket(&bucket).await
    }

    pub async fn put_object(&self, bucket: &str, source: UploadSource) -> Result<OperationOutcome> {
        let key = BucketRef::new(bucket)?.object(source.key())?;
        let result = self.orchestrator().put_one(&key, source).await;
        Ok(OperationOutcome::settle(key, result)?)
    }

    pub async fn put_objects(&self, bucket: &str, sources: Vec<UploadSource>) -> Result<BulkReport> {
        let bucket = BucketRef::new(bucket)?;
        self.orchestrator().put(&bucket, sources).await
    }

    pub async fn get_objects(&self, bucket: &str, downloads: Vec<Download>) -> Result<BulkReport> {
        let bucket = BucketRef::new(bucket)?;
        self.orchestrator().get(&bucket, downloads).await
    }

    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<OperationOutcome> {
        let key = BucketRef::new(bucket)?.object(key)?;
        let result = self.orchestrator().delete_one(&key).await;
        Ok(OperationOutcome::settle(key, result)?)
    }

    pub async fn delete_objects(&self, bucket: &str, keys: Vec<String>) -> Result<BulkReport> {
        let bucket = BucketRef::new(bucket)?;
        self.orchestrator().delete(&bucket, keys).await
    }

    /// Lazily list the objects in a bucket
    pub fn objects(
        &self,
        bucket: &BucketRef,
    ) -> BoxStream<'_, std::result::Result<ObjectInfo, StorageError>> {
        self.objects_from(bucket, None)
    }

    /// Resume a listing from a continuation token
    pub fn objects_from(
        &self,
        bucket: &BucketRef,
        token: Option<String>,
    ) -> BoxStream<'_, std::result::Result<ObjectInfo, StorageError>> {
        listing::objects(
            self.store.as_ref(),
            &self.policy,
            bucket.clone(),
            token,
            self.bulk.page_size,
        )
    }

    /// Collect every object in a bucket. A missing bucket is a
    /// [`Listing::Failed`] with NotFound.
    pub async fn list_objects(&self, bucket: &str) -> Result<Listing<ObjectInfo>> {
        let bucket = BucketRef::new(bucket)?;
        let result = self.objects(&bucket).try_collect().await;
        Ok(Listing::settle(bucket, result)?)
    }

    /// Fetch a single page, for callers that manage tokens themselves
    pub async fn list_objects_page(
        &self,
        bucket: &str,
        token: Option<String>,
    ) -> Result<Page<ObjectInfo>> {
        let bucket = BucketRef::new(bucket)?;
        let page = self
            .policy
            .call(Operation::ListObjects, &bucket, || {
                self.store
                    .list_objects(&bucket, token.clone(), self.bulk.page_size)
            })
            .await?;
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::error::{Error, ErrorKind, RawError, TransportFailure};
    use crate::memory::MemoryStore;
    use crate::traits::MockObjectStore;

    fn config(max_attempts: u32) -> ClientConfig {
        ClientConfig {
            retry: RetryConfig {
                max_attempts,
                initial_backoff_ms: 1,
                max_backoff_ms: 5,
            },
            ..Default::default()
        }
    }

    fn memory_client(store: &Arc<MemoryStore>) -> ObjectClient {
        ObjectClient::new(store.clone(), &config(3))
    }

    #[tokio::test]
    async fn test_transient_retried_until_exhausted() {
        let mut mock = MockObjectStore::new();
        mock.expect_delete_object()
            .times(4)
            .returning(|_| Err(RawError::transport(TransportFailure::Timeout, "timed out")));
        let client = ObjectClient::new(Arc::new(mock), &config(4));

        let outcome = client.delete_object("photos", "cat.jpg").await.unwrap();

        assert_eq!(outcome.error(), Some(ErrorKind::Transient));
    }

    #[tokio::test]
    async fn test_unauthorized_propagates_after_one_call() {
        let mut mock = MockObjectStore::new();
        mock.expect_create_bucket()
            .times(1)
            .returning(|_, _| Err(RawError::service("InvalidAccessKeyId", 403, "bad key")));
        let client = ObjectClient::new(Arc::new(mock), &config(5));

        let err = client.create_bucket("photos").await.unwrap_err();

        assert_eq!(err.kind(), Some(ErrorKind::Unauthorized));
        assert_eq!(err.exit_code(), 4);
    }

    #[tokio::test]
    async fn test_create_bucket_passes_region() {
        let mut mock = MockObjectStore::new();
        mock.expect_create_bucket()
            .withf(|bucket, region| {
                bucket.name() == "photos" && region.as_deref() == Some("eu-west-1")
            })
            .times(1)
            .returning(|_, _| Ok(()));
        let client = ObjectClient::new(Arc::new(mock), &config(1));

        let outcome = client.create_bucket_in("photos", "eu-west-1").await.unwrap();
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_invalid_names_never_reach_backend() {
        let mock = MockObjectStore::new();
        let client = ObjectClient::new(Arc::new(mock), &config(1));

        assert!(matches!(
            client.create_bucket("Bad_Name").await,
            Err(Error::InvalidBucketName { .. })
        ));
        assert!(matches!(
            client.delete_object("photos", "").await,
            Err(Error::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_create_bucket_uses_configured_region() {
        let store = Arc::new(MemoryStore::new());
        let client = memory_client(&store);

        client.create_bucket("photos").await.unwrap();

        assert_eq!(store.bucket_region("photos").as_deref(), Some("us-east-1"));
    }

    #[tokio::test]
    async fn test_put_and_list_objects() {
        let store = Arc::new(MemoryStore::new());
        store.insert_bucket("photos");
        let client = memory_client(&store);

        let outcome = client
            .put_object("photos", UploadSource::from_bytes("cat.jpg", "meow"))
            .await
            .unwrap();
        assert!(outcome.is_success());

        let listing = client.list_objects("photos").await.unwrap();
        let objects = listing.items().unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].key.key(), "cat.jpg");
        assert_eq!(objects[0].size_bytes, Some(4));
    }

    #[tokio::test]
    async fn test_missing_bucket_listing_is_an_outcome() {
        let store = Arc::new(MemoryStore::new());
        let client = memory_client(&store);

        let listing = client.list_objects("nowhere").await.unwrap();
        let Listing::Failed(outcome) = listing else {
            panic!("expected a failed listing");
        };
        assert_eq!(outcome.error(), Some(ErrorKind::NotFound));
        assert_eq!(outcome.target, Target::Bucket(BucketRef::new("nowhere").unwrap()));

        // Same channel as deleting the missing bucket
        let deletion = client.delete_bucket("nowhere").await.unwrap();
        assert_eq!(deletion.outcome.unwrap().error(), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_exhausted_bucket_listing_is_an_outcome() {
        let mut mock = MockObjectStore::new();
        mock.expect_list_buckets()
            .times(3)
            .returning(|_| Err(RawError::service("SlowDown", 503, "reduce your request rate")));
        let client = ObjectClient::new(Arc::new(mock), &config(3));

        let listing = client.list_buckets().await.unwrap();

        assert_eq!(listing.error(), Some(ErrorKind::Throttled));
        let Listing::Failed(outcome) = listing else {
            panic!("expected a failed listing");
        };
        assert_eq!(outcome.target, Target::Account);
    }

    #[tokio::test]
    async fn test_unauthorized_listing_propagates() {
        let mut mock = MockObjectStore::new();
        mock.expect_list_objects()
            .times(1)
            .returning(|_, _, _| Err(RawError::service("AccessDenied", 403, "denied")));
        let client = ObjectClient::new(Arc::new(mock), &config(3));

        let err = client.list_objects("photos").await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Unauthorized));
    }

    #[tokio::test]
    async fn test_list_objects_page_and_resume() {
        let store = Arc::new(MemoryStore::new().with_page_size(2));
        for key in ["a", "b", "c"] {
            store.insert_object("letters", key, "x");
        }
        let client = memory_client(&store);

        let page = client.list_objects_page("letters", None).await.unwrap();
        assert_eq!(page.items.len(), 2);

        let bucket = BucketRef::new("letters").unwrap();
        let rest: Vec<ObjectInfo> = client
            .objects_from(&bucket, page.next_token)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].key.key(), "c");
    }

    #[tokio::test]
    async fn test_with_cancellation_shares_store() {
        let store = Arc::new(MemoryStore::new());
        store.insert_bucket("photos");
        let client = memory_client(&store);
        let token = CancellationToken::new();
        let cancellable = client.with_cancellation(token.clone());
        token.cancel();

        let report = cancellable
            .delete_objects("photos", vec!["a".into()])
            .await
            .unwrap();
        assert_eq!(report.skipped.len(), 1);

        let report = client.delete_objects("photos", vec!["a".into()]).await.unwrap();
        assert!(report.is_clean());
    }
}
