//! Lazy listings over paginated backend calls
//!
//! [`paginate`] turns a page-fetching closure into one flat stream. A page is
//! only requested once the consumer has drained the previous one.

use std::future::Future;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};

use crate::error::{Operation, StorageError};
use crate::model::{BucketInfo, BucketRef, ObjectInfo};
use crate::retry::RetryPolicy;
use crate::traits::{ObjectStore, Page};

enum Cursor {
    Start(Option<String>),
    Next(String),
    Done,
}

/// Follow continuation tokens from `start` until the backend stops returning them
pub fn paginate<'a, T, F, Fut>(start: Option<String>, fetch: F) -> BoxStream<'a, Result<T, StorageError>>
where
    T: Send + 'a,
    F: FnMut(Option<String>) -> Fut + Send + 'a,
    Fut: Future<Output = Result<Page<T>, StorageError>> + Send + 'a,
{
    stream::try_unfold((Cursor::Start(start), fetch), |(cursor, mut fetch)| async move {
        let token = match cursor {
            Cursor::Start(token) => token,
            Cursor::Next(token) => Some(token),
            Cursor::Done => return Ok(None),
        };

        let page = fetch(token).await?;
        let next = match page.next_token {
            Some(token) if !token.is_empty() => Cursor::Next(token),
            _ => Cursor::Done,
        };

        let items = stream::iter(page.items.into_iter().map(Ok::<T, StorageError>));
        Ok(Some((items, (next, fetch))))
    })
    .try_flatten()
    .boxed()
}

/// Every bucket visible to the caller, one retried page at a time
pub fn buckets<'a>(
    store: &'a dyn ObjectStore,
    policy: &'a RetryPolicy,
) -> BoxStream<'a, Result<BucketInfo, StorageError>> {
    paginate(None, move |token: Option<String>| async move {
        policy
            .call(Operation::ListBuckets, "buckets", || {
                store.list_buckets(token.clone())
            })
            .await
    })
}

/// Objects in `bucket`, resuming after `start` when given
pub fn objects<'a>(
    store: &'a dyn ObjectStore,
    policy: &'a RetryPolicy,
    bucket: BucketRef,
    start: Option<String>,
    page_size: i32,
) -> BoxStream<'a, Result<ObjectInfo, StorageError>> {
    paginate(start, move |token: Option<String>| {
        let bucket = bucket.clone();
        async move {
            policy
                .call(Operation::ListObjects, &bucket, || {
                    store.list_objects(&bucket, token.clone(), page_size)
                })
                .await
        }
    })
}
