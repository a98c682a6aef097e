//! S3 backend
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from stow-core. Each
//! trait method issues exactly one request; retries live in the core.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use jiff::Timestamp;
use stow_core::{
    BackendResult, BucketInfo, BucketRef, ConnectionConfig, DEFAULT_REGION, ObjectData,
    ObjectInfo, ObjectKey, ObjectStore, Page,
};

use crate::error::{body_error, raw_error};

/// S3 client wrapper
#[derive(Debug, Clone)]
pub struct S3Backend {
    inner: aws_sdk_s3::Client,
}

impl S3Backend {
    /// Create a new S3 backend from connection settings.
    ///
    /// Static keys are used when configured; otherwise credentials come from
    /// the SDK's default provider chain.
    pub async fn new(config: &ConnectionConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            let credentials = aws_credential_types::Credentials::new(
                access_key,
                secret_key,
                config.session_token.clone(),
                None, // expiry
                "stow-static-credentials",
            );
            loader = loader.credentials_provider(credentials);
        }

        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;

        // Path-style addressing for S3-compatible services
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.path_style)
            .build();

        tracing::debug!(
            region = %config.region,
            endpoint = config.endpoint.as_deref().unwrap_or("default"),
            path_style = config.path_style,
            "S3 backend configured"
        );

        Self::from_client(aws_sdk_s3::Client::from_conf(s3_config))
    }

    /// Wrap an already configured SDK client
    pub fn from_client(inner: aws_sdk_s3::Client) -> Self {
        Self { inner }
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }
}

/// Location constraint for `region`; us-east-1 is the default and takes none
fn bucket_configuration(region: Option<&str>) -> Option<CreateBucketConfiguration> {
    let region = region.filter(|r| !r.is_empty() && *r != DEFAULT_REGION)?;
    Some(
        CreateBucketConfiguration::builder()
            .location_constraint(BucketLocationConstraint::from(region))
            .build(),
    )
}

fn timestamp(dt: &aws_smithy_types::DateTime) -> Option<Timestamp> {
    Timestamp::from_second(dt.secs()).ok()
}

#[async_trait]
impl ObjectStore for S3Backend {
    async fn list_buckets(
        &self,
        continuation_token: Option<String>,
    ) -> BackendResult<Page<BucketInfo>> {
        let response = self
            .inner
            .list_buckets()
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(|e| raw_error(&e))?;

        let items = response
            .buckets()
            .iter()
            .map(|b| {
                let mut info = BucketInfo::new(b.name().unwrap_or_default());
                info.created = b.creation_date().and_then(timestamp);
                info.region = b.bucket_region().map(str::to_string);
                info
            })
            .collect();

        Ok(Page {
            items,
            next_token: response.continuation_token().map(str::to_string),
        })
    }

    async fn create_bucket(&self, bucket: &BucketRef, region: Option<String>) -> BackendResult<()> {
        self.inner
            .create_bucket()
            .bucket(bucket.name())
            .set_create_bucket_configuration(bucket_configuration(region.as_deref()))
            .send()
            .await
            .map_err(|e| raw_error(&e))?;

        Ok(())
    }

    async fn delete_bucket(&self, bucket: &BucketRef) -> BackendResult<()> {
        self.inner
            .delete_bucket()
            .bucket(bucket.name())
            .send()
            .await
            .map_err(|e| raw_error(&e))?;

        Ok(())
    }

    async fn put_object(&self, key: &ObjectKey, object: ObjectData) -> BackendResult<()> {
        let metadata: Option<HashMap<String, String>> = (!object.metadata.is_empty())
            .then(|| object.metadata.into_iter().collect());

        self.inner
            .put_object()
            .bucket(key.bucket().name())
            .key(key.key())
            .body(ByteStream::from(object.data))
            .set_content_type(object.content_type)
            .set_metadata(metadata)
            .send()
            .await
            .map_err(|e| raw_error(&e))?;

        Ok(())
    }

    async fn get_object(&self, key: &ObjectKey) -> BackendResult<ObjectData> {
        let response = self
            .inner
            .get_object()
            .bucket(key.bucket().name())
            .key(key.key())
            .send()
            .await
            .map_err(|e| raw_error(&e))?;

        let content_type = response.content_type().map(str::to_string);
        let metadata = response
            .metadata()
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| body_error(&e))?
            .into_bytes();

        Ok(ObjectData {
            data,
            content_type,
            metadata,
        })
    }

    async fn delete_object(&self, key: &ObjectKey) -> BackendResult<()> {
        self.inner
            .delete_object()
            .bucket(key.bucket().name())
            .key(key.key())
            .send()
            .await
            .map_err(|e| raw_error(&e))?;

        Ok(())
    }

    async fn list_objects(
        &self,
        bucket: &BucketRef,
        continuation_token: Option<String>,
        max_keys: i32,
    ) -> BackendResult<Page<ObjectInfo>> {
        let response = self
            .inner
            .list_objects_v2()
            .bucket(bucket.name())
            .max_keys(max_keys)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(|e| raw_error(&e))?;

        let items = response
            .contents()
            .iter()
            .map(|object| {
                let mut info = ObjectInfo::new(
                    bucket,
                    object.key().unwrap_or_default(),
                    object.size().unwrap_or(0),
                );
                info.last_modified = object.last_modified().and_then(timestamp);
                info.etag = object.e_tag().map(|etag| etag.trim_matches('"').to_string());
                info
            })
            .collect();

        let next_token = if response.is_truncated().unwrap_or(false) {
            response.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(Page { items, next_token })
    }
}
