//! Bucket and object identifiers plus the metadata backends return
//!
//! Names are validated when they enter the library; everything past this
//! boundary assumes a well-formed [`BucketRef`] / [`ObjectKey`].

use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use bytes::Bytes;
use jiff::Timestamp;
use serde::Serialize;

use crate::error::{Error, Result};

/// Longest key S3-compatible stores accept, in bytes
pub const MAX_KEY_LEN: usize = 1024;

/// A validated bucket name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct BucketRef {
    name: String,
}

impl BucketRef {
    /// Validate `name` against S3 bucket naming rules
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_bucket_name(&name).map_err(|reason| Error::InvalidBucketName {
            name: name.clone(),
            reason,
        })?;
        Ok(Self { name })
    }

    /// Wrap a name reported by the backend itself
    pub(crate) fn from_backend(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Address an object inside this bucket
    pub fn object(&self, key: impl Into<String>) -> Result<ObjectKey> {
        ObjectKey::new(self.clone(), key)
    }
}

impl fmt::Display for BucketRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl AsRef<str> for BucketRef {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl FromStr for BucketRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

fn validate_bucket_name(name: &str) -> std::result::Result<(), &'static str> {
    if name.len() < 3 || name.len() > 63 {
        return Err("must be between 3 and 63 characters long");
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'.' || b == b'-')
    {
        return Err("may only contain lowercase letters, digits, '.' and '-'");
    }
    let first = name.as_bytes()[0];
    let last = name.as_bytes()[name.len() - 1];
    if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
        return Err("must begin and end with a letter or digit");
    }
    if name.contains("..") {
        return Err("must not contain two adjacent periods");
    }
    if name.parse::<Ipv4Addr>().is_ok() {
        return Err("must not be formatted as an IP address");
    }
    if name.starts_with("xn--") || name.ends_with("-s3alias") {
        return Err("uses a reserved prefix or suffix");
    }
    Ok(())
}

/// An object within a bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObjectKey {
    bucket: BucketRef,
    key: String,
}

impl ObjectKey {
    pub fn new(bucket: BucketRef, key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(Error::InvalidKey("key cannot be empty".to_string()));
        }
        if key.len() > MAX_KEY_LEN {
            return Err(Error::InvalidKey(format!(
                "key is {} bytes, limit is {MAX_KEY_LEN}",
                key.len()
            )));
        }
        Ok(Self { bucket, key })
    }

    pub(crate) fn from_backend(bucket: BucketRef, key: impl Into<String>) -> Self {
        Self {
            bucket,
            key: key.into(),
        }
    }

    pub fn bucket(&self) -> &BucketRef {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// What an outcome refers to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Every bucket visible to the credentials
    Account,
    Bucket(BucketRef),
    Object(ObjectKey),
}

impl Target {
    pub fn as_object(&self) -> Option<&ObjectKey> {
        match self {
            Target::Object(key) => Some(key),
            Target::Account | Target::Bucket(_) => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Account => f.write_str("*"),
            Target::Bucket(b) => b.fmt(f),
            Target::Object(k) => k.fmt(f),
        }
    }
}

impl From<BucketRef> for Target {
    fn from(bucket: BucketRef) -> Self {
        Target::Bucket(bucket)
    }
}

impl From<ObjectKey> for Target {
    fn from(key: ObjectKey) -> Self {
        Target::Object(key)
    }
}

/// Bucket as reported by a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketInfo {
    pub bucket: BucketRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl BucketInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            bucket: BucketRef::from_backend(name),
            created: None,
            region: None,
        }
    }
}

/// Object as reported by a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    pub key: ObjectKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl ObjectInfo {
    pub fn new(bucket: &BucketRef, key: impl Into<String>, size: i64) -> Self {
        Self {
            key: ObjectKey::from_backend(bucket.clone(), key),
            size_bytes: Some(size),
            last_modified: None,
            etag: None,
        }
    }
}

/// Object body with its content type and user metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectData {
    pub data: Bytes,
    pub content_type: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl ObjectData {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_bucket_names() {
        for name in ["abc", "my-bucket", "logs.2024.example", "a1b2c3"] {
            assert!(BucketRef::new(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_invalid_bucket_names() {
        for name in [
            "",
            "ab",
            "MyBucket",
            "under_score",
            "-leading",
            "trailing-",
            "two..dots",
            "192.168.1.1",
            "xn--bucket",
            &"a".repeat(64),
        ] {
            assert!(
                matches!(BucketRef::new(name), Err(Error::InvalidBucketName { .. })),
                "{name}"
            );
        }
    }

    #[test]
    fn test_object_key_validation() {
        let bucket = BucketRef::new("photos").unwrap();
        assert!(bucket.object("").is_err());
        assert!(bucket.object("x".repeat(MAX_KEY_LEN + 1)).is_err());

        let key = bucket.object("2024/cat.jpg").unwrap();
        assert_eq!(key.key(), "2024/cat.jpg");
        assert_eq!(key.bucket().name(), "photos");
        assert_eq!(key.to_string(), "photos/2024/cat.jpg");
    }

    #[test]
    fn test_target_serialization() {
        let bucket = BucketRef::new("photos").unwrap();
        let target = Target::Object(bucket.object("cat.jpg").unwrap());
        let json = serde_json::to_string(&target).unwrap();
        assert_eq!(json, r#"{"object":{"bucket":"photos","key":"cat.jpg"}}"#);

        let json = serde_json::to_string(&Target::Bucket(bucket)).unwrap();
        assert_eq!(json, r#"{"bucket":"photos"}"#);

        assert_eq!(serde_json::to_string(&Target::Account).unwrap(), r#""account""#);
        assert_eq!(Target::Account.to_string(), "*");
    }
}
