//! Client configuration
//!
//! These types are deserialized by the surrounding application (the `stow`
//! binary reads them from `config.toml`); the core only consumes them.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Region used when none is configured
pub const DEFAULT_REGION: &str = "us-east-1";

/// Full configuration for an [`ObjectClient`](crate::ObjectClient)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub connection: ConnectionConfig,
    pub retry: RetryConfig,
    pub bulk: BulkConfig,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        self.connection.validate()?;
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(Error::Config(
                "retry.initial_backoff_ms exceeds retry.max_backoff_ms".into(),
            ));
        }
        if self.bulk.concurrency == 0 {
            return Err(Error::Config("bulk.concurrency must be at least 1".into()));
        }
        if !(1..=1000).contains(&self.bulk.page_size) {
            return Err(Error::Config("bulk.page_size must be between 1 and 1000".into()));
        }
        Ok(())
    }
}

/// Where the object store lives and how to authenticate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub region: String,
    /// Custom endpoint for S3-compatible services; AWS when unset
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    #[serde(skip_serializing)]
    pub secret_key: Option<String>,
    #[serde(skip_serializing)]
    pub session_token: Option<String>,
    /// Use path-style addressing (`endpoint/bucket/key`)
    pub path_style: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            session_token: None,
            path_style: false,
        }
    }
}

impl ConnectionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.region.trim().is_empty() {
            return Err(Error::Config("region cannot be empty".into()));
        }

        if let Some(endpoint) = &self.endpoint {
            let url = url::Url::parse(endpoint)
                .map_err(|e| Error::Config(format!("invalid endpoint '{endpoint}': {e}")))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(Error::Config(format!(
                    "endpoint '{endpoint}' must use http or https"
                )));
            }
        }

        match (&self.access_key, &self.secret_key) {
            (Some(_), None) => Err(Error::Config("access_key set without secret_key".into())),
            (None, Some(_)) => Err(Error::Config("secret_key set without access_key".into())),
            _ => Ok(()),
        }
    }

    /// Whether static credentials are configured
    pub fn has_static_credentials(&self) -> bool {
        self.access_key.is_some() && self.secret_key.is_some()
    }
}

/// Retry policy parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first call
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 100,
            max_backoff_ms: 10_000,
        }
    }
}

/// Bulk operation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkConfig {
    /// Maximum primitive calls in flight during a bulk operation
    pub concurrency: usize,
    /// Items requested per listing page
    pub page_size: i32,
    /// Sort bulk reports by target before returning them
    pub sort_reports: bool,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            page_size: 1000,
            sort_reports: false,
        }
    }
}
