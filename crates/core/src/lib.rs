//! stow-core: resilient object storage operations
//!
//! This crate provides the core of the stow client:
//! - Error classification into a small set of kinds
//! - Retry with bounded exponential backoff
//! - Lazy, resumable listings
//! - Bulk put/get/delete with bounded concurrency and structured reports
//! - The [`ObjectStore`] trait every backend implements
//!
//! It is independent of any specific S3 SDK; `stow-s3` provides the AWS
//! backend and [`MemoryStore`] an in-process one.

pub mod bulk;
pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod listing;
pub mod memory;
pub mod model;
pub mod report;
pub mod retry;
pub mod traits;

pub use bulk::{BulkOrchestrator, Destination, Download, MemoryBuffer, UploadSource};
pub use classify::classify;
pub use client::ObjectClient;
pub use config::{BulkConfig, ClientConfig, ConnectionConfig, DEFAULT_REGION, RetryConfig};
pub use error::{Error, ErrorKind, Operation, RawError, Result, StorageError, TransportFailure};
pub use memory::MemoryStore;
pub use model::{BucketInfo, BucketRef, ObjectData, ObjectInfo, ObjectKey, Target};
pub use report::{
    BucketDeletion, BulkReport, BulkStatus, FailedItem, Listing, OperationOutcome, OutcomeStatus,
    ReportBuilder,
};
pub use retry::{RetryBuilder, RetryPolicy};
pub use traits::{BackendResult, ObjectStore, Page};
