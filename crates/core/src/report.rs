//! Outcomes and bulk reports
//!
//! Everything here is plain data. [`ReportBuilder`] folds per-item
//! [`OperationOutcome`]s into a [`BulkReport`]; it performs no I/O.

use serde::Serialize;

use crate::error::{ErrorKind, StorageError};
use crate::model::{BucketRef, ObjectKey, Target};

/// Result of one primitive call, after retries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Failed {
        kind: ErrorKind,
        reason: String,
        attempts: u32,
    },
}

/// Outcome of an operation on one bucket or object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationOutcome {
    pub target: Target,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl OperationOutcome {
    pub fn success(target: impl Into<Target>) -> Self {
        Self {
            target: target.into(),
            status: OutcomeStatus::Success,
        }
    }

    pub fn failed(target: impl Into<Target>, error: &StorageError) -> Self {
        Self {
            target: target.into(),
            status: OutcomeStatus::Failed {
                kind: error.kind,
                reason: error.message.clone(),
                attempts: error.attempts,
            },
        }
    }

    /// Record any result as an outcome, including Unauthorized and Fatal
    pub fn from_result(target: impl Into<Target>, result: Result<(), StorageError>) -> Self {
        match result {
            Ok(()) => Self::success(target),
            Err(e) => Self::failed(target, &e),
        }
    }

    /// Turn a single call's result into an outcome, letting Unauthorized and
    /// Fatal escape as errors
    pub fn settle(
        target: impl Into<Target>,
        result: Result<(), StorageError>,
    ) -> Result<Self, StorageError> {
        match result {
            Err(e) if e.kind.propagates() => Err(e),
            other => Ok(Self::from_result(target, other)),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success)
    }

    pub fn error(&self) -> Option<ErrorKind> {
        match &self.status {
            OutcomeStatus::Success => None,
            OutcomeStatus::Failed { kind, .. } => Some(*kind),
        }
    }
}

/// A collected listing, or the outcome that stopped it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Listing<T> {
    Items(Vec<T>),
    Failed(OperationOutcome),
}

impl<T> Listing<T> {
    /// Same rule as [`OperationOutcome::settle`]: only Unauthorized and
    /// Fatal escape as errors
    pub fn settle(
        target: impl Into<Target>,
        result: Result<Vec<T>, StorageError>,
    ) -> Result<Self, StorageError> {
        match result {
            Ok(items) => Ok(Self::Items(items)),
            Err(e) if e.kind.propagates() => Err(e),
            Err(e) => Ok(Self::Failed(OperationOutcome::failed(target, &e))),
        }
    }

    pub fn items(&self) -> Option<&[T]> {
        match self {
            Listing::Items(items) => Some(items),
            Listing::Failed(_) => None,
        }
    }

    pub fn into_items(self) -> Option<Vec<T>> {
        match self {
            Listing::Items(items) => Some(items),
            Listing::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<ErrorKind> {
        match self {
            Listing::Items(_) => None,
            Listing::Failed(outcome) => outcome.error(),
        }
    }
}

/// How a bulk call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkStatus {
    /// Every item was attempted
    Completed,
    /// Cancellation stopped dispatch; unattempted items are in `skipped`
    Cancelled,
    /// An Unauthorized failure stopped dispatch
    Aborted,
}

/// A failed item in a bulk report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedItem {
    pub target: Target,
    pub kind: ErrorKind,
    pub reason: String,
    pub attempts: u32,
}

/// Aggregated outcomes of a bulk call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    pub status: BulkStatus,
    pub succeeded: Vec<Target>,
    pub failed: Vec<FailedItem>,
    /// Items never dispatched because the call was cancelled or aborted
    pub skipped: Vec<Target>,
}

impl BulkReport {
    /// Report for a call that had nothing to do
    pub fn empty() -> Self {
        Self {
            status: BulkStatus::Completed,
            succeeded: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Fold finished outcomes into a completed report
    pub fn fold(outcomes: impl IntoIterator<Item = OperationOutcome>) -> Self {
        let mut builder = ReportBuilder::new();
        builder.start();
        for outcome in outcomes {
            builder.record(outcome);
        }
        builder.finish(BulkStatus::Completed)
    }

    /// Every item was attempted and succeeded
    pub fn is_clean(&self) -> bool {
        self.status == BulkStatus::Completed && self.failed.is_empty() && self.skipped.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.skipped.len()
    }

    /// Objects whose operation failed
    pub fn failed_keys(&self) -> Vec<&ObjectKey> {
        self.failed
            .iter()
            .filter_map(|item| item.target.as_object())
            .collect()
    }

    /// Order every section by target
    pub fn sorted(mut self) -> Self {
        self.succeeded.sort();
        self.failed.sort_by(|a, b| a.target.cmp(&b.target));
        self.skipped.sort();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pending,
    InProgress,
}

/// Incremental accumulator for a [`BulkReport`]
#[derive(Debug)]
pub struct ReportBuilder {
    phase: Phase,
    succeeded: Vec<Target>,
    failed: Vec<FailedItem>,
    skipped: Vec<Target>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self {
            phase: Phase::Pending,
            succeeded: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Mark the bulk call as dispatched
    pub fn start(&mut self) {
        self.phase = Phase::InProgress;
    }

    pub fn record(&mut self, outcome: OperationOutcome) {
        debug_assert_eq!(self.phase, Phase::InProgress, "record before start");
        match outcome.status {
            OutcomeStatus::Success => self.succeeded.push(outcome.target),
            OutcomeStatus::Failed {
                kind,
                reason,
                attempts,
            } => self.failed.push(FailedItem {
                target: outcome.target,
                kind,
                reason,
                attempts,
            }),
        }
    }

    pub fn skip(&mut self, target: impl Into<Target>) {
        self.skipped.push(target.into());
    }

    /// Whether any recorded failure has the given kind
    pub fn has_failure(&self, kind: ErrorKind) -> bool {
        self.failed.iter().any(|item| item.kind == kind)
    }

    pub fn finish(self, status: BulkStatus) -> BulkReport {
        BulkReport {
            status,
            succeeded: self.succeeded,
            failed: self.failed,
            skipped: self.skipped,
        }
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of emptying and deleting a bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketDeletion {
    pub bucket: BucketRef,
    pub deleted: bool,
    /// Outcome of the delete-bucket call; absent when it was never issued
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<OperationOutcome>,
    pub objects: BulkReport,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Operation;

    fn key(name: &str) -> ObjectKey {
        BucketRef::new("reports").unwrap().object(name).unwrap()
    }

    fn error(kind: ErrorKind) -> StorageError {
        StorageError::new(kind, Operation::DeleteObject, "reports/x", "boom", 1)
    }

    #[test]
    fn test_fold_partitions_outcomes() {
        let report = BulkReport::fold([
            OperationOutcome::success(key("a")),
            OperationOutcome::failed(key("b"), &error(ErrorKind::Fatal)),
            OperationOutcome::success(key("c")),
        ]);

        assert_eq!(report.status, BulkStatus::Completed);
        assert_eq!(
            report.succeeded,
            vec![Target::Object(key("a")), Target::Object(key("c"))]
        );
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].kind, ErrorKind::Fatal);
        assert_eq!(report.failed_keys(), vec![&key("b")]);
        assert!(!report.is_clean());
        assert_eq!(report.total(), 3);
    }

    #[test]
    fn test_settle_propagates_only_unauthorized_and_fatal() {
        assert!(OperationOutcome::settle(key("a"), Err(error(ErrorKind::Fatal))).is_err());
        assert!(OperationOutcome::settle(key("a"), Err(error(ErrorKind::Unauthorized))).is_err());

        let outcome = OperationOutcome::settle(key("a"), Err(error(ErrorKind::Conflict))).unwrap();
        assert_eq!(outcome.error(), Some(ErrorKind::Conflict));

        let outcome = OperationOutcome::settle(key("a"), Ok(())).unwrap();
        assert!(outcome.is_success());
    }

    #[test]
    fn test_listing_settles_like_outcomes() {
        let bucket = BucketRef::new("reports").unwrap();

        let listing = Listing::settle(bucket.clone(), Ok(vec![1, 2])).unwrap();
        assert_eq!(listing.items(), Some(&[1, 2][..]));

        for kind in [ErrorKind::NotFound, ErrorKind::Transient, ErrorKind::Throttled] {
            let listing = Listing::<u8>::settle(bucket.clone(), Err(error(kind))).unwrap();
            assert_eq!(listing.error(), Some(kind));
            assert!(listing.into_items().is_none());
        }

        for kind in [ErrorKind::Unauthorized, ErrorKind::Fatal] {
            assert!(Listing::<u8>::settle(bucket.clone(), Err(error(kind))).is_err());
        }
    }

    #[test]
    fn test_sorted() {
        let report = BulkReport::fold([
            OperationOutcome::success(key("c")),
            OperationOutcome::success(key("a")),
            OperationOutcome::success(key("b")),
        ])
        .sorted();

        let keys: Vec<_> = report
            .succeeded
            .iter()
            .filter_map(|t| t.as_object().map(|k| k.key().to_string()))
            .collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_builder_skips_and_status() {
        let mut builder = ReportBuilder::new();
        builder.start();
        builder.record(OperationOutcome::failed(key("a"), &error(ErrorKind::Unauthorized)));
        builder.skip(key("b"));
        assert!(builder.has_failure(ErrorKind::Unauthorized));

        let report = builder.finish(BulkStatus::Aborted);
        assert_eq!(report.skipped, vec![Target::Object(key("b"))]);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = OperationOutcome::failed(key("a"), &error(ErrorKind::NotFound));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["kind"], "not_found");
        assert_eq!(json["attempts"], 1);
        assert_eq!(json["target"]["object"]["key"], "a");
    }
}
