//! Mapping of raw backend errors onto [`ErrorKind`]
//!
//! The provider error code wins when present, then the HTTP status, then the
//! transport failure. Anything left over is [`ErrorKind::Fatal`].

use crate::error::{ErrorKind, RawError, TransportFailure};

const NOT_FOUND_CODES: &[&str] = &[
    "NoSuchBucket",
    "NoSuchKey",
    "NoSuchUpload",
    "NoSuchVersion",
    "NotFound",
];

const CONFLICT_CODES: &[&str] = &[
    "BucketAlreadyExists",
    "BucketAlreadyOwnedByYou",
    "BucketNotEmpty",
    "ConditionalRequestConflict",
    "InvalidBucketState",
    "OperationAborted",
    "PreconditionFailed",
];

const UNAUTHORIZED_CODES: &[&str] = &[
    "AccessDenied",
    "AccountProblem",
    "AllAccessDisabled",
    "ExpiredToken",
    "InvalidAccessKeyId",
    "InvalidSecurity",
    "InvalidToken",
    "SignatureDoesNotMatch",
    "TokenRefreshRequired",
];

const THROTTLED_CODES: &[&str] = &[
    "RequestLimitExceeded",
    "RequestThrottled",
    "RequestThrottledException",
    "SlowDown",
    "Throttling",
    "ThrottlingException",
    "TooManyRequests",
    "TooManyRequestsException",
];

const TRANSIENT_CODES: &[&str] = &[
    "InternalError",
    "RequestTimeout",
    "RequestTimeoutException",
    "ServiceUnavailable",
];

/// Classify a raw backend error. Total: every input maps to exactly one kind.
pub fn classify(error: &RawError) -> ErrorKind {
    if let Some(kind) = error.code.as_deref().and_then(classify_code) {
        return kind;
    }
    if let Some(kind) = error.status.and_then(classify_status) {
        return kind;
    }
    match error.transport {
        Some(failure) => classify_transport(failure),
        None => ErrorKind::Fatal,
    }
}

fn classify_code(code: &str) -> Option<ErrorKind> {
    let table = [
        (NOT_FOUND_CODES, ErrorKind::NotFound),
        (CONFLICT_CODES, ErrorKind::Conflict),
        (UNAUTHORIZED_CODES, ErrorKind::Unauthorized),
        (THROTTLED_CODES, ErrorKind::Throttled),
        (TRANSIENT_CODES, ErrorKind::Transient),
    ];
    table
        .into_iter()
        .find(|(codes, _)| codes.contains(&code))
        .map(|(_, kind)| kind)
}

fn classify_status(status: u16) -> Option<ErrorKind> {
    match status {
        404 => Some(ErrorKind::NotFound),
        409 | 412 => Some(ErrorKind::Conflict),
        401 | 403 => Some(ErrorKind::Unauthorized),
        429 => Some(ErrorKind::Throttled),
        408 | 500..=599 => Some(ErrorKind::Transient),
        _ => None,
    }
}

fn classify_transport(failure: TransportFailure) -> ErrorKind {
    match failure {
        TransportFailure::Timeout
        | TransportFailure::Connection
        | TransportFailure::Io
        | TransportFailure::Response => ErrorKind::Transient,
        TransportFailure::Construction | TransportFailure::Other => ErrorKind::Fatal,
    }
}

/// Classify a local filesystem error hit while staging an upload or download
pub fn classify_io(error: &std::io::Error) -> ErrorKind {
    match error.kind() {
        std::io::ErrorKind::NotFound => ErrorKind::NotFound,
        std::io::ErrorKind::AlreadyExists => ErrorKind::Conflict,
        _ => ErrorKind::Fatal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_take_precedence_over_status() {
        // S3 reports throttling as 503 SlowDown
        assert_eq!(
            classify(&RawError::service("SlowDown", 503, "Please reduce your request rate.")),
            ErrorKind::Throttled
        );
        // Bucket listing against a missing bucket
        assert_eq!(
            classify(&RawError::service("NoSuchBucket", 404, "missing")),
            ErrorKind::NotFound
        );
        assert_eq!(
            classify(&RawError::service("BucketAlreadyOwnedByYou", 409, "exists")),
            ErrorKind::Conflict
        );
    }

    #[test]
    fn test_credential_codes() {
        for code in ["InvalidAccessKeyId", "InvalidSecurity", "SignatureDoesNotMatch"] {
            assert_eq!(
                classify(&RawError::service(code, 403, "denied")),
                ErrorKind::Unauthorized,
                "{code}"
            );
        }
    }

    #[test]
    fn test_status_fallback() {
        assert_eq!(classify(&RawError::status(404, "")), ErrorKind::NotFound);
        assert_eq!(classify(&RawError::status(412, "")), ErrorKind::Conflict);
        assert_eq!(classify(&RawError::status(403, "")), ErrorKind::Unauthorized);
        assert_eq!(classify(&RawError::status(429, "")), ErrorKind::Throttled);
        assert_eq!(classify(&RawError::status(502, "")), ErrorKind::Transient);
        assert_eq!(classify(&RawError::status(400, "")), ErrorKind::Fatal);
    }

    #[test]
    fn test_unknown_code_falls_through_to_status() {
        assert_eq!(
            classify(&RawError::service("SomethingNew", 500, "boom")),
            ErrorKind::Transient
        );
        assert_eq!(
            classify(&RawError::service("SomethingNew", 400, "boom")),
            ErrorKind::Fatal
        );
    }

    #[test]
    fn test_transport_failures() {
        assert_eq!(
            classify(&RawError::transport(TransportFailure::Timeout, "")),
            ErrorKind::Transient
        );
        assert_eq!(
            classify(&RawError::transport(TransportFailure::Connection, "")),
            ErrorKind::Transient
        );
        assert_eq!(
            classify(&RawError::transport(TransportFailure::Construction, "")),
            ErrorKind::Fatal
        );
    }

    #[test]
    fn test_classification_is_total() {
        let codes = [
            None,
            Some("NoSuchKey"),
            Some("BucketNotEmpty"),
            Some("AccessDenied"),
            Some("SlowDown"),
            Some("InternalError"),
            Some("Bogus"),
        ];
        let statuses = [None, Some(200), Some(400), Some(404), Some(429), Some(503)];
        let transports = [
            None,
            Some(TransportFailure::Timeout),
            Some(TransportFailure::Other),
        ];

        for code in codes {
            for status in statuses {
                for transport in transports {
                    let raw = RawError {
                        code: code.map(str::to_string),
                        status,
                        transport,
                        message: String::new(),
                    };
                    let kind = classify(&raw);
                    let matched_code = code.and_then(classify_code).is_some();
                    let matched_status = status.and_then(classify_status).is_some();
                    let retryable_transport = matches!(transport, Some(TransportFailure::Timeout));
                    if kind == ErrorKind::Fatal {
                        assert!(!matched_code && !matched_status && !retryable_transport, "{raw:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_classify_io() {
        let missing = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert_eq!(classify_io(&missing), ErrorKind::NotFound);
        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert_eq!(classify_io(&denied), ErrorKind::Fatal);
    }
}
