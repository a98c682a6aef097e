//! SDK error conversion
//!
//! Turns `SdkError` values into the unclassified [`RawError`] the core
//! expects: the S3 error code and HTTP status for service errors, the
//! transport failure for everything that never produced a response.

use aws_sdk_s3::error::SdkError;
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use stow_core::{RawError, TransportFailure};

/// Convert an SDK error, keeping the provider code, status and message
pub(crate) fn raw_error<E>(error: &SdkError<E, HttpResponse>) -> RawError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    match error {
        SdkError::ServiceError(service_err) => {
            let err = service_err.err();
            let message = err
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| err.to_string());
            RawError {
                code: err.code().map(str::to_string),
                status: Some(service_err.raw().status().as_u16()),
                transport: None,
                message,
            }
        }
        SdkError::TimeoutError(_) => {
            RawError::transport(TransportFailure::Timeout, "Request timeout")
        }
        SdkError::DispatchFailure(dispatch) => {
            let failure = if dispatch.is_timeout() {
                TransportFailure::Timeout
            } else if dispatch.is_io() {
                TransportFailure::Io
            } else if dispatch.is_user() {
                TransportFailure::Other
            } else {
                TransportFailure::Connection
            };
            RawError::transport(
                failure,
                format!("Network dispatch error: {}", DisplayErrorContext(error)),
            )
        }
        SdkError::ResponseError(response) => RawError {
            code: None,
            status: Some(response.raw().status().as_u16()),
            transport: Some(TransportFailure::Response),
            message: format!("Response error: {}", DisplayErrorContext(error)),
        },
        SdkError::ConstructionFailure(_) => RawError::transport(
            TransportFailure::Construction,
            format!("Request construction failed: {}", DisplayErrorContext(error)),
        ),
        _ => RawError::other(DisplayErrorContext(error).to_string()),
    }
}

/// A response body that broke off while streaming
pub(crate) fn body_error(error: &aws_sdk_s3::primitives::ByteStreamError) -> RawError {
    RawError::transport(
        TransportFailure::Io,
        format!("Failed to read object body: {}", DisplayErrorContext(error)),
    )
}
