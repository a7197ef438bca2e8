//! AWS error classification and handling
//!
//! SDK failures are reduced to an [`AwsError`] carrying a coarse
//! [`ErrorKind`], the service error code and its message. The `Display`
//! form is what lands in `failed: ...` row statuses and fatal messages.

use awstbx_core::CoreError;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use std::fmt::Debug;
use thiserror::Error;

/// Coarse category of an AWS failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AccessDenied,
    NotFound,
    Throttled,
    Validation,
    Timeout,
    Unknown,
}

/// A classified AWS failure, rendered as `"<message> (<code>)"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}{}", .code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default())]
pub struct AwsError {
    pub kind: ErrorKind,
    pub code: Option<String>,
    pub message: String,
}

/// Code fragments (lowercased) for access-denied conditions
const ACCESS_DENIED_CODES: &[&str] = &["accessdenied", "unauthorized"];

/// Code fragments (lowercased) for "not found" conditions
const NOT_FOUND_CODES: &[&str] = &["notfound", "nosuch"];

/// Code fragments (lowercased) for throttling/rate limiting
const THROTTLING_CODES: &[&str] = &["throttl", "toomanyrequests"];

/// Code fragments (lowercased) for rejected input
const VALIDATION_CODES: &[&str] = &["validation", "invalid"];

const TIMEOUT_MESSAGE: &str = "request timed out before AWS returned a response";

/// Classify an AWS error code.
pub fn classify_code(code: &str) -> ErrorKind {
    let lower = code.to_ascii_lowercase();
    let matches = |fragments: &[&str]| fragments.iter().any(|f| lower.contains(f));

    if matches(ACCESS_DENIED_CODES) {
        ErrorKind::AccessDenied
    } else if matches(NOT_FOUND_CODES) {
        ErrorKind::NotFound
    } else if matches(THROTTLING_CODES) {
        ErrorKind::Throttled
    } else if matches(VALIDATION_CODES) {
        ErrorKind::Validation
    } else {
        ErrorKind::Unknown
    }
}

impl AwsError {
    pub fn new(kind: ErrorKind, code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
        }
    }

    /// An error raised locally (no service code), such as a malformed response.
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, None, message)
    }

    /// Classify an error returned by an SDK operation.
    ///
    /// Service errors keep their code and message. Timeouts become
    /// [`ErrorKind::Timeout`]; anything else without a service code is
    /// reported as `UnknownError` with the full error context as message.
    pub fn from_sdk<E, R>(err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: Debug,
    {
        if let SdkError::TimeoutError(_) = &err {
            return Self::new(ErrorKind::Timeout, Some("Timeout".into()), TIMEOUT_MESSAGE);
        }

        match err.code() {
            Some(code) => {
                let message = err
                    .message()
                    .filter(|m| !m.trim().is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
                Self::new(classify_code(code), Some(code.to_string()), message)
            }
            None => Self::new(
                ErrorKind::Unknown,
                Some("UnknownError".into()),
                DisplayErrorContext(&err).to_string(),
            ),
        }
    }

    /// The resource does not exist (any more). Delete paths treat this as
    /// already done.
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

impl From<CoreError> for AwsError {
    fn from(err: CoreError) -> Self {
        Self::other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_denied_codes() {
        assert_eq!(classify_code("AccessDenied"), ErrorKind::AccessDenied);
        assert_eq!(classify_code("AccessDeniedException"), ErrorKind::AccessDenied);
        assert_eq!(classify_code("UnauthorizedOperation"), ErrorKind::AccessDenied);
    }

    #[test]
    fn not_found_codes() {
        assert_eq!(classify_code("NoSuchBucket"), ErrorKind::NotFound);
        assert_eq!(classify_code("FileSystemNotFound"), ErrorKind::NotFound);
        assert_eq!(classify_code("ParameterNotFound"), ErrorKind::NotFound);
    }

    #[test]
    fn throttling_codes() {
        assert_eq!(classify_code("ThrottlingException"), ErrorKind::Throttled);
        assert_eq!(classify_code("TooManyRequestsException"), ErrorKind::Throttled);
    }

    #[test]
    fn validation_codes() {
        assert_eq!(classify_code("ValidationException"), ErrorKind::Validation);
        assert_eq!(classify_code("InvalidParameterException"), ErrorKind::Validation);
    }

    #[test]
    fn unknown_codes() {
        assert_eq!(classify_code("InternalFailure"), ErrorKind::Unknown);
        assert_eq!(classify_code(""), ErrorKind::Unknown);
    }

    #[test]
    fn display_includes_code_when_present() {
        let err = AwsError::new(
            ErrorKind::AccessDenied,
            Some("AccessDenied".into()),
            "not allowed",
        );
        assert_eq!(err.to_string(), "not allowed (AccessDenied)");
        assert_eq!(AwsError::other("empty response").to_string(), "empty response");
    }

    #[test]
    fn core_errors_convert() {
        let err = AwsError::from(CoreError::DuplicateCursor("abc".into()));
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert!(err.to_string().contains("duplicate cursor"));
    }
}
