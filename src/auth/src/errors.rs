// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Errors created while obtaining tokens.

use http::StatusCode;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter, Result};
use std::sync::Arc;

/// Represents an error using a [Credentials] to obtain a token.
///
/// Obtaining a token may fail because the network is unreachable, because the
/// service rejects the request, because the response cannot be parsed, or
/// because the caller gave up waiting. The `is_*` predicates classify the
/// error, and [is_transient][CredentialsError::is_transient] indicates whether
/// a future attempt may succeed.
///
/// The error is cheap to clone: all the callers waiting for the same token
/// refresh receive a copy of the same error.
///
/// # Example
/// ```
/// # use google_cloud_auth_impersonate::errors::CredentialsError;
/// let err = CredentialsError::from_msg(
///     true, "simulated retryable error while trying to create a token");
/// assert!(err.is_transient());
/// assert!(format!("{err}").contains("simulated retryable error"));
/// ```
///
/// [Credentials]: crate::credentials::Credentials
#[derive(Clone, Debug)]
pub struct CredentialsError {
    /// If `true`, the operation that resulted in this error might succeed upon
    /// retry.
    is_transient: bool,

    kind: ErrorKind,

    message: String,

    /// The underlying source of the error, if any.
    source: Option<Arc<dyn Error + Send + Sync>>,
}

#[derive(Clone, Debug)]
enum ErrorKind {
    Transport,
    Api { status: StatusCode, body: String },
    Decode,
    Cancelled,
    DeadlineExceeded,
    Other,
}

impl CredentialsError {
    /// Creates a new `CredentialsError` with a message and a source.
    ///
    /// This function is only intended for use in the client libraries
    /// implementation and in application mocks.
    pub fn new<M, T>(is_transient: bool, message: M, source: T) -> Self
    where
        M: Into<String>,
        T: Error + Send + Sync + 'static,
    {
        Self::with_kind(ErrorKind::Other, is_transient, message, Some(Arc::new(source)))
    }

    /// Creates a new `CredentialsError` from a message.
    ///
    /// This function is only intended for use in the client libraries
    /// implementation and in application mocks.
    pub fn from_msg<M: Into<String>>(is_transient: bool, message: M) -> Self {
        Self::with_kind(ErrorKind::Other, is_transient, message, None)
    }

    /// Creates a new `CredentialsError` from a source error.
    ///
    /// This function is only intended for use in the client libraries
    /// implementation and in application mocks.
    pub fn from_source<T: Error + Send + Sync + 'static>(is_transient: bool, source: T) -> Self {
        Self::with_kind(
            ErrorKind::Other,
            is_transient,
            "cannot obtain token",
            Some(Arc::new(source)),
        )
    }

    /// The request did not reach the service, or the response was lost.
    pub(crate) fn transport<M, T>(message: M, source: T) -> Self
    where
        M: Into<String>,
        T: Error + Send + Sync + 'static,
    {
        Self::with_kind(ErrorKind::Transport, true, message, Some(Arc::new(source)))
    }

    /// The service returned a status code outside the `2xx` range.
    pub(crate) fn api<M: Into<String>>(message: M, status: StatusCode, body: String) -> Self {
        let message = format!(
            "{}: status code {}: {body}",
            message.into(),
            status.as_u16()
        );
        Self::with_kind(
            ErrorKind::Api { status, body },
            is_retryable(status),
            message,
            None,
        )
    }

    /// The service returned a successful status code with an unexpected body.
    pub(crate) fn decode<M, T>(message: M, source: T) -> Self
    where
        M: Into<String>,
        T: Error + Send + Sync + 'static,
    {
        Self::with_kind(ErrorKind::Decode, false, message, Some(Arc::new(source)))
    }

    /// The caller cancelled the request.
    pub(crate) fn cancelled() -> Self {
        Self::with_kind(
            ErrorKind::Cancelled,
            false,
            "the request was cancelled by the caller",
            None,
        )
    }

    /// The caller's deadline expired before a token was available.
    pub(crate) fn deadline_exceeded() -> Self {
        Self::with_kind(
            ErrorKind::DeadlineExceeded,
            true,
            "the deadline expired before a token was available",
            None,
        )
    }

    fn with_kind<M: Into<String>>(
        kind: ErrorKind,
        is_transient: bool,
        message: M,
        source: Option<Arc<dyn Error + Send + Sync>>,
    ) -> Self {
        Self {
            is_transient,
            kind,
            message: message.into(),
            source,
        }
    }

    /// Returns `true` if a future attempt may succeed.
    pub fn is_transient(&self) -> bool {
        self.is_transient
    }

    /// The request could not be sent, or the response could not be received.
    pub fn is_transport(&self) -> bool {
        matches!(self.kind, ErrorKind::Transport)
    }

    /// The service rejected the request with a non-`2xx` status code.
    ///
    /// Use [status][Self::status] and [body][Self::body] to examine the
    /// response.
    pub fn is_api(&self) -> bool {
        matches!(self.kind, ErrorKind::Api { .. })
    }

    /// The service returned a successful status with a malformed body.
    pub fn is_decode(&self) -> bool {
        matches!(self.kind, ErrorKind::Decode)
    }

    /// The caller cancelled the request before a token was available.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled)
    }

    /// The caller's deadline expired before a token was available.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self.kind, ErrorKind::DeadlineExceeded)
    }

    /// The HTTP status code returned by the service, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match &self.kind {
            ErrorKind::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The raw response body returned by the service, if any.
    pub fn body(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::Api { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }
}

impl std::error::Error for CredentialsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

const TRANSIENT_MSG: &str = "but future attempts may succeed";
const PERMANENT_MSG: &str = "and future attempts will not succeed";

impl Display for CredentialsError {
    /// Formats the error message to include retryability and source.
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let msg = if self.is_transient {
            TRANSIENT_MSG
        } else {
            PERMANENT_MSG
        };
        write!(f, "{}, {msg}", self.message)?;
        if let Some(source) = &self.source {
            write!(f, ", source: {source}")?;
        }
        Ok(())
    }
}

pub(crate) fn is_retryable(c: StatusCode) -> bool {
    match c {
        // Internal server errors do not indicate that there is anything wrong
        // with our request, so we retry them.
        StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::REQUEST_TIMEOUT
        | StatusCode::TOO_MANY_REQUESTS => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(StatusCode::INTERNAL_SERVER_ERROR)]
    #[test_case(StatusCode::SERVICE_UNAVAILABLE)]
    #[test_case(StatusCode::REQUEST_TIMEOUT)]
    #[test_case(StatusCode::TOO_MANY_REQUESTS)]
    fn retryable(c: StatusCode) {
        assert!(is_retryable(c));
    }

    #[test_case(StatusCode::NOT_FOUND)]
    #[test_case(StatusCode::UNAUTHORIZED)]
    #[test_case(StatusCode::FORBIDDEN)]
    #[test_case(StatusCode::BAD_REQUEST)]
    #[test_case(StatusCode::BAD_GATEWAY)]
    fn non_retryable(c: StatusCode) {
        assert!(!is_retryable(c));
    }

    #[test]
    fn api() {
        let e = CredentialsError::api(
            "unable to generate ID token",
            StatusCode::FORBIDDEN,
            "permission denied".to_string(),
        );
        assert!(e.is_api(), "{e:?}");
        assert!(!e.is_transient(), "{e:?}");
        assert_eq!(e.status(), Some(StatusCode::FORBIDDEN));
        assert_eq!(e.body(), Some("permission denied"));
        let got = format!("{e}");
        assert!(got.contains("403"), "{got}");
        assert!(got.contains("permission denied"), "{got}");
        assert!(got.contains("unable to generate ID token"), "{got}");
    }

    #[test]
    fn transport() {
        let source = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "test-only");
        let e = CredentialsError::transport("unable to generate ID token", source);
        assert!(e.is_transport(), "{e:?}");
        assert!(e.is_transient(), "{e:?}");
        assert!(e.source().is_some(), "{e:?}");
        assert!(e.status().is_none(), "{e:?}");
        assert!(format!("{e}").contains("test-only"), "{e}");
    }

    #[test]
    fn decode() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e = CredentialsError::decode("unable to generate ID token", source);
        assert!(e.is_decode(), "{e:?}");
        assert!(!e.is_transient(), "{e:?}");
        assert!(e.source().is_some(), "{e:?}");
    }

    #[test]
    fn caller_gave_up() {
        let e = CredentialsError::cancelled();
        assert!(e.is_cancelled(), "{e:?}");
        assert!(!e.is_deadline_exceeded(), "{e:?}");

        let e = CredentialsError::deadline_exceeded();
        assert!(e.is_deadline_exceeded(), "{e:?}");
        assert!(!e.is_cancelled(), "{e:?}");
        assert!(e.is_transient(), "{e:?}");
    }

    #[test_case(true)]
    #[test_case(false)]
    fn from_msg(transient: bool) {
        let got = CredentialsError::from_msg(transient, "test-only");
        assert_eq!(got.is_transient(), transient, "{got}");
        assert!(got.source().is_none(), "{got}");
        assert!(!got.is_api(), "{got:?}");
        assert!(format!("{got}").contains("test-only"), "{got}");
    }

    #[test]
    fn fmt() {
        let e = CredentialsError::from_msg(true, "test-only-err-123");
        let got = format!("{e}");
        assert!(got.contains("test-only-err-123"), "{got}");
        assert!(got.contains(TRANSIENT_MSG), "{got}");

        let e = CredentialsError::from_msg(false, "test-only-err-123");
        let got = format!("{e}");
        assert!(got.contains("test-only-err-123"), "{got}");
        assert!(got.contains(PERMANENT_MSG), "{got}");
    }
}
