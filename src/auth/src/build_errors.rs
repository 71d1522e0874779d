// Copyright 2025 Google LLC
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

//! Errors created during credentials construction.

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type for [Credentials] builders.
///
/// Construction errors are detected before any network activity and are not
/// retried: the configuration must change before a second attempt can
/// succeed.
///
/// [Credentials]: super::credentials::Credentials
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct Error(ErrorKind);

impl Error {
    /// A required field was missing or empty.
    pub fn is_missing_field(&self) -> bool {
        matches!(self.0, ErrorKind::MissingField(_))
    }

    /// The base credentials could not be detected from the environment.
    pub fn is_detection(&self) -> bool {
        matches!(self.0, ErrorKind::Detection(_))
    }

    /// The service endpoint and the target principal do not form a valid URI.
    pub fn is_invalid_uri(&self) -> bool {
        matches!(self.0, ErrorKind::InvalidUri(_))
    }

    /// The HTTP transport could not be created.
    pub fn is_transport(&self) -> bool {
        matches!(self.0, ErrorKind::Transport(_))
    }

    /// A required field was missing or empty.
    pub(crate) fn missing_field(field: &'static str) -> Error {
        Error(ErrorKind::MissingField(field))
    }

    /// Create an error representing problems detecting the base credentials.
    pub fn detection<T>(source: T) -> Error
    where
        T: Into<BoxError>,
    {
        Error(ErrorKind::Detection(source.into()))
    }

    pub(crate) fn invalid_uri<T>(source: T) -> Error
    where
        T: Into<BoxError>,
    {
        Error(ErrorKind::InvalidUri(source.into()))
    }

    /// Create an error representing problems creating the HTTP transport.
    pub(crate) fn transport<T>(source: T) -> Error
    where
        T: Into<BoxError>,
    {
        Error(ErrorKind::Transport(source.into()))
    }
}

#[derive(thiserror::Error, Debug)]
enum ErrorKind {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("cannot detect the base credentials {0}")]
    Detection(#[source] BoxError),
    #[error("invalid request URI {0}")]
    InvalidUri(#[source] BoxError),
    #[error("cannot create the HTTP transport {0}")]
    Transport(#[source] BoxError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn constructors() {
        let error = Error::missing_field("test field");
        assert!(error.is_missing_field(), "{error:?}");
        assert!(error.source().is_none(), "{error:?}");
        assert!(error.to_string().contains("test field"), "{error}");

        let error = Error::detection("test message");
        assert!(error.is_detection(), "{error:?}");
        assert!(error.source().is_some(), "{error:?}");
        assert!(error.to_string().contains("test message"), "{error}");

        let error = Error::invalid_uri("test message");
        assert!(error.is_invalid_uri(), "{error:?}");
        assert!(error.source().is_some(), "{error:?}");
        assert!(error.to_string().contains("test message"), "{error}");

        let error = Error::transport("test message");
        assert!(error.is_transport(), "{error:?}");
        assert!(error.source().is_some(), "{error:?}");
        assert!(error.to_string().contains("test message"), "{error}");
    }
}
