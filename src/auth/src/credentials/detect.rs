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

//! Find the base credentials when the application provides none.
//!
//! The impersonated ID token builder uses a [CredentialsDetector] to find
//! the credentials of the base principal. The default detector,
//! [MdsDetector], returns [Metadata Service][crate::credentials::mds]
//! credentials. Applications running elsewhere supply their own detector, or
//! supply the base credentials directly.

use crate::BuildResult;
use crate::credentials::{Credentials, mds};

/// The options used to detect the base credentials.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectOptions {
    scopes: Vec<String>,
    use_self_signed_jwt: bool,
}

impl DetectOptions {
    /// Creates options with no scopes and self-signed JWTs disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the OAuth scopes requested for the base credentials.
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Allows service account credentials to use self-signed JWTs instead of
    /// OAuth access tokens.
    pub fn with_self_signed_jwt(mut self, v: bool) -> Self {
        self.use_self_signed_jwt = v;
        self
    }

    /// The OAuth scopes requested for the base credentials.
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Whether service account credentials may use self-signed JWTs.
    pub fn use_self_signed_jwt(&self) -> bool {
        self.use_self_signed_jwt
    }
}

/// Finds the base credentials for the environment.
///
/// Return [build_errors::Error::detection][crate::build_errors::Error::detection]
/// when no credentials are found.
pub trait CredentialsDetector: std::fmt::Debug + Send + Sync {
    /// Returns the base credentials for the given options.
    fn detect(&self, options: &DetectOptions) -> BuildResult<Credentials>;
}

/// Detects [Metadata Service][crate::credentials::mds] credentials.
///
/// Service accounts on the metadata service cannot sign JWTs locally, the
/// `use_self_signed_jwt` option is ignored.
#[derive(Clone, Debug, Default)]
pub struct MdsDetector {
    endpoint: Option<String>,
}

impl MdsDetector {
    /// Creates a detector using the default metadata service endpoint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the metadata service endpoint used by the detected credentials.
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

impl CredentialsDetector for MdsDetector {
    fn detect(&self, options: &DetectOptions) -> BuildResult<Credentials> {
        let mut builder = mds::Builder::default();
        if !options.scopes().is_empty() {
            builder = builder.with_scopes(options.scopes().iter().cloned());
        }
        if let Some(endpoint) = &self.endpoint {
            builder = builder.with_endpoint(endpoint.clone());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use httptest::{Expectation, Server, matchers::*, responders::*};
    use serde_json::json;

    type TestResult = anyhow::Result<()>;

    #[test]
    fn options() {
        let options = DetectOptions::new();
        assert!(options.scopes().is_empty(), "{options:?}");
        assert!(!options.use_self_signed_jwt(), "{options:?}");

        let options = DetectOptions::new()
            .with_scopes(["scope1", "scope2"])
            .with_self_signed_jwt(true);
        assert_eq!(options.scopes(), &["scope1", "scope2"]);
        assert!(options.use_self_signed_jwt(), "{options:?}");
    }

    #[tokio::test]
    async fn mds_detector() -> TestResult {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path(
                    "GET",
                    "/computeMetadata/v1/instance/service-accounts/default/token"
                ),
                request::query(url_decoded(contains(("scopes", "scope1")))),
            ])
            .respond_with(json_encoded(json!({
                "access_token": "test-access-token",
                "expires_in": 3600,
                "token_type": "Bearer",
            }))),
        );

        let detector = MdsDetector::new().with_endpoint(format!("http://{}", server.addr()));
        let credentials = detector.detect(
            &DetectOptions::new()
                .with_scopes(["scope1"])
                .with_self_signed_jwt(true),
        )?;
        let token = credentials.token(&Context::new()).await?;
        assert_eq!(token.token, "test-access-token");
        Ok(())
    }
}
