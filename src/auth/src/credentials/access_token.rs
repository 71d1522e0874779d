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

//! Credentials backed by an existing access token.
//!
//! Use these credentials when the application already holds an access token
//! for the base principal, for example, the output of
//! `gcloud auth print-access-token`. The credentials never refresh the token.
//!
//! ```
//! # use google_cloud_auth_impersonate::credentials::access_token::Builder;
//! # use google_cloud_auth_impersonate::context::Context;
//! # tokio_test::block_on(async {
//! let credentials = Builder::new("my-access-token").build();
//! let token = credentials.token(&Context::new()).await?;
//! assert_eq!(token.token, "my-access-token");
//! # Ok::<(), anyhow::Error>(())
//! # });
//! ```

use crate::Result;
use crate::constants::DEFAULT_UNIVERSE_DOMAIN;
use crate::context::Context;
use crate::credentials::{Credentials, CredentialsProvider};
use crate::token::Token;

/// A builder for access token [Credentials].
#[derive(Debug)]
pub struct Builder {
    token: String,
    universe_domain: Option<String>,
}

impl Builder {
    /// Creates a new builder using the given access token.
    pub fn new<S: Into<String>>(token: S) -> Self {
        Self {
            token: token.into(),
            universe_domain: None,
        }
    }

    /// Sets the universe domain for these credentials.
    ///
    /// If not set, the credentials report `googleapis.com`.
    pub fn with_universe_domain<S: Into<String>>(mut self, universe_domain: S) -> Self {
        self.universe_domain = Some(universe_domain.into());
        self
    }

    /// Returns a [Credentials] instance with the configured settings.
    pub fn build(self) -> Credentials {
        Credentials::from(AccessTokenCredentials {
            token: Token {
                token: self.token,
                token_type: "Bearer".to_string(),
                expires_at: None,
            },
            universe_domain: self
                .universe_domain
                .unwrap_or_else(|| DEFAULT_UNIVERSE_DOMAIN.to_string()),
        })
    }
}

#[derive(Debug)]
struct AccessTokenCredentials {
    token: Token,
    universe_domain: String,
}

impl CredentialsProvider for AccessTokenCredentials {
    async fn token(&self, _context: &Context) -> Result<Token> {
        Ok(self.token.clone())
    }

    async fn universe_domain(&self) -> Option<String> {
        Some(self.universe_domain.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::AUTHORIZATION;

    type TestResult = anyhow::Result<()>;

    #[tokio::test]
    async fn token_never_expires() -> TestResult {
        let credentials = Builder::new("test-token").build();
        let token = credentials.token(&Context::new()).await?;
        assert_eq!(token.token, "test-token");
        assert_eq!(token.token_type, "Bearer");
        assert!(token.expires_at.is_none(), "{token:?}");
        Ok(())
    }

    #[tokio::test]
    async fn headers() -> TestResult {
        let credentials = Builder::new("test-token").build();
        let headers = credentials.headers(&Context::new()).await?;
        let value = headers.get(AUTHORIZATION).unwrap();
        assert_eq!(value.to_str()?, "Bearer test-token");
        Ok(())
    }

    #[tokio::test]
    async fn universe_domain() {
        let credentials = Builder::new("test-token").build();
        assert_eq!(
            credentials.universe_domain().await.as_deref(),
            Some("googleapis.com")
        );

        let credentials = Builder::new("test-token")
            .with_universe_domain("my-universe.example.com")
            .build();
        assert_eq!(
            credentials.universe_domain().await.as_deref(),
            Some("my-universe.example.com")
        );
    }

    #[test]
    fn debug_censors_token() {
        let credentials = Builder::new("test-secret-token").build();
        let got = format!("{credentials:?}");
        assert!(!got.contains("test-secret-token"), "{got}");
    }
}
