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

pub mod access_token;
pub mod detect;
pub mod mds;

use crate::Result;
use crate::context::Context;
use crate::headers_util::build_bearer_headers;
use crate::token::Token;
use http::HeaderMap;
use std::future::Future;
use std::sync::Arc;

/// An implementation of [crate::credentials::CredentialsProvider].
///
/// Represents a [Credentials] used to obtain auth tokens. The impersonated ID
/// token credentials created by
/// [idtoken::impersonated::Builder][crate::idtoken::impersonated::Builder]
/// are `Credentials`, and so are the base credentials used to call the IAM
/// Credentials service.
///
/// `Credentials` are cheap to clone, all clones share the same token cache.
///
/// [Credentials]: https://cloud.google.com/docs/authentication#credentials
#[derive(Clone, Debug)]
pub struct Credentials {
    // We use an `Arc` to hold the inner implementation.
    //
    // Credentials may be shared across threads (`Send + Sync`), so an `Rc`
    // will not do.
    //
    // They also need to derive `Clone`, as the base credentials are shared
    // by the transport and by the impersonated credentials.
    inner: Arc<dyn dynamic::CredentialsProvider>,
}

impl<T> From<T> for Credentials
where
    T: CredentialsProvider + Send + Sync + 'static,
{
    fn from(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }
}

impl Credentials {
    /// Asynchronously retrieves a token.
    ///
    /// Returns a cached token if it is still valid, otherwise waits for a new
    /// token. The call returns early if the `context` is cancelled or its
    /// deadline expires.
    pub async fn token(&self, context: &Context) -> Result<Token> {
        self.inner.token(context).await
    }

    /// Asynchronously constructs the auth headers.
    ///
    /// The `authorization` header value is marked as sensitive.
    pub async fn headers(&self, context: &Context) -> Result<HeaderMap> {
        let token = self.token(context).await?;
        build_bearer_headers(&token)
    }

    /// Retrieves the universe domain associated with the credentials, if any.
    pub async fn universe_domain(&self) -> Option<String> {
        self.inner.universe_domain().await
    }
}

/// Represents a [Credentials] used to obtain auth tokens.
///
/// Implement this trait to use base credentials not supported by this crate,
/// or to mock credentials in tests. Convert the implementation into
/// [Credentials] using `From`.
///
/// [Credentials]: https://cloud.google.com/docs/authentication#credentials
pub trait CredentialsProvider: std::fmt::Debug {
    /// Asynchronously retrieves a token.
    fn token(&self, context: &Context) -> impl Future<Output = Result<Token>> + Send;

    /// Retrieves the universe domain associated with the credentials, if any.
    fn universe_domain(&self) -> impl Future<Output = Option<String>> + Send;
}

pub(crate) mod dynamic {
    use super::Result;
    use super::{Context, Token};

    /// A dyn-compatible, crate-private version of `CredentialsProvider`.
    #[async_trait::async_trait]
    pub trait CredentialsProvider: Send + Sync + std::fmt::Debug {
        async fn token(&self, context: &Context) -> Result<Token>;

        async fn universe_domain(&self) -> Option<String>;
    }

    /// The public `CredentialsProvider` implements the dyn-compatible `CredentialsProvider`.
    #[async_trait::async_trait]
    impl<T> CredentialsProvider for T
    where
        T: super::CredentialsProvider + Send + Sync,
    {
        async fn token(&self, context: &Context) -> Result<Token> {
            T::token(self, context).await
        }

        async fn universe_domain(&self) -> Option<String> {
            T::universe_domain(self).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CredentialsError;
    use http::header::AUTHORIZATION;

    type TestResult = anyhow::Result<()>;

    #[derive(Debug)]
    struct FakeCredentials {
        result: Result<Token>,
    }

    impl CredentialsProvider for FakeCredentials {
        async fn token(&self, _context: &Context) -> Result<Token> {
            self.result.clone()
        }

        async fn universe_domain(&self) -> Option<String> {
            Some("test-only.example.com".to_string())
        }
    }

    #[tokio::test]
    async fn from_provider() -> TestResult {
        let credentials = Credentials::from(FakeCredentials {
            result: Ok(Token {
                token: "test-token".into(),
                token_type: "Bearer".into(),
                expires_at: None,
            }),
        });
        let token = credentials.token(&Context::new()).await?;
        assert_eq!(token.token, "test-token");

        let headers = credentials.headers(&Context::new()).await?;
        let value = headers.get(AUTHORIZATION).unwrap();
        assert_eq!(value.to_str()?, "Bearer test-token");
        assert!(value.is_sensitive());

        assert_eq!(
            credentials.universe_domain().await.as_deref(),
            Some("test-only.example.com")
        );
        Ok(())
    }

    #[tokio::test]
    async fn headers_propagate_errors() {
        let credentials = Credentials::from(FakeCredentials {
            result: Err(CredentialsError::from_msg(true, "test-only-failure")),
        });
        let err = credentials.headers(&Context::new()).await.unwrap_err();
        assert!(err.is_transient(), "{err:?}");
        assert!(err.to_string().contains("test-only-failure"), "{err}");
    }

    #[test]
    fn debug() {
        let credentials = Credentials::from(FakeCredentials {
            result: Ok(Token {
                token: "test-secret".into(),
                token_type: "Bearer".into(),
                expires_at: None,
            }),
        });
        let got = format!("{credentials:?}");
        assert!(got.contains("FakeCredentials"), "{got}");
        assert!(!got.contains("test-secret"), "{got}");
    }
}
