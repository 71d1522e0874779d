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

//! Obtain [OIDC ID tokens] using [impersonated service accounts].
//!
//! When the principal you are using doesn't have the permissions you need to
//! accomplish your task, or you want to call a service that requires an ID
//! token for a specific service account, you can use service account
//! impersonation. The credentials call the [IAM Credentials] service
//! `generateIdToken` method as the base principal, and return ID tokens
//! issued for the target service account.
//!
//! The base principal needs the [Service Account Token Creator Role] on the
//! target service account. With a delegation chain, each principal in the
//! chain needs the role on the next one.
//!
//! ID tokens are cached, and refreshed shortly before the end of their
//! assumed one hour lifetime. Concurrent callers share a single refresh.
//!
//! ## Example: obtain an ID token for a Cloud Run service
//!
//! ```no_run
//! # use google_cloud_auth_impersonate::context::Context;
//! # use google_cloud_auth_impersonate::idtoken::impersonated::Builder;
//! # use std::time::Duration;
//! # tokio_test::block_on(async {
//! let audience = "https://my-service-abc123-uc.a.run.app";
//! let credentials = Builder::new(audience, "invoker@my-project.iam.gserviceaccount.com")
//!     .with_include_email(true)
//!     .build()?;
//! let context = Context::new().with_timeout(Duration::from_secs(30));
//! let id_token = credentials.token(&context).await?;
//!
//! let client = reqwest::Client::new();
//! client
//!     .get(format!("{audience}/api/method"))
//!     .bearer_auth(id_token.token)
//!     .send()
//!     .await?;
//! # Ok::<(), anyhow::Error>(())
//! # });
//! ```
//!
//! [IAM Credentials]: https://cloud.google.com/iam/docs/reference/credentials/rest
//! [impersonated service accounts]: https://cloud.google.com/docs/authentication/use-service-account-impersonation
//! [OIDC ID tokens]: https://cloud.google.com/docs/authentication/token-types#identity-tokens
//! [Service Account Token Creator Role]: https://cloud.google.com/docs/authentication/use-service-account-impersonation#required-roles

use crate::build_errors::Error as BuildError;
use crate::constants::{DEFAULT_SCOPE, IAM_CREDENTIALS_ENDPOINT, ID_TOKEN_LIFETIME};
use crate::context::Context;
use crate::credentials::detect::{CredentialsDetector, DetectOptions, MdsDetector};
use crate::credentials::{Credentials, CredentialsProvider};
use crate::errors::CredentialsError;
use crate::headers_util::{ID_TOKEN_REQUEST_TYPE, X_GOOG_API_CLIENT, metrics_header_value};
use crate::logging::{redacted_headers, tracing_enabled};
use crate::resource_name::service_account_resource_name;
use crate::token::{Token, TokenProvider};
use crate::token_cache::TokenCache;
use crate::transport::{ReqwestTransport, Transport};
use crate::{BuildResult, Result};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Method, Request, Uri};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub(crate) const MSG: &str = "unable to generate ID token";
const IMPERSONATED_CREDENTIAL_TYPE: &str = "imp";

/// A builder for impersonated service account ID token [Credentials].
///
/// The base credentials come from, in order of precedence:
/// 1. a pre-authenticated [Transport] set with [with_transport][Self::with_transport],
/// 2. the [Credentials] set with [with_credentials][Self::with_credentials],
/// 3. the [CredentialsDetector] set with [with_detector][Self::with_detector],
///    which defaults to [MdsDetector].
#[derive(Debug)]
pub struct Builder {
    audience: String,
    target_principal: String,
    include_email: bool,
    delegates: Vec<String>,
    credentials: Option<Credentials>,
    transport: Option<Arc<dyn Transport>>,
    detector: Option<Arc<dyn CredentialsDetector>>,
    endpoint: Option<String>,
    refresh_margin: Option<Duration>,
    tracing: bool,
}

impl Builder {
    /// Creates a new builder for ID tokens with the given audience, issued
    /// for `target_principal`.
    ///
    /// The target principal is a service account email, a unique id, or a
    /// full resource name such as
    /// `projects/-/serviceAccounts/sa@my-project.iam.gserviceaccount.com`.
    pub fn new<A, P>(audience: A, target_principal: P) -> Self
    where
        A: Into<String>,
        P: Into<String>,
    {
        Self {
            audience: audience.into(),
            target_principal: target_principal.into(),
            include_email: false,
            delegates: Vec::new(),
            credentials: None,
            transport: None,
            detector: None,
            endpoint: None,
            refresh_margin: None,
            tracing: false,
        }
    }

    /// Include the service account `email` and `email_verified` claims in
    /// the ID tokens.
    pub fn with_include_email(mut self, include_email: bool) -> Self {
        self.include_email = include_email;
        self
    }

    /// Sets the chain of delegates used to impersonate the target principal.
    ///
    /// The base principal must be able to impersonate the first delegate,
    /// each delegate the next one, and the last delegate the target
    /// principal. The order is preserved.
    pub fn with_delegates<I, S>(mut self, delegates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.delegates = delegates.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Sets the base credentials used to call the IAM Credentials service.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets a pre-authenticated transport to call the IAM Credentials service.
    ///
    /// The transport takes precedence over any base credentials. Credentials
    /// set with [with_credentials][Self::with_credentials] are still used
    /// for [universe_domain][Credentials::universe_domain].
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the detector used to find the base credentials when neither a
    /// transport nor credentials are set.
    pub fn with_detector(mut self, detector: Arc<dyn CredentialsDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Overrides the IAM Credentials service endpoint.
    ///
    /// Defaults to `https://iamcredentials.googleapis.com`.
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets how long before their expiration the ID tokens are refreshed.
    ///
    /// Defaults to 10 seconds.
    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = Some(margin);
        self
    }

    /// Enables debug logs for the requests to the IAM Credentials service.
    ///
    /// The logs are emitted as [tracing] events. They can also be enabled
    /// by setting the `GOOGLE_CLOUD_RUST_LOGGING` environment variable to
    /// `true`.
    pub fn with_tracing(mut self) -> Self {
        self.tracing = true;
        self
    }

    /// Returns a [Credentials] instance with the configured settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the audience or the target principal are empty,
    /// if the endpoint and target principal do not form a valid URI, if the
    /// base credentials cannot be detected, or if the HTTP client cannot be
    /// created.
    pub fn build(self) -> BuildResult<Credentials> {
        if self.audience.is_empty() {
            return Err(BuildError::missing_field("audience"));
        }
        if self.target_principal.is_empty() {
            return Err(BuildError::missing_field("target_principal"));
        }

        let (transport, base) = match (self.transport, self.credentials) {
            (Some(transport), credentials) => (transport, credentials),
            (None, Some(credentials)) => (
                Arc::new(ReqwestTransport::new(credentials.clone())?) as Arc<dyn Transport>,
                Some(credentials),
            ),
            (None, None) => {
                let detector = self
                    .detector
                    .unwrap_or_else(|| Arc::new(MdsDetector::default()));
                let options = DetectOptions::new()
                    .with_scopes([DEFAULT_SCOPE])
                    .with_self_signed_jwt(true);
                let credentials = detector.detect(&options)?;
                (
                    Arc::new(ReqwestTransport::new(credentials.clone())?) as Arc<dyn Transport>,
                    Some(credentials),
                )
            }
        };

        let endpoint = self
            .endpoint
            .unwrap_or_else(|| IAM_CREDENTIALS_ENDPOINT.to_string());
        let name = service_account_resource_name(&self.target_principal);
        let url = format!(
            "{}/v1/{name}:generateIdToken",
            endpoint.trim_end_matches('/')
        );
        let url = Uri::try_from(url).map_err(BuildError::invalid_uri)?;
        let fetcher = IdTokenFetcher {
            transport,
            url,
            request: GenerateIdTokenRequest {
                audience: self.audience,
                include_email: self.include_email,
                delegates: self
                    .delegates
                    .iter()
                    .map(|d| service_account_resource_name(d))
                    .collect(),
            },
            tracing: tracing_enabled(self.tracing),
        };
        let cache = match self.refresh_margin {
            Some(margin) => TokenCache::with_refresh_margin(fetcher, margin),
            None => TokenCache::new(fetcher),
        };
        Ok(Credentials::from(ImpersonatedIdTokenCredentials { cache, base }))
    }
}

#[derive(Debug)]
struct ImpersonatedIdTokenCredentials<T>
where
    T: TokenProvider,
{
    cache: TokenCache<T>,
    // `None` when the application only provided a transport.
    base: Option<Credentials>,
}

impl<T> CredentialsProvider for ImpersonatedIdTokenCredentials<T>
where
    T: TokenProvider + 'static,
{
    async fn token(&self, context: &Context) -> Result<Token> {
        self.cache.token(context).await
    }

    async fn universe_domain(&self) -> Option<String> {
        match &self.base {
            Some(credentials) => credentials.universe_domain().await,
            None => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
struct GenerateIdTokenRequest {
    audience: String,
    #[serde(rename = "includeEmail")]
    include_email: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    delegates: Vec<String>,
}

#[derive(Clone, Debug, serde::Deserialize)]
struct GenerateIdTokenResponse {
    token: String,
}

/// Calls `generateIdToken` once per refresh.
#[derive(Debug)]
struct IdTokenFetcher {
    transport: Arc<dyn Transport>,
    url: Uri,
    request: GenerateIdTokenRequest,
    tracing: bool,
}

impl IdTokenFetcher {
    fn build_request(&self) -> Result<Request<Bytes>> {
        let body = serde_json::to_vec(&self.request)
            .map_err(|e| CredentialsError::from_source(false, e))?;
        Request::builder()
            .method(Method::POST)
            .uri(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(
                X_GOOG_API_CLIENT,
                metrics_header_value(ID_TOKEN_REQUEST_TYPE, IMPERSONATED_CREDENTIAL_TYPE),
            )
            .body(Bytes::from(body))
            .map_err(|e| CredentialsError::from_source(false, e))
    }
}

#[async_trait]
impl TokenProvider for IdTokenFetcher {
    async fn token(&self) -> Result<Token> {
        let request = self.build_request()?;
        if self.tracing {
            tracing::debug!(
                method = %request.method(),
                uri = %request.uri(),
                headers = ?redacted_headers(request.headers()),
                body = %String::from_utf8_lossy(request.body()),
                "generateIdToken request"
            );
        }

        let response = self.transport.execute(request).await.map_err(|e| {
            // Base credential errors keep their own message.
            if e.is_transport() {
                CredentialsError::transport(MSG, e)
            } else {
                e
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = String::from_utf8_lossy(response.body()).into_owned();
            if self.tracing {
                tracing::debug!(
                    status = status.as_u16(),
                    headers = ?redacted_headers(response.headers()),
                    body = %body,
                    "generateIdToken response"
                );
            }
            return Err(CredentialsError::api(MSG, status, body));
        }
        if self.tracing {
            // The body contains the ID token.
            tracing::debug!(
                status = status.as_u16(),
                headers = ?redacted_headers(response.headers()),
                body_len = response.body().len(),
                "generateIdToken response"
            );
        }

        let response = serde_json::from_slice::<GenerateIdTokenResponse>(response.body())
            .map_err(|e| CredentialsError::decode(MSG, e))?;
        Ok(Token {
            token: response.token,
            token_type: "Bearer".to_string(),
            expires_at: Some(Instant::now() + ID_TOKEN_LIFETIME),
        })
    }
}
