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

//! [Metadata Service] Credentials type.
//!
//! Google Cloud environments such as [Google Compute Engine (GCE)][gce-link],
//! [Google Kubernetes Engine (GKE)][gke-link], or [Cloud Run] provide a
//! metadata service. This is a local service to the VM (or pod) which (as the
//! name implies) provides metadata information about the VM. The service also
//! provides access tokens associated with the [default service account] for
//! the corresponding VM.
//!
//! These credentials are the default base credentials for impersonation. The
//! access tokens are cached and refreshed before they expire.
//!
//! The metadata service endpoint is `http://metadata.google.internal`, unless
//! the `GCE_METADATA_HOST` environment variable names a different host, or
//! the application configures an endpoint with
//! [with_endpoint][Builder::with_endpoint].
//!
//! [Cloud Run]: https://cloud.google.com/run
//! [default service account]: https://cloud.google.com/iam/docs/service-account-types#default
//! [gce-link]: https://cloud.google.com/products/compute
//! [gke-link]: https://cloud.google.com/kubernetes-engine
//! [Metadata Service]: https://cloud.google.com/compute/docs/metadata/overview

use crate::build_errors::Error as BuildError;
use crate::constants::{DEFAULT_UNIVERSE_DOMAIN, GCE_METADATA_HOST_ENV_VAR, METADATA_ROOT};
use crate::context::Context;
use crate::credentials::{Credentials, CredentialsProvider};
use crate::errors::CredentialsError;
use crate::headers_util::{ACCESS_TOKEN_REQUEST_TYPE, X_GOOG_API_CLIENT, metrics_header_value};
use crate::token::{Token, TokenProvider};
use crate::token_cache::TokenCache;
use crate::{BuildResult, Result};
use async_trait::async_trait;
use http::StatusCode;
use reqwest::Client;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::Instant;

const METADATA_FLAVOR_VALUE: &str = "Google";
const METADATA_FLAVOR: &str = "metadata-flavor";
const MDS_TOKEN_PATH: &str = "computeMetadata/v1/instance/service-accounts/default/token";
const MDS_UNIVERSE_DOMAIN_PATH: &str = "computeMetadata/v1/universe/universe-domain";
const MDS_CREDENTIAL_TYPE: &str = "mds";
const MSG: &str = "failed to fetch token from the metadata service";

/// Creates [Credentials] instances backed by the [Metadata Service].
///
/// # Example
/// ```
/// # use google_cloud_auth_impersonate::credentials::mds::Builder;
/// # fn sample() -> anyhow::Result<()> {
/// let credentials = Builder::default()
///     .with_scopes(["https://www.googleapis.com/auth/cloud-platform"])
///     .build()?;
/// # Ok(()) }
/// ```
///
/// [Metadata Service]: https://cloud.google.com/compute/docs/metadata/overview
#[derive(Debug, Default)]
pub struct Builder {
    endpoint: Option<String>,
    scopes: Option<Vec<String>>,
    universe_domain: Option<String>,
}

impl Builder {
    /// Sets the endpoint for the metadata service.
    ///
    /// Overrides the `GCE_METADATA_HOST` environment variable.
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the [scopes] for the access tokens.
    ///
    /// If no scopes are specified, the metadata service issues tokens with all
    /// the scopes configured for the default service account.
    ///
    /// [scopes]: https://developers.google.com/identity/protocols/oauth2/scopes
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(scopes.into_iter().map(|s| s.into()).collect());
        self
    }

    /// Sets the universe domain for these credentials.
    ///
    /// If not set, the universe domain is fetched from the metadata service
    /// the first time it is needed.
    pub fn with_universe_domain<S: Into<String>>(mut self, universe_domain: S) -> Self {
        self.universe_domain = Some(universe_domain.into());
        self
    }

    /// Returns a [Credentials] instance with the configured settings.
    ///
    /// No requests are made until the credentials are used.
    pub fn build(self) -> BuildResult<Credentials> {
        let endpoint = self.resolve_endpoint();
        let client = Client::builder().build().map_err(BuildError::transport)?;
        let token_provider = MdsAccessTokenProvider {
            client: client.clone(),
            endpoint: endpoint.clone(),
            scopes: self.scopes,
        };
        let universe_domain = match self.universe_domain {
            Some(u) => OnceCell::new_with(Some(u)),
            None => OnceCell::new(),
        };
        Ok(Credentials::from(MdsCredentials {
            token_provider: TokenCache::new(token_provider),
            client,
            endpoint,
            universe_domain,
        }))
    }

    fn resolve_endpoint(&self) -> String {
        let endpoint = match (&self.endpoint, std::env::var(GCE_METADATA_HOST_ENV_VAR)) {
            (Some(e), _) => e.clone(),
            (None, Ok(host)) if !host.is_empty() => format!("http://{host}"),
            (None, _) => METADATA_ROOT.to_string(),
        };
        endpoint.trim_end_matches('/').to_string()
    }
}

#[derive(Debug)]
struct MdsCredentials<T>
where
    T: TokenProvider,
{
    token_provider: TokenCache<T>,
    client: Client,
    endpoint: String,
    universe_domain: OnceCell<String>,
}

impl<T> CredentialsProvider for MdsCredentials<T>
where
    T: TokenProvider + 'static,
{
    async fn token(&self, context: &Context) -> Result<Token> {
        self.token_provider.token(context).await
    }

    async fn universe_domain(&self) -> Option<String> {
        // Failures are not cached, the next call asks again.
        self.universe_domain
            .get_or_try_init(|| fetch_universe_domain(&self.client, &self.endpoint))
            .await
            .ok()
            .cloned()
    }
}

async fn fetch_universe_domain(client: &Client, endpoint: &str) -> Result<String> {
    const UNIVERSE_MSG: &str = "failed to fetch universe domain from the metadata service";
    let response = client
        .get(format!("{endpoint}/{MDS_UNIVERSE_DOMAIN_PATH}"))
        .header(METADATA_FLAVOR, METADATA_FLAVOR_VALUE)
        .send()
        .await
        .map_err(|e| CredentialsError::transport(UNIVERSE_MSG, e))?;
    let status = response.status();
    // Older metadata services do not know about universe domains.
    if status == StatusCode::NOT_FOUND {
        return Ok(DEFAULT_UNIVERSE_DOMAIN.to_string());
    }
    let body = response
        .text()
        .await
        .map_err(|e| CredentialsError::transport(UNIVERSE_MSG, e))?;
    if !status.is_success() {
        return Err(CredentialsError::api(UNIVERSE_MSG, status, body));
    }
    if body.is_empty() {
        return Ok(DEFAULT_UNIVERSE_DOMAIN.to_string());
    }
    Ok(body)
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
struct MdsTokenResponse {
    access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_in: Option<u64>,
    token_type: String,
}

#[derive(Debug)]
struct MdsAccessTokenProvider {
    client: Client,
    endpoint: String,
    scopes: Option<Vec<String>>,
}

#[async_trait]
impl TokenProvider for MdsAccessTokenProvider {
    async fn token(&self) -> Result<Token> {
        let mut request = self
            .client
            .get(format!("{}/{MDS_TOKEN_PATH}", self.endpoint))
            .header(METADATA_FLAVOR, METADATA_FLAVOR_VALUE)
            .header(
                X_GOOG_API_CLIENT,
                metrics_header_value(ACCESS_TOKEN_REQUEST_TYPE, MDS_CREDENTIAL_TYPE),
            );
        if let Some(scopes) = &self.scopes {
            request = request.query(&[("scopes", scopes.join(","))]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CredentialsError::transport(MSG, e))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| CredentialsError::transport(MSG, e))?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&body).into_owned();
            return Err(CredentialsError::api(MSG, status, body));
        }
        let response = serde_json::from_slice::<MdsTokenResponse>(&body)
            .map_err(|e| CredentialsError::decode(MSG, e))?;
        Ok(Token {
            token: response.access_token,
            token_type: response.token_type,
            expires_at: response
                .expires_in
                .map(|d| Instant::now() + Duration::from_secs(d)),
        })
    }
}
