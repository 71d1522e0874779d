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

//! The HTTP transport used to call the IAM Credentials service.
//!
//! Requests sent through a [Transport] must already be authorized as the
//! base principal. [ReqwestTransport] does this by attaching the headers of
//! the base [Credentials]. Applications with their own authorized HTTP stack
//! implement [Transport] and pass it to
//! [Builder::with_transport][crate::idtoken::impersonated::Builder::with_transport].

use crate::build_errors::Error as BuildError;
use crate::context::Context;
use crate::credentials::Credentials;
use crate::errors::CredentialsError;
use crate::{BuildResult, Result};
use bytes::Bytes;

const MSG: &str = "cannot send request to the IAM Credentials service";

/// Sends authorized HTTP requests.
///
/// Implementations return any response received from the service,
/// including non-`2xx` responses. Errors are reserved for requests that
/// could not be sent or responses that could not be received.
#[async_trait::async_trait]
pub trait Transport: std::fmt::Debug + Send + Sync {
    /// Sends `request` and returns the response.
    async fn execute(&self, request: http::Request<Bytes>) -> Result<http::Response<Bytes>>;
}

/// A [Transport] using [reqwest], authorized by the base [Credentials].
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    credentials: Credentials,
}

impl ReqwestTransport {
    /// Creates a transport with a new HTTP client.
    pub fn new(credentials: Credentials) -> BuildResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(BuildError::transport)?;
        Ok(Self::with_client(client, credentials))
    }

    /// Creates a transport sharing an existing HTTP client.
    pub fn with_client(client: reqwest::Client, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
        }
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        // Errors from the base credentials are returned unchanged.
        let auth_headers = self.credentials.headers(&Context::new()).await?;
        let (parts, body) = request.into_parts();
        let response = self
            .client
            .request(parts.method, parts.uri.to_string())
            .headers(parts.headers)
            .headers(auth_headers)
            .body(body)
            .send()
            .await
            .map_err(|e| CredentialsError::transport(MSG, e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| CredentialsError::transport(MSG, e))?;

        let mut output = http::Response::new(body);
        *output.status_mut() = status;
        *output.headers_mut() = headers;
        Ok(output)
    }
}
