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

//! Google Cloud Client Libraries for Rust - Impersonated ID Token Credentials
//!
//! This crate obtains [OIDC ID tokens] for an [impersonated service account].
//! A base credential (the principal running the application) calls the
//! [IAM Credentials API] `generateIdToken` method on behalf of the target
//! service account. The resulting tokens are cached and refreshed
//! transparently.
//!
//! ```no_run
//! # use google_cloud_auth_impersonate::context::Context;
//! # use google_cloud_auth_impersonate::idtoken::impersonated::Builder;
//! # tokio_test::block_on(async {
//! let credentials = Builder::new(
//!     "https://my-service.example.com",
//!     "my-service-account@my-project.iam.gserviceaccount.com",
//! )
//! .with_include_email(true)
//! .build()?;
//!
//! let token = credentials.token(&Context::new()).await?;
//! let client = reqwest::Client::new();
//! client
//!     .get("https://my-service.example.com/api/method")
//!     .bearer_auth(token.token)
//!     .send()
//!     .await?;
//! # Ok::<(), anyhow::Error>(())
//! # });
//! ```
//!
//! [OIDC ID tokens]: https://cloud.google.com/docs/authentication/token-types#identity-tokens
//! [impersonated service account]: https://cloud.google.com/docs/authentication/use-service-account-impersonation
//! [IAM Credentials API]: https://cloud.google.com/iam/docs/reference/credentials/rest

pub mod build_errors;
pub mod errors;

/// Types and functions to work with Google Cloud authentication [Credentials].
///
/// [Credentials]: https://cloud.google.com/docs/authentication#credentials
pub mod credentials;

/// Cancellation and deadlines for credential requests.
pub mod context;

pub mod idtoken;

/// Service account resource names.
pub mod resource_name;

/// Types and functions to work with auth [Tokens].
///
/// [Tokens]: https://cloud.google.com/docs/authentication#token
pub mod token;

pub mod transport;

pub(crate) mod constants;
pub(crate) mod headers_util;
pub(crate) mod logging;

/// The token cache
pub(crate) mod token_cache;

/// A `Result` alias where the `Err` case is
/// `google_cloud_auth_impersonate::errors::CredentialsError`.
pub type Result<T> = std::result::Result<T, crate::errors::CredentialsError>;

/// A `Result` alias where the `Err` case is
/// `google_cloud_auth_impersonate::build_errors::Error`.
pub type BuildResult<T> = std::result::Result<T, crate::build_errors::Error>;
