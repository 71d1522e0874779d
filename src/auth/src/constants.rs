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

use std::time::Duration;

pub(crate) const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
pub(crate) const DEFAULT_UNIVERSE_DOMAIN: &str = "googleapis.com";

pub(crate) const IAM_CREDENTIALS_ENDPOINT: &str = "https://iamcredentials.googleapis.com";

/// The lifetime assumed for ID tokens created by `generateIdToken`.
///
/// The service does not return an expiration time with the token. This is a
/// client-side assumption, if the service issues shorter-lived tokens the
/// cache would keep returning them after they expire.
pub(crate) const ID_TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// Tokens are refreshed this long before they expire.
pub(crate) const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(10);

/// A refresh that takes longer than this fails with a transient error.
pub(crate) const REFRESH_TIMEOUT: Duration = Duration::from_secs(60);

pub(crate) const METADATA_ROOT: &str = "http://metadata.google.internal";
pub(crate) const GCE_METADATA_HOST_ENV_VAR: &str = "GCE_METADATA_HOST";

pub(crate) const LOGGING_VAR: &str = "GOOGLE_CLOUD_RUST_LOGGING";
