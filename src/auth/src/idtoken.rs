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

//! Types and functions to work with Google-signed [ID tokens].
//!
//! ID tokens are JSON Web Tokens (JWTs) issued by Google for a specific
//! audience. Services such as Cloud Run and Cloud Functions, or any
//! application behind Identity-Aware Proxy, verify the token to authenticate
//! the caller.
//!
//! [ID tokens]: https://cloud.google.com/docs/authentication/token-types#identity-tokens

pub mod impersonated;
