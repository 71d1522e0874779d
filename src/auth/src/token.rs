// Copyright 2024 Google LLC
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

use crate::Result;
use std::time::Duration;
use tokio::time::Instant;

/// Represents an auth token.
#[derive(Clone, PartialEq)]
pub struct Token {
    /// The actual token string.
    ///
    /// This is the value used in `Authorization:` header.
    pub token: String,

    /// The type of the token.
    ///
    /// The most common type is `"Bearer"` but other types may appear in the
    /// future.
    pub token_type: String,

    /// The instant at which the token expires.
    ///
    /// If `None`, the token does not expire.
    ///
    /// Note that the `Instant` is not valid across processes. It is
    /// recommended to let the authentication library refresh tokens within a
    /// process instead of handling expirations yourself.
    pub expires_at: Option<Instant>,
}

impl Token {
    /// Returns `true` if the token can still be used `margin` from now.
    pub(crate) fn is_fresh(&self, margin: Duration) -> bool {
        self.expires_at
            .is_none_or(|expires_at| Instant::now() + margin < expires_at)
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("token", &"[censored]")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Creates new tokens, one network exchange per call.
#[async_trait::async_trait]
pub(crate) trait TokenProvider: std::fmt::Debug + Send + Sync {
    async fn token(&self) -> Result<Token>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    // Used by tests in other modules.
    mockall::mock! {
        #[derive(Debug)]
        pub TokenProvider { }

        #[async_trait::async_trait]
        impl TokenProvider for TokenProvider {
            async fn token(&self) -> Result<Token>;
        }
    }

    #[test]
    fn debug() {
        let expires_at = Instant::now() + Duration::from_secs(3600);

        let token = Token {
            token: "token-test-only".into(),
            token_type: "token-type-test-only".into(),
            expires_at: Some(expires_at),
        };
        let got = format!("{token:?}");
        assert!(!got.contains("token-test-only"), "{got}");
        assert!(got.contains("token: \"[censored]\""), "{got}");
        assert!(got.contains("token_type: \"token-type-test-only"), "{got}");
        assert!(
            got.contains(&format!("expires_at: Some({expires_at:?}")),
            "{got}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn freshness() {
        let token = Token {
            token: "test-only".into(),
            token_type: "Bearer".into(),
            expires_at: Some(Instant::now() + Duration::from_secs(60)),
        };
        assert!(token.is_fresh(Duration::ZERO));
        assert!(token.is_fresh(Duration::from_secs(59)));
        assert!(!token.is_fresh(Duration::from_secs(60)));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(!token.is_fresh(Duration::ZERO));
    }

    #[test]
    fn never_expires() {
        let token = Token {
            token: "test-only".into(),
            token_type: "Bearer".into(),
            expires_at: None,
        };
        assert!(token.is_fresh(Duration::from_secs(1_000_000)));
    }
}
