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

use crate::Result;
use crate::constants::{DEFAULT_REFRESH_MARGIN, REFRESH_TIMEOUT};
use crate::context::Context;
use crate::errors::CredentialsError;
use crate::token::{Token, TokenProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};

// `None` until the refresh completes.
type RefreshResult = Option<Result<Token>>;

#[derive(Debug)]
pub(crate) struct TokenCache<T>
where
    T: TokenProvider,
{
    // The cached token and the in-flight refresh, if any. The lock is never
    // held while the token provider runs.
    state: Arc<Mutex<CacheState>>,

    // The token provider. This thing does the refreshing.
    inner: Arc<T>,

    // Cached tokens are refreshed when they expire within this margin.
    refresh_margin: Duration,
}

#[derive(Debug, Default)]
struct CacheState {
    // The most recent token. Only successful refreshes replace it.
    token: Option<Token>,

    // Set while a refresh is running. Callers subscribe to its result instead
    // of starting a refresh of their own.
    refresh: Option<watch::Receiver<RefreshResult>>,
}

// We manually implement the `Clone` trait because the Rust compiler will
// squawk if `T` is not `Clone`, even though we only hold an `Arc<T>`. :shrug:
impl<T: TokenProvider> Clone for TokenCache<T> {
    fn clone(&self) -> TokenCache<T> {
        TokenCache {
            state: self.state.clone(),
            inner: self.inner.clone(),
            refresh_margin: self.refresh_margin,
        }
    }
}

impl<T: TokenProvider + 'static> TokenCache<T> {
    pub(crate) fn new(inner: T) -> TokenCache<T> {
        Self::with_refresh_margin(inner, DEFAULT_REFRESH_MARGIN)
    }

    pub(crate) fn with_refresh_margin(inner: T, refresh_margin: Duration) -> TokenCache<T> {
        TokenCache {
            state: Arc::new(Mutex::new(CacheState::default())),
            inner: Arc::new(inner),
            refresh_margin,
        }
    }

    /// Returns the cached token, refreshing it first if needed.
    ///
    /// At most one refresh runs at a time. Concurrent callers share its
    /// result, including any error. An error leaves the cache unchanged, so
    /// the next call starts a new refresh.
    pub(crate) async fn token(&self, context: &Context) -> Result<Token> {
        context.run(self.cached_or_refresh()).await
    }

    async fn cached_or_refresh(&self) -> Result<Token> {
        let rx = {
            let mut state = self.state.lock().await;
            if let Some(token) = state
                .token
                .as_ref()
                .filter(|t| t.is_fresh(self.refresh_margin))
            {
                return Ok(token.clone());
            }
            // A receiver whose sender is gone belongs to a refresh task that
            // died without publishing a result.
            match state.refresh.as_ref().filter(|rx| rx.has_changed().is_ok()) {
                Some(rx) => rx.clone(),
                None => {
                    let rx = self.start_refresh();
                    state.refresh = Some(rx.clone());
                    rx
                }
            }
        };
        wait_for_refresh(rx).await
    }

    // The refresh runs in its own task. Callers that stop waiting (because
    // they are cancelled or their deadline expires) do not abort it. A hung
    // provider is abandoned after `REFRESH_TIMEOUT`.
    fn start_refresh(&self) -> watch::Receiver<RefreshResult> {
        let (tx, rx) = watch::channel(None);
        let inner = self.inner.clone();
        let state = self.state.clone();
        tokio::spawn(async move {
            let result = match tokio::time::timeout(REFRESH_TIMEOUT, inner.token()).await {
                Ok(result) => result,
                Err(e) => Err(CredentialsError::new(
                    true,
                    "the token refresh did not complete in time",
                    e,
                )),
            };
            let mut state = state.lock().await;
            if let Ok(token) = &result {
                state.token = Some(token.clone());
            }
            state.refresh = None;
            // Publish while holding the lock, new callers either see the new
            // token or start a new refresh. Nobody may be listening.
            let _ = tx.send(Some(result));
        });
        rx
    }
}

async fn wait_for_refresh(mut rx: watch::Receiver<RefreshResult>) -> Result<Token> {
    loop {
        let current = rx.borrow_and_update().clone();
        if let Some(result) = current {
            return result;
        }
        if rx.changed().await.is_err() {
            return Err(CredentialsError::from_msg(
                true,
                "the token refresh terminated without a result",
            ));
        }
    }
}
