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
use crate::errors::CredentialsError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Controls how long a caller is willing to wait for a token.
///
/// Each call to [Credentials::token] receives its own `Context`. When the
/// cancellation token fires, or the deadline expires, the call returns
/// promptly with an error. Giving up does not affect other callers waiting on
/// the same token refresh, the refresh completes in the background and
/// populates the cache.
///
/// ```
/// # use google_cloud_auth_impersonate::context::Context;
/// # use std::time::Duration;
/// # use tokio_util::sync::CancellationToken;
/// let shutdown = CancellationToken::new();
/// let context = Context::new()
///     .with_timeout(Duration::from_secs(30))
///     .with_cancellation(shutdown.child_token());
/// ```
///
/// [Credentials::token]: crate::credentials::Credentials::token
#[derive(Clone, Debug, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancellation: Option<CancellationToken>,
}

impl Context {
    /// Creates a context without a deadline or cancellation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an absolute deadline for the request.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets a deadline relative to the current time.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Sets a cancellation token for the request.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    /// The deadline for the request, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Runs `future` until it completes, the request is cancelled, or the
    /// deadline expires.
    ///
    /// Cancellation is checked first, a context that is already cancelled
    /// never polls `future`.
    pub(crate) async fn run<F, T>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let cancelled = async {
            match &self.cancellation {
                Some(c) => c.cancelled().await,
                None => std::future::pending().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            biased;
            _ = cancelled => Err(CredentialsError::cancelled()),
            _ = expired => Err(CredentialsError::deadline_exceeded()),
            r = future => r,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = anyhow::Result<()>;

    #[tokio::test]
    async fn default_runs_to_completion() -> TestResult {
        let got = Context::new().run(async { Ok(42) }).await?;
        assert_eq!(got, 42);
        Ok(())
    }

    #[tokio::test]
    async fn already_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let context = Context::new().with_cancellation(cancel);
        let got = context.run(async { Ok(42) }).await;
        let err = got.unwrap_err();
        assert!(err.is_cancelled(), "{err:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_while_waiting() {
        let cancel = CancellationToken::new();
        let context = Context::new().with_cancellation(cancel.clone());
        let task = tokio::spawn(async move {
            context
                .run(async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(42)
                })
                .await
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        let err = task.await.unwrap().unwrap_err();
        assert!(err.is_cancelled(), "{err:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_exceeded() {
        let start = Instant::now();
        let context = Context::new().with_timeout(Duration::from_secs(5));
        assert_eq!(context.deadline(), Some(start + Duration::from_secs(5)));
        let got = context
            .run(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(42)
            })
            .await;
        let err = got.unwrap_err();
        assert!(err.is_deadline_exceeded(), "{err:?}");
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn completes_before_deadline() -> TestResult {
        let context = Context::new().with_timeout(Duration::from_secs(60));
        let got = context
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok("done")
            })
            .await?;
        assert_eq!(got, "done");
        Ok(())
    }
}
