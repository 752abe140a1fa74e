//! Rate limiting decorator.
//!
//! Waits a fixed amount of time between requests. The time is measured from
//! the end of one request to the start of the next, so a slow request is not
//! followed by a burst. Only one request is outstanding at a time.

use super::{close_inner, AnimeDetailsResults, MalApi, RecentUsersResults, UserLookupResults};
use crate::error::{MalError, Result};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Serializes calls to the inner client and spaces them out.
///
/// The gate holds the completion time of the previous request. A call that is
/// canceled before it reaches the inner client leaves that time untouched; a
/// call that reached the inner client records its completion whatever the
/// outcome, including the caller dropping the call mid-request.
#[derive(Debug)]
pub struct RateLimitingMalApi<A> {
    inner: A,
    owns_inner: bool,
    time_between_requests: Duration,
    /// Completion time of the last request
    gate: Mutex<Option<Instant>>,
}

impl<A: MalApi> RateLimitingMalApi<A> {
    pub fn new(inner: A, time_between_requests: Duration, owns_inner: bool) -> Self {
        Self {
            inner,
            owns_inner,
            time_between_requests,
            gate: Mutex::new(None),
        }
    }

    pub fn time_between_requests(&self) -> Duration {
        self.time_between_requests
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    async fn execute<T, F, Fut>(&self, cancel: &CancellationToken, action: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        // Only one request can be outstanding at a time.
        let last_completed = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MalError::Canceled),
            guard = self.gate.lock() => guard,
        };

        if let Some(last) = *last_completed {
            let elapsed = last.elapsed();
            if elapsed < self.time_between_requests {
                let wait = self.time_between_requests - elapsed;
                info!(wait_ms = wait.as_millis() as u64, "Waiting before making request");
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!("Canceled while waiting for rate limit");
                        return Err(MalError::Canceled);
                    }
                    _ = sleep(wait) => {}
                }
            }
        }

        let _completion = CompletionRecorder(last_completed);
        action().await
    }
}

/// Stamps the completion time when dropped, so a request abandoned mid-flight
/// still counts.
struct CompletionRecorder<'a>(MutexGuard<'a, Option<Instant>>);

impl Drop for CompletionRecorder<'_> {
    fn drop(&mut self) {
        *self.0 = Some(Instant::now());
    }
}

#[async_trait]
impl<A: MalApi> MalApi for RateLimitingMalApi<A> {
    async fn get_anime_list_for_user(
        &self,
        user: &str,
        cancel: &CancellationToken,
    ) -> Result<UserLookupResults> {
        self.execute(cancel, || self.inner.get_anime_list_for_user(user, cancel))
            .await
    }

    async fn get_recent_online_users(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RecentUsersResults> {
        self.execute(cancel, || self.inner.get_recent_online_users(cancel))
            .await
    }

    async fn get_anime_details(
        &self,
        anime_id: u32,
        cancel: &CancellationToken,
    ) -> Result<AnimeDetailsResults> {
        self.execute(cancel, || self.inner.get_anime_details(anime_id, cancel))
            .await
    }

    async fn close(&self) {
        close_inner(&self.inner, self.owns_inner).await;
    }
}
