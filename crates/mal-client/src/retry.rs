//! Retry decorator.
//!
//! Retries requests that failed for transient reasons after waiting a fixed
//! delay. After a set number of attempts it gives up and returns the last
//! failure. "Not found", unexpected responses and cancellations are never
//! retried.

use crate::api::{close_inner, AnimeDetailsResults, MalApi, RecentUsersResults, UserLookupResults};
use crate::error::{MalError, Result};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct RetryingMalApi<A> {
    inner: A,
    owns_inner: bool,
    max_attempts: u32,
    delay_between_attempts: Duration,
}

impl<A: MalApi> RetryingMalApi<A> {
    /// `max_attempts` counts the first attempt and is raised to 1 if zero.
    pub fn new(
        inner: A,
        max_attempts: u32,
        delay_between_attempts: Duration,
        owns_inner: bool,
    ) -> Self {
        if max_attempts == 0 {
            warn!("max_attempts of 0 treated as 1");
        }
        Self {
            inner,
            owns_inner,
            max_attempts: max_attempts.max(1),
            delay_between_attempts,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay_between_attempts(&self) -> Duration {
        self.delay_between_attempts
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    async fn execute<T, F, Fut>(
        &self,
        what: &str,
        cancel: &CancellationToken,
        mut action: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempts = 0;
        loop {
            let err = match action().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => e,
                Err(e) => return Err(e),
            };

            attempts += 1;
            warn!(attempt = attempts, error = %err, "{} failed", what);

            if attempts >= self.max_attempts {
                return Err(err);
            }

            info!(
                delay_ms = self.delay_between_attempts.as_millis() as u64,
                "Waiting before trying again"
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(MalError::Canceled),
                _ = sleep(self.delay_between_attempts) => {}
            }
        }
    }
}

#[async_trait]
impl<A: MalApi> MalApi for RetryingMalApi<A> {
    async fn get_anime_list_for_user(
        &self,
        user: &str,
        cancel: &CancellationToken,
    ) -> Result<UserLookupResults> {
        let what = format!("Getting anime list for user {}", user);
        self.execute(&what, cancel, || self.inner.get_anime_list_for_user(user, cancel))
            .await
    }

    async fn get_recent_online_users(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RecentUsersResults> {
        self.execute("Getting recently active MAL users", cancel, || {
            self.inner.get_recent_online_users(cancel)
        })
        .await
    }

    async fn get_anime_details(
        &self,
        anime_id: u32,
        cancel: &CancellationToken,
    ) -> Result<AnimeDetailsResults> {
        let what = format!("Getting details for anime id {}", anime_id);
        self.execute(&what, cancel, || self.inner.get_anime_details(anime_id, cancel))
            .await
    }

    async fn close(&self) {
        close_inner(&self.inner, self.owns_inner).await;
    }
}
