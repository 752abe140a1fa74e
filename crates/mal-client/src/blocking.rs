//! Blocking facade over any [`MalApi`].
//!
//! Runs the async operations to completion on a private current-thread
//! runtime. Do not use from inside an async context; `block_on` panics there.

use crate::api::{AnimeDetailsResults, MalApi, RecentUsersResults, UserLookupResults};
use crate::error::{MalError, Result};
use tokio::runtime::{Builder, Runtime};
use tokio_util::sync::CancellationToken;

pub struct BlockingMalApi<A> {
    inner: A,
    runtime: Runtime,
}

impl<A: MalApi> BlockingMalApi<A> {
    pub fn new(inner: A) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| MalError::api_with("Failed to create runtime for blocking client", e))?;
        Ok(Self { inner, runtime })
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    pub fn get_anime_list_for_user(&self, user: &str) -> Result<UserLookupResults> {
        self.get_anime_list_for_user_with_cancel(user, &CancellationToken::new())
    }

    pub fn get_anime_list_for_user_with_cancel(
        &self,
        user: &str,
        cancel: &CancellationToken,
    ) -> Result<UserLookupResults> {
        self.runtime
            .block_on(self.inner.get_anime_list_for_user(user, cancel))
    }

    pub fn get_recent_online_users(&self) -> Result<RecentUsersResults> {
        self.get_recent_online_users_with_cancel(&CancellationToken::new())
    }

    pub fn get_recent_online_users_with_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RecentUsersResults> {
        self.runtime.block_on(self.inner.get_recent_online_users(cancel))
    }

    pub fn get_anime_details(&self, anime_id: u32) -> Result<AnimeDetailsResults> {
        self.get_anime_details_with_cancel(anime_id, &CancellationToken::new())
    }

    pub fn get_anime_details_with_cancel(
        &self,
        anime_id: u32,
        cancel: &CancellationToken,
    ) -> Result<AnimeDetailsResults> {
        self.runtime
            .block_on(self.inner.get_anime_details(anime_id, cancel))
    }

    pub fn close(&self) {
        self.runtime.block_on(self.inner.close());
    }
}
