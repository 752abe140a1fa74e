//! The MAL client interface and its HTTP implementation.
//!
//! Everything that talks to MAL implements [`MalApi`]: the transport client as
//! well as the caching, rate limiting and retry decorators that wrap it.

pub mod client;
pub mod rate_limiter;
pub mod types;

pub use client::{HttpMalClient, ResponseParser};
pub use rate_limiter::RateLimitingMalApi;
pub use types::*;

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Operations a MAL client supports.
///
/// Every operation takes a cancellation token. A call whose token fires while
/// it is suspended fails with [`MalError::Canceled`](crate::MalError::Canceled).
#[async_trait]
pub trait MalApi: Send + Sync {
    /// Gets a user's anime list.
    ///
    /// Fails with `UserNotFound` if the user does not exist or has no list.
    async fn get_anime_list_for_user(
        &self,
        user: &str,
        cancel: &CancellationToken,
    ) -> Result<UserLookupResults>;

    /// Gets users that have been on MAL recently.
    async fn get_recent_online_users(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RecentUsersResults>;

    /// Gets information from an anime's details page.
    ///
    /// Fails with `AnimeNotFound` if no anime with that id exists.
    async fn get_anime_details(
        &self,
        anime_id: u32,
        cancel: &CancellationToken,
    ) -> Result<AnimeDetailsResults>;

    /// Releases held resources. Calls made afterwards may fail.
    async fn close(&self) {}
}

// Sharing through an Arc never owns the client, so close() is not forwarded.
#[async_trait]
impl<T: MalApi + ?Sized> MalApi for Arc<T> {
    async fn get_anime_list_for_user(
        &self,
        user: &str,
        cancel: &CancellationToken,
    ) -> Result<UserLookupResults> {
        (**self).get_anime_list_for_user(user, cancel).await
    }

    async fn get_recent_online_users(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RecentUsersResults> {
        (**self).get_recent_online_users(cancel).await
    }

    async fn get_anime_details(
        &self,
        anime_id: u32,
        cancel: &CancellationToken,
    ) -> Result<AnimeDetailsResults> {
        (**self).get_anime_details(anime_id, cancel).await
    }
}

#[async_trait]
impl<T: MalApi + ?Sized> MalApi for Box<T> {
    async fn get_anime_list_for_user(
        &self,
        user: &str,
        cancel: &CancellationToken,
    ) -> Result<UserLookupResults> {
        (**self).get_anime_list_for_user(user, cancel).await
    }

    async fn get_recent_online_users(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RecentUsersResults> {
        (**self).get_recent_online_users(cancel).await
    }

    async fn get_anime_details(
        &self,
        anime_id: u32,
        cancel: &CancellationToken,
    ) -> Result<AnimeDetailsResults> {
        (**self).get_anime_details(anime_id, cancel).await
    }

    async fn close(&self) {
        (**self).close().await
    }
}

/// Forwards `close()` to `inner` only when the decorator owns it.
pub(crate) async fn close_inner<A: MalApi + ?Sized>(inner: &A, owns_inner: bool) {
    if owns_inner {
        inner.close().await;
    }
}
