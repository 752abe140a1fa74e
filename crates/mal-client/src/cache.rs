//! In-memory caching of user anime lists.
//!
//! Only list lookups are cached, including the fact that a user has no list.
//! Entries expire after a configurable time; expired entries are swept only
//! when a new entry is inserted. Expiration is measured on the monotonic
//! clock.

use crate::api::{
    close_inner, AnimeDetailsResults, MalApi, RecentUsersResults, UserLookupResults,
};
use crate::error::{MalError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// What the cache knows about a user
#[derive(Debug, Clone)]
pub enum CachePayload {
    Found(UserLookupResults),
    /// MAL said the user has no list
    NotFound,
}

#[derive(Debug)]
struct CacheEntry {
    inserted_at: Instant,
    payload: CachePayload,
}

/// Case-insensitive map of user name to list lookup outcome.
///
/// Safe to share between threads. An expiration of `None` keeps entries for
/// the life of the cache.
#[derive(Debug)]
pub struct ListCache {
    expiration: Option<Duration>,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ListCache {
    pub fn new(expiration: Option<Duration>) -> Self {
        Self {
            expiration,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn expiration(&self) -> Option<Duration> {
        self.expiration
    }

    /// Returns the live entry for `user`, if any.
    pub fn get(&self, user: &str) -> Option<CachePayload> {
        let now = Instant::now();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&normalize(user))
            .filter(|entry| self.is_live(entry, now))
            .map(|entry| entry.payload.clone())
    }

    pub fn put_list(&self, user: &str, results: UserLookupResults) {
        self.insert(user, CachePayload::Found(results));
    }

    pub fn put_not_found(&self, user: &str) {
        self.insert(user, CachePayload::NotFound);
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn insert(&self, user: &str, payload: CachePayload) {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if self.expiration.is_some() {
            let before = entries.len();
            entries.retain(|_, entry| self.is_live(entry, now));
            let swept = before - entries.len();
            if swept > 0 {
                debug!(swept, "Removed expired cache entries");
            }
        }

        entries.insert(
            normalize(user),
            CacheEntry {
                inserted_at: now,
                payload,
            },
        );
    }

    fn is_live(&self, entry: &CacheEntry, now: Instant) -> bool {
        match self.expiration {
            Some(expiration) => now.duration_since(entry.inserted_at) < expiration,
            None => true,
        }
    }
}

fn normalize(user: &str) -> String {
    user.to_lowercase()
}

/// Caches user anime lists from [`MalApi::get_anime_list_for_user`].
///
/// Other operations go straight to the inner client. Concurrent misses for
/// the same user may each reach the inner client; the last one to finish
/// wins.
pub struct CachingMalApi<A> {
    inner: A,
    owns_inner: bool,
    cache: ListCache,
}

impl<A: MalApi> CachingMalApi<A> {
    pub fn new(inner: A, expiration: Option<Duration>, owns_inner: bool) -> Self {
        info!(expiration = ?expiration, "User list cache initialized");
        Self {
            inner,
            owns_inner,
            cache: ListCache::new(expiration),
        }
    }

    pub fn cache(&self) -> &ListCache {
        &self.cache
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

#[async_trait]
impl<A: MalApi> MalApi for CachingMalApi<A> {
    async fn get_anime_list_for_user(
        &self,
        user: &str,
        cancel: &CancellationToken,
    ) -> Result<UserLookupResults> {
        debug!(user, "Checking cache for user");

        match self.cache.get(user) {
            Some(CachePayload::Found(results)) => {
                info!(user, "Got anime list from cache");
                return Ok(results);
            }
            Some(CachePayload::NotFound) => {
                info!(user, "Cache indicates user does not have an anime list");
                return Err(MalError::user_not_found(user));
            }
            None => info!(user, "Cache did not contain anime list"),
        }

        match self.inner.get_anime_list_for_user(user, cancel).await {
            Ok(results) => {
                self.cache.put_list(user, results.clone());
                Ok(results)
            }
            Err(e) if e.is_not_found() => {
                self.cache.put_not_found(user);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn get_recent_online_users(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RecentUsersResults> {
        self.inner.get_recent_online_users(cancel).await
    }

    async fn get_anime_details(
        &self,
        anime_id: u32,
        cancel: &CancellationToken,
    ) -> Result<AnimeDetailsResults> {
        self.inner.get_anime_details(anime_id, cancel).await
    }

    async fn close(&self) {
        self.cache.clear();
        close_inner(&self.inner, self.owns_inner).await;
    }
}
