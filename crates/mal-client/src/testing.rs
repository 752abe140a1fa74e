//! Test doubles shared by the unit tests of every decorator.

use crate::api::*;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

type ListFn = Box<dyn Fn(&str, usize) -> Result<UserLookupResults> + Send + Sync>;
type RecentFn = Box<dyn Fn(usize) -> Result<RecentUsersResults> + Send + Sync>;
type DetailsFn = Box<dyn Fn(u32, usize) -> Result<AnimeDetailsResults> + Send + Sync>;

pub(crate) fn sample_list(user_id: u32, canonical_user_name: &str) -> UserLookupResults {
    UserLookupResults::new(user_id, canonical_user_name, Vec::new())
}

/// Counts calls, records when each one started, and answers from closures
/// that receive the zero-based call index.
pub(crate) struct MockApi {
    list: ListFn,
    recent: RecentFn,
    details: DetailsFn,
    work: Duration,
    list_calls: AtomicUsize,
    recent_calls: AtomicUsize,
    details_calls: AtomicUsize,
    starts: Mutex<Vec<Instant>>,
    closed: Arc<AtomicBool>,
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            list: Box::new(|user, _| Ok(sample_list(5, user))),
            recent: Box::new(|_| {
                Ok(RecentUsersResults {
                    users: vec!["alice".to_string(), "bob".to_string()],
                })
            }),
            details: Box::new(|_, _| {
                Ok(AnimeDetailsResults {
                    genres: vec![Genre {
                        genre_id: 1,
                        name: "Action".to_string(),
                    }],
                })
            }),
            work: Duration::ZERO,
            list_calls: AtomicUsize::new(0),
            recent_calls: AtomicUsize::new(0),
            details_calls: AtomicUsize::new(0),
            starts: Mutex::new(Vec::new()),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_list(
        mut self,
        f: impl Fn(&str, usize) -> Result<UserLookupResults> + Send + Sync + 'static,
    ) -> Self {
        self.list = Box::new(f);
        self
    }

    pub fn with_recent(
        mut self,
        f: impl Fn(usize) -> Result<RecentUsersResults> + Send + Sync + 'static,
    ) -> Self {
        self.recent = Box::new(f);
        self
    }

    pub fn with_details(
        mut self,
        f: impl Fn(u32, usize) -> Result<AnimeDetailsResults> + Send + Sync + 'static,
    ) -> Self {
        self.details = Box::new(f);
        self
    }

    /// Makes every call take `work` before answering.
    pub fn with_work(mut self, work: Duration) -> Self {
        self.work = work;
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn recent_calls(&self) -> usize {
        self.recent_calls.load(Ordering::SeqCst)
    }

    pub fn details_calls(&self) -> usize {
        self.details_calls.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> Vec<Instant> {
        self.starts.lock().unwrap().clone()
    }

    /// Stays observable after the mock is moved into an owning decorator.
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn begin(&self, counter: &AtomicUsize) -> usize {
        self.starts.lock().unwrap().push(Instant::now());
        let index = counter.fetch_add(1, Ordering::SeqCst);
        if !self.work.is_zero() {
            tokio::time::sleep(self.work).await;
        }
        index
    }
}

#[async_trait]
impl MalApi for MockApi {
    async fn get_anime_list_for_user(
        &self,
        user: &str,
        _cancel: &CancellationToken,
    ) -> Result<UserLookupResults> {
        let index = self.begin(&self.list_calls).await;
        (self.list)(user, index)
    }

    async fn get_recent_online_users(
        &self,
        _cancel: &CancellationToken,
    ) -> Result<RecentUsersResults> {
        let index = self.begin(&self.recent_calls).await;
        (self.recent)(index)
    }

    async fn get_anime_details(
        &self,
        anime_id: u32,
        _cancel: &CancellationToken,
    ) -> Result<AnimeDetailsResults> {
        let index = self.begin(&self.details_calls).await;
        (self.details)(anime_id, index)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
