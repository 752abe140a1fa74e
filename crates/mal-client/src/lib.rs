//! Client library for MyAnimeList.
//!
//! [`MalApi`] is the client interface. [`HttpMalClient`] talks to MAL; the
//! decorators add caching of user lists ([`CachingMalApi`]), spacing between
//! requests ([`RateLimitingMalApi`]) and retrying of transient failures
//! ([`RetryingMalApi`]). Decorators implement [`MalApi`] themselves, so they
//! stack in any order. [`build_stack`] assembles the usual stack from
//! configuration and [`BlockingMalApi`] offers a synchronous interface.

pub mod api;
pub mod blocking;
pub mod cache;
pub mod error;
pub mod retry;
pub mod stack;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{HttpMalClient, MalApi, RateLimitingMalApi, ResponseParser};
pub use blocking::BlockingMalApi;
pub use cache::{CachePayload, CachingMalApi, ListCache};
pub use error::{ErrorKind, MalError, Result};
pub use retry::RetryingMalApi;
pub use stack::build_stack;
pub use tokio_util::sync::CancellationToken;
