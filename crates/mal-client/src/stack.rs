//! Builds a decorated client from configuration.
//!
//! Layers, outermost first: retry, rate limiting, cache, then the given
//! client. Each layer owns the one beneath it and can be switched off in its
//! config section.

use crate::api::{MalApi, RateLimitingMalApi};
use crate::cache::CachingMalApi;
use crate::retry::RetryingMalApi;
use shared::Config;
use tracing::info;

pub fn build_stack<A: MalApi + 'static>(config: &Config, inner: A) -> Box<dyn MalApi> {
    let mut api: Box<dyn MalApi> = Box::new(inner);

    if config.cache.enabled {
        api = Box::new(CachingMalApi::new(api, config.cache_expiration(), true));
    }

    if config.rate_limit.enabled {
        api = Box::new(RateLimitingMalApi::new(api, config.min_request_interval(), true));
    }

    if config.retry.enabled {
        api = Box::new(RetryingMalApi::new(
            api,
            config.retry.max_attempts,
            config.retry_delay(),
            true,
        ));
    }

    info!(
        cache = config.cache.enabled,
        rate_limit = config.rate_limit.enabled,
        retry = config.retry.enabled,
        "MAL client stack built"
    );

    api
}
