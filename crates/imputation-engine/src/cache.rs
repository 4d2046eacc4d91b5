//! Bounded, TTL-evicting cache for raw search responses.
//!
//! Keyed on the exact query string. Only successful responses are cached;
//! provider errors are always retried.

use std::time::Duration;

use imputation_core::SearchResponse;
use moka::future::Cache;

#[derive(Clone)]
pub struct SearchCache {
    inner: Cache<String, SearchResponse>,
}

impl SearchCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, query: &str) -> Option<SearchResponse> {
        self.inner.get(query).await
    }

    pub async fn insert(&self, query: String, response: SearchResponse) {
        self.inner.insert(query, response).await;
    }
}
