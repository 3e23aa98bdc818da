use crate::normalizer::LinkFilterCounts;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the client counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStatsSnapshot {
    /// Fetches that went to the network (one per fetch, retries excluded)
    pub total_requests: u64,
    pub cache_hits: u64,
    /// Fetches that failed after all attempts
    pub api_errors: u64,
    /// Fetches answered with an empty result set
    pub empty_responses: u64,
    pub invalid_links: u64,
    pub synonyms_filtered: u64,
    /// Extra attempts made after transient failures
    pub retries: u64,
}

impl ClientStatsSnapshot {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.cache_hits + self.total_requests;
        if lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / lookups as f64
        }
    }
}

/// Client-lifetime counters. Shared by every build using the client.
#[derive(Debug, Default)]
pub struct ClientStatistics {
    total_requests: AtomicU64,
    cache_hits: AtomicU64,
    api_errors: AtomicU64,
    empty_responses: AtomicU64,
    invalid_links: AtomicU64,
    synonyms_filtered: AtomicU64,
    retries: AtomicU64,
}

impl ClientStatistics {
    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_api_error(&self) {
        self.api_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_empty_response(&self) {
        self.empty_responses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_filtered(&self, counts: LinkFilterCounts) {
        self.invalid_links
            .fetch_add(counts.invalid, Ordering::Relaxed);
        self.synonyms_filtered
            .fetch_add(counts.synonyms, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ClientStatsSnapshot {
        ClientStatsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            api_errors: self.api_errors.load(Ordering::Relaxed),
            empty_responses: self.empty_responses.load(Ordering::Relaxed),
            invalid_links: self.invalid_links.load(Ordering::Relaxed),
            synonyms_filtered: self.synonyms_filtered.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.total_requests,
            &self.cache_hits,
            &self.api_errors,
            &self.empty_responses,
            &self.invalid_links,
            &self.synonyms_filtered,
            &self.retries,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
