use lineage_catalog::{FetchOutcome, LinkFilterCounts};
use serde::{Deserialize, Serialize};

/// Counters for one build. Returned with the tree, never shared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStatistics {
    pub nodes_created: usize,
    pub cache_hits: usize,
    /// Fetches that went to the catalog, successful or not
    pub cache_misses: usize,
    pub api_errors: usize,
    /// Branches dropped because their asset was already in the tree
    pub cycles_prevented: usize,
    pub synonyms_filtered: usize,
    pub invalid_links: usize,
    /// Branches not expanded because they sat at the depth ceiling
    pub depth_limited: usize,
    /// Links left out because their node had more siblings than a path
    /// code segment can number
    #[serde(default)]
    pub links_truncated: usize,
    /// Set once the node budget stopped the walk
    pub budget_exhausted: bool,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl BuildStatistics {
    pub(crate) fn record_fetch(&mut self, outcome: &FetchOutcome) {
        if outcome.cache_hit {
            self.cache_hits += 1;
        } else {
            self.cache_misses += 1;
        }
        self.record_filtered(outcome.filtered);
    }

    pub(crate) fn record_failed_fetch(&mut self) {
        self.cache_misses += 1;
        self.api_errors += 1;
    }

    fn record_filtered(&mut self, counts: LinkFilterCounts) {
        self.synonyms_filtered += counts.synonyms as usize;
        self.invalid_links += counts.invalid as usize;
    }

    pub fn fetches(&self) -> usize {
        self.cache_hits + self.cache_misses
    }

    /// Whether the tree may be missing branches.
    pub fn is_partial(&self) -> bool {
        self.api_errors > 0 || self.links_truncated > 0 || self.budget_exhausted || self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_catalog::empty_record;
    use std::sync::Arc;

    #[test]
    fn test_cache_hits_carry_no_filter_counts() {
        let mut stats = BuildStatistics::default();
        let record = Arc::new(empty_record("a/T"));

        stats.record_fetch(&FetchOutcome {
            record: record.clone(),
            cache_hit: false,
            filtered: LinkFilterCounts {
                invalid: 1,
                synonyms: 2,
            },
        });
        stats.record_fetch(&FetchOutcome {
            record,
            cache_hit: true,
            filtered: LinkFilterCounts::default(),
        });
        stats.record_failed_fetch();

        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 2);
        assert_eq!(stats.api_errors, 1);
        assert_eq!(stats.synonyms_filtered, 2);
        assert_eq!(stats.fetches(), 3);
        assert!(stats.is_partial());
    }
}
