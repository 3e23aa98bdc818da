//! Offline catalog served from memory.
//!
//! Answers the same query language as the remote endpoint (`id:<asset>` for
//! point lookups, `*`-wildcard expressions for searches) and can be told to
//! fail for given ids. Used for demos without a catalog and throughout the
//! test suites.

use crate::record::{CatalogResponse, RawItem};
use crate::transport::{CatalogQuery, CatalogTransport};
use async_trait::async_trait;
use lineage_core::CatalogError;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
enum FailureMode {
    /// Fail this many more times, then answer normally.
    Times(u32),
    Always,
}

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    items: RwLock<BTreeMap<String, RawItem>>,
    failures: Mutex<HashMap<String, FailureMode>>,
    failure_status: Mutex<Option<u16>>,
    latency: Mutex<Option<Duration>>,
    calls: Mutex<Vec<String>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: impl IntoIterator<Item = RawItem>) -> Self {
        let catalog = Self::new();
        for item in items {
            catalog.insert(item);
        }
        catalog
    }

    /// Items without an id are ignored.
    pub fn insert(&self, item: RawItem) {
        if let Some(id) = item.id.clone() {
            self.items.write().insert(id, item);
        }
    }

    /// Every lookup of `id` fails with a transient network error.
    pub fn fail_always(&self, id: impl Into<String>) {
        self.failures.lock().insert(id.into(), FailureMode::Always);
    }

    /// The next `times` lookups of `id` fail, later ones succeed.
    pub fn fail_times(&self, id: impl Into<String>, times: u32) {
        self.failures
            .lock()
            .insert(id.into(), FailureMode::Times(times));
    }

    /// Fail with this HTTP status instead of a network error.
    pub fn fail_with_status(&self, status: u16) {
        *self.failure_status.lock() = Some(status);
    }

    /// Delay every answer, to simulate a slow catalog.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    /// Total number of queries received, including failed ones.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of point lookups received for `id`.
    pub fn calls_for(&self, id: &str) -> usize {
        let expression = format!("id:{}", id);
        self.calls
            .lock()
            .iter()
            .filter(|e| **e == expression)
            .count()
    }

    pub fn queries(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn should_fail(&self, id: &str) -> bool {
        let mut failures = self.failures.lock();
        match failures.get_mut(id) {
            Some(FailureMode::Always) => true,
            Some(FailureMode::Times(remaining)) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    fn search(&self, query: &CatalogQuery) -> Vec<RawItem> {
        let pattern = query.expression.to_lowercase();
        let class_types: Vec<&str> = query.param_values("classType").collect();

        self.items
            .read()
            .values()
            .filter(|item| {
                let id = item.id.as_deref().unwrap_or_default().to_lowercase();
                let name = item.name.as_deref().unwrap_or_default().to_lowercase();
                wildcard_match(&pattern, &id) || wildcard_match(&pattern, &name)
            })
            .filter(|item| {
                class_types.is_empty()
                    || item
                        .class_type
                        .as_deref()
                        .map(|ct| class_types.contains(&ct))
                        .unwrap_or(false)
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CatalogTransport for InMemoryCatalog {
    async fn query(&self, query: &CatalogQuery) -> Result<CatalogResponse, CatalogError> {
        self.calls.lock().push(query.expression.clone());

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let Some(id) = query.point_id() else {
            return Ok(CatalogResponse::new(self.search(query)));
        };

        if self.should_fail(id) {
            let status = *self.failure_status.lock();
            return Err(match status {
                Some(status) => CatalogError::Status {
                    status,
                    body: format!("simulated failure for {}", id),
                },
                None => CatalogError::Network(format!("simulated failure for {}", id)),
            });
        }

        let mut item = self.items.read().get(id).cloned();
        if let Some(item) = item.as_mut() {
            if excluded(query, "includeSrcLinks") {
                item.src_links.clear();
            }
            if excluded(query, "includeDstLinks") {
                item.dst_links.clear();
            }
        }
        Ok(CatalogResponse::new(item.into_iter().collect()))
    }

    fn endpoint(&self) -> &str {
        "memory://catalog"
    }
}

/// Link lists are returned unless the query turns them off explicitly.
fn excluded(query: &CatalogQuery, flag: &str) -> bool {
    query.param_values(flag).any(|value| value == "false")
}

/// Glob match supporting `*` only. A bare `*` matches everything.
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == text;
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let (first, rest) = match parts.split_first() {
        Some(split) => split,
        None => return true,
    };

    if !text.starts_with(first) {
        return false;
    }
    let mut cursor = first.len();

    let last_index = rest.len().saturating_sub(1);
    for (i, part) in rest.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == last_index {
            return text.len() >= cursor + part.len() && text[cursor..].ends_with(part);
        }
        match text[cursor..].find(part) {
            Some(pos) => cursor += pos + part.len(),
            None => return false,
        }
    }

    true
}
