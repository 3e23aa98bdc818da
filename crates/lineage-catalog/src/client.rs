use crate::cache::AssetCache;
use crate::class_types::ClassType;
use crate::normalizer::{empty_record, normalize_item, LinkFilterCounts};
use crate::record::{AssetRecord, CatalogResponse, LineageLink};
use crate::stats::{ClientStatistics, ClientStatsSnapshot};
use crate::transport::{CatalogQuery, CatalogTransport, HttpCatalogTransport};
use lineage_core::{CatalogConfig, CatalogError, LinkDirection};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Result of a fetch, with what the builder needs for per-build statistics.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub record: Arc<AssetRecord>,
    pub cache_hit: bool,
    /// Links dropped while normalizing this response. Zero on cache hits.
    pub filtered: LinkFilterCounts,
}

/// Extra constraints for [`CatalogClient::search`].
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub class_types: Vec<ClassType>,
    pub params: Vec<(String, String)>,
}

impl SearchFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class_types(mut self, class_types: impl IntoIterator<Item = ClassType>) -> Self {
        self.class_types.extend(class_types);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    fn to_params(&self) -> Vec<(String, String)> {
        self.class_types
            .iter()
            .map(|ct| ("classType".to_string(), ct.as_str().to_string()))
            .chain(self.params.iter().cloned())
            .collect()
    }
}

/// Cached, retrying client for the catalog object endpoint.
///
/// One client is meant to be shared (behind `Arc`) by every build of a
/// session: the cache and the statistics live as long as the client.
pub struct CatalogClient {
    transport: Arc<dyn CatalogTransport>,
    base_params: Vec<(String, String)>,
    max_retries: u32,
    retry_backoff: Duration,
    cache: AssetCache,
    stats: ClientStatistics,
}

impl CatalogClient {
    pub fn new(transport: Arc<dyn CatalogTransport>, config: &CatalogConfig) -> Self {
        Self {
            transport,
            base_params: config.static_params(),
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff(),
            cache: AssetCache::new(),
            stats: ClientStatistics::default(),
        }
    }

    /// Client over HTTP, configured from `config`.
    pub fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let transport = HttpCatalogTransport::new(config)?;
        info!("Catalog client initialized for {}", transport.endpoint());
        Ok(Self::new(Arc::new(transport), config))
    }

    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    /// Whether point lookups ask the catalog for links in `direction`.
    pub fn requests_links(&self, direction: LinkDirection) -> bool {
        let flag = match direction {
            LinkDirection::Upstream => "includeSrcLinks",
            LinkDirection::Downstream => "includeDstLinks",
        };
        !self
            .base_params
            .iter()
            .any(|(key, value)| key == flag && value == "false")
    }

    /// Fetch one asset, from cache when possible.
    ///
    /// An empty result set is not an error: it yields a record with
    /// `found == false` and no links.
    pub async fn fetch(&self, asset_id: &str) -> Result<Arc<AssetRecord>, CatalogError> {
        self.fetch_traced(asset_id).await.map(|outcome| outcome.record)
    }

    /// Like [`CatalogClient::fetch`], reporting whether the record came from
    /// the cache and what normalization dropped.
    ///
    /// Concurrent misses for one id make a single request; callers that waited
    /// on it see a cache hit.
    pub async fn fetch_traced(&self, asset_id: &str) -> Result<FetchOutcome, CatalogError> {
        if let Some(record) = self.cache.get(asset_id) {
            self.stats.record_cache_hit();
            debug!("Cache hit for {}", asset_id);
            return Ok(FetchOutcome {
                record,
                cache_hit: true,
                filtered: LinkFilterCounts::default(),
            });
        }

        let mut fresh = None;
        let slot = &mut fresh;
        let record = self
            .cache
            .get_or_try_init(asset_id, || async move {
                let (record, filtered) = self.fetch_uncached(asset_id).await?;
                *slot = Some(filtered);
                Ok::<_, CatalogError>(Arc::new(record))
            })
            .await?;

        match fresh {
            Some(filtered) => Ok(FetchOutcome {
                record,
                cache_hit: false,
                filtered,
            }),
            None => {
                self.stats.record_cache_hit();
                debug!("Joined in-flight fetch for {}", asset_id);
                Ok(FetchOutcome {
                    record,
                    cache_hit: true,
                    filtered: LinkFilterCounts::default(),
                })
            }
        }
    }

    async fn fetch_uncached(
        &self,
        asset_id: &str,
    ) -> Result<(AssetRecord, LinkFilterCounts), CatalogError> {
        self.stats.record_request();
        let query = CatalogQuery::point(asset_id).with_params(&self.base_params);

        let response = match self.query_with_retry(asset_id, &query).await {
            Ok(response) => response,
            Err(e) => {
                self.stats.record_api_error();
                error!("Failed to fetch {}: {}", asset_id, e);
                return Err(e);
            }
        };

        let (record, filtered) = match response.items.first() {
            Some(item) => {
                let (record, filtered) = normalize_item(asset_id, item);
                info!(
                    "Asset found: {} ({}), {} upstream / {} downstream links",
                    record.name,
                    record.class_type,
                    record.src_links.len(),
                    record.dst_links.len()
                );
                (record, filtered)
            }
            None => {
                self.stats.record_empty_response();
                warn!("Empty response for {}", asset_id);
                (empty_record(asset_id), LinkFilterCounts::default())
            }
        };

        self.stats.record_filtered(filtered);
        Ok((record, filtered))
    }

    /// Normalized links of `asset_id` in one direction.
    pub async fn links(
        &self,
        asset_id: &str,
        direction: LinkDirection,
    ) -> Result<Vec<LineageLink>, CatalogError> {
        let record = self.fetch(asset_id).await?;
        Ok(record.links(direction).to_vec())
    }

    pub async fn upstream(&self, asset_id: &str) -> Result<Vec<LineageLink>, CatalogError> {
        self.links(asset_id, LinkDirection::Upstream).await
    }

    pub async fn downstream(&self, asset_id: &str) -> Result<Vec<LineageLink>, CatalogError> {
        self.links(asset_id, LinkDirection::Downstream).await
    }

    /// Free-text search. Results bypass the cache and the fetch counters; items
    /// without an id are skipped.
    pub async fn search(
        &self,
        expression: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<AssetRecord>, CatalogError> {
        let query = CatalogQuery::search(expression)
            .with_params(&self.base_params)
            .with_params(&filters.to_params());

        let response = self.query_with_retry(expression, &query).await?;
        let records: Vec<AssetRecord> = response
            .items
            .iter()
            .filter_map(|item| {
                let id = item.id.as_deref()?;
                Some(normalize_item(id, item).0)
            })
            .collect();

        info!("Search '{}' returned {} asset(s)", expression, records.len());
        Ok(records)
    }

    async fn query_with_retry(
        &self,
        asset: &str,
        query: &CatalogQuery,
    ) -> Result<CatalogResponse, CatalogError> {
        let max_attempts = self.max_retries.saturating_add(1);
        let mut attempt = 1;

        loop {
            match self.transport.query(query).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    self.stats.record_retry();
                    let delay = self.backoff(attempt);
                    warn!(
                        "Catalog request for {} failed (attempt {}/{}), retrying in {:?}: {}",
                        asset, attempt, max_attempts, delay, e
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(e) => return Err(exhausted(asset, attempt, e)),
            }
        }
    }

    /// `retry_backoff * 2^(attempt-1)`.
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.retry_backoff.saturating_mul(1u32 << exponent)
    }

    pub fn statistics(&self) -> ClientStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_statistics(&self) {
        self.stats.reset();
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("Asset cache cleared");
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_cached(&self, asset_id: &str) -> bool {
        self.cache.contains(asset_id)
    }
}

/// Map the last failure to what callers see once retries are over.
fn exhausted(asset: &str, attempts: u32, e: CatalogError) -> CatalogError {
    match e {
        CatalogError::Decode(_) | CatalogError::Client(_) | CatalogError::Unavailable { .. } => e,
        other => CatalogError::Unavailable {
            asset: asset.to_string(),
            attempts,
            reason: other.to_string(),
        },
    }
}
