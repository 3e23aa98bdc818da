use crate::record::AssetRecord;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Session cache of fetched assets, keyed by asset id.
///
/// Entries are write-once: the first record stored for an id wins and is
/// returned to every later reader. Concurrent misses for the same id share
/// one initialization; a failed initialization leaves the entry empty so the
/// next caller tries again. There is no invalidation short of
/// [`AssetCache::clear`].
#[derive(Debug, Default)]
pub struct AssetCache {
    entries: DashMap<String, Arc<OnceCell<Arc<AssetRecord>>>>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Arc<AssetRecord>> {
        self.entries
            .get(id)
            .and_then(|entry| entry.value().get().cloned())
    }

    /// Return the cached record for `id`, running `init` only if no record
    /// exists and no other caller is already producing one.
    pub async fn get_or_try_init<F, Fut, E>(
        &self,
        id: &str,
        init: F,
    ) -> Result<Arc<AssetRecord>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<AssetRecord>, E>>,
    {
        let cell = self.slot(id);
        cell.get_or_try_init(init).await.cloned()
    }

    // The map guard is dropped before the cell is awaited.
    fn slot(&self, id: &str) -> Arc<OnceCell<Arc<AssetRecord>>> {
        self.entries.entry(id.to_string()).or_default().value().clone()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::empty_record;

    fn ready(record: AssetRecord) -> impl Future<Output = Result<Arc<AssetRecord>, ()>> {
        std::future::ready(Ok(Arc::new(record)))
    }

    #[tokio::test]
    async fn test_first_write_wins() {
        let cache = AssetCache::new();
        let first = cache
            .get_or_try_init("a/T", || ready(empty_record("a/T")))
            .await
            .unwrap();

        let mut replacement = empty_record("a/T");
        replacement.name = "changed".to_string();
        let second = cache
            .get_or_try_init("a/T", || ready(replacement))
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.name, "T");
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_init_is_not_cached() {
        let cache = AssetCache::new();
        let failed: Result<_, &str> = cache
            .get_or_try_init("a/T", || async { Err("unreachable") })
            .await;
        assert!(failed.is_err());
        assert!(!cache.contains("a/T"));
        assert!(cache.is_empty());

        let record = cache
            .get_or_try_init("a/T", || ready(empty_record("a/T")))
            .await
            .unwrap();
        assert_eq!(record.id, "a/T");
        assert!(cache.contains("a/T"));
    }

    #[tokio::test]
    async fn test_get_and_clear() {
        let cache = AssetCache::new();
        assert!(cache.get("x").is_none());
        cache
            .get_or_try_init("x", || ready(empty_record("x")))
            .await
            .unwrap();
        assert!(cache.contains("x"));
        cache.clear();
        assert!(cache.is_empty());
    }
}
