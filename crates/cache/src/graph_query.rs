use crate::clock::Clock;
use crate::ttl_lru::{CacheStats, TtlLruCache};
use crate::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Results of graph queries keyed by `<query_type>:<json params>`.
/// Everything is dropped when the graph is rebuilt.
pub struct GraphQueryCache<T> {
    inner: TtlLruCache<T>,
}

impl<T: Clone> GraphQueryCache<T> {
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: TtlLruCache::new(capacity, ttl),
        }
    }

    #[must_use]
    pub fn with_clock(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: TtlLruCache::with_clock(capacity, ttl, clock),
        }
    }

    pub fn key_for<P: Serialize + ?Sized>(query_type: &str, params: &P) -> Result<String> {
        let params = serde_json::to_string(params)?;
        Ok(format!("{query_type}:{params}"))
    }

    pub fn get<P: Serialize + ?Sized>(&mut self, query_type: &str, params: &P) -> Option<T> {
        let key = Self::key_for(query_type, params).ok()?;
        self.inner.get(&key).cloned()
    }

    pub fn set<P: Serialize + ?Sized>(&mut self, query_type: &str, params: &P, value: T) -> Result<()> {
        let key = Self::key_for(query_type, params)?;
        self.inner.set(key, value);
        Ok(())
    }

    /// Drop every cached result of one query type
    pub fn invalidate_query_type(&mut self, query_type: &str) -> Result<usize> {
        self.inner
            .invalidate_pattern(&format!("^{}:", regex::escape(query_type)))
    }

    pub fn invalidate_all(&mut self) -> usize {
        let dropped = self.inner.clear();
        if dropped > 0 {
            log::debug!("Graph query cache invalidated ({dropped} entries)");
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub const fn stats(&self) -> CacheStats {
        self.inner.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn cache() -> GraphQueryCache<Vec<String>> {
        GraphQueryCache::with_clock(16, Duration::from_secs(60), Arc::new(ManualClock::new(0)))
    }

    #[test]
    fn key_combines_type_and_params() {
        let key = GraphQueryCache::<Vec<String>>::key_for("callers", &json!({"id": "function:a.ts:main"}))
            .unwrap();
        assert_eq!(key, r#"callers:{"id":"function:a.ts:main"}"#);
    }

    #[test]
    fn invalidate_all_drops_everything() {
        let mut cache = cache();
        cache.set("callers", "x", vec!["a".to_string()]).unwrap();
        cache.set("imports", "y", vec!["b".to_string()]).unwrap();

        assert_eq!(cache.get("callers", "x"), Some(vec!["a".to_string()]));
        assert_eq!(cache.invalidate_all(), 2);
        assert_eq!(cache.get("callers", "x"), None);
    }

    #[test]
    fn invalidate_single_query_type() {
        let mut cache = cache();
        cache.set("callers", "x", vec![]).unwrap();
        cache.set("callees", "x", vec![]).unwrap();

        assert_eq!(cache.invalidate_query_type("callers").unwrap(), 1);
        assert!(cache.get("callees", "x").is_some());
    }
}
