//! Per-run robots.txt cache
//!
//! One entry per origin (`scheme://host[:port]`). The first task that needs an
//! origin fetches its robots.txt; concurrent tasks for the same origin wait
//! for that fetch instead of issuing their own.

use crate::robots::ParsedRobots;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

type Slot = Arc<OnceCell<ParsedRobots>>;

/// Robots rules keyed by origin
#[derive(Debug, Default)]
pub struct RobotsCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached rules for `origin`, running `fetch` if there are none yet
    pub async fn get_or_fetch<F, Fut>(&self, origin: &str, fetch: F) -> ParsedRobots
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ParsedRobots>,
    {
        let slot = self.slot(origin);
        slot.get_or_init(fetch).await.clone()
    }

    /// Number of origins with rules loaded
    pub fn len(&self) -> usize {
        match self.slots.lock() {
            Ok(slots) => slots.values().filter(|slot| slot.initialized()).count(),
            Err(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, origin: &str) -> Slot {
        match self.slots.lock() {
            Ok(mut slots) => Arc::clone(slots.entry(origin.to_string()).or_default()),
            // Poisoned map: fetch without caching
            Err(_) => Arc::new(OnceCell::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_fetches_once_per_origin() {
        let cache = RobotsCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let robots = cache
                .get_or_fetch("https://example.com", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    ParsedRobots::from_content("User-agent: *\nDisallow: /private/\n")
                })
                .await;
            assert!(!robots.is_allowed("https://example.com/private/x", "Tidemark"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_origins_are_separate() {
        let cache = RobotsCache::new();
        assert!(cache.is_empty());

        cache
            .get_or_fetch("https://a.example.com", || async { ParsedRobots::allow_all() })
            .await;
        cache
            .get_or_fetch("https://b.example.com", || async { ParsedRobots::allow_all() })
            .await;

        assert_eq!(cache.len(), 2);
    }
}
