//! Concurrent registry of market caches
//!
//! One [`MarketCache`] per market id, created the first time a record names
//! the market. Each entry has a single writer at a time; records for
//! different markets can be applied from different tasks.

use dashmap::DashMap;
use exstream_cache::{CacheConfig, MarketCache};
use exstream_core::{ChangeRecord, MarketId};
use log::{debug, trace};

/// A market touched by one applied record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketUpdate {
    pub market_id: MarketId,
    /// The cache was created by this record
    pub created: bool,
}

pub struct MarketRegistry {
    markets: DashMap<MarketId, MarketCache>,
    config: CacheConfig,
}

impl MarketRegistry {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            markets: DashMap::new(),
            config,
        }
    }

    /// Apply every market and order change in `record`, creating caches for
    /// markets not seen before. Returns the markets that changed, in the
    /// order they first appear in the record.
    pub fn apply_record(&self, record: &ChangeRecord) -> Vec<MarketUpdate> {
        let mut ids: Vec<&str> = Vec::new();
        let named = record
            .mc
            .iter()
            .filter_map(|c| c.id.as_deref())
            .chain(record.oc.iter().filter_map(|c| c.id.as_deref()));
        for id in named {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        let mut updates = Vec::with_capacity(ids.len());
        for id in ids {
            let mut created = false;
            let mut market = self.markets.entry(id.to_string()).or_insert_with(|| {
                created = true;
                MarketCache::with_config(id, &self.config)
            });
            if created {
                debug!("New market cache {}", id);
            }

            if market.apply_record(record) {
                updates.push(MarketUpdate {
                    market_id: id.to_string(),
                    created,
                });
            } else {
                trace!("Record left market {} unchanged", id);
            }
        }
        updates
    }

    /// Run `f` against a market's cache, if the market is known
    pub fn with_market<R>(&self, market_id: &str, f: impl FnOnce(&MarketCache) -> R) -> Option<R> {
        self.markets.get(market_id).map(|market| f(&market))
    }

    /// Copy of a market's current state
    pub fn snapshot(&self, market_id: &str) -> Option<MarketCache> {
        self.with_market(market_id, MarketCache::clone)
    }

    pub fn market_ids(&self) -> Vec<MarketId> {
        let mut ids: Vec<MarketId> = self.markets.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn contains(&self, market_id: &str) -> bool {
        self.markets.contains_key(market_id)
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}

impl Default for MarketRegistry {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
