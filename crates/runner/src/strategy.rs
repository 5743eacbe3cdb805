//! Strategy capability
//!
//! A strategy decides which markets it cares about when each one first
//! appears on the feed, then reacts to every update of those markets.

use exstream_cache::MarketCache;

/// Implement this to consume market updates from a [`crate::FeedRunner`]
pub trait Strategy: Send {
    /// Strategy name for logging
    fn name(&self) -> &str;

    /// Offered each market cache once, after its first update.
    ///
    /// Return true to receive `on_change` for this market from now on.
    fn link_to_market(&mut self, market: &MarketCache) -> bool;

    /// Called after every applied record touching a linked market
    fn on_change(&mut self, market: &MarketCache);
}
