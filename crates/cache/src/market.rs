//! Per-market state reduced from market and order change records

use chrono::{Duration, Utc};
use exstream_core::{
    ChangeRecord, MarketChange, MarketDefinition, MarketId, OrderMarketChange, SelectionId, Size,
    Timestamp, round_money,
};
use log::{debug, trace};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::config::CacheConfig;
use crate::runner::RunnerCache;

/// Point-in-time view of one market
///
/// Not internally synchronized: callers serialize writes to a given cache.
#[derive(Debug, Clone)]
pub struct MarketCache {
    market_id: MarketId,
    definition: Option<MarketDefinition>,
    total_matched: Size,
    last_publish_time: Option<Timestamp>,
    runners: HashMap<SelectionId, RunnerCache>,
    liability: Decimal,
    /// Set by the order stream once the market closes
    orders_closed: bool,
    /// Last market change was conflated by the venue
    conflated: bool,
    window: Duration,
}

impl MarketCache {
    pub fn new(market_id: impl Into<MarketId>) -> Self {
        Self::with_config(market_id, &CacheConfig::default())
    }

    pub fn with_config(market_id: impl Into<MarketId>, config: &CacheConfig) -> Self {
        Self {
            market_id: market_id.into(),
            definition: None,
            total_matched: Decimal::ZERO,
            last_publish_time: None,
            runners: HashMap::new(),
            liability: Decimal::ZERO,
            orders_closed: false,
            conflated: false,
            window: config.traded_window(),
        }
    }

    fn matches(&self, id: Option<&str>) -> bool {
        id == Some(self.market_id.as_str())
    }

    /// Apply every market and order change in `record` that targets this
    /// market, stamped with the record's publish time.
    ///
    /// Returns true if anything was applied.
    pub fn apply_record(&mut self, record: &ChangeRecord) -> bool {
        let publish_time = record.publish_time().unwrap_or_else(Utc::now);
        let mut applied = false;

        for change in &record.mc {
            applied |= self.apply(change, publish_time);
        }
        for change in &record.oc {
            applied |= self.apply_order(change, publish_time);
        }
        applied
    }

    /// Fold a market change into this cache.
    ///
    /// Ignored (returns false) when the market id does not match.
    pub fn apply(&mut self, change: &MarketChange, publish_time: Timestamp) -> bool {
        if !self.matches(change.id.as_deref()) {
            return false;
        }

        if change.is_replace() {
            debug!("Market {}: replacing cached state", self.market_id);
            self.definition = None;
            self.total_matched = Decimal::ZERO;
            self.runners.clear();
        }

        if let Some(definition) = &change.market_definition {
            for runner_def in &definition.runners {
                let Some(id) = runner_def.id else { continue };
                if let Some(runner) = self.runners.get_mut(&id) {
                    runner.apply_definition(runner_def);
                }
            }
            self.definition = Some(definition.clone());
        }

        if let Some(tv) = change.tv {
            self.total_matched = tv;
        }
        self.conflated = change.con.unwrap_or(false);

        for runner_change in &change.rc {
            let Some(id) = runner_change.id else {
                trace!("Market {}: dropping runner change without id", self.market_id);
                continue;
            };
            self.runner_entry(id).apply_change(runner_change, publish_time);
        }

        self.last_publish_time = Some(publish_time);
        true
    }

    /// Fold an order change into this cache and recompute market liability.
    ///
    /// Ignored (returns false) when the market id does not match.
    pub fn apply_order(&mut self, change: &OrderMarketChange, publish_time: Timestamp) -> bool {
        if !self.matches(change.id.as_deref()) {
            return false;
        }

        if change.full_image {
            debug!("Market {}: full order image", self.market_id);
            for runner in self.runners.values_mut() {
                runner.reset_orders();
            }
        }
        if change.closed == Some(true) {
            self.orders_closed = true;
        }

        for runner_change in &change.orc {
            let Some(id) = runner_change.id else { continue };
            self.runner_entry(id).apply_order(runner_change, publish_time);
        }

        self.liability = self.compute_liability();
        self.last_publish_time = Some(publish_time);
        true
    }

    /// Sum of negative runner profits less unmatched liability, rounded
    fn compute_liability(&self) -> Decimal {
        let (matched, unmatched) = self.runners.values().fold(
            (Decimal::ZERO, Decimal::ZERO),
            |(matched, unmatched), runner| {
                (
                    matched + runner.profit().min(Decimal::ZERO),
                    unmatched + runner.unmatched_liability(),
                )
            },
        );
        round_money(matched - unmatched)
    }

    /// Fetch a runner, creating it on first sight seeded from the current definition
    fn runner_entry(&mut self, id: SelectionId) -> &mut RunnerCache {
        let window = self.window;
        let definition = self.definition.as_ref();
        self.runners.entry(id).or_insert_with(|| {
            let mut runner = RunnerCache::new(id, window);
            if let Some(runner_def) = definition.and_then(|d| d.runner(id)) {
                runner.apply_definition(runner_def);
            }
            runner
        })
    }

    pub fn market_id(&self) -> &str {
        &self.market_id
    }

    pub fn definition(&self) -> Option<&MarketDefinition> {
        self.definition.as_ref()
    }

    pub fn total_matched(&self) -> Size {
        self.total_matched
    }

    pub fn last_publish_time(&self) -> Option<Timestamp> {
        self.last_publish_time
    }

    pub fn runner(&self, selection_id: SelectionId) -> Option<&RunnerCache> {
        self.runners.get(&selection_id)
    }

    pub fn runners(&self) -> impl Iterator<Item = &RunnerCache> {
        self.runners.values()
    }

    pub fn runner_count(&self) -> usize {
        self.runners.len()
    }

    /// Worst-case market exposure (zero or negative)
    pub fn liability(&self) -> Decimal {
        self.liability
    }

    pub fn is_conflated(&self) -> bool {
        self.conflated
    }

    pub fn is_closed(&self) -> bool {
        self.orders_closed || self.definition.as_ref().is_some_and(|d| d.is_closed())
    }
}
