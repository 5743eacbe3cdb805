//! Feed runner
//!
//! Drains a [`Subscription`] through the idle watchdog, folds every record
//! into the [`MarketRegistry`] and notifies linked strategies. A stall
//! cancels only the current connection, so [`FeedRunner::run_with_reconnect`]
//! can open a new channel and resume from the stored clocks.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use exstream_cache::CacheConfig;
use exstream_core::{ChangeRecord, MarketId};
use exstream_gateway::{IdleWatchdog, Subscription, TransportError, WatchdogConfig};
use futures_util::StreamExt;
use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::connector::Connector;
use crate::registry::MarketRegistry;
use crate::strategy::Strategy;

/// Feed runner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub cache: CacheConfig,
    pub watchdog: WatchdogConfig,
    /// Reconnect attempts before giving up (0 = never reconnect)
    pub max_reconnects: u32,
    /// Pause before each reconnect
    pub reconnect_delay_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            watchdog: WatchdogConfig::default(),
            max_reconnects: 5,
            reconnect_delay_ms: 1_000,
        }
    }
}

impl FeedConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

/// Why a connection's record stream stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    /// The caller's token was cancelled
    Cancelled,
    /// The watchdog saw no traffic for too long
    Stalled,
    /// The venue closed the stream or the channel failed
    Ended,
}

/// Result of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedSummary {
    pub outcome: FeedOutcome,
    /// Records taken off the stream
    pub processed: u64,
    pub reconnects: u32,
}

pub struct FeedRunner {
    config: FeedConfig,
    registry: Arc<MarketRegistry>,
    watchdog: IdleWatchdog,
    strategies: Vec<Box<dyn Strategy>>,
    /// Strategy indices linked to each market
    links: HashMap<MarketId, Vec<usize>>,
}

impl FeedRunner {
    pub fn new(config: FeedConfig) -> Self {
        let registry = Arc::new(MarketRegistry::new(config.cache.clone()));
        let watchdog = IdleWatchdog::from_config(&config.watchdog);
        Self {
            config,
            registry,
            watchdog,
            strategies: Vec::new(),
            links: HashMap::new(),
        }
    }

    pub fn with_strategy(mut self, strategy: impl Strategy + 'static) -> Self {
        self.add_strategy(Box::new(strategy));
        self
    }

    /// Register a strategy. It is offered markets created from now on.
    pub fn add_strategy(&mut self, strategy: Box<dyn Strategy>) {
        info!("Registered strategy {}", strategy.name());
        self.strategies.push(strategy);
    }

    /// Shared handle to the market caches, readable from other tasks
    pub fn registry(&self) -> Arc<MarketRegistry> {
        Arc::clone(&self.registry)
    }

    /// Names of the strategies linked to a market
    pub fn linked_strategies(&self, market_id: &str) -> Vec<&str> {
        self.links
            .get(market_id)
            .map(|linked| linked.iter().map(|&i| self.strategies[i].name()).collect())
            .unwrap_or_default()
    }

    /// Drain the subscription's current connection until it ends, stalls or
    /// `cancel` fires.
    pub async fn run(
        &mut self,
        subscription: &Subscription,
        cancel: &CancellationToken,
    ) -> FeedSummary {
        let connection = cancel.child_token();
        let stalled = Arc::new(AtomicBool::new(false));
        let on_stall = {
            let stalled = Arc::clone(&stalled);
            let connection = connection.clone();
            move || {
                stalled.store(true, Ordering::SeqCst);
                connection.cancel();
            }
        };

        let source = subscription.changes(connection.clone());
        let mut records = self.watchdog.watch(source, connection, on_stall);

        let mut processed = 0;
        while let Some(record) = records.next().await {
            processed += 1;
            self.process(&record);
        }

        let outcome = if stalled.load(Ordering::SeqCst) {
            FeedOutcome::Stalled
        } else if cancel.is_cancelled() {
            FeedOutcome::Cancelled
        } else {
            FeedOutcome::Ended
        };
        info!("Feed stopped: {:?} after {} records", outcome, processed);

        FeedSummary {
            outcome,
            processed,
            reconnects: 0,
        }
    }

    /// [`run`](Self::run), reconnecting through `connector` whenever the
    /// connection stalls or ends, up to `max_reconnects` times.
    ///
    /// Only a failure to open a channel or write to it is returned as `Err`.
    pub async fn run_with_reconnect<C>(
        &mut self,
        subscription: &Subscription,
        connector: &C,
        cancel: &CancellationToken,
    ) -> Result<FeedSummary, TransportError>
    where
        C: Connector + ?Sized,
    {
        let mut processed = 0;
        let mut reconnects = 0;

        loop {
            let summary = self.run(subscription, cancel).await;
            processed += summary.processed;

            let done = FeedSummary {
                outcome: summary.outcome,
                processed,
                reconnects,
            };
            if summary.outcome == FeedOutcome::Cancelled {
                return Ok(done);
            }
            if reconnects >= self.config.max_reconnects {
                warn!("Giving up after {} reconnects", reconnects);
                return Ok(done);
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    return Ok(FeedSummary { outcome: FeedOutcome::Cancelled, ..done });
                }
                _ = tokio::time::sleep(self.config.reconnect_delay()) => {}
            }

            reconnects += 1;
            info!("Reconnecting ({}/{})", reconnects, self.config.max_reconnects);
            let channel = connector.connect().await?;
            subscription.reconnect(channel).await?;

            if !subscription.is_authenticated() {
                error!("Re-authentication failed: {:?}", subscription.failure());
                return Ok(FeedSummary { reconnects, ..done });
            }
        }
    }

    fn process(&mut self, record: &ChangeRecord) {
        if record.is_heartbeat() {
            trace!("Heartbeat");
            return;
        }

        for update in self.registry.apply_record(record) {
            if update.created {
                self.link(&update.market_id);
            }
            self.dispatch(&update.market_id);
        }
    }

    fn link(&mut self, market_id: &str) {
        let strategies = &mut self.strategies;
        let linked = self
            .registry
            .with_market(market_id, |market| {
                strategies
                    .iter_mut()
                    .enumerate()
                    .filter_map(|(i, strategy)| strategy.link_to_market(market).then_some(i))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        if linked.is_empty() {
            debug!("Market {} not linked to any strategy", market_id);
            return;
        }
        for &i in &linked {
            info!("Linked {} to market {}", self.strategies[i].name(), market_id);
        }
        self.links.insert(market_id.to_string(), linked);
    }

    fn dispatch(&mut self, market_id: &str) {
        let Some(linked) = self.links.get(market_id) else {
            return;
        };
        let strategies = &mut self.strategies;
        self.registry.with_market(market_id, |market| {
            for &i in linked {
                strategies[i].on_change(market);
            }
        });
    }
}
