//! Exstream Runner
//!
//! Drives a stream subscription end to end:
//!
//! - **Registry**: one market cache per market id, shared across tasks
//! - **Strategy**: links to markets it cares about and reacts to their updates
//! - **Feed runner**: subscription → watchdog → caches → strategies, with a
//!   reconnect loop that resumes from the stored clocks
//!
//! ## Architecture
//!
//! ```text
//!   Connector ──channel──► Subscription
//!                               │ changes(cancel)
//!                               ▼
//!                         IdleWatchdog ── stall ──► reconnect
//!                               │
//!                               ▼
//!                        MarketRegistry
//!                               │ on_change
//!                               ▼
//!                          Strategies
//! ```

pub mod connector;
pub mod feed;
pub mod registry;
pub mod strategy;

pub use connector::{Connector, VenueConnector};
pub use feed::{FeedConfig, FeedOutcome, FeedRunner, FeedSummary};
pub use registry::{MarketRegistry, MarketUpdate};
pub use strategy::Strategy;
