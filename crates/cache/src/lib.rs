//! Exstream Cache
//!
//! Pure state reduction for the exchange stream. A [`MarketCache`] folds
//! market and order change records into a point-in-time view of one market:
//! definition, traded volume, best-offer ladders and the trader's matched and
//! unmatched position, one [`RunnerCache`] per selection.
//!
//! No async, no I/O. Callers serialize writes to a given cache.

pub mod config;
pub mod error;
pub mod ladder;
pub mod market;
pub mod runner;
pub mod unmatched;
pub mod window;

pub use config::CacheConfig;
pub use error::{CacheError, CacheResult};
pub use ladder::{LevelLadder, PriceSizeLadder};
pub use market::MarketCache;
pub use runner::RunnerCache;
pub use unmatched::UnmatchedOrders;
pub use window::{PriceSizeTimeWindow, TimeBuffer, TimeWindow};
