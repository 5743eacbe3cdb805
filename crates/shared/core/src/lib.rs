//! Exstream Core Domain
//!
//! Pure data model for the exchange stream client: decoded change records,
//! market and order changes, market definitions and subscription filters.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod error;
pub mod filters;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{
    ChangeRecord, ChangeType, ErrorCode, MarketChange, MarketDefinition, MarketStatus, Operation,
    OrderMarketChange, OrderRunnerChange, OrderStatus, RunnerChange, RunnerDefinition,
    RunnerStatus, SegmentType, Side, StatusCode, UnmatchedOrder,
};
pub use error::CoreError;
pub use filters::{MarketDataFilter, MarketFilter, OrderFilter, PriceField};
pub use values::{
    BetId, LevelPriceSize, MarketId, Price, PriceSize, SelectionId, Size, Timestamp, round_money,
    timestamp_from_millis,
};
