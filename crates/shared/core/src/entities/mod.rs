mod change;
mod market;
mod order;
mod order_status;
mod side;
mod status;

pub use change::{ChangeRecord, ChangeType, Operation, SegmentType};
pub use market::{
    MarketChange, MarketDefinition, MarketStatus, RunnerChange, RunnerDefinition, RunnerStatus,
};
pub use order::{OrderMarketChange, OrderRunnerChange, UnmatchedOrder};
pub use order_status::OrderStatus;
pub use side::Side;
pub use status::{ErrorCode, StatusCode};

use serde::{Deserialize, Deserializer};

/// Lists may arrive as `null`; treat that the same as absent.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
