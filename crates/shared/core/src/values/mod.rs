use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Odds/price value - uses Decimal for precision
pub type Price = Decimal;

/// Stake or volume value - uses Decimal for precision
pub type Size = Decimal;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;

/// Market identifier as assigned by the venue (e.g. `1.23456789`)
pub type MarketId = String;

/// Selection (runner) identifier within a market
pub type SelectionId = i64;

/// Bet identifier of an order
pub type BetId = String;

/// Round a monetary figure to 2 decimal places, half away from zero.
///
/// All profit, liability and return figures go through this at the point
/// of computation so repeated reads are stable.
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a venue publish time (epoch milliseconds) to a UTC timestamp
pub fn timestamp_from_millis(millis: i64) -> Option<Timestamp> {
    DateTime::<Utc>::from_timestamp_millis(millis)
}

/// A `[price, size]` pair as sent by the venue. Either side may be null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "(Option<Decimal>, Option<Decimal>)",
    into = "(Option<Decimal>, Option<Decimal>)"
)]
pub struct PriceSize {
    pub price: Option<Price>,
    pub size: Option<Size>,
}

impl PriceSize {
    pub fn new(price: Price, size: Size) -> Self {
        Self {
            price: Some(price),
            size: Some(size),
        }
    }

    /// Both values, or None when either is missing
    pub fn values(&self) -> Option<(Price, Size)> {
        Some((self.price?, self.size?))
    }
}

impl From<(Option<Decimal>, Option<Decimal>)> for PriceSize {
    fn from((price, size): (Option<Decimal>, Option<Decimal>)) -> Self {
        Self { price, size }
    }
}

impl From<PriceSize> for (Option<Decimal>, Option<Decimal>) {
    fn from(ps: PriceSize) -> Self {
        (ps.price, ps.size)
    }
}

/// A `[level, price, size]` triple for the leveled best-offer ladders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "(Option<u32>, Option<Decimal>, Option<Decimal>)",
    into = "(Option<u32>, Option<Decimal>, Option<Decimal>)"
)]
pub struct LevelPriceSize {
    pub level: Option<u32>,
    pub price: Option<Price>,
    pub size: Option<Size>,
}

impl LevelPriceSize {
    pub fn new(level: u32, price: Price, size: Size) -> Self {
        Self {
            level: Some(level),
            price: Some(price),
            size: Some(size),
        }
    }
}

impl From<(Option<u32>, Option<Decimal>, Option<Decimal>)> for LevelPriceSize {
    fn from((level, price, size): (Option<u32>, Option<Decimal>, Option<Decimal>)) -> Self {
        Self { level, price, size }
    }
}

impl From<LevelPriceSize> for (Option<u32>, Option<Decimal>, Option<Decimal>) {
    fn from(lps: LevelPriceSize) -> Self {
        (lps.level, lps.price, lps.size)
    }
}
