//! Subscription filters
//!
//! Opaque configuration passed through to the venue unmodified, apart from
//! clamping the ladder depth into the range the venue accepts.

use serde::{Deserialize, Serialize};

/// Shallowest ladder depth the venue accepts
pub const MIN_LADDER_LEVELS: u8 = 1;
/// Deepest ladder depth the venue accepts
pub const MAX_LADDER_LEVELS: u8 = 10;

/// Which markets to stream
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketFilter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub market_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_type_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub country_codes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub venues: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub market_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub betting_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub race_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_in_play_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bsp_market: Option<bool>,
}

impl MarketFilter {
    /// Filter on an explicit set of market ids
    pub fn markets<I, S>(market_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            market_ids: market_ids.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

/// Data fields that can be requested on a market subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceField {
    ExBestOffersDisp,
    ExBestOffers,
    ExAllOffers,
    ExTraded,
    ExTradedVol,
    ExLtp,
    ExMarketDef,
    SpTraded,
    SpProjected,
}

/// What data to stream for each market
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDataFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ladder_levels: Option<u8>,
    #[serde(default)]
    pub fields: Vec<PriceField>,
}

impl MarketDataFilter {
    pub fn new(fields: Vec<PriceField>) -> Self {
        Self {
            ladder_levels: None,
            fields,
        }
    }

    /// Set the ladder depth, clamped to 1..=10
    pub fn with_ladder_levels(mut self, levels: u8) -> Self {
        self.ladder_levels = Some(levels.clamp(MIN_LADDER_LEVELS, MAX_LADDER_LEVELS));
        self
    }
}

/// Which orders to stream
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_overall_position: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub customer_strategy_refs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_matched_by_strategy_ref: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub account_ids: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_levels_clamped() {
        assert_eq!(
            MarketDataFilter::default().with_ladder_levels(0).ladder_levels,
            Some(1)
        );
        assert_eq!(
            MarketDataFilter::default().with_ladder_levels(25).ladder_levels,
            Some(10)
        );
        assert_eq!(
            MarketDataFilter::default().with_ladder_levels(3).ladder_levels,
            Some(3)
        );
    }

    #[test]
    fn test_market_filter_serialization_omits_empty() {
        let filter = MarketFilter::markets(["1.1", "1.2"]);
        let json = serde_json::to_string(&filter).unwrap();
        assert_eq!(json, r#"{"marketIds":["1.1","1.2"]}"#);
    }

    #[test]
    fn test_data_filter_wire_names() {
        let filter = MarketDataFilter::new(vec![PriceField::ExBestOffers, PriceField::ExLtp])
            .with_ladder_levels(3);
        let json = serde_json::to_string(&filter).unwrap();
        assert_eq!(json, r#"{"ladderLevels":3,"fields":["EX_BEST_OFFERS","EX_LTP"]}"#);
    }
}
