use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::null_as_empty;
use crate::values::{LevelPriceSize, MarketId, PriceSize, SelectionId};

/// Market lifecycle status from the market definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketStatus {
    Inactive,
    Open,
    Suspended,
    Closed,
    #[serde(other)]
    Unknown,
}

/// Runner status from the market definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunnerStatus {
    Active,
    Winner,
    Loser,
    Placed,
    RemovedVacant,
    Removed,
    Hidden,
    #[serde(other)]
    Unknown,
}

/// Per-runner metadata inside a market definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerDefinition {
    pub id: Option<SelectionId>,
    /// Weighting applied to account for withdrawn competitors
    pub adjustment_factor: Option<Decimal>,
    pub status: Option<RunnerStatus>,
    pub sort_priority: Option<u32>,
    pub hc: Option<Decimal>,
    pub removal_date: Option<DateTime<Utc>>,
}

impl RunnerDefinition {
    pub fn new(id: SelectionId, adjustment_factor: Option<Decimal>) -> Self {
        Self {
            id: Some(id),
            adjustment_factor,
            status: None,
            sort_priority: None,
            hc: None,
            removal_date: None,
        }
    }
}

/// Venue metadata for a market. Always pushed whole, never as a delta.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDefinition {
    pub status: Option<MarketStatus>,
    pub in_play: Option<bool>,
    pub bet_delay: Option<u32>,
    pub market_time: Option<DateTime<Utc>>,
    pub version: Option<u64>,
    pub complete: Option<bool>,
    pub bsp_market: Option<bool>,
    pub turn_in_play_enabled: Option<bool>,
    pub market_type: Option<String>,
    pub event_id: Option<String>,
    pub event_type_id: Option<String>,
    pub country_code: Option<String>,
    pub venue: Option<String>,
    pub number_of_winners: Option<u32>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub runners: Vec<RunnerDefinition>,
}

impl MarketDefinition {
    /// Find the runner definition for a selection
    pub fn runner(&self, selection_id: SelectionId) -> Option<&RunnerDefinition> {
        self.runners.iter().find(|r| r.id == Some(selection_id))
    }

    pub fn is_closed(&self) -> bool {
        self.status == Some(MarketStatus::Closed)
    }
}

/// Incremental change for a single runner (selection)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunnerChange {
    /// Selection id; changes without one are discarded by the cache
    pub id: Option<SelectionId>,
    pub hc: Option<Decimal>,
    /// Last traded price
    pub ltp: Option<Decimal>,
    /// Total matched on this runner (0 means unchanged)
    pub tv: Option<Decimal>,
    /// Traded volume ladder (cumulative price -> size)
    pub trd: Option<Vec<PriceSize>>,
    /// Best available to back, leveled
    pub batb: Option<Vec<LevelPriceSize>>,
    /// Best available to lay, leveled
    pub batl: Option<Vec<LevelPriceSize>>,
    /// Full-depth available to back (size 0 removes the price)
    pub atb: Option<Vec<PriceSize>>,
    /// Full-depth available to lay (size 0 removes the price)
    pub atl: Option<Vec<PriceSize>>,
}

impl RunnerChange {
    pub fn new(id: SelectionId) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }
}

/// Incremental change for a single market
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketChange {
    pub id: Option<MarketId>,
    /// Total matched on the market
    pub tv: Option<Decimal>,
    /// Replace flag: discard all prior state for this market first
    #[serde(default)]
    pub img: bool,
    /// Set when the venue conflated several updates into this one
    pub con: Option<bool>,
    pub market_definition: Option<MarketDefinition>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub rc: Vec<RunnerChange>,
}

impl MarketChange {
    pub fn new(id: impl Into<MarketId>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn is_replace(&self) -> bool {
        self.img
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_market_change_from_wire() {
        let json = r#"{
            "id": "1.234",
            "tv": 150.5,
            "img": true,
            "marketDefinition": {
                "status": "OPEN",
                "inPlay": false,
                "runners": [{"id": 11, "adjustmentFactor": 45.2, "status": "ACTIVE"}]
            },
            "rc": [{"id": 11, "ltp": 2.5, "trd": [[2.5, 10]], "batb": [[0, 2.48, 5]]}]
        }"#;

        let mc: MarketChange = serde_json::from_str(json).unwrap();
        assert_eq!(mc.id.as_deref(), Some("1.234"));
        assert!(mc.is_replace());
        assert_eq!(mc.tv, Some(dec!(150.5)));

        let def = mc.market_definition.unwrap();
        assert_eq!(def.status, Some(MarketStatus::Open));
        assert_eq!(def.runner(11).unwrap().adjustment_factor, Some(dec!(45.2)));

        let rc = &mc.rc[0];
        assert_eq!(rc.ltp, Some(dec!(2.5)));
        assert_eq!(rc.trd.as_ref().unwrap()[0].values(), Some((dec!(2.5), dec!(10))));
        assert!(rc.batl.is_none());
    }

    #[test]
    fn test_null_runner_changes_are_empty() {
        let mc: MarketChange = serde_json::from_str(r#"{"id":"1.1","rc":null}"#).unwrap();
        assert!(mc.rc.is_empty());
        assert!(!mc.img);
    }
}
