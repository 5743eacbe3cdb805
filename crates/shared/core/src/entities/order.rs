use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::null_as_empty;
use super::{OrderStatus, Side};
use crate::values::{BetId, MarketId, PriceSize, SelectionId};

/// An unmatched (resting) order as reported on the order stream
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UnmatchedOrder {
    /// Bet id
    pub id: Option<BetId>,
    /// Price
    pub p: Option<Decimal>,
    /// Original size
    pub s: Option<Decimal>,
    pub side: Option<Side>,
    pub status: Option<OrderStatus>,
    /// Size remaining
    pub sr: Option<Decimal>,
    /// Size matched
    pub sm: Option<Decimal>,
    /// Persistence type
    pub pt: Option<String>,
    /// Order type
    pub ot: Option<String>,
    /// Placed date (epoch ms)
    pub pd: Option<i64>,
    /// Customer order reference
    pub rfo: Option<String>,
    /// Customer strategy reference
    pub rfs: Option<String>,
}

impl UnmatchedOrder {
    pub fn new(
        bet_id: impl Into<BetId>,
        side: Side,
        price: Decimal,
        size_remaining: Decimal,
        status: OrderStatus,
    ) -> Self {
        Self {
            id: Some(bet_id.into()),
            p: Some(price),
            s: Some(size_remaining),
            side: Some(side),
            status: Some(status),
            sr: Some(size_remaining),
            ..Default::default()
        }
    }
}

/// Order changes for a single selection
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRunnerChange {
    /// Selection id
    pub id: Option<SelectionId>,
    pub hc: Option<Decimal>,
    /// When set, `uo` is the complete set of resting orders
    #[serde(default)]
    pub full_image: bool,
    /// Matched backs (price, size)
    pub mb: Option<Vec<PriceSize>>,
    /// Matched lays (price, size)
    pub ml: Option<Vec<PriceSize>>,
    /// Unmatched orders
    #[serde(default, deserialize_with = "null_as_empty")]
    pub uo: Vec<UnmatchedOrder>,
}

impl OrderRunnerChange {
    pub fn new(id: SelectionId) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }
}

/// Order changes for a single market
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMarketChange {
    /// Market id
    pub id: Option<MarketId>,
    #[serde(default)]
    pub full_image: bool,
    pub closed: Option<bool>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub orc: Vec<OrderRunnerChange>,
}

impl OrderMarketChange {
    pub fn new(id: impl Into<MarketId>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_change_from_wire() {
        let json = r#"{
            "id": "1.234",
            "orc": [{
                "id": 11,
                "fullImage": true,
                "mb": [[8, 2]],
                "ml": [[8.8, 3]],
                "uo": [{"id": "b1", "p": 3.5, "s": 10, "side": "L", "status": "E", "sr": 4}]
            }]
        }"#;

        let oc: OrderMarketChange = serde_json::from_str(json).unwrap();
        let orc = &oc.orc[0];
        assert!(orc.full_image);
        assert_eq!(orc.ml.as_ref().unwrap()[0].values(), Some((dec!(8.8), dec!(3))));

        let uo = &orc.uo[0];
        assert_eq!(uo.side, Some(Side::Lay));
        assert_eq!(uo.status, Some(OrderStatus::Executable));
        assert_eq!(uo.sr, Some(dec!(4)));
    }
}
