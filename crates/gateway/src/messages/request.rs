//! Outbound control messages

use exstream_core::{MarketDataFilter, MarketFilter, OrderFilter};
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Clock tokens last seen for a subscription, echoed back on resubscribe
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Clocks {
    pub initial_clk: Option<String>,
    pub clk: Option<String>,
}

impl Clocks {
    pub fn is_empty(&self) -> bool {
        self.initial_clk.is_none() && self.clk.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationMessage {
    pub id: u32,
    pub app_key: String,
    pub session: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSubscriptionMessage {
    pub id: u32,
    pub market_filter: MarketFilter,
    pub market_data_filter: MarketDataFilter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_clk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflate_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmentation_enabled: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSubscriptionMessage {
    pub id: u32,
    pub order_filter: OrderFilter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_clk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflate_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmentation_enabled: Option<bool>,
}

/// Any message the client writes to the stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum RequestMessage {
    Authentication(AuthenticationMessage),
    MarketSubscription(MarketSubscriptionMessage),
    OrderSubscription(OrderSubscriptionMessage),
}

impl RequestMessage {
    /// Request id carried by the message
    pub fn id(&self) -> u32 {
        match self {
            Self::Authentication(m) => m.id,
            Self::MarketSubscription(m) => m.id,
            Self::OrderSubscription(m) => m.id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "authentication",
            Self::MarketSubscription(_) => "marketSubscription",
            Self::OrderSubscription(_) => "orderSubscription",
        }
    }

    /// Attach resume clocks (subscriptions only)
    pub fn with_clocks(mut self, clocks: &Clocks) -> Self {
        match &mut self {
            Self::MarketSubscription(m) => {
                m.initial_clk = clocks.initial_clk.clone();
                m.clk = clocks.clk.clone();
            }
            Self::OrderSubscription(m) => {
                m.initial_clk = clocks.initial_clk.clone();
                m.clk = clocks.clk.clone();
            }
            Self::Authentication(_) => {}
        }
        self
    }

    /// Serialize as one line of JSON (without terminator)
    pub fn to_line(&self) -> Result<String, TransportError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a line written by a client
    pub fn from_line(line: &str) -> Result<Self, TransportError> {
        Ok(serde_json::from_str(line.trim())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exstream_core::PriceField;

    #[test]
    fn test_authentication_wire_format() {
        let msg = RequestMessage::Authentication(AuthenticationMessage {
            id: 1,
            app_key: "key".into(),
            session: "token".into(),
        });
        assert_eq!(
            msg.to_line().unwrap(),
            r#"{"op":"authentication","id":1,"appKey":"key","session":"token"}"#
        );
    }

    #[test]
    fn test_market_subscription_omits_absent_fields() {
        let msg = RequestMessage::MarketSubscription(MarketSubscriptionMessage {
            id: 2,
            market_filter: MarketFilter::markets(["1.23"]),
            market_data_filter: MarketDataFilter::new(vec![PriceField::ExTraded])
                .with_ladder_levels(3),
            initial_clk: None,
            clk: None,
            heartbeat_ms: Some(500),
            conflate_ms: None,
            segmentation_enabled: None,
        });

        let line = msg.to_line().unwrap();
        assert_eq!(
            line,
            r#"{"op":"marketSubscription","id":2,"marketFilter":{"marketIds":["1.23"]},"marketDataFilter":{"ladderLevels":3,"fields":["EX_TRADED"]},"heartbeatMs":500}"#
        );
    }

    #[test]
    fn test_with_clocks_and_parse_back() {
        let msg = RequestMessage::OrderSubscription(OrderSubscriptionMessage {
            id: 3,
            order_filter: OrderFilter::default(),
            initial_clk: None,
            clk: None,
            heartbeat_ms: None,
            conflate_ms: None,
            segmentation_enabled: None,
        })
        .with_clocks(&Clocks {
            initial_clk: Some("init".into()),
            clk: Some("c9".into()),
        });

        let parsed = RequestMessage::from_line(&msg.to_line().unwrap()).unwrap();
        assert_eq!(parsed.id(), 3);
        assert_eq!(parsed.kind(), "orderSubscription");
        let RequestMessage::OrderSubscription(order) = parsed else {
            panic!("expected order subscription");
        };
        assert_eq!(order.clk.as_deref(), Some("c9"));
        assert_eq!(order.initial_clk.as_deref(), Some("init"));
    }
}
