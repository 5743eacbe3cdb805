use serde::{Deserialize, Serialize};

use super::null_as_empty;
use super::{ErrorCode, MarketChange, OrderMarketChange, StatusCode};
use crate::error::CoreError;
use crate::values::{Timestamp, timestamp_from_millis};

/// Record kind, carried in the `op` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Connection,
    Status,
    #[serde(rename = "mcm")]
    MarketChange,
    #[serde(rename = "ocm")]
    OrderChange,
}

/// Change type of a market/order change record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    SubImage,
    ResubDelta,
    Heartbeat,
}

/// Segment marker when the venue splits a large image over several records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SegmentType {
    SegStart,
    Seg,
    SegEnd,
}

/// One decoded message from the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    pub op: Operation,
    /// Request id this record correlates with
    pub id: Option<u32>,
    /// Opaque clock tokens, only used for resubscription
    pub initial_clk: Option<String>,
    pub clk: Option<String>,
    /// Publish time (epoch ms)
    pub pt: Option<i64>,
    pub ct: Option<ChangeType>,
    pub segment_type: Option<SegmentType>,
    pub heartbeat_ms: Option<u64>,
    pub conflate_ms: Option<u64>,
    /// 503 when the venue is conflating due to latency
    pub status: Option<u32>,
    pub connection_id: Option<String>,
    pub status_code: Option<StatusCode>,
    pub error_code: Option<ErrorCode>,
    pub error_message: Option<String>,
    pub connection_closed: Option<bool>,
    pub connections_available: Option<u32>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub mc: Vec<MarketChange>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub oc: Vec<OrderMarketChange>,
}

impl ChangeRecord {
    /// Create an empty record of the given kind
    pub fn new(op: Operation) -> Self {
        Self {
            op,
            id: None,
            initial_clk: None,
            clk: None,
            pt: None,
            ct: None,
            segment_type: None,
            heartbeat_ms: None,
            conflate_ms: None,
            status: None,
            connection_id: None,
            status_code: None,
            error_code: None,
            error_message: None,
            connection_closed: None,
            connections_available: None,
            mc: Vec::new(),
            oc: Vec::new(),
        }
    }

    /// Connection record announcing the connection id
    pub fn connection(connection_id: impl Into<String>) -> Self {
        Self {
            connection_id: Some(connection_id.into()),
            ..Self::new(Operation::Connection)
        }
    }

    /// Successful status for a request id
    pub fn success(id: u32) -> Self {
        Self {
            id: Some(id),
            status_code: Some(StatusCode::Success),
            connection_closed: Some(false),
            ..Self::new(Operation::Status)
        }
    }

    /// Failed status for a request id
    pub fn failure(id: u32, error_code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            status_code: Some(StatusCode::Failure),
            error_code: Some(error_code),
            error_message: Some(message.into()),
            connection_closed: Some(false),
            ..Self::new(Operation::Status)
        }
    }

    /// Market change record for a subscription id
    pub fn market_change(id: u32, pt: i64, mc: Vec<MarketChange>) -> Self {
        Self {
            id: Some(id),
            pt: Some(pt),
            mc,
            ..Self::new(Operation::MarketChange)
        }
    }

    /// Order change record for a subscription id
    pub fn order_change(id: u32, pt: i64, oc: Vec<OrderMarketChange>) -> Self {
        Self {
            id: Some(id),
            pt: Some(pt),
            oc,
            ..Self::new(Operation::OrderChange)
        }
    }

    /// Decode a single line from the feed
    pub fn decode(line: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(line.trim())?)
    }

    /// Publish time as a UTC timestamp
    pub fn publish_time(&self) -> Option<Timestamp> {
        self.pt.and_then(timestamp_from_millis)
    }

    pub fn is_heartbeat(&self) -> bool {
        self.ct == Some(ChangeType::Heartbeat)
    }

    pub fn is_failure(&self) -> bool {
        self.op == Operation::Status && self.status_code != Some(StatusCode::Success)
    }
}
