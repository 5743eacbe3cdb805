//! Wire message types written by the client
//!
//! Inbound records are decoded into `exstream_core::ChangeRecord`.

pub mod request;

pub use request::{
    AuthenticationMessage, Clocks, MarketSubscriptionMessage, OrderSubscriptionMessage,
    RequestMessage,
};
