//! Exstream Gateway
//!
//! Stream protocol client for the exchange. Provides:
//! - Transport abstraction (line reader/writer halves) with a TLS socket
//!   implementation and an in-process channel pair for tests
//! - Outbound control messages (authentication, market/order subscriptions)
//! - The subscription state machine: authentication sequencing, request ids,
//!   retry on failure status, resubscription with clocks
//! - An idle watchdog decorating the record stream
//!
//! ## Architecture
//!
//! ```text
//!        Venue (TLS, newline-delimited JSON)
//!                 │
//!         ┌───────▼────────┐
//!         │  Subscription  │  authenticate / subscribe / resubscribe
//!         └───────┬────────┘
//!                 │ changes(cancel)
//!         ┌───────▼────────┐
//!         │  IdleWatchdog  │  stall callback on silence
//!         └───────┬────────┘
//!                 │ ChangeRecord stream
//!            Market caches
//! ```

pub mod config;
pub mod error;
pub mod messages;
pub mod subscription;
pub mod transport;
pub mod watchdog;

// Re-export commonly used types
pub use config::{StreamConfig, WatchdogConfig};
pub use error::{ConfigError, StreamFailure, TransportError};
pub use messages::{Clocks, RequestMessage};
pub use subscription::{RecordStream, Subscription};
pub use transport::{
    Channel, LineReader, LineWriter, MemoryChannel, TransportConfig, VenuePeer, decode_change,
};
pub use watchdog::IdleWatchdog;
