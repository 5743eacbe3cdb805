//! Transport abstraction layer
//!
//! The stream is a bidirectional, newline-delimited JSON connection. It is
//! split into a [`LineWriter`] half (control messages) and a [`LineReader`]
//! half (decoded change records) so control messages can be written while a
//! consumer drains the reader.

pub mod channel;
pub mod config;
pub mod tls;

pub use channel::{MemoryChannel, VenuePeer};
pub use config::TransportConfig;

use crate::error::TransportError;
use async_trait::async_trait;
use exstream_core::ChangeRecord;
use log::warn;

/// Write half of a stream connection
#[async_trait]
pub trait LineWriter: Send {
    /// Write one line; the terminator is appended by the transport
    async fn write_line(&mut self, line: &str) -> Result<(), TransportError>;

    /// Shut down the write side
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Read half of a stream connection
#[async_trait]
pub trait LineReader: Send {
    /// Next raw line, or None at end of stream
    async fn read_line(&mut self) -> Result<Option<String>, TransportError>;

    /// Next decoded record, or None at end of stream.
    ///
    /// Malformed lines are logged and skipped.
    async fn read_record(&mut self) -> Result<Option<ChangeRecord>, TransportError> {
        loop {
            match self.read_line().await? {
                None => return Ok(None),
                Some(line) => {
                    if let Some(record) = decode_change(&line) {
                        return Ok(Some(record));
                    }
                }
            }
        }
    }
}

/// One live connection, both halves
pub struct Channel {
    pub reader: Box<dyn LineReader>,
    pub writer: Box<dyn LineWriter>,
}

impl Channel {
    pub fn new(reader: Box<dyn LineReader>, writer: Box<dyn LineWriter>) -> Self {
        Self { reader, writer }
    }

    pub fn into_parts(self) -> (Box<dyn LineReader>, Box<dyn LineWriter>) {
        (self.reader, self.writer)
    }
}

/// Decode one line from the feed.
///
/// Yields a fully populated record or None; blank lines are None silently.
pub fn decode_change(line: &str) -> Option<ChangeRecord> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match ChangeRecord::decode(line) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Dropping malformed record ({}): {:.120}", e, line);
            None
        }
    }
}
