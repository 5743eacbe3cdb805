//! In-process channel transport
//!
//! A [`MemoryChannel`] pair stands in for the venue: the client side is a
//! regular [`Channel`], the other side a [`VenuePeer`] that reads the
//! client's requests and answers with records. No sockets, no TLS.

use crate::error::TransportError;
use crate::messages::RequestMessage;
use crate::transport::{Channel, LineReader, LineWriter};
use async_trait::async_trait;
use exstream_core::ChangeRecord;
use tokio::sync::mpsc;

/// Client-side write half backed by an mpsc sender
pub struct MemoryWriter {
    tx: Option<mpsc::Sender<String>>,
}

#[async_trait]
impl LineWriter for MemoryWriter {
    async fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::ChannelClosed)?;
        tx.send(line.to_string())
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.tx = None;
        Ok(())
    }
}

/// Client-side read half backed by an mpsc receiver
pub struct MemoryReader {
    rx: mpsc::Receiver<String>,
}

#[async_trait]
impl LineReader for MemoryReader {
    async fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        Ok(self.rx.recv().await)
    }
}

/// Factory for in-process connections
pub struct MemoryChannel;

impl MemoryChannel {
    /// Create a connected client channel / venue peer pair
    pub fn pair(capacity: usize) -> (Channel, VenuePeer) {
        let (client_tx, venue_rx) = mpsc::channel(capacity);
        let (venue_tx, client_rx) = mpsc::channel(capacity);

        let channel = Channel::new(
            Box::new(MemoryReader { rx: client_rx }),
            Box::new(MemoryWriter {
                tx: Some(client_tx),
            }),
        );
        let peer = VenuePeer {
            rx: venue_rx,
            tx: Some(venue_tx),
        };
        (channel, peer)
    }
}

/// The venue end of a [`MemoryChannel`]
pub struct VenuePeer {
    rx: mpsc::Receiver<String>,
    tx: Option<mpsc::Sender<String>>,
}

impl VenuePeer {
    /// Next raw line written by the client, None once the client closed
    pub async fn recv_line(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Next request written by the client, None once the client closed
    pub async fn recv_request(&mut self) -> Option<Result<RequestMessage, TransportError>> {
        self.rx
            .recv()
            .await
            .map(|line| RequestMessage::from_line(&line))
    }

    /// Send a record to the client
    pub async fn send(&self, record: &ChangeRecord) -> Result<(), TransportError> {
        let line = serde_json::to_string(record)?;
        self.send_line(line).await
    }

    /// Send a raw line to the client (may be malformed on purpose)
    pub async fn send_line(&self, line: impl Into<String>) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::ChannelClosed)?;
        tx.send(line.into())
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }

    /// End the client's record stream
    pub fn close(&mut self) {
        self.tx = None;
    }
}
