//! Subscription protocol state machine
//!
//! Owns one connection and sequences the control messages on it:
//! authentication, market and order subscriptions, and resubscription with
//! the clocks last seen for each subscription. Failures reported by the venue
//! are recorded on the subscription ([`Subscription::failure`]); only
//! channel-level faults come back as `Err`.
//!
//! Two modes, chosen by whether a consumer is draining [`Subscription::changes`]:
//! - no active reader: authentication drains the channel itself until its
//!   status arrives, subscriptions are written once and not awaited
//! - active reader: every control message waits for its correlated status,
//!   and a failure status on a subscription re-sends the same message (same id)
//!
//! Change records read while authentication drains the channel are buffered
//! and handed out first by the next record stream.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use exstream_core::{
    ChangeRecord, ErrorCode, MarketDataFilter, MarketFilter, Operation, OrderFilter, StatusCode,
};
use futures_util::Stream;
use futures_util::stream;
use log::{debug, info, trace, warn};
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::config::StreamConfig;
use crate::error::{StreamFailure, TransportError};
use crate::messages::{
    AuthenticationMessage, Clocks, MarketSubscriptionMessage, OrderSubscriptionMessage,
    RequestMessage,
};
use crate::transport::{Channel, LineReader, LineWriter};

/// Decoded record stream handed to consumers
pub type RecordStream = Pin<Box<dyn Stream<Item = ChangeRecord> + Send>>;

#[derive(Default)]
struct State {
    next_id: u32,
    session: Option<String>,
    authenticated: bool,
    connected: bool,
    connection_id: Option<String>,
    failure: Option<StreamFailure>,
    market_subscriptions: BTreeMap<u32, MarketSubscriptionMessage>,
    order_subscriptions: BTreeMap<u32, OrderSubscriptionMessage>,
    clocks: HashMap<u32, Clocks>,
    /// Control messages waiting for their status record
    waiters: HashMap<u32, oneshot::Sender<ChangeRecord>>,
    /// Change records read by a status drain, not yet streamed
    pending: VecDeque<ChangeRecord>,
    reader_active: bool,
}

impl State {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Reset everything scoped to one connection
    fn reset_connection(&mut self) {
        self.authenticated = false;
        self.connected = false;
        self.connection_id = None;
        self.failure = None;
        self.waiters.clear();
    }
}

struct Inner {
    config: StreamConfig,
    state: Mutex<State>,
    reader: AsyncMutex<Option<Box<dyn LineReader>>>,
    writer: AsyncMutex<Option<Box<dyn LineWriter>>>,
}

/// Client side of one stream connection. Cheap to clone.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<Inner>,
}

/// Interpret a status record: None on success
fn status_failure(record: &ChangeRecord) -> Option<StreamFailure> {
    let message = record.error_message.clone().unwrap_or_default();
    match record.status_code {
        Some(StatusCode::Success) => None,
        Some(StatusCode::Failure) if record.connection_closed == Some(true) => {
            Some(StreamFailure::ConnectionClosed {
                code: record.error_code,
                message,
            })
        }
        Some(StatusCode::Failure) => Some(StreamFailure::Rejected {
            id: record.id.unwrap_or_default(),
            code: record.error_code.unwrap_or(ErrorCode::Unknown),
            message,
        }),
        None => Some(StreamFailure::ConnectionError),
    }
}

impl Subscription {
    pub fn new(channel: Channel, config: StreamConfig) -> Self {
        let (reader, writer) = channel.into_parts();
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(State::default()),
                reader: AsyncMutex::new(Some(reader)),
                writer: AsyncMutex::new(Some(writer)),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Session token used when authentication happens implicitly
    pub fn set_session(&self, session: impl Into<String>) {
        self.state().session = Some(session.into());
    }

    /// Swap in a fresh connection, dropping the old one.
    ///
    /// Connection-scoped state is reset; subscriptions and clocks are kept.
    pub async fn connect(&self, channel: Channel) {
        let (reader, writer) = channel.into_parts();
        if let Some(mut old) = self.inner.writer.lock().await.replace(writer) {
            let _ = old.close().await;
        }
        *self.inner.reader.lock().await = Some(reader);
        self.state().reset_connection();
        debug!("Subscription connected to new channel");
    }

    /// Authenticate with a session token.
    ///
    /// A blank token records `ParameterEmpty` without touching the channel.
    pub async fn authenticate(&self, session: &str) -> Result<(), TransportError> {
        if session.trim().is_empty() {
            self.record_failure(StreamFailure::ParameterEmpty("session"));
            return Ok(());
        }

        let (id, reader_active) = {
            let mut state = self.state();
            state.session = Some(session.to_string());
            state.failure = None;
            (state.next_id(), state.reader_active)
        };
        let message = RequestMessage::Authentication(AuthenticationMessage {
            id,
            app_key: self.inner.config.app_key.clone(),
            session: session.to_string(),
        });

        let status = if reader_active {
            self.request(message, false).await?
        } else {
            let (tx, rx) = oneshot::channel();
            self.state().waiters.insert(id, tx);
            if let Err(e) = self.write(&message).await {
                self.state().waiters.remove(&id);
                return Err(e);
            }
            self.drain_until_status(id, rx).await
        };

        match status.as_ref().map(status_failure) {
            Some(None) => {
                info!("Authenticated (request {})", id);
                self.state().authenticated = true;
            }
            Some(Some(failure)) => {
                warn!("Authentication failed: {}", failure);
                self.record_failure(failure);
            }
            None => {
                warn!("No status for authentication request {}", id);
                self.record_failure(StreamFailure::ConnectionError);
            }
        }
        Ok(())
    }

    async fn ensure_authenticated(&self) -> Result<bool, TransportError> {
        let session = {
            let state = self.state();
            if state.authenticated {
                return Ok(true);
            }
            state.session.clone().unwrap_or_default()
        };
        self.authenticate(&session).await?;
        Ok(self.is_authenticated())
    }

    /// Subscribe to market data.
    ///
    /// A missing filter records `ParameterEmpty` and writes nothing.
    pub async fn subscribe(
        &self,
        market_filter: Option<MarketFilter>,
        data_filter: Option<MarketDataFilter>,
    ) -> Result<(), TransportError> {
        let Some(market_filter) = market_filter else {
            self.record_failure(StreamFailure::ParameterEmpty("marketFilter"));
            return Ok(());
        };
        let Some(data_filter) = data_filter else {
            self.record_failure(StreamFailure::ParameterEmpty("marketDataFilter"));
            return Ok(());
        };
        if !self.ensure_authenticated().await? {
            return Ok(());
        }

        let config = &self.inner.config;
        let message = {
            let mut state = self.state();
            let id = state.next_id();
            let message = MarketSubscriptionMessage {
                id,
                market_filter,
                market_data_filter: data_filter,
                initial_clk: None,
                clk: None,
                heartbeat_ms: config.heartbeat_ms,
                conflate_ms: config.conflate_ms,
                segmentation_enabled: config.segmentation_enabled,
            };
            state.market_subscriptions.insert(id, message.clone());
            RequestMessage::MarketSubscription(message)
        };

        info!("Subscribing to markets (request {})", message.id());
        self.send_control(message).await
    }

    /// Subscribe to the account's orders.
    ///
    /// A missing filter records `ParameterEmpty` and writes nothing.
    pub async fn subscribe_to_orders(
        &self,
        order_filter: Option<OrderFilter>,
    ) -> Result<(), TransportError> {
        let Some(order_filter) = order_filter else {
            self.record_failure(StreamFailure::ParameterEmpty("orderFilter"));
            return Ok(());
        };
        if !self.ensure_authenticated().await? {
            return Ok(());
        }

        let config = &self.inner.config;
        let message = {
            let mut state = self.state();
            let id = state.next_id();
            let message = OrderSubscriptionMessage {
                id,
                order_filter,
                initial_clk: None,
                clk: None,
                heartbeat_ms: config.heartbeat_ms,
                conflate_ms: config.conflate_ms,
                segmentation_enabled: config.segmentation_enabled,
            };
            state.order_subscriptions.insert(id, message.clone());
            RequestMessage::OrderSubscription(message)
        };

        info!("Subscribing to orders (request {})", message.id());
        self.send_control(message).await
    }

    /// Re-send every subscription made so far, each with its own id and the
    /// clocks last seen for it, so the venue resumes instead of re-imaging.
    pub async fn resubscribe(&self) -> Result<(), TransportError> {
        let messages: Vec<RequestMessage> = {
            let state = self.state();
            let clocks = |id: &u32| state.clocks.get(id).cloned().unwrap_or_default();
            let markets = state.market_subscriptions.iter().map(|(id, m)| {
                RequestMessage::MarketSubscription(m.clone()).with_clocks(&clocks(id))
            });
            let orders = state.order_subscriptions.iter().map(|(id, m)| {
                RequestMessage::OrderSubscription(m.clone()).with_clocks(&clocks(id))
            });
            markets.chain(orders).collect()
        };

        for message in messages {
            info!("Resubscribing {} (request {})", message.kind(), message.id());
            self.send_control(message).await?;
        }
        Ok(())
    }

    /// Connect a fresh channel, re-authenticate with the stored session and
    /// resubscribe everything.
    pub async fn reconnect(&self, channel: Channel) -> Result<(), TransportError> {
        self.connect(channel).await;
        let session = self.state().session.clone().unwrap_or_default();
        self.authenticate(&session).await?;
        if self.is_authenticated() {
            self.resubscribe().await?;
        }
        Ok(())
    }

    /// Write a subscription: awaited with retry when a reader is active,
    /// fire-and-forget otherwise.
    async fn send_control(&self, message: RequestMessage) -> Result<(), TransportError> {
        if !self.is_reader_active() {
            return self.write(&message).await;
        }
        if let Some(status) = self.request(message, true).await? {
            if let Some(failure) = status_failure(&status) {
                self.record_failure(failure);
            }
        }
        Ok(())
    }

    /// Write and wait for the correlated status. With `retry`, a failure
    /// status re-sends the message up to `max_retries` times.
    ///
    /// Returns the final status record, or None if the reader went away.
    async fn request(
        &self,
        message: RequestMessage,
        retry: bool,
    ) -> Result<Option<ChangeRecord>, TransportError> {
        let id = message.id();
        let max_retries = if retry { self.inner.config.max_retries } else { 0 };
        let mut attempt = 0;

        loop {
            let (tx, rx) = oneshot::channel();
            self.state().waiters.insert(id, tx);
            self.write(&message).await?;

            let status = match timeout(self.inner.config.status_timeout(), rx).await {
                Ok(Ok(status)) => status,
                Ok(Err(_)) => {
                    debug!("Reader stopped while request {} was pending", id);
                    return Ok(None);
                }
                Err(_) => {
                    self.state().waiters.remove(&id);
                    warn!("Timed out waiting for status of request {}", id);
                    return Err(TransportError::Timeout);
                }
            };

            let retryable = status.status_code == Some(StatusCode::Failure)
                && status.connection_closed != Some(true);
            if retryable && attempt < max_retries {
                attempt += 1;
                warn!(
                    "Request {} ({}) failed with {:?}, retry {}/{}",
                    id,
                    message.kind(),
                    status.error_code,
                    attempt,
                    max_retries
                );
                continue;
            }
            return Ok(Some(status));
        }
    }

    /// Read records until the status for `id` reaches `status` (no consumer
    /// active).
    ///
    /// Change records read on the way are kept for the record stream. If a
    /// stream took the channel meanwhile, it routes the status instead.
    async fn drain_until_status(
        &self,
        id: u32,
        mut status: oneshot::Receiver<ChangeRecord>,
    ) -> Option<ChangeRecord> {
        let limit = self.inner.config.status_timeout();
        let mut guard = self.inner.reader.lock().await;
        let Some(reader) = guard.as_mut() else {
            drop(guard);
            let routed = if self.is_reader_active() {
                timeout(limit, status).await.ok().and_then(Result::ok)
            } else {
                None
            };
            if routed.is_none() {
                self.state().waiters.remove(&id);
            }
            return routed;
        };

        let outcome = loop {
            match timeout(limit, reader.read_record()).await {
                Ok(Ok(Some(record))) => {
                    self.observe(&record);
                    if let Ok(record) = status.try_recv() {
                        return Some(record);
                    }
                    if matches!(record.op, Operation::MarketChange | Operation::OrderChange) {
                        trace!("Buffering {:?} while waiting for status {}", record.op, id);
                        self.state().pending.push_back(record);
                    } else {
                        trace!("Skipping {:?} while waiting for status {}", record.op, id);
                    }
                }
                Ok(Ok(None)) => {
                    self.state().connected = false;
                    break None;
                }
                Ok(Err(e)) => {
                    warn!("Channel fault while waiting for status {}: {}", id, e);
                    break None;
                }
                Err(_) => {
                    warn!("Timed out waiting for status {}", id);
                    break None;
                }
            }
        };
        self.state().waiters.remove(&id);
        outcome
    }

    async fn write(&self, message: &RequestMessage) -> Result<(), TransportError> {
        let line = message.to_line()?;
        let mut writer = self.inner.writer.lock().await;
        let writer = writer.as_mut().ok_or(TransportError::ChannelClosed)?;
        trace!("-> {}", line);
        writer.write_line(&line).await
    }

    async fn close(&self) {
        if let Some(mut writer) = self.inner.writer.lock().await.take() {
            let _ = writer.close().await;
        }
        self.state().connected = false;
    }

    fn record_failure(&self, failure: StreamFailure) {
        self.state().failure = Some(failure);
    }

    /// Track connection identity, liveness and clocks from an inbound record.
    ///
    /// Status records with a pending waiter are handed to it.
    fn observe(&self, record: &ChangeRecord) {
        let mut state = self.state();
        match record.op {
            Operation::Connection => {
                info!("Connection id {:?}", record.connection_id);
                state.connection_id = record.connection_id.clone();
                state.connected = true;
            }
            Operation::Status => {
                if record.connection_closed == Some(true) {
                    state.connected = false;
                }
                let waiter = record.id.and_then(|id| state.waiters.remove(&id));
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(record.clone());
                    }
                    None => {
                        if let Some(failure) = status_failure(record) {
                            warn!("Unsolicited failure status: {}", failure);
                            state.failure = Some(failure);
                        }
                    }
                }
            }
            Operation::MarketChange | Operation::OrderChange => {
                if let Some(id) = record.id {
                    let clocks = state.clocks.entry(id).or_default();
                    if record.initial_clk.is_some() {
                        clocks.initial_clk = record.initial_clk.clone();
                    }
                    if record.clk.is_some() {
                        clocks.clk = record.clk.clone();
                    }
                }
            }
        }
    }

    /// Drain the connection as a stream of decoded records.
    ///
    /// Buffered change records come first. If a status drain holds the
    /// channel, the stream waits for it before reading.
    ///
    /// Single consumer: a second call while the first stream is alive yields
    /// an empty stream. Cancelling `cancel` ends the stream and closes the
    /// channel; it is not reported as a failure.
    pub fn changes(&self, cancel: CancellationToken) -> RecordStream {
        {
            let mut state = self.state();
            if state.reader_active {
                warn!("Record stream already has a consumer");
                return Box::pin(stream::empty());
            }
            state.reader_active = true;
        }
        let reading = Reading {
            subscription: self.clone(),
            reader: None,
            cancel,
        };

        Box::pin(stream::unfold(reading, |mut reading| async move {
            loop {
                if reading.cancel.is_cancelled() {
                    info!("Stream cancelled, closing channel");
                    reading.subscription.close().await;
                    return None;
                }
                let buffered = reading.subscription.state().pending.pop_front();
                if let Some(record) = buffered {
                    return Some((record, reading));
                }

                if reading.reader.is_none() {
                    let taken = tokio::select! {
                        biased;
                        _ = reading.cancel.cancelled() => continue,
                        mut guard = reading.subscription.inner.reader.lock() => guard.take(),
                    };
                    if taken.is_none() {
                        warn!("No reader available; channel closed");
                        return None;
                    }
                    reading.reader = taken;
                    continue;
                }
                let Some(reader) = reading.reader.as_mut() else {
                    return None;
                };

                let next = tokio::select! {
                    biased;
                    _ = reading.cancel.cancelled() => continue,
                    next = reader.read_record() => next,
                };

                return match next {
                    Ok(Some(record)) => {
                        reading.subscription.observe(&record);
                        Some((record, reading))
                    }
                    Ok(None) => {
                        info!("Stream ended by venue");
                        reading.subscription.state().connected = false;
                        None
                    }
                    Err(e) => {
                        warn!("Stream read failed: {}", e);
                        reading.subscription.state().connected = false;
                        None
                    }
                };
            }
        }))
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().authenticated
    }

    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    pub fn connection_id(&self) -> Option<String> {
        self.state().connection_id.clone()
    }

    /// Last recorded failure, cleared by the next authentication attempt
    pub fn failure(&self) -> Option<StreamFailure> {
        self.state().failure.clone()
    }

    pub fn last_request_id(&self) -> u32 {
        self.state().next_id
    }

    /// Clocks last seen for a subscription id
    pub fn clocks(&self, id: u32) -> Option<Clocks> {
        self.state().clocks.get(&id).cloned()
    }

    pub fn is_reader_active(&self) -> bool {
        self.state().reader_active
    }

    pub fn config(&self) -> &StreamConfig {
        &self.inner.config
    }
}

/// State carried by the record stream; clears the reader-active flag when dropped
struct Reading {
    subscription: Subscription,
    /// Taken from the subscription on first read
    reader: Option<Box<dyn LineReader>>,
    cancel: CancellationToken,
}

impl Drop for Reading {
    fn drop(&mut self) {
        let mut state = self.subscription.state();
        state.reader_active = false;
        // pending requests see their sender dropped
        state.waiters.clear();
    }
}
