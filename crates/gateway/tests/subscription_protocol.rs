//! Integration test: Subscription <-> scripted venue
//!
//! The venue side of a MemoryChannel pair plays the exchange: it reads the
//! client's control messages and answers with status and change records.

use exstream_core::{
    ChangeRecord, ErrorCode, MarketChange, MarketDataFilter, MarketFilter, OrderFilter,
    PriceField,
};
use exstream_gateway::{
    MemoryChannel, RequestMessage, StreamConfig, StreamFailure, Subscription, TransportError,
    VenuePeer,
};
use futures_util::StreamExt;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

fn config() -> StreamConfig {
    StreamConfig {
        status_timeout_ms: 2_000,
        max_retries: 2,
        heartbeat_ms: Some(500),
        ..StreamConfig::default().with_app_key("app-key")
    }
}

fn market_filter() -> Option<MarketFilter> {
    Some(MarketFilter::markets(["1.234"]))
}

fn data_filter() -> Option<MarketDataFilter> {
    let fields = vec![PriceField::ExBestOffers, PriceField::ExTraded];
    Some(MarketDataFilter::new(fields).with_ladder_levels(3))
}

async fn expect_request(peer: &mut VenuePeer) -> RequestMessage {
    peer.recv_request()
        .await
        .expect("client closed")
        .expect("valid request")
}

/// Subscription authenticated over a fresh pair, venue side returned
async fn authenticated(config: StreamConfig) -> (Subscription, VenuePeer) {
    let (channel, mut peer) = MemoryChannel::pair(32);
    let sub = Subscription::new(channel, config);

    peer.send(&ChangeRecord::connection("conn-1")).await.unwrap();
    let venue = tokio::spawn(async move {
        let auth = expect_request(&mut peer).await;
        peer.send(&ChangeRecord::success(auth.id())).await.unwrap();
        peer
    });

    sub.authenticate("session-token").await.unwrap();
    let peer = venue.await.unwrap();
    assert!(sub.is_authenticated());
    (sub, peer)
}

/// Drain the subscription's records on a background task
fn spawn_consumer(
    sub: &Subscription,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<Vec<ChangeRecord>> {
    let mut records = sub.changes(cancel);
    tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(record) = records.next().await {
            seen.push(record);
        }
        seen
    })
}

#[tokio::test]
async fn test_failure_status_resends_same_message() {
    let _ = env_logger::try_init();
    let (sub, mut peer) = authenticated(config()).await;
    let cancel = CancellationToken::new();
    let consumer = spawn_consumer(&sub, cancel.clone());
    assert!(sub.is_reader_active());

    let venue = tokio::spawn(async move {
        let first = expect_request(&mut peer).await;
        peer.send(&ChangeRecord::failure(first.id(), ErrorCode::TooManyRequests, "slow down"))
            .await
            .unwrap();
        let second = expect_request(&mut peer).await;
        peer.send(&ChangeRecord::success(second.id())).await.unwrap();
        (peer, first, second)
    });

    sub.subscribe(market_filter(), data_filter()).await.unwrap();
    let (_peer, first, second) = venue.await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.id(), 2);
    assert_eq!(sub.failure(), None);

    cancel.cancel();
    let seen = consumer.await.unwrap();
    assert_eq!(seen.len(), 2);
    assert!(!sub.is_reader_active());
}

#[tokio::test]
async fn test_retries_exhausted_records_failure() {
    let (sub, mut peer) = authenticated(config()).await;
    let cancel = CancellationToken::new();
    let _consumer = spawn_consumer(&sub, cancel.clone());

    let venue = tokio::spawn(async move {
        let mut sends = 0;
        // initial send + max_retries
        for _ in 0..3 {
            let request = expect_request(&mut peer).await;
            sends += 1;
            peer.send(&ChangeRecord::failure(
                request.id(),
                ErrorCode::SubscriptionLimitExceeded,
                "limit",
            ))
            .await
            .unwrap();
        }
        (peer, sends)
    });

    sub.subscribe_to_orders(Some(OrderFilter::default()))
        .await
        .unwrap();
    let (_peer, sends) = venue.await.unwrap();

    assert_eq!(sends, 3);
    assert_eq!(
        sub.failure(),
        Some(StreamFailure::Rejected {
            id: 2,
            code: ErrorCode::SubscriptionLimitExceeded,
            message: "limit".into(),
        })
    );
    cancel.cancel();
}

#[tokio::test]
async fn test_status_timeout_with_active_reader() {
    let config = StreamConfig {
        status_timeout_ms: 50,
        ..config()
    };
    let (sub, _peer) = authenticated(config).await;
    let cancel = CancellationToken::new();
    let _consumer = spawn_consumer(&sub, cancel.clone());

    let result = sub.subscribe(market_filter(), data_filter()).await;

    assert!(matches!(result, Err(TransportError::Timeout)));
    cancel.cancel();
}

#[tokio::test]
async fn test_without_reader_subscribe_is_fire_and_forget() {
    let (sub, mut peer) = authenticated(config()).await;

    sub.subscribe(market_filter(), data_filter()).await.unwrap();

    let RequestMessage::MarketSubscription(request) = expect_request(&mut peer).await else {
        panic!("expected market subscription");
    };
    assert_eq!(request.id, 2);
    assert_eq!(request.heartbeat_ms, Some(500));
    assert_eq!(request.market_data_filter.ladder_levels, Some(3));
    assert!(request.clk.is_none());
}

#[tokio::test]
async fn test_reconnect_resubscribes_with_clocks() {
    let _ = env_logger::try_init();
    let (channel, mut peer) = MemoryChannel::pair(32);
    let sub = Subscription::new(channel, config());
    sub.set_session("session-token");

    let venue = tokio::spawn(async move {
        let auth = expect_request(&mut peer).await;
        peer.send(&ChangeRecord::success(auth.id())).await.unwrap();

        let subscribe = expect_request(&mut peer).await;
        let id = subscribe.id();
        peer.send(&ChangeRecord::success(id)).await.unwrap();

        let mut image = MarketChange::new("1.234");
        image.img = true;
        image.tv = Some(dec!(10));
        let mut first = ChangeRecord::market_change(id, 1_700_000_000_000, vec![image]);
        first.initial_clk = Some("init-1".into());
        first.clk = Some("clk-1".into());
        peer.send(&first).await.unwrap();

        let mut delta = ChangeRecord::market_change(id, 1_700_000_001_000, Vec::new());
        delta.clk = Some("clk-2".into());
        peer.send(&delta).await.unwrap();

        peer.close();
        peer
    });

    sub.subscribe(market_filter(), data_filter()).await.unwrap();
    let _old_peer = venue.await.unwrap();

    let seen = spawn_consumer(&sub, CancellationToken::new()).await.unwrap();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[1].mc[0].tv, Some(dec!(10)));
    assert!(!sub.is_connected());

    let clocks = sub.clocks(2).unwrap();
    assert_eq!(clocks.initial_clk.as_deref(), Some("init-1"));
    assert_eq!(clocks.clk.as_deref(), Some("clk-2"));

    // second connection
    let (channel, mut peer) = MemoryChannel::pair(32);
    peer.send(&ChangeRecord::connection("conn-2")).await.unwrap();
    let venue = tokio::spawn(async move {
        let auth = expect_request(&mut peer).await;
        peer.send(&ChangeRecord::success(auth.id())).await.unwrap();
        let resubscribe = expect_request(&mut peer).await;
        (peer, auth, resubscribe)
    });

    sub.reconnect(channel).await.unwrap();
    let (_peer, auth, resubscribe) = venue.await.unwrap();

    assert_eq!(auth.id(), 3);
    assert!(sub.is_authenticated());
    assert_eq!(sub.connection_id().as_deref(), Some("conn-2"));

    let RequestMessage::MarketSubscription(resubscribe) = resubscribe else {
        panic!("expected market resubscription");
    };
    assert_eq!(resubscribe.id, 2);
    assert_eq!(resubscribe.initial_clk.as_deref(), Some("init-1"));
    assert_eq!(resubscribe.clk.as_deref(), Some("clk-2"));
}

#[tokio::test]
async fn test_cancellation_closes_channel() {
    let (sub, mut peer) = authenticated(config()).await;
    let cancel = CancellationToken::new();
    let mut records = sub.changes(cancel.clone());

    cancel.cancel();
    assert!(records.next().await.is_none());
    drop(records);

    assert!(peer.recv_line().await.is_none());
    assert!(!sub.is_reader_active());
    assert!(!sub.is_connected());
    assert_eq!(sub.failure(), None);
}

#[tokio::test]
async fn test_connection_closed_status() {
    let (sub, peer) = authenticated(config()).await;
    let consumer = spawn_consumer(&sub, CancellationToken::new());
    assert!(sub.is_connected());

    let mut closed = ChangeRecord::failure(0, ErrorCode::MaxConnectionLimitExceeded, "too many");
    closed.id = None;
    closed.connection_closed = Some(true);
    peer.send(&closed).await.unwrap();
    drop(peer);

    let seen = consumer.await.unwrap();
    assert_eq!(seen.len(), 1);
    assert!(!sub.is_connected());
    assert_eq!(
        sub.failure().and_then(|f| f.error_code()),
        Some(ErrorCode::MaxConnectionLimitExceeded)
    );
}

#[tokio::test]
async fn test_rejected_authentication_is_not_resent() {
    let (channel, mut peer) = MemoryChannel::pair(32);
    let sub = Subscription::new(channel, config());
    let cancel = CancellationToken::new();
    let consumer = spawn_consumer(&sub, cancel.clone());
    assert!(sub.is_reader_active());

    let venue = tokio::spawn(async move {
        let auth = expect_request(&mut peer).await;
        peer.send(&ChangeRecord::failure(auth.id(), ErrorCode::NoAppKey, "no key"))
            .await
            .unwrap();
        peer
    });

    sub.authenticate("session-token").await.unwrap();
    let mut peer = venue.await.unwrap();
    cancel.cancel();
    consumer.await.unwrap();

    // a resend would still be queued ahead of the close
    assert!(peer.recv_line().await.is_none());
    assert!(!sub.is_authenticated());
    assert_eq!(
        sub.failure(),
        Some(StreamFailure::Rejected {
            id: 1,
            code: ErrorCode::NoAppKey,
            message: "no key".into(),
        })
    );
}

#[tokio::test]
async fn test_changes_read_during_authentication_are_streamed() {
    let (channel, mut peer) = MemoryChannel::pair(32);
    let sub = Subscription::new(channel, config());

    let venue = tokio::spawn(async move {
        let auth = expect_request(&mut peer).await;
        let mut image = MarketChange::new("1.234");
        image.img = true;
        image.tv = Some(dec!(10));
        let image = ChangeRecord::market_change(7, 1_700_000_000_000, vec![image]);
        peer.send(&image).await.unwrap();
        peer.send(&ChangeRecord::success(auth.id())).await.unwrap();
        peer.close();
        peer
    });

    sub.authenticate("session-token").await.unwrap();
    let _peer = venue.await.unwrap();
    assert!(sub.is_authenticated());

    let seen = spawn_consumer(&sub, CancellationToken::new()).await.unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].id, Some(7));
    assert_eq!(seen[0].mc[0].tv, Some(dec!(10)));
}

#[tokio::test]
async fn test_consumer_started_during_authentication_gets_records() {
    let _ = env_logger::try_init();
    let (channel, mut peer) = MemoryChannel::pair(32);
    let sub = Subscription::new(channel, config());

    let authenticating = tokio::spawn({
        let sub = sub.clone();
        async move { sub.authenticate("session-token").await }
    });
    let auth = expect_request(&mut peer).await;

    // the channel may still be held by the authentication drain
    let consumer = spawn_consumer(&sub, CancellationToken::new());
    let mut image = MarketChange::new("1.234");
    image.tv = Some(dec!(4));
    peer.send(&ChangeRecord::market_change(2, 1_700_000_000_000, vec![image]))
        .await
        .unwrap();
    peer.send(&ChangeRecord::success(auth.id())).await.unwrap();

    authenticating.await.unwrap().unwrap();
    assert!(sub.is_authenticated());
    peer.close();

    let seen = consumer.await.unwrap();
    assert!(!seen.is_empty());
    assert_eq!(seen[0].mc[0].tv, Some(dec!(4)));
}

#[tokio::test]
async fn test_second_consumer_gets_empty_stream() {
    let (sub, _peer) = authenticated(config()).await;
    let cancel = CancellationToken::new();
    let _first = sub.changes(cancel.clone());

    let mut second = sub.changes(cancel.clone());

    assert!(second.next().await.is_none());
    assert!(sub.is_reader_active());
    cancel.cancel();
}
