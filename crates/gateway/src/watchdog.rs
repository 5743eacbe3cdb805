//! Idle watchdog over a record stream
//!
//! Passes records through unchanged while a background task watches the gap
//! since the last one. When the gap exceeds `stall_multiplier × heartbeat`
//! the stall callback fires, once. The heartbeat is the first `heartbeatMs`
//! the venue sends on the connection, else the configured default.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use exstream_core::ChangeRecord;
use futures_util::{Stream, StreamExt, stream};
use log::{debug, warn};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::WatchdogConfig;
use crate::subscription::RecordStream;

/// Watches inter-record gaps against the heartbeat interval
#[derive(Debug, Clone)]
pub struct IdleWatchdog {
    default_heartbeat: Duration,
    stall_multiplier: f64,
    poll_interval: Duration,
}

/// Shared between the pass-through stream and the poll task
struct Liveness {
    last_seen: Mutex<Instant>,
    /// 0 until the venue announces one
    heartbeat_ms: AtomicU64,
}

impl Liveness {
    fn touch(&self, record: &ChangeRecord) {
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
        if let Some(hb) = record.heartbeat_ms.filter(|hb| *hb > 0) {
            let _ = self
                .heartbeat_ms
                .compare_exchange(0, hb, Ordering::Relaxed, Ordering::Relaxed);
        }
    }

    fn since_last(&self) -> Duration {
        self.last_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }
}

impl IdleWatchdog {
    pub fn new(
        default_heartbeat: Duration,
        stall_multiplier: f64,
        poll_interval: Duration,
    ) -> Self {
        Self {
            default_heartbeat,
            stall_multiplier,
            poll_interval,
        }
    }

    pub fn from_config(config: &WatchdogConfig) -> Self {
        Self::new(
            config.default_heartbeat(),
            config.stall_multiplier,
            config.poll_interval(),
        )
    }

    /// Silence tolerated for a given heartbeat
    pub fn threshold(&self, heartbeat: Duration) -> Duration {
        heartbeat.mul_f64(self.stall_multiplier)
    }

    /// Decorate `source`, calling `on_stall` at most once if it goes quiet.
    ///
    /// The poll task stops when `cancel` fires or the returned stream is
    /// dropped or exhausted; it never fires after that.
    pub fn watch<S, F>(&self, source: S, cancel: CancellationToken, on_stall: F) -> RecordStream
    where
        S: Stream<Item = ChangeRecord> + Send + Unpin + 'static,
        F: FnOnce() + Send + 'static,
    {
        let liveness = Arc::new(Liveness {
            last_seen: Mutex::new(Instant::now()),
            heartbeat_ms: AtomicU64::new(0),
        });
        let token = cancel.child_token();

        tokio::spawn(poll(
            self.clone(),
            Arc::clone(&liveness),
            token.clone(),
            on_stall,
        ));

        let guard = token.drop_guard();
        Box::pin(stream::unfold(
            (source, liveness, guard),
            |(mut source, liveness, guard)| async move {
                let record = source.next().await?;
                liveness.touch(&record);
                Some((record, (source, liveness, guard)))
            },
        ))
    }
}

async fn poll<F>(
    watchdog: IdleWatchdog,
    liveness: Arc<Liveness>,
    token: CancellationToken,
    on_stall: F,
) where
    F: FnOnce(),
{
    let mut ticker = tokio::time::interval(watchdog.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Watchdog stopped");
                return;
            }
            _ = ticker.tick() => {}
        }

        let heartbeat = match liveness.heartbeat_ms.load(Ordering::Relaxed) {
            0 => watchdog.default_heartbeat,
            ms => Duration::from_millis(ms),
        };
        let threshold = watchdog.threshold(heartbeat);
        let silent = liveness.since_last();

        if silent > threshold && !token.is_cancelled() {
            warn!(
                "Stream idle for {:?} (heartbeat {:?}, threshold {:?})",
                silent, heartbeat, threshold
            );
            on_stall();
            return;
        }
    }
}
