//! Time-bounded rolling aggregates
//!
//! All windows hold samples whose timestamp lies within `window` of the most
//! recent sample. Samples sharing a timestamp share a bucket. Statistics are
//! maintained incrementally as samples enter and leave.

use chrono::Duration;
use exstream_core::{Price, Size, Timestamp, round_money};
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Ordered buckets of values keyed by timestamp
#[derive(Debug, Clone)]
pub struct TimeBuffer<T> {
    window: Duration,
    /// (timestamp, values) sorted by timestamp
    buckets: VecDeque<(Timestamp, Vec<T>)>,
}

impl<T> TimeBuffer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            buckets: VecDeque::new(),
        }
    }

    /// Add a sample, evict anything older than the window, and return the
    /// evicted values.
    pub fn push(&mut self, time: Timestamp, value: T) -> Vec<T> {
        match self.buckets.binary_search_by_key(&time, |(t, _)| *t) {
            Ok(idx) => self.buckets[idx].1.push(value),
            Err(idx) => self.buckets.insert(idx, (time, vec![value])),
        }
        self.evict()
    }

    fn evict(&mut self) -> Vec<T> {
        let Some(latest) = self.latest() else {
            return Vec::new();
        };
        let cutoff = latest - self.window;

        let mut evicted = Vec::new();
        while let Some((time, _)) = self.buckets.front() {
            if *time >= cutoff {
                break;
            }
            if let Some((_, values)) = self.buckets.pop_front() {
                evicted.extend(values);
            }
        }
        evicted
    }

    /// Timestamp of the newest bucket
    pub fn latest(&self) -> Option<Timestamp> {
        self.buckets.back().map(|(t, _)| *t)
    }

    /// Timestamp of the oldest bucket
    pub fn oldest(&self) -> Option<Timestamp> {
        self.buckets.front().map(|(t, _)| *t)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of distinct timestamps held
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of samples held
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|(_, v)| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Timestamp, &T)> {
        self.buckets
            .iter()
            .flat_map(|(t, values)| values.iter().map(move |v| (*t, v)))
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}

/// Rolling total and mean of decimal samples
#[derive(Debug, Clone)]
pub struct TimeWindow {
    buffer: TimeBuffer<Decimal>,
    /// Running sum for O(1) mean
    total: Decimal,
    count: usize,
}

impl TimeWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            buffer: TimeBuffer::new(window),
            total: Decimal::ZERO,
            count: 0,
        }
    }

    /// Add a sample and return the values that fell out of the window
    pub fn update(&mut self, time: Timestamp, value: Decimal) -> Vec<Decimal> {
        self.total += value;
        self.count += 1;

        let evicted = self.buffer.push(time, value);
        for old in &evicted {
            self.total -= *old;
        }
        self.count -= evicted.len();
        evicted
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> Option<Decimal> {
        if self.count == 0 {
            return None;
        }
        Some(self.total / Decimal::from(self.count))
    }

    pub fn latest(&self) -> Option<Timestamp> {
        self.buffer.latest()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.total = Decimal::ZERO;
        self.count = 0;
    }
}

/// Rolling traded size with a size-weighted mean price
#[derive(Debug, Clone)]
pub struct PriceSizeTimeWindow {
    buffer: TimeBuffer<(Price, Size)>,
    total_size: Size,
    /// Sum of price * size
    notional: Decimal,
}

impl PriceSizeTimeWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            buffer: TimeBuffer::new(window),
            total_size: Decimal::ZERO,
            notional: Decimal::ZERO,
        }
    }

    /// Add a trade and return the trades that fell out of the window
    pub fn update(&mut self, time: Timestamp, price: Price, size: Size) -> Vec<(Price, Size)> {
        self.total_size += size;
        self.notional += price * size;

        let evicted = self.buffer.push(time, (price, size));
        for (p, s) in &evicted {
            self.total_size -= *s;
            self.notional -= *p * *s;
        }
        evicted
    }

    pub fn total_size(&self) -> Size {
        self.total_size
    }

    /// Size-weighted average price over the window
    pub fn vwap(&self) -> Option<Price> {
        if self.total_size.is_zero() {
            return None;
        }
        Some(self.notional / self.total_size)
    }

    /// Traded size per second of window span, rounded to 2 dp
    pub fn size_per_second(&self) -> Size {
        let secs = self.buffer.window().num_milliseconds();
        if secs <= 0 {
            return Decimal::ZERO;
        }
        round_money(self.total_size * Decimal::from(1000) / Decimal::from(secs))
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.total_size = Decimal::ZERO;
        self.notional = Decimal::ZERO;
    }
}
