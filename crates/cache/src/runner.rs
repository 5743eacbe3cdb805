//! Per-selection state: prices, traded volume and the trader's position

use chrono::Duration;
use exstream_core::{
    OrderRunnerChange, Price, PriceSize, RunnerChange, RunnerDefinition, RunnerStatus,
    SelectionId, Size, Timestamp, round_money,
};
use log::{trace, warn};
use rust_decimal::Decimal;

use crate::ladder::{LevelLadder, PriceSizeLadder};
use crate::unmatched::UnmatchedOrders;
use crate::window::{PriceSizeTimeWindow, TimeWindow};

/// Cached view of one runner within a market
#[derive(Debug, Clone)]
pub struct RunnerCache {
    selection_id: SelectionId,
    handicap: Option<Decimal>,
    status: Option<RunnerStatus>,
    last_publish_time: Option<Timestamp>,

    // Market data
    last_traded_price: Option<Price>,
    total_matched: Size,
    adjustment_factor: Decimal,
    best_to_back: LevelLadder,
    best_to_lay: LevelLadder,
    available_to_back: PriceSizeLadder,
    available_to_lay: PriceSizeLadder,
    traded: PriceSizeLadder,
    recent_trades: PriceSizeTimeWindow,
    recent_prices: TimeWindow,

    // Position
    matched_backs: PriceSizeLadder,
    matched_lays: PriceSizeLadder,
    if_win: Decimal,
    if_lose: Decimal,
    profit: Decimal,
    unmatched_liability: Decimal,
    unmatched: UnmatchedOrders,
}

impl RunnerCache {
    /// Create an empty runner cache. `window` bounds the recent trade/price windows.
    pub fn new(selection_id: SelectionId, window: Duration) -> Self {
        Self {
            selection_id,
            handicap: None,
            status: None,
            last_publish_time: None,
            last_traded_price: None,
            total_matched: Decimal::ZERO,
            adjustment_factor: Decimal::ZERO,
            best_to_back: LevelLadder::new(),
            best_to_lay: LevelLadder::new(),
            available_to_back: PriceSizeLadder::new(),
            available_to_lay: PriceSizeLadder::new(),
            traded: PriceSizeLadder::new(),
            recent_trades: PriceSizeTimeWindow::new(window),
            recent_prices: TimeWindow::new(window),
            matched_backs: PriceSizeLadder::new(),
            matched_lays: PriceSizeLadder::new(),
            if_win: Decimal::ZERO,
            if_lose: Decimal::ZERO,
            profit: Decimal::ZERO,
            unmatched_liability: Decimal::ZERO,
            unmatched: UnmatchedOrders::new(),
        }
    }

    /// Adopt the adjustment factor and status from a definition entry.
    ///
    /// An absent factor resolves to zero rather than keeping a stale value.
    pub fn apply_definition(&mut self, definition: &RunnerDefinition) {
        if definition.id != Some(self.selection_id) {
            return;
        }
        self.adjustment_factor = definition.adjustment_factor.unwrap_or(Decimal::ZERO);
        self.status = definition.status;
    }

    /// Fold a market-data change into this runner
    pub fn apply_change(&mut self, change: &RunnerChange, publish_time: Timestamp) {
        if change.id != Some(self.selection_id) {
            return;
        }

        self.last_publish_time = Some(publish_time);
        self.traded.touch(publish_time);

        if change.hc.is_some() {
            self.handicap = change.hc;
        }

        if let Some(ltp) = change.ltp {
            self.last_traded_price = Some(ltp);
            self.recent_prices.update(publish_time, ltp);
        }

        // 0 means unchanged
        if let Some(tv) = change.tv.filter(|tv| !tv.is_zero()) {
            self.total_matched = tv;
        }

        if let Some(batb) = &change.batb {
            self.best_to_back.update(batb);
        }
        if let Some(batl) = &change.batl {
            self.best_to_lay.update(batl);
        }
        if let Some(atb) = &change.atb {
            self.available_to_back.update_available(atb, publish_time);
        }
        if let Some(atl) = &change.atl {
            self.available_to_lay.update_available(atl, publish_time);
        }

        if let Some(trd) = &change.trd {
            self.record_trades(trd, publish_time);
        }
    }

    /// Merge the cumulative traded ladder, feeding positive deltas into the
    /// recent-trade window. The first image only seeds the ladder.
    fn record_trades(&mut self, trd: &[PriceSize], publish_time: Timestamp) {
        let seeded = !self.traded.is_empty();
        if seeded {
            for (price, size) in trd.iter().filter_map(PriceSize::values) {
                let delta = size - self.traded.size_for_price(price);
                if delta > Decimal::ZERO {
                    self.recent_trades.update(publish_time, price, delta);
                }
            }
        }
        self.traded.update(trd, publish_time);
    }

    /// Fold an order change into this runner's position
    pub fn apply_order(&mut self, change: &OrderRunnerChange, publish_time: Timestamp) {
        if change.id != Some(self.selection_id) {
            return;
        }

        if change.full_image {
            self.reset_orders();
        }

        if let Some(mb) = &change.mb {
            self.matched_backs.update(mb, publish_time);
        }
        if let Some(ml) = &change.ml {
            self.matched_lays.update(ml, publish_time);
        }
        self.recompute_matched();

        for order in &change.uo {
            if let Err(e) = self.unmatched.update(order) {
                warn!("Runner {}: skipping unmatched order: {}", self.selection_id, e);
            }
        }
        self.unmatched_liability = round_money(self.unmatched.liability());

        trace!(
            "Runner {} position: ifWin={} ifLose={} unmatched={}",
            self.selection_id, self.if_win, self.if_lose, self.unmatched_liability
        );
    }

    /// Recompute win/lose outcomes from the full matched lists
    fn recompute_matched(&mut self) {
        let mut if_win = Decimal::ZERO;
        let mut if_lose = Decimal::ZERO;

        for (price, size) in self.matched_backs.iter() {
            if_win += round_money(price * size - size);
            if_lose -= round_money(size);
        }
        for (price, size) in self.matched_lays.iter() {
            if_win -= round_money(price * size - size);
            if_lose += round_money(size);
        }

        self.if_win = if_win;
        self.if_lose = if_lose;
        self.profit = if_win.min(if_lose);
    }

    /// Drop all order state, ready for a full order image
    pub fn reset_orders(&mut self) {
        self.matched_backs.clear();
        self.matched_lays.clear();
        self.unmatched.clear();
        self.if_win = Decimal::ZERO;
        self.if_lose = Decimal::ZERO;
        self.profit = Decimal::ZERO;
        self.unmatched_liability = Decimal::ZERO;
    }

    pub fn selection_id(&self) -> SelectionId {
        self.selection_id
    }

    pub fn handicap(&self) -> Option<Decimal> {
        self.handicap
    }

    pub fn status(&self) -> Option<RunnerStatus> {
        self.status
    }

    pub fn last_publish_time(&self) -> Option<Timestamp> {
        self.last_publish_time
    }

    pub fn last_traded_price(&self) -> Option<Price> {
        self.last_traded_price
    }

    pub fn total_matched(&self) -> Size {
        self.total_matched
    }

    pub fn adjustment_factor(&self) -> Decimal {
        self.adjustment_factor
    }

    pub fn best_to_back(&self) -> &LevelLadder {
        &self.best_to_back
    }

    pub fn best_to_lay(&self) -> &LevelLadder {
        &self.best_to_lay
    }

    pub fn available_to_back(&self) -> &PriceSizeLadder {
        &self.available_to_back
    }

    pub fn available_to_lay(&self) -> &PriceSizeLadder {
        &self.available_to_lay
    }

    pub fn traded(&self) -> &PriceSizeLadder {
        &self.traded
    }

    pub fn recent_trades(&self) -> &PriceSizeTimeWindow {
        &self.recent_trades
    }

    pub fn recent_prices(&self) -> &TimeWindow {
        &self.recent_prices
    }

    pub fn matched_backs(&self) -> &PriceSizeLadder {
        &self.matched_backs
    }

    pub fn matched_lays(&self) -> &PriceSizeLadder {
        &self.matched_lays
    }

    /// Outcome if this runner wins
    pub fn if_win(&self) -> Decimal {
        self.if_win
    }

    /// Outcome if this runner loses
    pub fn if_lose(&self) -> Decimal {
        self.if_lose
    }

    /// Worst-case matched outcome: the lower of `if_win` and `if_lose`.
    ///
    /// Negative when the matched position loses money on some result.
    pub fn profit(&self) -> Decimal {
        self.profit
    }

    pub fn unmatched_liability(&self) -> Decimal {
        self.unmatched_liability
    }

    pub fn unmatched(&self) -> &UnmatchedOrders {
        &self.unmatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use exstream_core::{LevelPriceSize, OrderStatus, Side, UnmatchedOrder};
    use rust_decimal_macros::dec;

    fn at(secs: i64) -> Timestamp {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn runner() -> RunnerCache {
        RunnerCache::new(11, Duration::seconds(60))
    }

    #[test]
    fn test_mismatched_selection_ignored() {
        let mut r = runner();
        let mut change = RunnerChange::new(12);
        change.ltp = Some(dec!(3.0));
        r.apply_change(&change, at(0));

        assert_eq!(r.last_traded_price(), None);
        assert_eq!(r.last_publish_time(), None);
    }

    #[test]
    fn test_sticky_fields() {
        let mut r = runner();
        let mut change = RunnerChange::new(11);
        change.ltp = Some(dec!(3.0));
        change.tv = Some(dec!(100));
        r.apply_change(&change, at(0));

        let mut zero = RunnerChange::new(11);
        zero.tv = Some(dec!(0));
        r.apply_change(&zero, at(1));

        assert_eq!(r.last_traded_price(), Some(dec!(3.0)));
        assert_eq!(r.total_matched(), dec!(100));
        assert_eq!(r.last_publish_time(), Some(at(1)));
        assert_eq!(r.traded().last_publish_time(), Some(at(1)));
    }

    #[test]
    fn test_best_offer_ladders_independent() {
        let mut r = runner();
        let mut change = RunnerChange::new(11);
        change.batb = Some(vec![
            LevelPriceSize::new(0, dec!(2.0), dec!(10)),
            LevelPriceSize::new(1, dec!(1.99), dec!(5)),
        ]);
        change.batl = Some(vec![LevelPriceSize::new(0, dec!(2.02), dec!(8))]);
        r.apply_change(&change, at(0));

        let mut level_one = RunnerChange::new(11);
        level_one.batb = Some(vec![LevelPriceSize::new(1, dec!(1.98), dec!(6))]);
        r.apply_change(&level_one, at(1));

        assert_eq!(r.best_to_back().level(0), (dec!(2.0), dec!(10)));
        assert_eq!(r.best_to_back().level(1), (dec!(1.98), dec!(6)));
        assert_eq!(r.best_to_lay().level(0), (dec!(2.02), dec!(8)));
        assert_eq!(r.best_to_lay().level(1), (dec!(0), dec!(0)));
    }

    #[test]
    fn test_traded_deltas_feed_recent_window() {
        let mut r = runner();
        let mut image = RunnerChange::new(11);
        image.trd = Some(vec![PriceSize::new(dec!(2.0), dec!(50))]);
        r.apply_change(&image, at(0));
        assert!(r.recent_trades().is_empty());

        let mut delta = RunnerChange::new(11);
        delta.trd = Some(vec![
            PriceSize::new(dec!(2.0), dec!(60)),
            PriceSize::new(dec!(2.02), dec!(4)),
        ]);
        r.apply_change(&delta, at(1));

        assert_eq!(r.traded().size_for_price(dec!(2.0)), dec!(60));
        assert_eq!(r.recent_trades().total_size(), dec!(14));
    }

    #[test]
    fn test_matched_profit_and_loss() {
        let mut r = runner();
        let mut change = OrderRunnerChange::new(11);
        change.mb = Some(vec![PriceSize::new(dec!(8), dec!(2))]);
        change.ml = Some(vec![PriceSize::new(dec!(8.8), dec!(3))]);
        r.apply_order(&change, at(0));

        assert_eq!(r.if_win(), dec!(-9.4));
        assert_eq!(r.if_lose(), dec!(1));
        assert_eq!(r.profit(), dec!(-9.4));
    }

    #[test]
    fn test_matched_recomputed_not_accumulated() {
        let mut r = runner();
        let mut change = OrderRunnerChange::new(11);
        change.mb = Some(vec![PriceSize::new(dec!(8), dec!(2))]);
        r.apply_order(&change, at(0));
        r.apply_order(&change, at(1));

        assert_eq!(r.if_win(), dec!(14));
        assert_eq!(r.if_lose(), dec!(-2));
    }

    #[test]
    fn test_unmatched_liability_recomputed() {
        let mut r = runner();
        let mut change = OrderRunnerChange::new(11);
        change.uo = vec![
            UnmatchedOrder::new("b1", Side::Back, dec!(3.0), dec!(10), OrderStatus::Executable),
            UnmatchedOrder::new("b2", Side::Lay, dec!(2.5), dec!(4), OrderStatus::Executable),
        ];
        r.apply_order(&change, at(0));
        assert_eq!(r.unmatched_liability(), dec!(16));

        let mut done = OrderRunnerChange::new(11);
        done.uo = vec![UnmatchedOrder::new(
            "b1",
            Side::Back,
            dec!(3.0),
            dec!(0),
            OrderStatus::ExecutionComplete,
        )];
        r.apply_order(&done, at(1));

        assert!(!r.unmatched().contains("b1"));
        assert_eq!(r.unmatched_liability(), dec!(6));
    }

    #[test]
    fn test_full_image_rebuilds_unmatched() {
        let mut r = runner();
        let mut change = OrderRunnerChange::new(11);
        change.uo = vec![UnmatchedOrder::new(
            "b1",
            Side::Back,
            dec!(3.0),
            dec!(10),
            OrderStatus::Executable,
        )];
        r.apply_order(&change, at(0));

        let mut image = OrderRunnerChange::new(11);
        image.full_image = true;
        image.uo = vec![UnmatchedOrder::new(
            "b2",
            Side::Back,
            dec!(4.0),
            dec!(2),
            OrderStatus::Executable,
        )];
        r.apply_order(&image, at(1));

        assert!(!r.unmatched().contains("b1"));
        assert!(r.unmatched().contains("b2"));
        assert_eq!(r.unmatched_liability(), dec!(2));
    }

    #[test]
    fn test_definition_absent_factor_resolves_to_zero() {
        let mut r = runner();
        r.apply_definition(&RunnerDefinition::new(11, Some(dec!(25.5))));
        assert_eq!(r.adjustment_factor(), dec!(25.5));

        r.apply_definition(&RunnerDefinition::new(11, None));
        assert_eq!(r.adjustment_factor(), dec!(0));

        r.apply_definition(&RunnerDefinition::new(99, Some(dec!(10))));
        assert_eq!(r.adjustment_factor(), dec!(0));
    }
}
