//! Open (unmatched) orders for one selection, keyed by bet id

use exstream_core::{BetId, Side, UnmatchedOrder, round_money};
use log::trace;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::error::{CacheError, CacheResult};

/// Set of resting orders keyed by bet id
#[derive(Debug, Clone, Default)]
pub struct UnmatchedOrders {
    orders: HashMap<BetId, UnmatchedOrder>,
}

impl UnmatchedOrders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, replace or remove an order.
    ///
    /// A completed order ("EC") is removed when present and never inserted.
    /// Any other status inserts the order or fully replaces the previous
    /// entry for that bet id.
    pub fn update(&mut self, order: &UnmatchedOrder) -> CacheResult<()> {
        let bet_id = order
            .id
            .as_ref()
            .ok_or(CacheError::MissingArgument("order.id"))?;

        if order.status.is_some_and(|status| status.is_terminal()) {
            if self.orders.remove(bet_id).is_some() {
                trace!("Order {} complete, removed from open set", bet_id);
            }
            return Ok(());
        }

        self.orders.insert(bet_id.clone(), order.clone());
        Ok(())
    }

    pub fn get(&self, bet_id: &str) -> Option<&UnmatchedOrder> {
        self.orders.get(bet_id)
    }

    pub fn contains(&self, bet_id: &str) -> bool {
        self.orders.contains_key(bet_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &UnmatchedOrder> {
        self.orders.values()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn clear(&mut self) {
        self.orders.clear();
    }

    /// Worst-case exposure of all open orders.
    ///
    /// A back risks its remaining size; a lay risks round(p * sr - sr, 2).
    /// Orders without a side or price are skipped.
    pub fn liability(&self) -> Decimal {
        self.orders.values().map(order_liability).sum()
    }
}

/// Remaining size, falling back to the original size
fn remaining(order: &UnmatchedOrder) -> Option<Decimal> {
    order.sr.or(order.s)
}

fn order_liability(order: &UnmatchedOrder) -> Decimal {
    match (order.side, remaining(order)) {
        (Some(Side::Back), Some(size)) => round_money(size),
        (Some(Side::Lay), Some(size)) => match order.p {
            Some(price) => round_money(price * size - size),
            None => Decimal::ZERO,
        },
        _ => Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exstream_core::OrderStatus;
    use rust_decimal_macros::dec;

    #[test]
    fn test_missing_bet_id_is_rejected() {
        let mut orders = UnmatchedOrders::new();
        let result = orders.update(&UnmatchedOrder::default());

        assert_eq!(result, Err(CacheError::MissingArgument("order.id")));
        assert!(orders.is_empty());
    }

    #[test]
    fn test_insert_then_replace() {
        let mut orders = UnmatchedOrders::new();
        orders
            .update(&UnmatchedOrder::new(
                "b1",
                Side::Back,
                dec!(3.0),
                dec!(10),
                OrderStatus::Executable,
            ))
            .unwrap();
        orders
            .update(&UnmatchedOrder::new(
                "b1",
                Side::Lay,
                dec!(2.5),
                dec!(4),
                OrderStatus::Executable,
            ))
            .unwrap();

        assert_eq!(orders.len(), 1);
        let order = orders.get("b1").unwrap();
        assert_eq!(order.side, Some(Side::Lay));
        assert_eq!(order.sr, Some(dec!(4)));
    }

    #[test]
    fn test_execution_complete_removes() {
        let mut orders = UnmatchedOrders::new();
        orders
            .update(&UnmatchedOrder::new(
                "b1",
                Side::Back,
                dec!(3.0),
                dec!(10),
                OrderStatus::Executable,
            ))
            .unwrap();
        orders
            .update(&UnmatchedOrder::new(
                "b1",
                Side::Back,
                dec!(3.0),
                dec!(0),
                OrderStatus::ExecutionComplete,
            ))
            .unwrap();

        assert!(!orders.contains("b1"));
    }

    #[test]
    fn test_execution_complete_never_inserted() {
        let mut orders = UnmatchedOrders::new();
        orders
            .update(&UnmatchedOrder::new(
                "b9",
                Side::Lay,
                dec!(3.0),
                dec!(5),
                OrderStatus::ExecutionComplete,
            ))
            .unwrap();

        assert!(orders.is_empty());
    }

    #[test]
    fn test_liability() {
        let mut orders = UnmatchedOrders::new();
        orders
            .update(&UnmatchedOrder::new(
                "b1",
                Side::Back,
                dec!(3.0),
                dec!(10),
                OrderStatus::Executable,
            ))
            .unwrap();
        orders
            .update(&UnmatchedOrder::new(
                "b2",
                Side::Lay,
                dec!(2.5),
                dec!(4),
                OrderStatus::Executable,
            ))
            .unwrap();

        // back 10 + lay (2.5*4 - 4 = 6)
        assert_eq!(orders.liability(), dec!(16.00));
    }
}
