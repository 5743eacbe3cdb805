//! Price ladders
//!
//! Two shapes of ladder arrive on the stream:
//! - sparse price -> size maps (traded volume, full-depth offers, matched positions)
//! - leveled best-offer ladders, indexed by depth level
//!
//! Both use BTreeMap so iteration is price (or level) ordered.

use exstream_core::{LevelPriceSize, Price, PriceSize, Size, Timestamp, round_money};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Sparse mapping from price to cumulative size
#[derive(Debug, Clone, Default)]
pub struct PriceSizeLadder {
    /// price -> size (sorted ascending)
    sizes: BTreeMap<Price, Size>,
    /// Publish time of the last update
    last_publish_time: Option<Timestamp>,
}

impl PriceSizeLadder {
    /// Create a new empty ladder
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the size at each supplied price.
    ///
    /// Entries with a null price or size are skipped. Sizes are replaced,
    /// never added: the venue sends cumulative figures.
    pub fn update(&mut self, price_sizes: &[PriceSize], publish_time: Timestamp) {
        for (price, size) in price_sizes.iter().filter_map(PriceSize::values) {
            self.sizes.insert(price, size);
        }
        self.last_publish_time = Some(publish_time);
    }

    /// Like [`update`](Self::update), but a zero size removes the price.
    ///
    /// Used for available-to-back/lay depth where an empty level disappears.
    pub fn update_available(&mut self, price_sizes: &[PriceSize], publish_time: Timestamp) {
        for (price, size) in price_sizes.iter().filter_map(PriceSize::values) {
            if size.is_zero() {
                self.sizes.remove(&price);
            } else {
                self.sizes.insert(price, size);
            }
        }
        self.last_publish_time = Some(publish_time);
    }

    /// Record a publish time without changing any entry
    pub fn touch(&mut self, publish_time: Timestamp) {
        self.last_publish_time = Some(publish_time);
    }

    /// Size at a price, zero when absent
    pub fn size_for_price(&self, price: Price) -> Size {
        self.sizes.get(&price).copied().unwrap_or(Decimal::ZERO)
    }

    /// Sum of all sizes
    pub fn total_size(&self) -> Size {
        self.sizes.values().sum()
    }

    /// Sum over all entries of round(price * size - size, 2)
    pub fn total_return(&self) -> Decimal {
        self.sizes
            .iter()
            .map(|(price, size)| round_money(price * size - size))
            .sum()
    }

    /// Lowest price with a size
    pub fn lowest(&self) -> Option<(Price, Size)> {
        self.sizes.iter().next().map(|(p, s)| (*p, *s))
    }

    /// Highest price with a size
    pub fn highest(&self) -> Option<(Price, Size)> {
        self.sizes.iter().next_back().map(|(p, s)| (*p, *s))
    }

    /// Iterate entries in ascending price order
    pub fn iter(&self) -> impl Iterator<Item = (Price, Size)> + '_ {
        self.sizes.iter().map(|(p, s)| (*p, *s))
    }

    pub fn last_publish_time(&self) -> Option<Timestamp> {
        self.last_publish_time
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    pub fn clear(&mut self) {
        self.sizes.clear();
    }
}

/// Leveled best-offer ladder (level 0 is the best price)
#[derive(Debug, Clone, Default)]
pub struct LevelLadder {
    levels: BTreeMap<u32, (Price, Size)>,
}

impl LevelLadder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace each supplied level independently.
    ///
    /// Levels not mentioned keep their previous value. A zero size empties
    /// the level. Entries missing any component are skipped.
    pub fn update(&mut self, levels: &[LevelPriceSize]) {
        for entry in levels {
            let (Some(level), Some(price), Some(size)) = (entry.level, entry.price, entry.size)
            else {
                continue;
            };
            if size.is_zero() {
                self.levels.remove(&level);
            } else {
                self.levels.insert(level, (price, size));
            }
        }
    }

    /// Price and size at a level; (0, 0) when the level is unset
    pub fn level(&self, level: u32) -> (Price, Size) {
        self.levels
            .get(&level)
            .copied()
            .unwrap_or((Decimal::ZERO, Decimal::ZERO))
    }

    /// Price at a level, zero when unset
    pub fn price(&self, level: u32) -> Price {
        self.level(level).0
    }

    /// Size at a level, zero when unset
    pub fn size(&self, level: u32) -> Size {
        self.level(level).1
    }

    /// Best (level 0) price and size, None when unset
    pub fn best(&self) -> Option<(Price, Size)> {
        self.levels.get(&0).copied()
    }

    /// Number of populated levels
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Iterate populated levels in ascending level order
    pub fn iter(&self) -> impl Iterator<Item = (u32, Price, Size)> + '_ {
        self.levels.iter().map(|(l, (p, s))| (*l, *p, *s))
    }

    pub fn clear(&mut self) {
        self.levels.clear();
    }
}
