//! Side-level reserved-quantity accounting.
//!
//! Tracks quantity committed to the exchange (live plus pending orders)
//! per side, in raw quantity units. Every slot transition that changes a
//! committed quantity adjusts this tracker in the same step; the risk
//! gate reads the net signed value as open exposure.

use crate::types::{SIDE_COUNT, Side};

#[derive(Debug, Default, Clone, Copy)]
pub struct ReservedPositionTracker {
    per_side: [i64; SIDE_COUNT],
}

impl ReservedPositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add_reserved(&mut self, side: Side, qty_raw: i64) {
        if side.is_tradable() {
            self.per_side[side.index()] += qty_raw;
        }
    }

    #[inline]
    pub fn remove_reserved(&mut self, side: Side, qty_raw: i64) {
        if side.is_tradable() {
            self.per_side[side.index()] -= qty_raw;
        }
    }

    /// A partial fill releases exactly the filled quantity.
    #[inline]
    pub fn remove_partial_fill(&mut self, side: Side, filled_raw: i64) {
        self.remove_reserved(side, filled_raw);
    }

    /// Reserved quantity of one side, in raw units.
    #[inline]
    pub fn reserved_for(&self, side: Side) -> i64 {
        self.per_side[side.index()]
    }

    /// Net signed reserve: buys positive, sells negative.
    #[inline]
    pub fn net_reserved(&self) -> i64 {
        self.per_side[Side::Buy.index()] - self.per_side[Side::Sell.index()]
    }

    pub fn reset(&mut self) {
        self.per_side = [0; SIDE_COUNT];
    }
}
