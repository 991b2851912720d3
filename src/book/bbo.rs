//! Best bid and offer snapshot.

use std::fmt;

use crate::types::{Price, Qty};

/// Top of book. All fields are `INVALID` until the corresponding side has
/// an active level. `Copy`, so it can be published whole through an
/// atomic cell and read by other threads as a by-value snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bbo {
    pub bid_price: Price,
    pub ask_price: Price,
    pub bid_qty: Qty,
    pub ask_qty: Qty,
}

impl Bbo {
    /// Both sides present.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.bid_price.is_valid()
            && self.ask_price.is_valid()
            && self.bid_qty.is_valid()
            && self.ask_qty.is_valid()
    }

    /// Midpoint of a complete BBO, in raw price units.
    #[inline]
    pub fn mid_raw(&self) -> Option<i64> {
        if self.bid_price.is_valid() && self.ask_price.is_valid() {
            Some((self.bid_price.raw() + self.ask_price.raw()) / 2)
        } else {
            None
        }
    }

    /// Absolute spread in raw price units; negative for a crossed book.
    #[inline]
    pub fn spread_raw(&self) -> Option<i64> {
        if self.bid_price.is_valid() && self.ask_price.is_valid() {
            Some(self.ask_price.raw() - self.bid_price.raw())
        } else {
            None
        }
    }
}

impl fmt::Display for Bbo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BBO{{{}@{}X{}@{}}}",
            self.bid_qty, self.bid_price, self.ask_qty, self.ask_price
        )
    }
}
