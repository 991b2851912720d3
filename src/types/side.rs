//! Book side of an order or market event.

use std::fmt;

/// Number of real sides used to size per-side arrays.
pub const SIDE_COUNT: usize = 2;

/// Which side of the book an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Side {
    Buy = 0,
    Sell = 1,
    #[default]
    Invalid = 2,
    /// Aggressor marker for trade prints.
    Trade = 3,
}

impl Side {
    /// Array index of a real side. `Invalid`/`Trade` map to the buy slot;
    /// callers validate before indexing.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Side::Sell => 1,
            _ => 0,
        }
    }

    /// Index of the opposing side.
    #[inline]
    pub const fn opposite_index(self) -> usize {
        1 - self.index()
    }

    /// Signed direction: +1 for buys, -1 for sells, 0 otherwise.
    #[inline]
    pub const fn sign(self) -> i64 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
            _ => 0,
        }
    }

    #[inline]
    pub const fn is_tradable(self) -> bool {
        matches!(self, Side::Buy | Side::Sell)
    }

    #[inline]
    pub const fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
            other => other,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
            Side::Trade => "TRADE",
            Side::Invalid => "INVALID",
        };
        f.write_str(s)
    }
}
