//! Opaque identifiers for orders and symbols.

use std::fmt;
use std::sync::Arc;

/// Opaque 64-bit order identifier. `0` and `u64::MAX` are reserved as
/// invalid values and never assigned to live orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderId(pub u64);

impl OrderId {
    pub const INVALID: OrderId = OrderId(u64::MAX);

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0 && self.0 != u64::MAX
    }

    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        OrderId::INVALID
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            f.write_str("INVALID")
        }
    }
}

/// Interned symbol name. Cloning shares the underlying allocation, so the
/// id is cheap to carry on every market-data entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TickerId(Arc<str>);

impl TickerId {
    pub fn new(symbol: &str) -> Self {
        TickerId(Arc::from(symbol))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for TickerId {
    fn default() -> Self {
        TickerId(Arc::from(""))
    }
}

impl From<&str> for TickerId {
    fn from(s: &str) -> Self {
        TickerId::new(s)
    }
}

impl fmt::Display for TickerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
