//! Pooled market-data event model.
//!
//! The decoder allocates one [`MarketData`] per book-side level out of a
//! fixed-capacity pool, batches them into a [`MarketUpdateData`] and hands
//! the batch across the book-update ring. The trade engine applies the
//! batch to the order book and returns every allocation to its pool.

use std::fmt;

use super::ids::{OrderId, TickerId};
use super::side::Side;
use super::{Price, Qty};

/// Kind of a single book-side event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarketUpdateType {
    Add,
    Modify,
    Cancel,
    Trade,
    BookTicker,
    /// Resets both sides of the book before a snapshot is applied.
    SnapshotClear,
    #[default]
    Invalid,
}

impl fmt::Display for MarketUpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MarketUpdateType::Add => "ADD",
            MarketUpdateType::Modify => "MODIFY",
            MarketUpdateType::Cancel => "CANCEL",
            MarketUpdateType::Trade => "TRADE",
            MarketUpdateType::BookTicker => "BOOK_TICKER",
            MarketUpdateType::SnapshotClear => "SNAPSHOT_CLEAR",
            MarketUpdateType::Invalid => "INVALID",
        };
        f.write_str(s)
    }
}

/// What a whole batch represents on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchKind {
    /// Incremental depth update.
    Market,
    Trade,
    BookTicker,
    Snapshot,
    #[default]
    None,
}

/// A single book-side event, pool-allocated by the decoder and freed by
/// the trade engine after it has been applied.
#[derive(Debug, Clone, Default)]
pub struct MarketData {
    pub update: MarketUpdateType,
    pub order_id: OrderId,
    pub ticker: TickerId,
    pub side: Side,
    pub price: Price,
    pub qty: Qty,
}

impl MarketData {
    pub fn new(
        update: MarketUpdateType,
        order_id: OrderId,
        ticker: TickerId,
        side: Side,
        price: Price,
        qty: Qty,
    ) -> Self {
        Self {
            update,
            order_id,
            ticker,
            side,
            price,
            qty,
        }
    }
}

impl fmt::Display for MarketData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MarketData{{{} {} {} {}@{}}}",
            self.update, self.ticker, self.side, self.qty, self.price
        )
    }
}

/// An atomic batch of [`MarketData`] for one wire message.
///
/// Depth batches carry the update-id bounds used for Binance-style gap
/// detection: a snapshot with `last_update_id = U` is consistent with a
/// depth update iff `first_update_id <= U + 1 <= last_update_id` and the
/// update's `prev_end_update_id` equals the previous update's
/// `last_update_id`.
#[derive(Debug, Default)]
pub struct MarketUpdateData {
    pub first_update_id: u64,
    pub last_update_id: u64,
    pub prev_end_update_id: u64,
    pub kind: BatchKind,
    pub entries: Vec<Box<MarketData>>,
}

impl MarketUpdateData {
    /// Reset in place so the allocation (including the entries vector's
    /// backing storage) can be reused by the pool.
    pub fn reset(&mut self) {
        self.first_update_id = 0;
        self.last_update_id = 0;
        self.prev_end_update_id = 0;
        self.kind = BatchKind::None;
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for MarketUpdateData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MarketUpdateData{{kind:{:?} U:{} u:{} pu:{} entries:{}}}",
            self.kind,
            self.first_update_id,
            self.last_update_id,
            self.prev_end_update_id,
            self.entries.len()
        )
    }
}
