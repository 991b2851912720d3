//! Dense bitmap-indexed market order book.
//!
//! Two parallel grids (one per side) indexed by `price_raw -
//! min_price_raw`, subdivided into lazily pooled 4096-entry buckets. A
//! per-side summary bitmap over buckets plus per-bucket bitmaps give O(1)
//! top-of-book after any update and O(bits set) level walks. The book is
//! mutated only by the market-data consumer thread; other threads observe
//! the BBO through an atomic by-value snapshot.

use std::sync::Arc;

use crossbeam::atomic::AtomicCell;

use crate::logging::LogProducer;
use crate::sync::MemoryPool;
use crate::types::{MarketData, MarketUpdateType, Price, Qty, Side, TickerId};

use super::bbo::Bbo;
use super::bucket::{Bucket, MarketLevel, mask_above, mask_below, scan_word_asc, scan_word_desc};
use super::config::{BUCKET_SIZE, BookConfig, WORD_MASK, WORD_SHIFT};

/// What applying one market-data entry did to the book. The engine uses
/// this to decide which downstream hooks run; the book itself never calls
/// into strategy code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookEvent {
    /// A level changed on the book-update path.
    BookUpdated,
    /// A trade was applied; forward through the trade hooks.
    TradeApplied,
    /// Both sides were reset by a snapshot-clear entry.
    Cleared,
    /// The entry referenced an inactive level; nothing changed.
    Ignored,
    /// The entry was invalid (price out of range, bad side).
    Rejected,
}

/// One side of the dense grid.
struct SideGrid {
    buckets: Vec<Option<Box<Bucket>>>,
    summary: Vec<u64>,
    best_idx: Option<usize>,
    pool: MemoryPool<Bucket>,
    /// Bids improve toward higher indices, asks toward lower.
    is_bid: bool,
}

/// Upper bound on buckets pre-allocated per side; `upsert` falls back to
/// a direct allocation when the pool is dry.
const BUCKET_POOL_CAPACITY: usize = 64;

impl SideGrid {
    fn new(config: &BookConfig, is_bid: bool) -> Self {
        SideGrid {
            buckets: (0..config.bucket_count).map(|_| None).collect(),
            summary: vec![0; config.summary_words],
            best_idx: None,
            pool: MemoryPool::new(config.bucket_count.min(BUCKET_POOL_CAPACITY)),
            is_bid,
        }
    }

    #[inline]
    fn improves(&self, idx: usize, best: usize) -> bool {
        if self.is_bid { idx > best } else { idx < best }
    }

    fn level(&self, idx: usize) -> Option<&MarketLevel> {
        self.buckets[idx / BUCKET_SIZE]
            .as_ref()
            .map(|b| &b.levels[idx % BUCKET_SIZE])
    }

    fn is_active(&self, idx: usize) -> bool {
        let bucket_idx = idx / BUCKET_SIZE;
        match &self.buckets[bucket_idx] {
            Some(bucket) => {
                let off = idx % BUCKET_SIZE;
                self.summary_bit(bucket_idx)
                    && bucket.bit(off)
                    && bucket.levels[off].active
                    && bucket.levels[off].qty.raw() > 0
            }
            None => false,
        }
    }

    #[inline]
    fn summary_bit(&self, bucket_idx: usize) -> bool {
        self.summary[bucket_idx >> WORD_SHIFT] & (1u64 << (bucket_idx & WORD_MASK)) != 0
    }

    #[inline]
    fn set_summary(&mut self, bucket_idx: usize) {
        self.summary[bucket_idx >> WORD_SHIFT] |= 1u64 << (bucket_idx & WORD_MASK);
    }

    #[inline]
    fn clear_summary(&mut self, bucket_idx: usize) {
        self.summary[bucket_idx >> WORD_SHIFT] &= !(1u64 << (bucket_idx & WORD_MASK));
    }

    /// Set a level's quantity and activate it. Hidden edge-depth orders
    /// may re-add an already active level; last write wins.
    fn upsert(&mut self, idx: usize, qty: Qty) {
        let bucket_idx = idx / BUCKET_SIZE;
        let off = idx % BUCKET_SIZE;
        if self.buckets[bucket_idx].is_none() {
            let bucket = self.pool.acquire().unwrap_or_default();
            self.buckets[bucket_idx] = Some(bucket);
        }
        let bucket = self.buckets[bucket_idx]
            .as_mut()
            .expect("bucket allocated above");
        bucket.levels[off] = MarketLevel { qty, active: true };
        bucket.set_bit(off);
        self.set_summary(bucket_idx);

        match self.best_idx {
            Some(best) if !self.improves(idx, best) => {}
            _ => self.best_idx = Some(idx),
        }
    }

    /// Deactivate a level; rescans the best index when the best level was
    /// removed. Returns whether the level had been active.
    fn deactivate(&mut self, idx: usize) -> bool {
        let bucket_idx = idx / BUCKET_SIZE;
        let off = idx % BUCKET_SIZE;
        let Some(bucket) = self.buckets[bucket_idx].as_mut() else {
            return false;
        };
        if !bucket.levels[off].active {
            return false;
        }
        bucket.levels[off] = MarketLevel::EMPTY;
        bucket.clear_bit(off);
        if bucket.is_empty() {
            // The bucket itself stays allocated for reuse.
            self.clear_summary(bucket_idx);
        }
        if self.best_idx == Some(idx) {
            self.best_idx = self.next_active(idx);
        }
        true
    }

    /// Subtract traded quantity at a level; deactivates it when the
    /// remainder is not positive.
    fn trade(&mut self, idx: usize, qty: Qty) -> bool {
        let bucket_idx = idx / BUCKET_SIZE;
        let off = idx % BUCKET_SIZE;
        let Some(bucket) = self.buckets[bucket_idx].as_mut() else {
            return false;
        };
        if !bucket.levels[off].active {
            return false;
        }
        let remaining = bucket.levels[off].qty.saturating_sub(qty);
        if remaining.raw() > 0 {
            bucket.levels[off].qty = remaining;
        } else {
            self.deactivate(idx);
        }
        true
    }

    fn clear(&mut self) {
        for slot in &mut self.buckets {
            if let Some(mut bucket) = slot.take() {
                bucket.reset();
                self.pool.release(bucket);
            }
        }
        self.summary.fill(0);
        self.best_idx = None;
    }

    /// Best active index: highest for bids, lowest for asks.
    fn first_active(&self) -> Option<usize> {
        let mut found = None;
        let mut visit_bucket = |bucket_idx: usize| -> bool {
            let Some(bucket) = &self.buckets[bucket_idx] else {
                return false;
            };
            let mut hit = None;
            let mut grab = |off: usize| {
                hit = Some(off);
                true
            };
            if self.is_bid {
                bucket.scan_desc(None, &mut grab);
            } else {
                bucket.scan_asc(None, &mut grab);
            }
            if let Some(off) = hit {
                found = Some(bucket_idx * BUCKET_SIZE + off);
                return true;
            }
            false
        };
        if self.is_bid {
            for word_idx in (0..self.summary.len()).rev() {
                if scan_word_desc(self.summary[word_idx], word_idx, &mut visit_bucket) {
                    break;
                }
            }
        } else {
            for word_idx in 0..self.summary.len() {
                if scan_word_asc(self.summary[word_idx], word_idx, &mut visit_bucket) {
                    break;
                }
            }
        }
        found
    }

    /// Next active index strictly beyond `from` in the direction of
    /// worsening prices (bids: below, asks: above).
    fn next_active(&self, from: usize) -> Option<usize> {
        let mut found = None;

        // Remainder of the starting bucket first.
        let start_bucket = from / BUCKET_SIZE;
        let start_off = from % BUCKET_SIZE;
        if let Some(bucket) = &self.buckets[start_bucket] {
            let mut grab = |off: usize| {
                found = Some(start_bucket * BUCKET_SIZE + off);
                true
            };
            if self.is_bid {
                if start_off > 0 {
                    bucket.scan_desc(Some(start_off - 1), &mut grab);
                }
            } else if start_off + 1 < BUCKET_SIZE {
                bucket.scan_asc(Some(start_off + 1), &mut grab);
            }
        }
        if found.is_some() {
            return found;
        }

        // Then following buckets via the summary bitmap.
        let mut visit_bucket = |bucket_idx: usize| -> bool {
            let Some(bucket) = &self.buckets[bucket_idx] else {
                return false;
            };
            let mut grab = |off: usize| {
                found = Some(bucket_idx * BUCKET_SIZE + off);
                true
            };
            if self.is_bid {
                bucket.scan_desc(None, &mut grab)
            } else {
                bucket.scan_asc(None, &mut grab)
            }
        };
        let start_word = start_bucket >> WORD_SHIFT;
        if self.is_bid {
            let first = self.summary[start_word] & mask_below(start_bucket & WORD_MASK);
            if !scan_word_desc(first, start_word, &mut visit_bucket) {
                for word_idx in (0..start_word).rev() {
                    if scan_word_desc(self.summary[word_idx], word_idx, &mut visit_bucket) {
                        break;
                    }
                }
            }
        } else {
            let first = self.summary[start_word] & mask_above(start_bucket & WORD_MASK);
            if !scan_word_asc(first, start_word, &mut visit_bucket) {
                for word_idx in (start_word + 1)..self.summary.len() {
                    if scan_word_asc(self.summary[word_idx], word_idx, &mut visit_bucket) {
                        break;
                    }
                }
            }
        }
        found
    }

    /// Visit active levels from the best in improving-price order, until
    /// the visitor returns `true`. Skips inactive entries in O(bits set).
    fn walk_active<F>(&self, mut visit: F)
    where
        F: FnMut(usize, &MarketLevel) -> bool,
    {
        let mut cursor = self.best_idx;
        while let Some(idx) = cursor {
            if let Some(level) = self.level(idx) {
                if level.active && level.qty.raw() > 0 && visit(idx, level) {
                    return;
                }
            }
            cursor = self.next_active(idx);
        }
    }
}

/// An active level observed while peeking the book.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelView {
    pub idx: usize,
    pub price: Price,
    pub qty: Qty,
}

/// Per-symbol limit order book.
pub struct MarketOrderBook {
    ticker: TickerId,
    config: BookConfig,
    log: LogProducer,
    bids: SideGrid,
    asks: SideGrid,
    bbo: Bbo,
    shared_bbo: Arc<AtomicCell<Bbo>>,
}

impl MarketOrderBook {
    pub fn new(ticker: TickerId, config: BookConfig, log: LogProducer) -> Self {
        MarketOrderBook {
            ticker,
            bids: SideGrid::new(&config, true),
            asks: SideGrid::new(&config, false),
            config,
            log,
            bbo: Bbo::default(),
            shared_bbo: Arc::new(AtomicCell::new(Bbo::default())),
        }
    }

    pub fn ticker(&self) -> &TickerId {
        &self.ticker
    }

    pub fn config(&self) -> &BookConfig {
        &self.config
    }

    /// Apply one pooled market-data entry. Crossed books are accepted as a
    /// transient state; reconciliation happens through sequence numbers
    /// upstream.
    pub fn apply(&mut self, entry: &MarketData) -> BookEvent {
        let event = match entry.update {
            MarketUpdateType::Add | MarketUpdateType::Modify | MarketUpdateType::BookTicker => {
                self.upsert(entry)
            }
            MarketUpdateType::Cancel => self.cancel(entry),
            MarketUpdateType::Trade => self.trade(entry),
            MarketUpdateType::SnapshotClear => {
                self.bids.clear();
                self.asks.clear();
                BookEvent::Cleared
            }
            MarketUpdateType::Invalid => {
                self.log
                    .error(format!("{}: invalid market update {entry}", self.ticker));
                BookEvent::Ignored
            }
        };
        self.refresh_bbo();
        event
    }

    fn grid_mut(&mut self, side: Side) -> &mut SideGrid {
        if side == Side::Buy {
            &mut self.bids
        } else {
            &mut self.asks
        }
    }

    fn grid(&self, side: Side) -> &SideGrid {
        if side == Side::Buy { &self.bids } else { &self.asks }
    }

    fn upsert(&mut self, entry: &MarketData) -> BookEvent {
        if !entry.side.is_tradable() {
            self.log
                .warn(format!("{}: sideless book update {entry}", self.ticker));
            return BookEvent::Rejected;
        }
        let Some(idx) = self.config.price_to_index(entry.price) else {
            self.log
                .warn(format!("{}: price out of range {entry}", self.ticker));
            return BookEvent::Rejected;
        };
        self.grid_mut(entry.side).upsert(idx, entry.qty);
        BookEvent::BookUpdated
    }

    fn cancel(&mut self, entry: &MarketData) -> BookEvent {
        if !entry.side.is_tradable() {
            self.log
                .warn(format!("{}: sideless cancel {entry}", self.ticker));
            return BookEvent::Rejected;
        }
        let Some(idx) = self.config.price_to_index(entry.price) else {
            self.log
                .warn(format!("{}: cancel out of range {entry}", self.ticker));
            return BookEvent::Rejected;
        };
        if !self.grid_mut(entry.side).deactivate(idx) {
            self.log
                .info(format!("{}: cancel of inactive level {entry}", self.ticker));
            return BookEvent::Ignored;
        }
        BookEvent::BookUpdated
    }

    fn trade(&mut self, entry: &MarketData) -> BookEvent {
        if entry.side.is_tradable() {
            if let Some(idx) = self.config.price_to_index(entry.price) {
                self.grid_mut(entry.side).trade(idx, entry.qty);
            } else {
                self.log
                    .warn(format!("{}: trade out of range {entry}", self.ticker));
            }
        }
        // The print is forwarded to the trade hooks even when the level
        // was not resting on the local book.
        BookEvent::TradeApplied
    }

    fn refresh_bbo(&mut self) {
        self.bbo = Bbo {
            bid_price: self
                .bids
                .best_idx
                .map_or(Price::INVALID, |i| self.config.index_to_price(i)),
            bid_qty: self
                .bids
                .best_idx
                .and_then(|i| self.bids.level(i))
                .map_or(Qty::INVALID, |l| l.qty),
            ask_price: self
                .asks
                .best_idx
                .map_or(Price::INVALID, |i| self.config.index_to_price(i)),
            ask_qty: self
                .asks
                .best_idx
                .and_then(|i| self.asks.level(i))
                .map_or(Qty::INVALID, |l| l.qty),
        };
        self.shared_bbo.store(self.bbo);
    }

    /// Top of book; O(1) after any update.
    #[inline]
    pub fn get_bbo(&self) -> Bbo {
        self.bbo
    }

    /// Shared handle other threads may read for a by-value BBO snapshot.
    pub fn bbo_handle(&self) -> Arc<AtomicCell<Bbo>> {
        Arc::clone(&self.shared_bbo)
    }

    /// Emit up to `want` active levels in improving-price order. `qty_out`
    /// and `idx_out` are cleared first; returns the number emitted.
    pub fn peek_qty(
        &self,
        side: Side,
        want: usize,
        qty_out: &mut Vec<Qty>,
        idx_out: &mut Vec<usize>,
    ) -> usize {
        qty_out.clear();
        idx_out.clear();
        if want == 0 {
            return 0;
        }
        self.grid(side).walk_active(|idx, level| {
            qty_out.push(level.qty);
            idx_out.push(idx);
            qty_out.len() >= want
        });
        qty_out.len()
    }

    /// Up to `want` active levels with their prices.
    pub fn peek_levels(&self, side: Side, want: usize) -> Vec<LevelView> {
        let mut out = Vec::with_capacity(want);
        if want == 0 {
            return out;
        }
        self.grid(side).walk_active(|idx, level| {
            out.push(LevelView {
                idx,
                price: self.config.index_to_price(idx),
                qty: level.qty,
            });
            out.len() >= want
        });
        out
    }

    /// Next active grid index strictly beyond `start_idx` in worsening
    /// direction, or `None`.
    pub fn next_active_idx(&self, side: Side, start_idx: usize) -> Option<usize> {
        self.grid(side).next_active(start_idx)
    }

    /// Recompute the best index from the bitmaps; test/diagnostic hook.
    pub fn scan_best(&self, side: Side) -> Option<usize> {
        self.grid(side).first_active()
    }

    pub fn is_active(&self, side: Side, idx: usize) -> bool {
        self.grid(side).is_active(idx)
    }

    pub fn qty_at(&self, side: Side, idx: usize) -> Option<Qty> {
        self.grid(side)
            .level(idx)
            .filter(|l| l.active)
            .map(|l| l.qty)
    }

    /// Debug rendering of the active levels on one side.
    pub fn active_levels_string(&self, side: Side, max_levels: usize) -> String {
        let mut out = format!("{} {side}:", self.ticker);
        for level in self.peek_levels(side, max_levels) {
            out.push_str(&format!(" {}@{}", level.qty, level.price));
        }
        out
    }
}
