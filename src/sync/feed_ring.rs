//! Typed market-data framing over the variable-length byte ring.
//!
//! Trades, depth updates and snapshots flow through three independent
//! rings sized for their traffic patterns: trades are small and frequent,
//! depth frames mid-sized, snapshots large and rare. The engine feeds this
//! ring as a tap for external sidecars (recorders, replay indexers); the
//! in-process pipeline itself hands pooled batches over an SPSC queue.

use std::mem::size_of;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::types::{MarketData, MarketUpdateType, Price, Qty, Side};

use super::var_ring::{VarRingReader, VarRingWriter, byte_ring};

/// Ring sizes in bytes.
pub const TRADE_RING_BYTES: usize = 64 * 1024;
pub const DEPTH_RING_BYTES: usize = 1024 * 1024;
pub const SNAPSHOT_RING_BYTES: usize = 4 * 1024 * 1024;

/// Frame discriminator carried in the frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum FeedFrameType {
    Trade = 1,
    Depth = 2,
    BookTicker = 3,
    Snapshot = 4,
}

impl FeedFrameType {
    pub fn from_u16(v: u16) -> Option<Self> {
        match v {
            1 => Some(FeedFrameType::Trade),
            2 => Some(FeedFrameType::Depth),
            3 => Some(FeedFrameType::BookTicker),
            4 => Some(FeedFrameType::Snapshot),
            _ => None,
        }
    }
}

/// Depth/snapshot frame metadata: the update-id bounds used for gap
/// detection downstream.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DepthFrameMeta {
    pub start_update_id: u64,
    pub end_update_id: u64,
    pub prev_end_update_id: u64,
}

impl DepthFrameMeta {
    pub const EMPTY: DepthFrameMeta = DepthFrameMeta {
        start_update_id: 0,
        end_update_id: 0,
        prev_end_update_id: 0,
    };
}

/// One book-side level in wire form. The ticker is shared frame-wide; all
/// entries of a frame belong to the same symbol.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct FeedEntry {
    pub price_raw: i64,
    pub qty_raw: i64,
    pub update: u16,
    pub side: u16,
    _pad: u32,
}

const UPDATE_ADD: u16 = 0;
const UPDATE_MODIFY: u16 = 1;
const UPDATE_CANCEL: u16 = 2;
const UPDATE_TRADE: u16 = 3;
const UPDATE_BOOK_TICKER: u16 = 4;
const UPDATE_CLEAR: u16 = 5;

impl FeedEntry {
    pub fn new(update: MarketUpdateType, side: Side, price: Price, qty: Qty) -> Self {
        let update = match update {
            MarketUpdateType::Add => UPDATE_ADD,
            MarketUpdateType::Modify => UPDATE_MODIFY,
            MarketUpdateType::Cancel => UPDATE_CANCEL,
            MarketUpdateType::Trade => UPDATE_TRADE,
            MarketUpdateType::BookTicker => UPDATE_BOOK_TICKER,
            MarketUpdateType::SnapshotClear => UPDATE_CLEAR,
            MarketUpdateType::Invalid => u16::MAX,
        };
        FeedEntry {
            price_raw: price.raw(),
            qty_raw: qty.raw(),
            update,
            side: side as u16,
            _pad: 0,
        }
    }

    pub fn from_market(entry: &MarketData) -> Self {
        Self::new(entry.update, entry.side, entry.price, entry.qty)
    }

    pub fn update_type(&self) -> MarketUpdateType {
        match self.update {
            UPDATE_ADD => MarketUpdateType::Add,
            UPDATE_MODIFY => MarketUpdateType::Modify,
            UPDATE_CANCEL => MarketUpdateType::Cancel,
            UPDATE_TRADE => MarketUpdateType::Trade,
            UPDATE_BOOK_TICKER => MarketUpdateType::BookTicker,
            UPDATE_CLEAR => MarketUpdateType::SnapshotClear,
            _ => MarketUpdateType::Invalid,
        }
    }

    pub fn side_type(&self) -> Side {
        match self.side {
            0 => Side::Buy,
            1 => Side::Sell,
            3 => Side::Trade,
            _ => Side::Invalid,
        }
    }

    pub fn price(&self) -> Price {
        Price::from_raw(self.price_raw)
    }

    pub fn qty(&self) -> Qty {
        Qty::from_raw(self.qty_raw)
    }
}

/// Producer side of the market-feed tap.
pub struct FeedWriter {
    trade: VarRingWriter,
    depth: VarRingWriter,
    snapshot: VarRingWriter,
}

/// Consumer side of the market-feed tap.
pub struct FeedReader {
    trade: VarRingReader,
    depth: VarRingReader,
    snapshot: VarRingReader,
    scratch: Vec<FeedEntry>,
}

/// Create the three-ring market-feed tap with default sizes.
pub fn market_feed_ring() -> (FeedWriter, FeedReader) {
    market_feed_ring_with(TRADE_RING_BYTES, DEPTH_RING_BYTES, SNAPSHOT_RING_BYTES)
}

/// Create the tap with custom per-ring byte sizes.
pub fn market_feed_ring_with(
    trade_bytes: usize,
    depth_bytes: usize,
    snapshot_bytes: usize,
) -> (FeedWriter, FeedReader) {
    let (tw, tr) = byte_ring(trade_bytes);
    let (dw, dr) = byte_ring(depth_bytes);
    let (sw, sr) = byte_ring(snapshot_bytes);
    (
        FeedWriter {
            trade: tw,
            depth: dw,
            snapshot: sw,
        },
        FeedReader {
            trade: tr,
            depth: dr,
            snapshot: sr,
            scratch: Vec::with_capacity(1024),
        },
    )
}

impl FeedWriter {
    pub fn write_trade(&mut self, side: Side, price: Price, qty: Qty) -> bool {
        let entry = FeedEntry::new(MarketUpdateType::Trade, side, price, qty);
        self.trade.write_var(
            FeedFrameType::Trade as u16,
            &DepthFrameMeta::EMPTY,
            std::slice::from_ref(&entry),
        )
    }

    pub fn write_book_ticker(
        &mut self,
        bid_price: Price,
        bid_qty: Qty,
        ask_price: Price,
        ask_qty: Qty,
    ) -> bool {
        let entries = [
            FeedEntry::new(MarketUpdateType::BookTicker, Side::Buy, bid_price, bid_qty),
            FeedEntry::new(MarketUpdateType::BookTicker, Side::Sell, ask_price, ask_qty),
        ];
        self.depth.write_var(
            FeedFrameType::BookTicker as u16,
            &DepthFrameMeta::EMPTY,
            &entries,
        )
    }

    pub fn write_depth(&mut self, meta: DepthFrameMeta, entries: &[FeedEntry]) -> bool {
        self.depth
            .write_var(FeedFrameType::Depth as u16, &meta, entries)
    }

    pub fn write_snapshot(&mut self, last_update_id: u64, entries: &[FeedEntry]) -> bool {
        let meta = DepthFrameMeta {
            start_update_id: last_update_id,
            end_update_id: last_update_id,
            prev_end_update_id: 0,
        };
        self.snapshot
            .write_var(FeedFrameType::Snapshot as u16, &meta, entries)
    }
}

impl FeedReader {
    /// Drain every ring, trades first. The handler receives the frame
    /// type, metadata and decoded entries; the entries borrow is valid for
    /// the duration of the call. Returns the total frames delivered.
    pub fn read_all<F>(&mut self, mut handler: F) -> usize
    where
        F: FnMut(FeedFrameType, DepthFrameMeta, &[FeedEntry]),
    {
        let scratch = &mut self.scratch;
        let mut total = 0usize;
        for ring in [&mut self.trade, &mut self.depth, &mut self.snapshot] {
            total += ring.read(|msg_type, _count, body| {
                let Some(frame_type) = FeedFrameType::from_u16(msg_type) else {
                    return;
                };
                let Ok((meta, rest)) = DepthFrameMeta::read_from_prefix(body) else {
                    return;
                };
                scratch.clear();
                for chunk in rest.chunks_exact(size_of::<FeedEntry>()) {
                    if let Ok(entry) = FeedEntry::read_from_bytes(chunk) {
                        scratch.push(entry);
                    }
                }
                handler(frame_type, meta, scratch);
            });
        }
        total
    }

    pub fn is_empty(&self) -> bool {
        self.trade.is_empty() && self.depth.is_empty() && self.snapshot.is_empty()
    }
}
