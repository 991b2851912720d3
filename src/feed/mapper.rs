//! Domain mapper: decoded wire messages to pooled market-data batches.
//!
//! Runs on the transport thread, between the decoder and the book-update
//! ring. Every level becomes one pooled [`MarketData`]; a batch is emitted
//! whole or not at all. When a pool runs dry the mapper backs off with
//! bounded sleeps and retries: the producer stalls rather than dropping
//! or truncating a source message.

use std::sync::Arc;
use std::time::Duration;

use crate::logging::LogProducer;
use crate::sync::MemoryPool;
use crate::types::{
    BatchKind, MarketData, MarketUpdateData, MarketUpdateType, OrderId, Price, Qty, Side, TickerId,
};

use super::wire::{ApiResponse, ExchangeInfo, WireLevel, WireMessage};

const BACKOFF_START_MICROS: u64 = 10;
const BACKOFF_CAP_MICROS: u64 = 1_000;
const BACKOFF_WARN_EVERY: u32 = 1_000;

/// The two fixed-capacity pools feeding the market-data path. The mapper
/// allocates, the book consumer releases through [`MarketPools::release_batch`].
#[derive(Clone)]
pub struct MarketPools {
    pub entries: Arc<MemoryPool<MarketData>>,
    pub batches: Arc<MemoryPool<MarketUpdateData>>,
}

impl MarketPools {
    pub fn new(entry_capacity: usize, batch_capacity: usize) -> Self {
        MarketPools {
            entries: Arc::new(MemoryPool::new(entry_capacity)),
            batches: Arc::new(MemoryPool::new(batch_capacity)),
        }
    }

    /// Return a consumed batch and all of its entries to the pools.
    pub fn release_batch(&self, mut batch: Box<MarketUpdateData>) {
        for entry in batch.entries.drain(..) {
            self.entries.release(entry);
        }
        batch.reset();
        self.batches.release(batch);
    }
}

/// Instrument metadata extracted from an exchange-info response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InstrumentInfo {
    pub symbol: String,
    pub quote_asset: String,
    pub tick_size: Option<Price>,
    pub min_qty: Option<Qty>,
    pub max_qty: Option<Qty>,
    pub step_size: Option<Qty>,
}

/// Normalised feed-level rejection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeedReject {
    pub code: i64,
    pub message: String,
}

/// Converts [`WireMessage`]s into pooled [`MarketUpdateData`] batches.
pub struct DomainMapper {
    log: LogProducer,
    /// Fallback symbol for snapshot responses that do not embed one.
    default_ticker: TickerId,
    pools: MarketPools,
}

impl DomainMapper {
    pub fn new(log: LogProducer, default_ticker: TickerId, pools: MarketPools) -> Self {
        DomainMapper {
            log,
            default_ticker,
            pools,
        }
    }

    pub fn pools(&self) -> &MarketPools {
        &self.pools
    }

    /// Map a market-data message to a batch. `None` for messages that
    /// carry no book data (API acks, exchange info, `MonoState`).
    pub fn map_market_data(&self, msg: &WireMessage) -> Option<Box<MarketUpdateData>> {
        match msg {
            WireMessage::Depth(depth) => {
                let ticker = TickerId::new(&depth.symbol);
                let mut batch = self.acquire_batch();
                batch.first_update_id = depth.first_update_id;
                batch.last_update_id = depth.last_update_id;
                batch.prev_end_update_id = depth.prev_end_update_id;
                batch.kind = BatchKind::Market;
                self.push_levels(&mut batch, &ticker, Side::Buy, &depth.bids, MarketUpdateType::Add);
                self.push_levels(&mut batch, &ticker, Side::Sell, &depth.asks, MarketUpdateType::Add);
                Some(batch)
            }
            WireMessage::Trade(trade) => {
                let ticker = TickerId::new(&trade.symbol);
                let mut batch = self.acquire_batch();
                batch.kind = BatchKind::Trade;
                // The aggressor side: a buyer-maker print means the taker
                // sold into the bid.
                let side = if trade.is_buyer_maker {
                    Side::Sell
                } else {
                    Side::Buy
                };
                let entry = self.acquire_entry(
                    MarketUpdateType::Trade,
                    &ticker,
                    side,
                    Price::from_raw(trade.price_raw),
                    Qty::from_raw(trade.qty_raw),
                );
                batch.entries.push(entry);
                Some(batch)
            }
            WireMessage::BookTicker(ticker_msg) => {
                let ticker = TickerId::new(&ticker_msg.symbol);
                let mut batch = self.acquire_batch();
                batch.first_update_id = ticker_msg.update_id;
                batch.last_update_id = ticker_msg.update_id;
                batch.kind = BatchKind::BookTicker;
                for (side, price_raw, qty_raw) in [
                    (Side::Buy, ticker_msg.bid_price_raw, ticker_msg.bid_qty_raw),
                    (Side::Sell, ticker_msg.ask_price_raw, ticker_msg.ask_qty_raw),
                ] {
                    let entry = self.level_entry(
                        &ticker,
                        side,
                        WireLevel {
                            price_raw,
                            qty_raw,
                        },
                        MarketUpdateType::BookTicker,
                    );
                    batch.entries.push(entry);
                }
                Some(batch)
            }
            WireMessage::Snapshot(snapshot) => {
                let ticker = snapshot
                    .symbol()
                    .map(TickerId::new)
                    .unwrap_or_else(|| self.default_ticker.clone());
                let mut batch = self.acquire_batch();
                batch.first_update_id = snapshot.last_update_id;
                batch.last_update_id = snapshot.last_update_id;
                batch.kind = BatchKind::Snapshot;
                // A snapshot batch resets the book before the levels land.
                let clear = self.acquire_entry(
                    MarketUpdateType::SnapshotClear,
                    &ticker,
                    Side::Invalid,
                    Price::from_raw(0),
                    Qty::from_raw(0),
                );
                batch.entries.push(clear);
                self.push_levels(
                    &mut batch,
                    &ticker,
                    Side::Buy,
                    &snapshot.bids,
                    MarketUpdateType::Add,
                );
                self.push_levels(
                    &mut batch,
                    &ticker,
                    Side::Sell,
                    &snapshot.asks,
                    MarketUpdateType::Add,
                );
                Some(batch)
            }
            WireMessage::MonoState
            | WireMessage::Api(_)
            | WireMessage::ExchangeInfo(_) => None,
        }
    }

    /// Extract instrument metadata from an exchange-info response.
    pub fn map_instrument_info(&self, msg: &WireMessage) -> Vec<InstrumentInfo> {
        let WireMessage::ExchangeInfo(ExchangeInfo { symbols }) = msg else {
            return Vec::new();
        };
        symbols
            .iter()
            .map(|sym| InstrumentInfo {
                symbol: sym.symbol.clone(),
                quote_asset: sym.quote_asset.clone(),
                tick_size: sym.tick_size.as_deref().and_then(Price::parse),
                min_qty: sym.min_qty.as_deref().and_then(Qty::parse),
                max_qty: sym.max_qty.as_deref().and_then(Qty::parse),
                step_size: sym.step_size.as_deref().and_then(Qty::parse),
            })
            .collect()
    }

    /// Normalise an API error response into a reject, if it is one.
    pub fn map_reject(&self, msg: &WireMessage) -> Option<FeedReject> {
        let WireMessage::Api(ApiResponse {
            error: Some(error), ..
        }) = msg
        else {
            return None;
        };
        Some(FeedReject {
            code: error.code,
            message: error.msg.clone(),
        })
    }

    fn push_levels(
        &self,
        batch: &mut MarketUpdateData,
        ticker: &TickerId,
        side: Side,
        levels: &[WireLevel],
        update: MarketUpdateType,
    ) {
        for level in levels {
            batch.entries.push(self.level_entry(ticker, side, *level, update));
        }
    }

    fn level_entry(
        &self,
        ticker: &TickerId,
        side: Side,
        level: WireLevel,
        update: MarketUpdateType,
    ) -> Box<MarketData> {
        // A zero-qty level is a removal regardless of wire semantics.
        let update = if level.qty_raw <= 0 {
            MarketUpdateType::Cancel
        } else {
            update
        };
        self.acquire_entry(
            update,
            ticker,
            side,
            Price::from_raw(level.price_raw),
            Qty::from_raw(level.qty_raw),
        )
    }

    fn acquire_entry(
        &self,
        update: MarketUpdateType,
        ticker: &TickerId,
        side: Side,
        price: Price,
        qty: Qty,
    ) -> Box<MarketData> {
        let mut slot = self.acquire_with_backoff(&self.pools.entries, "market-data entry");
        slot.update = update;
        slot.order_id = OrderId::INVALID;
        slot.ticker = ticker.clone();
        slot.side = side;
        slot.price = price;
        slot.qty = qty;
        slot
    }

    fn acquire_batch(&self) -> Box<MarketUpdateData> {
        let mut batch = self.acquire_with_backoff(&self.pools.batches, "market-update batch");
        batch.reset();
        batch
    }

    /// Acquire from a pool, backing off with bounded sleeps while it is
    /// exhausted. The consumer frees in bulk per batch, so exhaustion is
    /// transient; stalling the producer here is what keeps a source
    /// message from being dropped or split.
    fn acquire_with_backoff<T: Default>(&self, pool: &MemoryPool<T>, what: &str) -> Box<T> {
        let mut backoff_micros = BACKOFF_START_MICROS;
        let mut attempts: u32 = 0;
        loop {
            if let Some(slot) = pool.acquire() {
                return slot;
            }
            attempts += 1;
            if attempts % BACKOFF_WARN_EVERY == 0 {
                self.log
                    .warn(format!("{what} pool exhausted; producer backing off"));
            }
            std::thread::sleep(Duration::from_micros(backoff_micros));
            backoff_micros = (backoff_micros * 2).min(BACKOFF_CAP_MICROS);
        }
    }
}
