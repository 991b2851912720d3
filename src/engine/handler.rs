//! Transport-thread handlers: the producer role of the pipeline.
//!
//! `MarketFeedHandler` sits on the market-data transport's callback
//! thread: decode, map to a pooled batch, hand the batch to the
//! book-update ring (and optionally tap it into the sidecar feed ring).
//! `ResponseFeedHandler` does the same for the order-entry stream into
//! the response ring. Neither blocks on the consumer; ring overflow is a
//! bounded-retry-then-drop with the drop logged.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::feed::{
    DomainMapper, MarketDecoder, default_streams, snapshot_request_message, subscription_message,
};
use crate::logging::LogProducer;
use crate::oe::{ExecutionReport, ResponseMapper};
use crate::sync::{DepthFrameMeta, FeedEntry, FeedWriter, SpscProducer};
use crate::transport::{CONNECTED_SENTINEL, TransportOut};
use crate::types::{BatchKind, MarketUpdateData, TickerId};

const RING_PUSH_ATTEMPTS: u32 = 1_024;

/// Session state shared between a transport callback thread and the
/// response consumer.
pub const SESSION_UNKNOWN: u8 = 0;
pub const SESSION_UP: u8 = 1;
pub const SESSION_DOWN: u8 = 2;

#[derive(Clone)]
pub struct SessionFlag(Arc<AtomicU8>);

impl SessionFlag {
    pub fn new() -> Self {
        SessionFlag(Arc::new(AtomicU8::new(SESSION_UNKNOWN)))
    }

    pub fn set(&self, state: u8) {
        self.0.store(state, Ordering::Release);
    }

    pub fn get(&self) -> u8 {
        self.0.load(Ordering::Acquire)
    }
}

impl Default for SessionFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot request raised by the book consumer when it detects an
/// update-id gap; the transport-thread handler services it by asking the
/// exchange for a fresh snapshot.
#[derive(Clone, Default)]
pub struct SnapshotRequestFlag(Arc<AtomicBool>);

impl SnapshotRequestFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// Market-data producer: decoder + mapper + ring writer.
pub struct MarketFeedHandler {
    log: LogProducer,
    decoder: Box<dyn MarketDecoder>,
    mapper: DomainMapper,
    book_tx: SpscProducer<Box<MarketUpdateData>>,
    /// Control channel back to the exchange (subscribe, snapshot
    /// requests).
    control_out: Box<dyn TransportOut>,
    /// Optional sidecar tap fed with every decoded frame.
    tap: Option<FeedWriter>,
    symbol: TickerId,
    snapshot_depth: u32,
    snapshot_needed: SnapshotRequestFlag,
    next_request_id: u64,
    dropped_batches: u64,
}

impl MarketFeedHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        log: LogProducer,
        decoder: Box<dyn MarketDecoder>,
        mapper: DomainMapper,
        book_tx: SpscProducer<Box<MarketUpdateData>>,
        control_out: Box<dyn TransportOut>,
        tap: Option<FeedWriter>,
        symbol: TickerId,
        snapshot_depth: u32,
        snapshot_needed: SnapshotRequestFlag,
    ) -> Self {
        MarketFeedHandler {
            log,
            decoder,
            mapper,
            book_tx,
            control_out,
            tap,
            symbol,
            snapshot_depth,
            snapshot_needed,
            next_request_id: 1,
            dropped_batches: 0,
        }
    }

    /// Transport callback. The payload borrow is only valid for the
    /// duration of this call; everything that crosses a thread is pooled
    /// or owned.
    pub fn on_payload(&mut self, payload: &str) {
        if self.snapshot_needed.take() {
            self.request_snapshot();
        }
        if payload.is_empty() {
            return;
        }
        if payload == CONNECTED_SENTINEL {
            self.on_connected();
            return;
        }

        let msg = self.decoder.decode(payload);
        if let Some(reject) = self.mapper.map_reject(&msg) {
            self.log.error(format!(
                "market-data request rejected ({}): {}",
                reject.code, reject.message
            ));
            return;
        }

        let Some(batch) = self.mapper.map_market_data(&msg) else {
            return;
        };
        self.tap_batch(&batch);
        self.push_batch(batch);
    }

    /// Ask the exchange for a fresh depth snapshot.
    pub fn request_snapshot(&mut self) {
        let frame = snapshot_request_message(self.symbol.as_str(), self.snapshot_depth);
        if self.control_out.write(frame.as_bytes()) < 0 {
            self.log.error("failed to write snapshot request");
        } else {
            self.log
                .info(format!("requested snapshot for {}", self.symbol));
        }
    }

    pub fn dropped_batches(&self) -> u64 {
        self.dropped_batches
    }

    fn on_connected(&mut self) {
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        let frame = subscription_message(request_id, &default_streams(self.symbol.as_str()), true);
        if self.control_out.write(frame.as_bytes()) < 0 {
            self.log.error("failed to write stream subscription");
        }
        self.request_snapshot();
        // Session marker for the book consumer (the logon "A" event);
        // an empty batch of kind `None` dispatches it to the strategy.
        if let Some(mut marker) = self.mapper.pools().batches.acquire() {
            marker.reset();
            self.push_batch(marker);
        }
        self.log
            .info(format!("market-data session up for {}", self.symbol));
    }

    fn tap_batch(&mut self, batch: &MarketUpdateData) {
        let Some(tap) = self.tap.as_mut() else {
            return;
        };
        match batch.kind {
            BatchKind::Trade => {
                if let Some(entry) = batch.entries.first() {
                    let _ = tap.write_trade(entry.side, entry.price, entry.qty);
                }
            }
            BatchKind::BookTicker => {
                if let [bid, ask] = batch.entries.as_slice() {
                    let _ = tap.write_book_ticker(bid.price, bid.qty, ask.price, ask.qty);
                }
            }
            BatchKind::Market => {
                let entries: Vec<FeedEntry> =
                    batch.entries.iter().map(|e| FeedEntry::from_market(e)).collect();
                let meta = DepthFrameMeta {
                    start_update_id: batch.first_update_id,
                    end_update_id: batch.last_update_id,
                    prev_end_update_id: batch.prev_end_update_id,
                };
                let _ = tap.write_depth(meta, &entries);
            }
            BatchKind::Snapshot => {
                let entries: Vec<FeedEntry> =
                    batch.entries.iter().map(|e| FeedEntry::from_market(e)).collect();
                let _ = tap.write_snapshot(batch.last_update_id, &entries);
            }
            BatchKind::None => {}
        }
    }

    fn push_batch(&mut self, batch: Box<MarketUpdateData>) {
        let mut batch = batch;
        for _ in 0..RING_PUSH_ATTEMPTS {
            match self.book_tx.push(batch) {
                Ok(()) => return,
                Err(back) => {
                    batch = back;
                    std::hint::spin_loop();
                }
            }
        }
        self.dropped_batches += 1;
        self.log
            .error(format!("book-update ring full; dropping {batch}"));
        self.mapper.pools().release_batch(batch);
    }
}

/// Order-entry producer: response mapper + response ring writer.
pub struct ResponseFeedHandler {
    log: LogProducer,
    mapper: ResponseMapper,
    response_tx: SpscProducer<ExecutionReport>,
    session: SessionFlag,
    dropped_reports: u64,
}

impl ResponseFeedHandler {
    pub fn new(
        log: LogProducer,
        mapper: ResponseMapper,
        response_tx: SpscProducer<ExecutionReport>,
        session: SessionFlag,
    ) -> Self {
        ResponseFeedHandler {
            log,
            mapper,
            response_tx,
            session,
            dropped_reports: 0,
        }
    }

    pub fn on_payload(&mut self, payload: &str) {
        if payload.is_empty() {
            return;
        }
        if payload == CONNECTED_SENTINEL {
            self.session.set(SESSION_UP);
            self.log.info("order-entry session up");
            return;
        }
        let Some(report) = self.mapper.map_execution_report(payload) else {
            return;
        };
        let mut report = report;
        for _ in 0..RING_PUSH_ATTEMPTS {
            match self.response_tx.push(report) {
                Ok(()) => return,
                Err(back) => {
                    report = back;
                    std::hint::spin_loop();
                }
            }
        }
        self.dropped_reports += 1;
        self.log
            .error(format!("response ring full; dropping {report}"));
    }

    /// Transport disconnect signal: outstanding reserved quantity is
    /// unknown until resynchronisation.
    pub fn on_disconnected(&mut self) {
        self.session.set(SESSION_DOWN);
        self.log.error("order-entry transport disconnected");
    }

    pub fn dropped_reports(&self) -> u64 {
        self.dropped_reports
    }
}
