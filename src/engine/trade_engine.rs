//! Per-symbol trade engine: the pipeline orchestrator.
//!
//! Two hot threads per symbol. The market-data thread drains the
//! book-update ring, applies each batch to the order book under the
//! gap-detection protocol, runs features and strategy, and frees the
//! batch back to its pools. The response thread drains the response ring
//! through the order manager (state manager + position keeper), applies
//! queued strategy intents and pumps the order gateway. The threads share
//! nothing but SPSC rings and the atomic BBO snapshot; both idle through
//! the tiered wait strategy and pin to configured cores.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crossbeam::atomic::AtomicCell;

use crate::book::{Bbo, BookConfig, BookEvent, MarketOrderBook};
use crate::feed::{DomainMapper, GenericJsonDecoder, MarketDecoder, MarketPools, OnePassDecoder};
use crate::features::FeatureEngine;
use crate::logging::{LogProducer, Logger};
use crate::oe::{ExecutionReport, JsonOrderEncoder, OrderGateway, ResponseMapper};
use crate::orders::{OrderManager, OrderSink, QuoteIntent, TickConverter};
use crate::risk::{PositionKeeper, RiskManager};
use crate::strategy::{StrategyContext, StrategyHandle, register_builtin_strategies};
use crate::sync::{
    SpscConsumer, SpscProducer, WaitStrategy, market_feed_ring, spsc_channel,
};
use crate::transport::TransportOut;
use crate::types::{BatchKind, MarketUpdateData, Price, Side, TickerId};

use super::config::EngineConfig;
use super::handler::{
    MarketFeedHandler, ResponseFeedHandler, SESSION_DOWN, SESSION_UNKNOWN, SESSION_UP, SessionFlag,
    SnapshotRequestFlag,
};

/// Everything [`TradeEngine::start`] hands back: the engine plus the
/// transport-facing handlers and the sidecar feed tap.
pub struct EngineHandles {
    pub engine: TradeEngine,
    pub market_handler: MarketFeedHandler,
    pub response_handler: ResponseFeedHandler,
    /// Reader half of the market-feed tap for external sidecars
    /// (recorders, replay indexers).
    pub sidecar: crate::sync::FeedReader,
}

const INTENT_PUSH_ATTEMPTS: u32 = 256;

/// Outcome of gap-checking one depth batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GapDecision {
    Apply,
    DropStale,
    Resync,
}

/// Binance-style update-id continuity tracking.
///
/// A depth update continues the stream when its `prev_end_update_id`
/// equals the last applied `last_update_id`. After a snapshot with id
/// `S`, the first accepted update must straddle it
/// (`first <= S + 1 <= last`). Anything older is stale; anything else is
/// a gap that demands a fresh snapshot, and book-aware strategy callbacks
/// stay suspended until one applies.
struct GapTracker {
    last_end: Option<u64>,
    awaiting_snapshot: bool,
    synced: bool,
}

impl GapTracker {
    fn new() -> Self {
        GapTracker {
            last_end: None,
            awaiting_snapshot: false,
            synced: false,
        }
    }

    fn suspended(&self) -> bool {
        self.awaiting_snapshot
    }

    fn on_market_batch(&mut self, batch: &MarketUpdateData) -> GapDecision {
        if self.awaiting_snapshot {
            return GapDecision::DropStale;
        }
        let Some(last) = self.last_end else {
            // Cold start before any snapshot: build incrementally.
            self.last_end = Some(batch.last_update_id);
            self.synced = true;
            return GapDecision::Apply;
        };

        if !self.synced {
            // First update after a snapshot must straddle it.
            if batch.last_update_id <= last {
                return GapDecision::DropStale;
            }
            if batch.first_update_id <= last + 1 {
                self.synced = true;
                self.last_end = Some(batch.last_update_id);
                return GapDecision::Apply;
            }
            self.awaiting_snapshot = true;
            return GapDecision::Resync;
        }

        if batch.prev_end_update_id == last {
            self.last_end = Some(batch.last_update_id);
            return GapDecision::Apply;
        }
        if batch.last_update_id <= last {
            return GapDecision::DropStale;
        }
        self.awaiting_snapshot = true;
        GapDecision::Resync
    }

    fn on_snapshot(&mut self, batch: &MarketUpdateData) {
        self.last_end = Some(batch.last_update_id);
        self.awaiting_snapshot = false;
        self.synced = false;
    }
}

/// Strategy order sink on the market-data thread: ferries intent batches
/// to the response thread, which owns the order manager.
struct IntentRingSink {
    tx: SpscProducer<Vec<QuoteIntent>>,
    log: LogProducer,
    dropped: u64,
}

impl OrderSink for IntentRingSink {
    fn submit(&mut self, intents: &[QuoteIntent]) {
        if intents.is_empty() {
            return;
        }
        let mut batch = intents.to_vec();
        for _ in 0..INTENT_PUSH_ATTEMPTS {
            match self.tx.push(batch) {
                Ok(()) => return,
                Err(back) => {
                    batch = back;
                    std::hint::spin_loop();
                }
            }
        }
        self.dropped += 1;
        self.log.error("intent ring full; dropping quote batch");
    }
}

fn pin_to_core(log: &LogProducer, thread_name: &str, core: Option<usize>) {
    let Some(core) = core else {
        return;
    };
    let Some(core_ids) = core_affinity::get_core_ids() else {
        log.warn(format!("{thread_name}: no core ids available; not pinning"));
        return;
    };
    match core_ids.iter().find(|id| id.id == core) {
        Some(id) if core_affinity::set_for_current(*id) => {
            log.info(format!("{thread_name} pinned to core {core}"));
        }
        _ => log.warn(format!("{thread_name}: failed to pin to core {core}")),
    }
}

/// Running engine for one symbol.
pub struct TradeEngine {
    log: LogProducer,
    running: Arc<AtomicBool>,
    bbo_cell: Arc<AtomicCell<Bbo>>,
    market_thread: Option<JoinHandle<()>>,
    response_thread: Option<JoinHandle<()>>,
}

impl TradeEngine {
    /// Build the full pipeline and spawn the two worker threads.
    ///
    /// Returns the engine handle plus the two transport-facing handlers;
    /// the integrator wires those into its transport callbacks.
    /// `order_transport` carries encoded order-entry frames;
    /// `stream_control` carries subscriptions and snapshot requests.
    pub fn start(
        config: EngineConfig,
        logger: &Logger,
        stream_control: Box<dyn TransportOut>,
        order_transport: Box<dyn TransportOut>,
    ) -> EngineHandles {
        register_builtin_strategies();
        let log = logger.producer();

        let pools = MarketPools::new(config.pools.entries, config.pools.batches);
        let (book_tx, book_rx) = spsc_channel::<Box<MarketUpdateData>>(config.rings.book_updates);
        let (response_tx, response_rx) =
            spsc_channel::<ExecutionReport>(config.rings.responses);
        let (intent_tx, intent_rx) = spsc_channel::<Vec<QuoteIntent>>(config.rings.intents);
        let (request_tx, request_rx) = spsc_channel(config.rings.requests);
        let (echo_tx, echo_rx) = spsc_channel::<ExecutionReport>(config.rings.report_echo);
        let snapshot_needed = SnapshotRequestFlag::new();

        // Producer-side components (live on the transport threads).
        let decoder: Box<dyn MarketDecoder> = if config.one_pass_decoder {
            Box::new(OnePassDecoder::new(logger.producer()))
        } else {
            Box::new(GenericJsonDecoder::new(logger.producer()))
        };
        let mapper = DomainMapper::new(logger.producer(), config.ticker.clone(), pools.clone());
        let (tap_writer, tap_reader) = market_feed_ring();
        let market_handler = MarketFeedHandler::new(
            logger.producer(),
            decoder,
            mapper,
            book_tx,
            stream_control,
            Some(tap_writer),
            config.ticker.clone(),
            config.snapshot_depth,
            snapshot_needed.clone(),
        );

        let session = SessionFlag::new();
        let response_handler = ResponseFeedHandler::new(
            logger.producer(),
            ResponseMapper::new(logger.producer()),
            response_tx,
            session.clone(),
        );

        // Book and strategy live on the market-data thread.
        let book = MarketOrderBook::new(
            config.ticker.clone(),
            BookConfig::new(config.min_price_raw, config.max_price_raw),
            logger.producer(),
        );
        let bbo_cell = book.bbo_handle();
        let features = FeatureEngine::new(logger.producer());
        let strategy = StrategyHandle::create(&config.strategy_name, &config.strategy)
            .unwrap_or_else(|| {
                panic!("unknown strategy {:?}", config.strategy_name);
            });

        // Order management lives on the response thread.
        let mut risk = RiskManager::new(logger.producer());
        risk.set_limits(config.ticker.clone(), config.risk);
        let order_manager = OrderManager::new(
            logger.producer(),
            risk,
            PositionKeeper::new(logger.producer()),
            TickConverter::new(config.tick_size_raw),
            request_tx,
        );
        let gateway = OrderGateway::new(
            logger.producer(),
            Box::new(JsonOrderEncoder::new(logger.producer())),
            order_transport,
            request_rx,
        );

        let running = Arc::new(AtomicBool::new(true));

        let market_thread = {
            let running = Arc::clone(&running);
            let log = logger.producer();
            let ticker = config.ticker.clone();
            let intent_sink = IntentRingSink {
                tx: intent_tx,
                log: logger.producer(),
                dropped: 0,
            };
            let pools = pools.clone();
            let snapshot_needed = snapshot_needed.clone();
            let core = config.market_cpu;
            std::thread::Builder::new()
                .name("te-market".into())
                .spawn(move || {
                    pin_to_core(&log, "te-market", core);
                    market_loop(
                        running,
                        log,
                        ticker,
                        book,
                        features,
                        strategy,
                        intent_sink,
                        book_rx,
                        echo_rx,
                        pools,
                        snapshot_needed,
                    );
                })
                .expect("spawn market-data thread")
        };

        let response_thread = {
            let running = Arc::clone(&running);
            let log = logger.producer();
            let ticker = config.ticker.clone();
            let bbo_cell = Arc::clone(&bbo_cell);
            let core = config.response_cpu;
            std::thread::Builder::new()
                .name("te-response".into())
                .spawn(move || {
                    pin_to_core(&log, "te-response", core);
                    response_loop(
                        running,
                        log,
                        ticker,
                        order_manager,
                        gateway,
                        session,
                        bbo_cell,
                        response_rx,
                        intent_rx,
                        echo_tx,
                    );
                })
                .expect("spawn response thread")
        };

        let engine = TradeEngine {
            log,
            running,
            bbo_cell,
            market_thread: Some(market_thread),
            response_thread: Some(response_thread),
        };
        EngineHandles {
            engine,
            market_handler,
            response_handler,
            sidecar: tap_reader,
        }
    }

    /// Latest published top-of-book snapshot.
    pub fn bbo(&self) -> Bbo {
        self.bbo_cell.load()
    }

    /// Signal shutdown and join both workers; consumers exit once their
    /// rings drain.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.market_thread.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.response_thread.take() {
            let _ = handle.join();
        }
        self.log.info("trade engine stopped");
    }
}

impl Drop for TradeEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

#[allow(clippy::too_many_arguments)]
fn market_loop(
    running: Arc<AtomicBool>,
    log: LogProducer,
    ticker: TickerId,
    mut book: MarketOrderBook,
    mut features: FeatureEngine,
    mut strategy: StrategyHandle,
    mut intent_sink: IntentRingSink,
    mut book_rx: SpscConsumer<Box<MarketUpdateData>>,
    mut echo_rx: SpscConsumer<ExecutionReport>,
    pools: MarketPools,
    snapshot_needed: SnapshotRequestFlag,
) {
    let mut wait = WaitStrategy::new();
    let mut gap = GapTracker::new();

    loop {
        let mut progressed = false;

        if let Some(batch) = book_rx.pop() {
            progressed = true;
            let was_suspended = gap.suspended();
            process_batch(
                &log,
                &ticker,
                &mut book,
                &mut features,
                &mut strategy,
                &mut intent_sink,
                &mut gap,
                &batch,
            );
            if gap.suspended() && !was_suspended {
                snapshot_needed.raise();
            }
            pools.release_batch(batch);
        }

        while let Some(report) = echo_rx.pop() {
            progressed = true;
            let mut ctx = StrategyContext {
                orders: &mut intent_sink,
                features: &features,
                log: &log,
            };
            strategy.on_order_updated(&mut ctx, &report);
        }

        if progressed {
            wait.reset();
        } else {
            if !running.load(Ordering::Relaxed) && book_rx.is_empty() && echo_rx.is_empty() {
                return;
            }
            wait.idle();
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn process_batch(
    log: &LogProducer,
    ticker: &TickerId,
    book: &mut MarketOrderBook,
    features: &mut FeatureEngine,
    strategy: &mut StrategyHandle,
    intent_sink: &mut IntentRingSink,
    gap: &mut GapTracker,
    batch: &MarketUpdateData,
) {
    match batch.kind {
        BatchKind::Market => match gap.on_market_batch(batch) {
            GapDecision::Apply => {
                apply_entries(log, ticker, book, features, strategy, intent_sink, gap, batch);
            }
            GapDecision::DropStale => {}
            GapDecision::Resync => {
                log.warn(format!(
                    "update-id gap on {ticker} ({batch}); requesting snapshot"
                ));
            }
        },
        BatchKind::Snapshot => {
            gap.on_snapshot(batch);
            log.info(format!("applying snapshot {batch}"));
            apply_entries(log, ticker, book, features, strategy, intent_sink, gap, batch);
        }
        // Trades and book-ticker overlays carry no depth sequence.
        BatchKind::Trade | BatchKind::BookTicker => {
            apply_entries(log, ticker, book, features, strategy, intent_sink, gap, batch);
        }
        BatchKind::None => {
            // Session marker from the connection handler.
            let mut ctx = StrategyContext {
                orders: intent_sink,
                features,
                log,
            };
            strategy.on_orderbook_updated(&mut ctx, ticker, Price::INVALID, Side::Invalid, book);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_entries(
    log: &LogProducer,
    ticker: &TickerId,
    book: &mut MarketOrderBook,
    features: &mut FeatureEngine,
    strategy: &mut StrategyHandle,
    intent_sink: &mut IntentRingSink,
    gap: &GapTracker,
    batch: &MarketUpdateData,
) {
    for entry in &batch.entries {
        if entry.ticker != *ticker && entry.update != crate::types::MarketUpdateType::SnapshotClear
        {
            log.warn(format!("entry for foreign ticker dropped: {entry}"));
            continue;
        }
        match book.apply(entry) {
            BookEvent::TradeApplied => {
                features.on_trade_updated(entry, &book.get_bbo());
                if !gap.suspended() {
                    let mut ctx = StrategyContext {
                        orders: intent_sink,
                        features,
                        log,
                    };
                    strategy.on_trade_updated(&mut ctx, entry, book);
                }
            }
            BookEvent::BookUpdated | BookEvent::Cleared => {
                features.on_orderbook_updated(&book.get_bbo());
                if !gap.suspended() {
                    let mut ctx = StrategyContext {
                        orders: intent_sink,
                        features,
                        log,
                    };
                    strategy.on_orderbook_updated(&mut ctx, ticker, entry.price, entry.side, book);
                }
            }
            BookEvent::Ignored | BookEvent::Rejected => {}
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn response_loop(
    running: Arc<AtomicBool>,
    log: LogProducer,
    ticker: TickerId,
    mut manager: OrderManager,
    mut gateway: OrderGateway,
    session: SessionFlag,
    bbo_cell: Arc<AtomicCell<Bbo>>,
    mut response_rx: SpscConsumer<ExecutionReport>,
    mut intent_rx: SpscConsumer<Vec<QuoteIntent>>,
    mut echo_tx: SpscProducer<ExecutionReport>,
) {
    let mut wait = WaitStrategy::new();
    let mut session_seen = SESSION_UNKNOWN;
    let mut last_bbo = Bbo::default();

    loop {
        let mut progressed = false;

        let session_now = session.get();
        if session_now != session_seen {
            session_seen = session_now;
            match session_now {
                SESSION_UP => gateway.on_connected(),
                SESSION_DOWN => gateway.on_disconnected(),
                _ => {}
            }
        }

        while let Some(report) = response_rx.pop() {
            progressed = true;
            manager.on_order_updated(&report);
            if echo_tx.push(report).is_err() {
                log.warn("report echo ring full; strategy misses one update");
            }
        }

        let bbo = bbo_cell.load();
        if bbo != last_bbo {
            last_bbo = bbo;
            manager.position_keeper_mut().update_bbo(&ticker, bbo);
        }

        while let Some(intents) = intent_rx.pop() {
            progressed = true;
            if session_seen == SESSION_DOWN {
                // Reserved state is unknown while disconnected; no new
                // orders until resynchronisation.
                log.warn("dropping strategy intents while order session is down");
                continue;
            }
            manager.apply(&intents);
        }

        if gateway.pump() > 0 {
            progressed = true;
        }

        if progressed {
            wait.reset();
        } else {
            if !running.load(Ordering::Relaxed)
                && response_rx.is_empty()
                && intent_rx.is_empty()
            {
                return;
            }
            wait.idle();
        }
    }
}
