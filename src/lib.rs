//! # High-Performance Lock-Free Trading Engine Core
//!
//! A low-latency cryptocurrency trading engine core written in Rust: the in-process pipeline that ingests exchange market data, maintains local order books, produces trading decisions and manages live orders against an exchange.
//!
//! ## Key Features
//!
//! - **Lock-Free Pipeline**: Every thread boundary is a single-producer/single-consumer ring with release/acquire publication; hot threads never touch a mutex. Pooled allocations follow a strict "producer allocates, consumer frees" ownership hand-off.
//!
//! - **Dense Bitmap-Indexed Order Book**: A per-side dense price grid split into lazily pooled 4096-entry buckets with two-level occupancy bitmaps, giving O(1) top-of-book after any update and O(bits set) level walks for depth peeking.
//!
//! - **Dual-Path Market-Data Decoding**: A schema-directed `serde_json` decoder as the default and a verified one-pass decoder for the hot streams that parses prices and quantities straight into fixed-point raw values; the two paths are equivalence-tested field by field.
//!
//! - **Exact Order-State Reconciliation**: An eight-slot layer book per (symbol, side) with idempotent tick assignment, LRU eviction, full cancel-replace bookkeeping including rejection rollback, and a reserved-quantity counter that stays exact between request emit and terminal response.
//!
//! - **V-Table Strategy Dispatch**: Strategies register a four-pointer function table under a string name at startup; the engine pays one indirect call per event. Market-maker, liquid-taker, OBI-VWAP momentum and a robust-z-score mean-reversion maker ship in the box.
//!
//! - **Fixed-Point Everywhere**: Prices and quantities are scaled 64-bit integers with a compile-time per-symbol scale; multiplication and division widen through 128 bits. Floats never carry money.
//!
//! ## Architecture
//!
//! Data flows strictly one way per thread boundary:
//!
//! ```text
//! transport-rx -> decoder -> domain mapper -> (book-update ring) ->
//!   market-data thread: order book -> feature engine -> strategy
//!     -> (intent ring) ->
//!   response thread: order manager (layer book, state manager, risk,
//!     position keeper) -> (request ring) -> encoder -> transport-tx
//!
//! transport-rx (order entry) -> response mapper -> (response ring) ->
//!   response thread -> order-state manager -> (report echo ring) ->
//!   market-data thread -> strategy
//! ```
//!
//! Each symbol runs its own [`engine::TradeEngine`] with exactly two hot
//! threads, both pinned to configured cores and idling through a tiered
//! busy-spin/yield/sleep wait strategy.
//!
//! ## Consistency Model
//!
//! Depth updates carry Binance-style update-id bounds. The market-data
//! thread enforces continuity (`pu == last applied u`), requests a fresh
//! snapshot on any gap, and suspends book-aware strategy callbacks until
//! a consistent snapshot has been applied: the engine never trades a
//! stale book.
//!
//! ## Scope
//!
//! Transports (TLS, websocket framing, FIX sessions), configuration
//! loading, credential signing and persistence are external: the core
//! consumes opaque byte payloads through the handler callbacks in
//! [`engine`] and emits complete frames through the [`transport`]
//! contract. Durable state is the job of a sidecar fed from the
//! market-feed tap ring.
//!
//! ## Status
//!
//! The engine core is feature-complete and heavily tested (property tests
//! over the book, the SPSC substrate and the fixed-point codec; scenario
//! tests for snapshot recovery, cancel-replace and PnL accounting). It is
//! not a turnkey trading system: bring your own transports, keys and
//! configuration.

pub mod book;
pub mod engine;
pub mod feed;
pub mod features;
pub mod logging;
pub mod oe;
pub mod orders;
pub mod risk;
pub mod strategy;
pub mod sync;
pub mod transport;
pub mod types;

pub mod prelude;
mod utils;

pub use book::{Bbo, BookConfig, BookEvent, MarketOrderBook};
pub use engine::{EngineConfig, EngineHandles, TradeEngine};
pub use feed::{DomainMapper, GenericJsonDecoder, MarketDecoder, OnePassDecoder, WireMessage};
pub use features::FeatureEngine;
pub use logging::{LogLevel, LogProducer, Logger, init_tracing};
pub use oe::{ExecutionReport, JsonOrderEncoder, OrdStatus, OrderGateway, OrderRequest};
pub use orders::{LayerBook, OrderManager, OrderSink, QuoteIntent, SlotState};
pub use risk::{PositionKeeper, RiskCheckResult, RiskConfig, RiskManager};
pub use strategy::{Strategy, StrategyConfig, StrategyHandle, register_strategy};
pub use transport::{CONNECTED_SENTINEL, TransportOut};
pub use types::{FixedPoint, OrderId, Price, Qty, Side, TickerId};
pub use utils::{current_time_millis, current_time_nanos};
