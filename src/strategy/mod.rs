//! Strategy dispatch and the base strategies.
//!
//! Hot-path polymorphism is an explicit v-table: four function pointers
//! over an opaque `Box<dyn Any>` payload, registered under a string name
//! at program start. The trade engine looks the table up once and pays a
//! single indirect call per event. Adding a strategy means implementing
//! [`Strategy`] and registering it; nothing else in the engine changes.

mod liquid_taker;
mod market_maker;
pub mod mean_reversion;
mod momentum;

#[cfg(test)]
mod tests;

use std::any::Any;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::book::MarketOrderBook;
use crate::features::FeatureEngine;
use crate::logging::LogProducer;
use crate::oe::ExecutionReport;
use crate::orders::OrderSink;
use crate::types::{MarketData, Price, Qty, Side, TickerId};

pub use liquid_taker::LiquidTaker;
pub use market_maker::MarketMaker;
pub use mean_reversion::MeanReversionMaker;
pub use momentum::ObiVwapMomentum;

/// Per-symbol strategy parameters, bound at engine start.
#[derive(Debug, Clone)]
pub struct StrategyConfig {
    pub ticker: TickerId,
    /// Quote size per layer.
    pub clip_qty: Qty,
    /// Distance from the touch for passive quotes, in raw price units.
    pub safety_margin_raw: i64,
    /// Signal level to start acting.
    pub enter_threshold: f64,
    /// Signal level below which the strategy goes idle.
    pub exit_threshold: f64,
    /// Momentum sizing: raw signal divided by this before scaling.
    pub variance_denominator: f64,
    /// Momentum sizing scalar.
    pub position_variance: f64,
    /// Book levels considered for order-book imbalance.
    pub obi_levels: usize,
    /// Aggressor-ratio band that triggers the liquid taker.
    pub taker_ratio_band: f64,
    /// Mean-reversion z-score window.
    pub zscore_window: usize,
    /// Samples required before z-scores are trusted.
    pub zscore_min_samples: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            ticker: TickerId::default(),
            clip_qty: Qty::from_int(1),
            safety_margin_raw: 2,
            enter_threshold: 0.6,
            exit_threshold: 0.2,
            variance_denominator: 1_000.0,
            position_variance: 1.0,
            obi_levels: 10,
            taker_ratio_band: 0.75,
            zscore_window: 30,
            zscore_min_samples: 20,
        }
    }
}

/// Context handed to every strategy callback: where orders go, the
/// feature engine, and an async log token.
pub struct StrategyContext<'a> {
    pub orders: &'a mut dyn OrderSink,
    pub features: &'a FeatureEngine,
    pub log: &'a LogProducer,
}

/// The strategy contract. Implementations are plain structs; the engine
/// never sees the concrete type, only the v-table.
pub trait Strategy: Any + Send {
    fn create(config: &StrategyConfig) -> Self
    where
        Self: Sized;

    fn on_orderbook_updated(
        &mut self,
        ctx: &mut StrategyContext<'_>,
        ticker: &TickerId,
        price: Price,
        side: Side,
        book: &MarketOrderBook,
    );

    fn on_trade_updated(
        &mut self,
        ctx: &mut StrategyContext<'_>,
        trade: &MarketData,
        book: &MarketOrderBook,
    );

    fn on_order_updated(&mut self, ctx: &mut StrategyContext<'_>, report: &ExecutionReport);
}

type OnOrderbookUpdatedFn =
    fn(&mut dyn Any, &mut StrategyContext<'_>, &TickerId, Price, Side, &MarketOrderBook);
type OnTradeUpdatedFn = fn(&mut dyn Any, &mut StrategyContext<'_>, &MarketData, &MarketOrderBook);
type OnOrderUpdatedFn = fn(&mut dyn Any, &mut StrategyContext<'_>, &ExecutionReport);
type CreateFn = fn(&StrategyConfig) -> Box<dyn Any + Send>;

/// Function-pointer table for one registered strategy. Destruction is the
/// payload box's `Drop`.
#[derive(Clone, Copy)]
pub struct StrategyVTable {
    pub on_orderbook_updated: OnOrderbookUpdatedFn,
    pub on_trade_updated: OnTradeUpdatedFn,
    pub on_order_updated: OnOrderUpdatedFn,
    pub create: CreateFn,
}

fn adapt_orderbook<S: Strategy>(
    data: &mut dyn Any,
    ctx: &mut StrategyContext<'_>,
    ticker: &TickerId,
    price: Price,
    side: Side,
    book: &MarketOrderBook,
) {
    if let Some(strategy) = data.downcast_mut::<S>() {
        strategy.on_orderbook_updated(ctx, ticker, price, side, book);
    }
}

fn adapt_trade<S: Strategy>(
    data: &mut dyn Any,
    ctx: &mut StrategyContext<'_>,
    trade: &MarketData,
    book: &MarketOrderBook,
) {
    if let Some(strategy) = data.downcast_mut::<S>() {
        strategy.on_trade_updated(ctx, trade, book);
    }
}

fn adapt_order<S: Strategy>(
    data: &mut dyn Any,
    ctx: &mut StrategyContext<'_>,
    report: &ExecutionReport,
) {
    if let Some(strategy) = data.downcast_mut::<S>() {
        strategy.on_order_updated(ctx, report);
    }
}

fn adapt_create<S: Strategy>(config: &StrategyConfig) -> Box<dyn Any + Send> {
    Box::new(S::create(config))
}

static REGISTRY: Lazy<DashMap<&'static str, StrategyVTable>> = Lazy::new(DashMap::new);

/// Register a strategy under `name`. Later registrations win, so tests
/// can shadow built-ins.
pub fn register_strategy<S: Strategy>(name: &'static str) {
    let vtable = StrategyVTable {
        on_orderbook_updated: adapt_orderbook::<S>,
        on_trade_updated: adapt_trade::<S>,
        on_order_updated: adapt_order::<S>,
        create: adapt_create::<S>,
    };
    REGISTRY.insert(name, vtable);
}

pub fn lookup_strategy(name: &str) -> Option<StrategyVTable> {
    REGISTRY.get(name).map(|entry| *entry.value())
}

pub fn strategy_names() -> Vec<&'static str> {
    REGISTRY.iter().map(|entry| *entry.key()).collect()
}

/// Register the strategies shipped with the engine. Idempotent.
pub fn register_builtin_strategies() {
    register_strategy::<MarketMaker>("market_maker");
    register_strategy::<LiquidTaker>("liquid_taker");
    register_strategy::<ObiVwapMomentum>("obi_vwap_momentum");
    register_strategy::<MeanReversionMaker>("mean_reversion_maker");
}

/// A live strategy instance: the v-table plus its opaque state.
pub struct StrategyHandle {
    vtable: StrategyVTable,
    data: Box<dyn Any + Send>,
}

impl StrategyHandle {
    /// Instantiate the strategy registered under `name`.
    pub fn create(name: &str, config: &StrategyConfig) -> Option<Self> {
        let vtable = lookup_strategy(name)?;
        let data = (vtable.create)(config);
        Some(StrategyHandle { vtable, data })
    }

    #[inline]
    pub fn on_orderbook_updated(
        &mut self,
        ctx: &mut StrategyContext<'_>,
        ticker: &TickerId,
        price: Price,
        side: Side,
        book: &MarketOrderBook,
    ) {
        (self.vtable.on_orderbook_updated)(self.data.as_mut(), ctx, ticker, price, side, book);
    }

    #[inline]
    pub fn on_trade_updated(
        &mut self,
        ctx: &mut StrategyContext<'_>,
        trade: &MarketData,
        book: &MarketOrderBook,
    ) {
        (self.vtable.on_trade_updated)(self.data.as_mut(), ctx, trade, book);
    }

    #[inline]
    pub fn on_order_updated(&mut self, ctx: &mut StrategyContext<'_>, report: &ExecutionReport) {
        (self.vtable.on_order_updated)(self.data.as_mut(), ctx, report);
    }

    #[cfg(test)]
    pub(crate) fn payload_for_tests(&mut self) -> &mut dyn Any {
        self.data.as_mut()
    }
}
