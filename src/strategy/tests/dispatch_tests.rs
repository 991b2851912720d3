use crate::book::MarketOrderBook;
use crate::oe::ExecutionReport;
use crate::strategy::{
    Strategy, StrategyConfig, StrategyContext, StrategyHandle, lookup_strategy,
    register_builtin_strategies, register_strategy, strategy_names,
};
use crate::types::{MarketData, Price, Side, TickerId};

use super::strategy_tests::{RecordingSink, test_world};

/// Counts every callback it receives.
struct CountingStrategy {
    book_events: u32,
    trade_events: u32,
    order_events: u32,
}

impl Strategy for CountingStrategy {
    fn create(_config: &StrategyConfig) -> Self {
        CountingStrategy {
            book_events: 0,
            trade_events: 0,
            order_events: 0,
        }
    }

    fn on_orderbook_updated(
        &mut self,
        ctx: &mut StrategyContext<'_>,
        _ticker: &TickerId,
        _price: Price,
        _side: Side,
        _book: &MarketOrderBook,
    ) {
        self.book_events += 1;
        ctx.log.trace("counting book event");
    }

    fn on_trade_updated(
        &mut self,
        _ctx: &mut StrategyContext<'_>,
        _trade: &MarketData,
        _book: &MarketOrderBook,
    ) {
        self.trade_events += 1;
    }

    fn on_order_updated(&mut self, _ctx: &mut StrategyContext<'_>, _report: &ExecutionReport) {
        self.order_events += 1;
    }
}

#[test]
fn builtins_register_under_known_names() {
    register_builtin_strategies();
    for name in [
        "market_maker",
        "liquid_taker",
        "obi_vwap_momentum",
        "mean_reversion_maker",
    ] {
        assert!(lookup_strategy(name).is_some(), "missing strategy {name}");
        assert!(strategy_names().contains(&name));
    }
    assert!(lookup_strategy("nonexistent").is_none());
}

#[test]
fn handle_dispatches_through_vtable() {
    register_strategy::<CountingStrategy>("counting_test_strategy");
    let config = StrategyConfig::default();
    let mut handle =
        StrategyHandle::create("counting_test_strategy", &config).expect("registered above");

    let (logger, book, features) = test_world();
    let mut sink = RecordingSink::default();
    let producer = logger.producer();
    let mut ctx = StrategyContext {
        orders: &mut sink,
        features: &features,
        log: &producer,
    };

    let ticker = TickerId::new("T");
    handle.on_orderbook_updated(&mut ctx, &ticker, Price::from_int(100), Side::Buy, &book);
    handle.on_orderbook_updated(&mut ctx, &ticker, Price::from_int(101), Side::Sell, &book);
    let trade = MarketData::default();
    handle.on_trade_updated(&mut ctx, &trade, &book);
    handle.on_order_updated(&mut ctx, &ExecutionReport::default());

    // The opaque payload kept its state across indirect calls.
    drop(ctx);
    let counters = handle_data(&mut handle);
    assert_eq!(counters, (2, 1, 1));
}

fn handle_data(handle: &mut StrategyHandle) -> (u32, u32, u32) {
    // Reach through the opaque payload the same way the adapters do.
    let any = handle_payload(handle);
    let counting = any
        .downcast_mut::<CountingStrategy>()
        .expect("payload type");
    (
        counting.book_events,
        counting.trade_events,
        counting.order_events,
    )
}

fn handle_payload(handle: &mut StrategyHandle) -> &mut dyn std::any::Any {
    // Exercise a book callback that increments nothing to get access:
    // the handle exposes no payload accessor by design, so this test
    // reuses the registered create/dispatch machinery instead.
    handle.payload_for_tests()
}

#[test]
fn create_unknown_strategy_fails_cleanly() {
    assert!(StrategyHandle::create("no_such_strategy", &StrategyConfig::default()).is_none());
}

#[test]
fn re_registration_shadows_previous_entry() {
    register_strategy::<CountingStrategy>("shadow_test");
    let first = lookup_strategy("shadow_test").unwrap();
    register_strategy::<CountingStrategy>("shadow_test");
    let second = lookup_strategy("shadow_test").unwrap();
    // Same adapter functions for the same type.
    assert_eq!(
        first.on_orderbook_updated as usize,
        second.on_orderbook_updated as usize
    );
}
