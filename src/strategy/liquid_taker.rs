//! Aggressive liquidity taker.
//!
//! Watches the aggressor-to-top-qty ratio from the feature engine; when a
//! print consumes a large share of the opposing touch, it joins the flow
//! with an immediate-or-cancel order that crosses the spread.

use crate::book::MarketOrderBook;
use crate::oe::ExecutionReport;
use crate::orders::QuoteIntent;
use crate::types::{MarketData, Price, Qty, Side, TickerId};

use super::{Strategy, StrategyConfig, StrategyContext};

pub struct LiquidTaker {
    ticker: TickerId,
    clip_qty: Qty,
    ratio_band: f64,
}

impl Strategy for LiquidTaker {
    fn create(config: &StrategyConfig) -> Self {
        LiquidTaker {
            ticker: config.ticker.clone(),
            clip_qty: config.clip_qty,
            ratio_band: config.taker_ratio_band,
        }
    }

    fn on_orderbook_updated(
        &mut self,
        _ctx: &mut StrategyContext<'_>,
        _ticker: &TickerId,
        _price: Price,
        _side: Side,
        _book: &MarketOrderBook,
    ) {
    }

    fn on_trade_updated(
        &mut self,
        ctx: &mut StrategyContext<'_>,
        trade: &MarketData,
        book: &MarketOrderBook,
    ) {
        if trade.ticker != self.ticker || !trade.side.is_tradable() {
            return;
        }
        let ratio = ctx.features.agg_trade_qty_ratio();
        if !ratio.is_finite() || ratio < self.ratio_band {
            return;
        }
        let bbo = book.get_bbo();
        if !bbo.is_complete() {
            return;
        }

        // Join the aggressor: cross the spread on their side.
        let (side, price) = if trade.side == Side::Buy {
            (Side::Buy, bbo.ask_price)
        } else {
            (Side::Sell, bbo.bid_price)
        };
        let intent = QuoteIntent::taker(self.ticker.clone(), side, price, self.clip_qty);
        ctx.log.info(format!(
            "taker joining {side} flow at {price} (ratio {ratio:.3})"
        ));
        ctx.orders.submit(std::slice::from_ref(&intent));
    }

    fn on_order_updated(&mut self, ctx: &mut StrategyContext<'_>, report: &ExecutionReport) {
        ctx.log.trace(format!("taker saw {report}"));
    }
}
