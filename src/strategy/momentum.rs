//! OBI-VWAP momentum strategy.
//!
//! On every trade: compute the order-book imbalance over the top N
//! levels, the deviation of the mid from the rolling VWAP normalised by
//! the spread, and take `sign(delta * obi)` as direction with size
//! `|signal| * position_variance`. Does nothing while the combined signal
//! sits below the exit threshold.

use crate::book::MarketOrderBook;
use crate::features::FeatureEngine;
use crate::oe::ExecutionReport;
use crate::orders::QuoteIntent;
use crate::types::{MarketData, Price, Qty, Side, TickerId, scale};

use super::{Strategy, StrategyConfig, StrategyContext};

const MIN_SPREAD_DENOM: f64 = 0.01;

pub struct ObiVwapMomentum {
    ticker: TickerId,
    safety_margin_raw: i64,
    enter_threshold: f64,
    exit_threshold: f64,
    position_variance: f64,
    obi_levels: usize,
    bid_qty: Vec<Qty>,
    ask_qty: Vec<Qty>,
    bid_idx: Vec<usize>,
    ask_idx: Vec<usize>,
}

impl ObiVwapMomentum {
    fn sized_qty(&self, signal: f64) -> Qty {
        let qty_units = signal * self.position_variance;
        Qty::from_raw((qty_units * scale::QTY_SCALE as f64).round() as i64)
    }
}

impl Strategy for ObiVwapMomentum {
    fn create(config: &StrategyConfig) -> Self {
        ObiVwapMomentum {
            ticker: config.ticker.clone(),
            safety_margin_raw: config.safety_margin_raw,
            enter_threshold: config.enter_threshold,
            exit_threshold: config.exit_threshold,
            position_variance: config.position_variance / config.variance_denominator,
            obi_levels: config.obi_levels,
            bid_qty: Vec::with_capacity(config.obi_levels),
            ask_qty: Vec::with_capacity(config.obi_levels),
            bid_idx: Vec::with_capacity(config.obi_levels),
            ask_idx: Vec::with_capacity(config.obi_levels),
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
        if trade.ticker != self.ticker {
            return;
        }
        let bbo = book.get_bbo();
        if !bbo.is_complete() || bbo.ask_price.raw() < bbo.bid_price.raw() {
            ctx.log.trace("momentum: unusable BBO, skipping");
            return;
        }

        book.peek_qty(Side::Buy, self.obi_levels, &mut self.bid_qty, &mut self.bid_idx);
        book.peek_qty(Side::Sell, self.obi_levels, &mut self.ask_qty, &mut self.ask_idx);
        let obi = FeatureEngine::obi_from_levels(&self.bid_qty, &self.ask_qty);

        let vwap = ctx.features.vwap();
        if !vwap.is_finite() {
            return;
        }
        let mid = (bbo.bid_price.raw() + bbo.ask_price.raw()) as f64 * 0.5;
        let spread = ctx.features.spread();
        let denom = if spread.is_finite() && spread > 0.0 {
            spread
        } else {
            ctx.log
                .trace(format!("momentum: non-positive spread ({spread})"));
            MIN_SPREAD_DENOM
        };
        let delta = (mid - vwap) / denom;
        let signal = (delta * obi).abs();

        ctx.log.trace(format!(
            "momentum delta:{delta:.4} obi:{obi:.4} signal:{signal:.4} mid:{mid:.1} vwap:{vwap:.1}"
        ));

        if signal < self.exit_threshold {
            return;
        }

        let direction = delta * obi;
        let qty = self.sized_qty(signal);
        if qty.raw() <= 0 {
            return;
        }

        if direction > self.enter_threshold {
            let price = Price::from_raw(bbo.bid_price.raw() - self.safety_margin_raw);
            let intent = QuoteIntent::maker(self.ticker.clone(), Side::Buy, price, qty);
            ctx.log.info(format!(
                "momentum buy {qty}@{price} signal:{signal:.4} obi:{obi:.4}"
            ));
            ctx.orders.submit(std::slice::from_ref(&intent));
        } else if direction < -self.enter_threshold {
            let price = Price::from_raw(bbo.ask_price.raw() + self.safety_margin_raw);
            let intent = QuoteIntent::maker(self.ticker.clone(), Side::Sell, price, qty);
            ctx.log.info(format!(
                "momentum sell {qty}@{price} signal:{signal:.4} obi:{obi:.4}"
            ));
            ctx.orders.submit(std::slice::from_ref(&intent));
        }
    }

    fn on_order_updated(&mut self, _ctx: &mut StrategyContext<'_>, _report: &ExecutionReport) {}
}
