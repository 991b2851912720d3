//! Two-sided passive market maker.
//!
//! Quotes one clip on each side of the BBO at a fixed safety margin and
//! re-quotes whenever the touch moves. The order manager owns replace
//! mechanics; this strategy only states the desired levels.

use crate::book::MarketOrderBook;
use crate::oe::ExecutionReport;
use crate::orders::QuoteIntent;
use crate::types::{MarketData, Price, Qty, Side, TickerId};

use super::{Strategy, StrategyConfig, StrategyContext};

pub struct MarketMaker {
    ticker: TickerId,
    clip_qty: Qty,
    safety_margin_raw: i64,
    last_bid_raw: i64,
    last_ask_raw: i64,
}

impl Strategy for MarketMaker {
    fn create(config: &StrategyConfig) -> Self {
        MarketMaker {
            ticker: config.ticker.clone(),
            clip_qty: config.clip_qty,
            safety_margin_raw: config.safety_margin_raw,
            last_bid_raw: i64::MIN,
            last_ask_raw: i64::MIN,
        }
    }

    fn on_orderbook_updated(
        &mut self,
        ctx: &mut StrategyContext<'_>,
        ticker: &TickerId,
        _price: Price,
        _side: Side,
        book: &MarketOrderBook,
    ) {
        if *ticker != self.ticker {
            return;
        }
        let bbo = book.get_bbo();
        if !bbo.is_complete() {
            ctx.log.trace("maker: incomplete BBO, not quoting");
            return;
        }

        let bid_raw = bbo.bid_price.raw() - self.safety_margin_raw;
        let ask_raw = bbo.ask_price.raw() + self.safety_margin_raw;
        if bid_raw == self.last_bid_raw && ask_raw == self.last_ask_raw {
            return;
        }
        self.last_bid_raw = bid_raw;
        self.last_ask_raw = ask_raw;

        let intents = [
            QuoteIntent::maker(
                self.ticker.clone(),
                Side::Buy,
                Price::from_raw(bid_raw),
                self.clip_qty,
            ),
            QuoteIntent::maker(
                self.ticker.clone(),
                Side::Sell,
                Price::from_raw(ask_raw),
                self.clip_qty,
            ),
        ];
        ctx.log.trace(format!(
            "maker quoting {}@{} X {}@{}",
            self.clip_qty,
            Price::from_raw(bid_raw),
            self.clip_qty,
            Price::from_raw(ask_raw)
        ));
        ctx.orders.submit(&intents);
    }

    fn on_trade_updated(
        &mut self,
        _ctx: &mut StrategyContext<'_>,
        _trade: &MarketData,
        _book: &MarketOrderBook,
    ) {
    }

    fn on_order_updated(&mut self, ctx: &mut StrategyContext<'_>, report: &ExecutionReport) {
        ctx.log.trace(format!("maker saw {report}"));
    }
}
