//! Stateless market indicators recomputed from the book and trade flow.
//!
//! The feature engine keeps only O(1) running state: the depth-weighted
//! market price, the last aggressor-to-top-qty ratio, the spread and a
//! rolling trade VWAP. Strategies read features after every book or trade
//! callback; values are `f64` signals, never fed back into order pricing
//! without requantisation.

use std::collections::VecDeque;

use crate::book::Bbo;
use crate::logging::LogProducer;
use crate::types::{MarketData, Qty};

const DEFAULT_VWAP_WINDOW: usize = 256;

/// Rolling indicators for one symbol.
pub struct FeatureEngine {
    log: LogProducer,
    /// Depth-weighted market price, in raw price units.
    market_price: f64,
    /// Last trade qty over the opposing top-of-book qty.
    agg_trade_qty_ratio: f64,
    /// Spread in raw price units.
    spread: f64,
    /// Rolling VWAP over recent trades, in raw price units.
    vwap: f64,
    window: VecDeque<(i64, i64)>,
    window_notional: i128,
    window_volume: i128,
    vwap_window: usize,
}

impl FeatureEngine {
    pub fn new(log: LogProducer) -> Self {
        Self::with_window(log, DEFAULT_VWAP_WINDOW)
    }

    pub fn with_window(log: LogProducer, vwap_window: usize) -> Self {
        FeatureEngine {
            log,
            market_price: f64::NAN,
            agg_trade_qty_ratio: f64::NAN,
            spread: f64::NAN,
            vwap: f64::NAN,
            window: VecDeque::with_capacity(vwap_window),
            window_notional: 0,
            window_volume: 0,
            vwap_window: vwap_window.max(1),
        }
    }

    /// Refresh book-derived features after a book update.
    pub fn on_orderbook_updated(&mut self, bbo: &Bbo) {
        if !bbo.is_complete() {
            return;
        }
        let bid_qty = bbo.bid_qty.raw() as f64;
        let ask_qty = bbo.ask_qty.raw() as f64;
        let depth = bid_qty + ask_qty;
        if depth > 0.0 {
            self.market_price =
                (bbo.bid_price.raw() as f64 * ask_qty + bbo.ask_price.raw() as f64 * bid_qty)
                    / depth;
        }
        self.spread = (bbo.ask_price.raw() - bbo.bid_price.raw()) as f64;
        self.log.trace(format!(
            "features book mkt-price:{:.2} spread:{:.2}",
            self.market_price, self.spread
        ));
    }

    /// Fold one trade print into the aggressor ratio and rolling VWAP.
    pub fn on_trade_updated(&mut self, trade: &MarketData, bbo: &Bbo) {
        if bbo.is_complete() {
            let opposing_qty = if trade.side == crate::types::Side::Buy {
                bbo.ask_qty
            } else {
                bbo.bid_qty
            };
            if opposing_qty.raw() > 0 {
                self.agg_trade_qty_ratio = trade.qty.raw() as f64 / opposing_qty.raw() as f64;
            }
        }

        let price_raw = trade.price.raw();
        let qty_raw = trade.qty.raw();
        if qty_raw > 0 {
            self.window.push_back((price_raw, qty_raw));
            self.window_notional += price_raw as i128 * qty_raw as i128;
            self.window_volume += qty_raw as i128;
            while self.window.len() > self.vwap_window {
                if let Some((old_price, old_qty)) = self.window.pop_front() {
                    self.window_notional -= old_price as i128 * old_qty as i128;
                    self.window_volume -= old_qty as i128;
                }
            }
            if self.window_volume > 0 {
                self.vwap = self.window_notional as f64 / self.window_volume as f64;
            }
        }

        self.log.trace(format!(
            "features trade ratio:{:.4} vwap:{:.2}",
            self.agg_trade_qty_ratio, self.vwap
        ));
    }

    /// Depth-weighted market price in raw price units (NaN until both
    /// sides have been seen).
    pub fn market_price(&self) -> f64 {
        self.market_price
    }

    /// Last aggressor trade qty over the opposing top-of-book qty.
    pub fn agg_trade_qty_ratio(&self) -> f64 {
        self.agg_trade_qty_ratio
    }

    /// Spread in raw price units.
    pub fn spread(&self) -> f64 {
        self.spread
    }

    /// Rolling trade VWAP in raw price units.
    pub fn vwap(&self) -> f64 {
        self.vwap
    }

    /// Order-book imbalance in `[-1, 1]` from peeked per-level
    /// quantities: positive means bid-heavy.
    pub fn obi_from_levels(bid_qty: &[Qty], ask_qty: &[Qty]) -> f64 {
        let bid_sum: i128 = bid_qty.iter().map(|q| q.raw() as i128).sum();
        let ask_sum: i128 = ask_qty.iter().map(|q| q.raw() as i128).sum();
        let total = bid_sum + ask_sum;
        if total <= 0 {
            return 0.0;
        }
        (bid_sum - ask_sum) as f64 / total as f64
    }
}
