//! Liquidity-wall detection.
//!
//! A "wall" is a large resting-quantity concentration near the touch. The
//! qualifying size is dynamic: a hybrid of the exponential moving average
//! of trade size (flow) and a percentile of the top-N book level sizes
//! (depth), floored by a configured minimum. The detector reports the
//! first level at or past the threshold on a side.

use crate::book::{LevelView, MarketOrderBook};
use crate::types::{Price, Qty, Side, scale};

#[derive(Debug, Clone)]
pub struct WallConfig {
    /// EMA alpha for trade-size flow at [`scale::SIGNAL_SCALE`].
    pub ema_alpha: i64,
    /// Book-depth percentile at [`scale::SIGNAL_SCALE`] (8000 = 80th).
    pub percentile: i64,
    /// Levels inspected per side.
    pub top_levels: usize,
    /// Hard floor for the wall size, in raw quantity units.
    pub min_wall_qty_raw: i64,
}

impl Default for WallConfig {
    fn default() -> Self {
        WallConfig {
            ema_alpha: 1_000,
            percentile: 8_000,
            top_levels: 10,
            min_wall_qty_raw: 1,
        }
    }
}

/// Dynamic qualifying size for walls.
#[derive(Debug)]
pub struct DynamicWallThreshold {
    config: WallConfig,
    ema_trade_qty_raw: i64,
    seeded: bool,
    scratch: Vec<i64>,
}

impl DynamicWallThreshold {
    pub fn new(config: WallConfig) -> Self {
        DynamicWallThreshold {
            ema_trade_qty_raw: 0,
            seeded: false,
            scratch: Vec::with_capacity(config.top_levels),
            config,
        }
    }

    /// Fold one trade size into the flow EMA.
    pub fn on_trade(&mut self, qty_raw: i64) {
        if qty_raw <= 0 {
            return;
        }
        if self.seeded {
            self.ema_trade_qty_raw +=
                self.config.ema_alpha * (qty_raw - self.ema_trade_qty_raw) / scale::SIGNAL_SCALE;
        } else {
            self.ema_trade_qty_raw = qty_raw;
            self.seeded = true;
        }
    }

    /// Current qualifying size given the visible level sizes of one side.
    pub fn threshold_raw(&mut self, level_qtys: &[Qty]) -> i64 {
        let percentile_qty = if level_qtys.is_empty() {
            0
        } else {
            self.scratch.clear();
            self.scratch.extend(level_qtys.iter().map(|q| q.raw()));
            self.scratch.sort_unstable();
            let rank =
                (self.scratch.len() - 1) as i64 * self.config.percentile / scale::SIGNAL_SCALE;
            self.scratch[rank as usize]
        };
        // Flow says how big prints run; depth says what "big" means on
        // this book. A wall must dominate both.
        self.ema_trade_qty_raw
            .max(percentile_qty)
            .max(self.config.min_wall_qty_raw)
    }

    pub fn flow_ema_raw(&self) -> i64 {
        self.ema_trade_qty_raw
    }
}

/// A detected liquidity wall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wall {
    pub idx: usize,
    pub price: Price,
    pub qty: Qty,
}

/// Scan one side for the nearest wall within `top_levels` of the touch.
pub fn detect_wall(
    book: &MarketOrderBook,
    side: Side,
    top_levels: usize,
    threshold_raw: i64,
) -> Option<Wall> {
    book.peek_levels(side, top_levels)
        .into_iter()
        .find(|level: &LevelView| level.qty.raw() >= threshold_raw)
        .map(|level| Wall {
            idx: level.idx,
            price: level.price,
            qty: level.qty,
        })
}
