//! Mean-reversion maker: robust z-score entry, wall-gated placement.
//!
//! Trades against stretched prices: when the last price sits far from the
//! rolling median (measured in robust z-score units) the strategy quotes
//! the reverting direction, but only when a liquidity wall on the quoting
//! side offers somewhere to lean. The entry threshold adapts to recent
//! volatility; inside the exit threshold the strategy stays idle.

mod robust_zscore;
mod wall;

pub use robust_zscore::{MAD_SCALE_FACTOR, RobustZScore, RobustZScoreConfig};
pub use wall::{DynamicWallThreshold, Wall, WallConfig, detect_wall};

use crate::book::MarketOrderBook;
use crate::oe::ExecutionReport;
use crate::orders::QuoteIntent;
use crate::types::{MarketData, Price, Qty, Side, TickerId, scale};

use super::{Strategy, StrategyConfig, StrategyContext};

pub struct MeanReversionMaker {
    ticker: TickerId,
    clip_qty: Qty,
    zscore: RobustZScore,
    wall_threshold: DynamicWallThreshold,
    wall_levels: usize,
    /// Entry/exit z-levels at [`scale::SIGNAL_SCALE`].
    enter_z: i64,
    exit_z: i64,
    level_qty: Vec<Qty>,
    level_idx: Vec<usize>,
}

impl MeanReversionMaker {
    fn quote(
        &mut self,
        ctx: &mut StrategyContext<'_>,
        book: &MarketOrderBook,
        side: Side,
        zscore: i64,
    ) {
        book.peek_qty(side, self.wall_levels, &mut self.level_qty, &mut self.level_idx);
        let threshold_raw = self.wall_threshold.threshold_raw(&self.level_qty);
        let Some(wall) = detect_wall(book, side, self.wall_levels, threshold_raw) else {
            ctx.log.trace(format!(
                "mean-reversion: no {side} wall >= {threshold_raw}, standing down"
            ));
            return;
        };

        // Lean on the wall: quote one tick inside it.
        let price_raw = if side == Side::Buy {
            wall.price.raw() + 1
        } else {
            wall.price.raw() - 1
        };
        let intent = QuoteIntent::maker(
            self.ticker.clone(),
            side,
            Price::from_raw(price_raw),
            self.clip_qty,
        );
        ctx.log.info(format!(
            "mean-reversion {side} {}@{} z:{} wall {}@{}",
            self.clip_qty,
            Price::from_raw(price_raw),
            zscore,
            wall.qty,
            wall.price
        ));
        ctx.orders.submit(std::slice::from_ref(&intent));
    }
}

impl Strategy for MeanReversionMaker {
    fn create(config: &StrategyConfig) -> Self {
        let zscore_config = RobustZScoreConfig {
            window_size: config.zscore_window,
            min_samples: config.zscore_min_samples,
            ..RobustZScoreConfig::default()
        };
        let wall_config = WallConfig::default();
        let wall_levels = wall_config.top_levels;
        MeanReversionMaker {
            ticker: config.ticker.clone(),
            clip_qty: config.clip_qty,
            zscore: RobustZScore::new(zscore_config),
            wall_threshold: DynamicWallThreshold::new(wall_config),
            wall_levels,
            enter_z: (config.enter_threshold * scale::SIGNAL_SCALE as f64) as i64,
            exit_z: (config.exit_threshold * scale::SIGNAL_SCALE as f64) as i64,
            level_qty: Vec::new(),
            level_idx: Vec::new(),
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
        if trade.ticker != self.ticker || !trade.price.is_valid() {
            return;
        }
        self.zscore.on_price(trade.price.raw());
        self.wall_threshold.on_trade(trade.qty.raw());

        let z = self.zscore.calculate_zscore(trade.price.raw());
        if z.abs() < self.exit_z {
            return;
        }
        let enter = self.zscore.get_adaptive_threshold(self.enter_z);
        ctx.log.trace(format!(
            "mean-reversion z:{z} enter:{enter} median:{}",
            self.zscore.get_median()
        ));

        if z >= enter {
            // Stretched high: fade it with a sell.
            self.quote(ctx, book, Side::Sell, z);
        } else if z <= -enter {
            // Stretched low: fade it with a buy.
            self.quote(ctx, book, Side::Buy, z);
        }
    }

    fn on_order_updated(&mut self, _ctx: &mut StrategyContext<'_>, _report: &ExecutionReport) {}
}
