//! Position and PnL accounting.
//!
//! All accounting is integer: position in raw quantity units, VWAP
//! accumulators and PnL in `i128` at the `price_raw * qty_raw` scale.
//! `total_pnl == realized + unrealized` holds after every event.

use rustc_hash::FxHashMap;

use crate::book::Bbo;
use crate::logging::LogProducer;
use crate::oe::ExecutionReport;
use crate::types::{PnlRaw, Price, Qty, SIDE_COUNT, Side, TickerId, pnl_to_f64};

/// Running position state for one symbol.
#[derive(Debug, Clone, Default)]
pub struct PositionInfo {
    /// Net position in raw quantity units; positive is long.
    position_raw: i64,
    /// Open notional per side: sum of `price_raw * qty_raw` still open.
    open_vwap: [i128; SIDE_COUNT],
    real_pnl: PnlRaw,
    unreal_pnl: PnlRaw,
    total_pnl: PnlRaw,
    /// Cumulative traded volume in raw quantity units.
    volume_raw: i64,
    last_bbo: Option<Bbo>,
}

impl PositionInfo {
    /// Fold one fill into the position.
    ///
    /// Extending the position (same sign, or from flat) accumulates the
    /// side's open notional. Reducing realises PnL on the reduced portion
    /// against the opposing VWAP and rescales that VWAP to the remaining
    /// size; a flip seeds the new side with the residual.
    pub fn add_fill(&mut self, side: Side, price: Price, last_qty: Qty) {
        let sgn = side.sign();
        if sgn == 0 || last_qty.raw() <= 0 {
            return;
        }
        let old_position = self.position_raw;
        let idx = side.index();
        let opp = side.opposite_index();

        self.position_raw += last_qty.raw() * sgn;
        self.volume_raw += last_qty.raw();

        if old_position * sgn >= 0 {
            self.open_vwap[idx] += price.raw() as i128 * last_qty.raw() as i128;
        } else {
            let opp_vwap = self.open_vwap[opp] / old_position.unsigned_abs() as i128;
            self.open_vwap[opp] = opp_vwap * self.position_raw.unsigned_abs() as i128;
            let reduced = last_qty.raw().min(old_position.abs()) as i128;
            self.real_pnl += reduced * (opp_vwap - price.raw() as i128) * sgn as i128;
            if (self.position_raw as i128) * (old_position as i128) < 0 {
                // Flipped through flat: the residual opens the new side.
                self.open_vwap[idx] =
                    price.raw() as i128 * self.position_raw.unsigned_abs() as i128;
                self.open_vwap[opp] = 0;
            }
        }

        if self.position_raw == 0 {
            self.open_vwap = [0; SIDE_COUNT];
            self.unreal_pnl = 0;
        } else {
            self.unreal_pnl = self.mark_to(price.raw());
        }
        self.total_pnl = self.real_pnl + self.unreal_pnl;
    }

    /// Re-mark unrealised PnL against the BBO mid. No-op while flat or
    /// while either side of the book is missing.
    pub fn update_bbo(&mut self, bbo: Bbo) -> bool {
        self.last_bbo = Some(bbo);
        if self.position_raw == 0 {
            return false;
        }
        let Some(mid_raw) = bbo.mid_raw() else {
            return false;
        };
        let old_total = self.total_pnl;
        self.unreal_pnl = self.mark_to(mid_raw);
        self.total_pnl = self.real_pnl + self.unreal_pnl;
        self.total_pnl != old_total
    }

    /// Unrealised PnL of the open position against `mark_raw`, without
    /// dividing the VWAP accumulator (exact integer math).
    fn mark_to(&self, mark_raw: i64) -> PnlRaw {
        let abs_pos = self.position_raw.unsigned_abs() as i128;
        if self.position_raw > 0 {
            mark_raw as i128 * abs_pos - self.open_vwap[Side::Buy.index()]
        } else {
            self.open_vwap[Side::Sell.index()] - mark_raw as i128 * abs_pos
        }
    }

    pub fn position_raw(&self) -> i64 {
        self.position_raw
    }

    /// Average open price of one side in raw price units, 0 while flat.
    pub fn open_vwap_raw(&self, side: Side) -> i64 {
        if self.position_raw == 0 {
            return 0;
        }
        (self.open_vwap[side.index()] / self.position_raw.unsigned_abs() as i128) as i64
    }

    pub fn realized_pnl(&self) -> PnlRaw {
        self.real_pnl
    }

    pub fn unrealized_pnl(&self) -> PnlRaw {
        self.unreal_pnl
    }

    pub fn total_pnl(&self) -> PnlRaw {
        self.total_pnl
    }

    pub fn volume_raw(&self) -> i64 {
        self.volume_raw
    }

    pub fn last_bbo(&self) -> Option<Bbo> {
        self.last_bbo
    }

    pub fn describe(&self) -> String {
        format!(
            "Position{{pos:{} u-pnl:{:.4} r-pnl:{:.4} t-pnl:{:.4} vol:{}}}",
            self.position_raw,
            pnl_to_f64(self.unreal_pnl),
            pnl_to_f64(self.real_pnl),
            pnl_to_f64(self.total_pnl),
            self.volume_raw,
        )
    }
}

/// Per-symbol position book, updated on fills and BBO changes.
pub struct PositionKeeper {
    log: LogProducer,
    positions: FxHashMap<TickerId, PositionInfo>,
}

impl PositionKeeper {
    pub fn new(log: LogProducer) -> Self {
        PositionKeeper {
            log,
            positions: FxHashMap::default(),
        }
    }

    /// Apply a fill from an execution report.
    pub fn add_fill(&mut self, report: &ExecutionReport) {
        let info = self.positions.entry(report.symbol.clone()).or_default();
        info.add_fill(report.side, report.price, report.last_qty);
        self.log
            .info(format!("{} {} {}", report.symbol, info.describe(), report));
    }

    /// Re-mark a symbol against a fresh BBO.
    pub fn update_bbo(&mut self, ticker: &TickerId, bbo: Bbo) {
        if let Some(info) = self.positions.get_mut(ticker) {
            if info.update_bbo(bbo) {
                self.log.info(format!("{} {}", ticker, info.describe()));
            }
        }
    }

    pub fn position(&self, ticker: &TickerId) -> Option<&PositionInfo> {
        self.positions.get(ticker)
    }

    pub fn position_mut(&mut self, ticker: &TickerId) -> &mut PositionInfo {
        self.positions.entry(ticker.clone()).or_default()
    }

    /// Sum of total PnL across symbols.
    pub fn total_pnl(&self) -> PnlRaw {
        self.positions.values().map(|p| p.total_pnl()).sum()
    }
}
