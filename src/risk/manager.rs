//! Pre-trade risk gate.
//!
//! Evaluates every outgoing intent against per-symbol limits and reports
//! the specific breach. The gate never sends or blocks orders itself; the
//! order manager acts on the result.

use rustc_hash::FxHashMap;

use crate::logging::LogProducer;
use crate::types::{PnlRaw, Qty, Side, TickerId};

/// Outcome of a pre-trade check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskCheckResult {
    Allowed,
    /// Order quantity exceeds the per-order limit.
    BreachesQty,
    /// Projected exposure exceeds the position limit.
    BreachesPosition,
    /// Accumulated loss is past the stop.
    BreachesLoss,
}

impl std::fmt::Display for RiskCheckResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskCheckResult::Allowed => "ALLOWED",
            RiskCheckResult::BreachesQty => "QTY_BREACH",
            RiskCheckResult::BreachesPosition => "POSITION_BREACH",
            RiskCheckResult::BreachesLoss => "LOSS_BREACH",
        };
        f.write_str(s)
    }
}

/// Per-symbol limits. `max_loss` is negative: trading stops once total
/// PnL drops below it.
#[derive(Debug, Clone, Copy)]
pub struct RiskConfig {
    pub max_position: Qty,
    pub max_order_size: Qty,
    pub max_loss: PnlRaw,
}

pub struct RiskManager {
    log: LogProducer,
    limits: FxHashMap<TickerId, RiskConfig>,
}

impl RiskManager {
    pub fn new(log: LogProducer) -> Self {
        RiskManager {
            log,
            limits: FxHashMap::default(),
        }
    }

    pub fn set_limits(&mut self, ticker: TickerId, config: RiskConfig) {
        self.limits.insert(ticker, config);
    }

    /// Check one intent. `signed_exposure_raw` is the current net
    /// exposure in raw quantity units including reserved (live + pending)
    /// quantity; `total_pnl` is the keeper's current total.
    pub fn check_pre_trade(
        &self,
        ticker: &TickerId,
        side: Side,
        qty: Qty,
        signed_exposure_raw: i64,
        total_pnl: PnlRaw,
    ) -> RiskCheckResult {
        let Some(limits) = self.limits.get(ticker) else {
            // No limits configured for this symbol: fail closed.
            self.log
                .error(format!("no risk limits configured for {ticker}; rejecting"));
            return RiskCheckResult::BreachesPosition;
        };

        if qty.raw() > limits.max_order_size.raw() {
            return RiskCheckResult::BreachesQty;
        }

        let projected = signed_exposure_raw + side.sign() * qty.raw();
        if projected.abs() > limits.max_position.raw() {
            return RiskCheckResult::BreachesPosition;
        }

        if total_pnl < limits.max_loss {
            return RiskCheckResult::BreachesLoss;
        }

        RiskCheckResult::Allowed
    }
}
