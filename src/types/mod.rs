//! Core value types: fixed-point prices and quantities, sides, opaque
//! identifiers and the pooled market-data model.

pub mod fixed_point;
pub mod ids;
pub mod market;
pub mod scale;
pub mod side;

pub use fixed_point::FixedPoint;
pub use ids::{OrderId, TickerId};
pub use market::{BatchKind, MarketData, MarketUpdateData, MarketUpdateType};
pub use side::{SIDE_COUNT, Side};

/// Price in the symbol's internal scale.
pub type Price = FixedPoint<{ scale::PRICE_SCALE }>;

/// Quantity in the symbol's internal scale.
pub type Qty = FixedPoint<{ scale::QTY_SCALE }>;

/// Raw PnL value at [`scale::PNL_SCALE`] (`price_raw * qty_raw`).
pub type PnlRaw = i128;

/// Render a raw PnL value as a float for logging and reports.
#[inline]
pub fn pnl_to_f64(pnl: PnlRaw) -> f64 {
    pnl as f64 / scale::PNL_SCALE as f64
}
