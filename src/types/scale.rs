//! Per-symbol fixed-point scale configuration.
//!
//! Scales are fixed at build time: exactly one `symbol-*` cargo feature
//! selects the constants below, and every price/quantity in the engine is
//! an `i64` in that scale. The exchange-visible ("actual") scale may be
//! coarser than the internal one; the order-entry encoder truncates toward
//! zero when formatting outbound decimals.

#[cfg(not(any(
    feature = "symbol-btcusdc",
    feature = "symbol-btcusdt",
    feature = "symbol-xrpusdc"
)))]
compile_error!("exactly one `symbol-*` feature must be enabled to fix the value scales");

/// Internal price scale (raw units per 1.0 of price).
#[cfg(feature = "symbol-btcusdc")]
pub const PRICE_SCALE: i64 = 10;
/// Internal quantity scale (raw units per 1.0 of quantity).
#[cfg(feature = "symbol-btcusdc")]
pub const QTY_SCALE: i64 = 1_000;
/// Exchange-visible price scale.
#[cfg(feature = "symbol-btcusdc")]
pub const PRICE_SCALE_ACTUAL: i64 = 10;
/// Exchange-visible quantity scale.
#[cfg(feature = "symbol-btcusdc")]
pub const QTY_SCALE_ACTUAL: i64 = 1_000;
/// Decimal digits carried by the internal price scale.
#[cfg(feature = "symbol-btcusdc")]
pub const PRICE_PRECISION: u32 = 1;
/// Decimal digits carried by the internal quantity scale.
#[cfg(feature = "symbol-btcusdc")]
pub const QTY_PRECISION: u32 = 3;

#[cfg(all(feature = "symbol-btcusdt", not(feature = "symbol-btcusdc")))]
pub const PRICE_SCALE: i64 = 100;
#[cfg(all(feature = "symbol-btcusdt", not(feature = "symbol-btcusdc")))]
pub const QTY_SCALE: i64 = 100_000;
#[cfg(all(feature = "symbol-btcusdt", not(feature = "symbol-btcusdc")))]
pub const PRICE_SCALE_ACTUAL: i64 = 100;
#[cfg(all(feature = "symbol-btcusdt", not(feature = "symbol-btcusdc")))]
pub const QTY_SCALE_ACTUAL: i64 = 100_000;
#[cfg(all(feature = "symbol-btcusdt", not(feature = "symbol-btcusdc")))]
pub const PRICE_PRECISION: u32 = 2;
#[cfg(all(feature = "symbol-btcusdt", not(feature = "symbol-btcusdc")))]
pub const QTY_PRECISION: u32 = 5;

#[cfg(all(
    feature = "symbol-xrpusdc",
    not(any(feature = "symbol-btcusdc", feature = "symbol-btcusdt"))
))]
pub const PRICE_SCALE: i64 = 1_000_000;
#[cfg(all(
    feature = "symbol-xrpusdc",
    not(any(feature = "symbol-btcusdc", feature = "symbol-btcusdt"))
))]
pub const QTY_SCALE: i64 = 1_000;
#[cfg(all(
    feature = "symbol-xrpusdc",
    not(any(feature = "symbol-btcusdc", feature = "symbol-btcusdt"))
))]
pub const PRICE_SCALE_ACTUAL: i64 = 10_000;
#[cfg(all(
    feature = "symbol-xrpusdc",
    not(any(feature = "symbol-btcusdc", feature = "symbol-btcusdt"))
))]
pub const QTY_SCALE_ACTUAL: i64 = 10;
#[cfg(all(
    feature = "symbol-xrpusdc",
    not(any(feature = "symbol-btcusdc", feature = "symbol-btcusdt"))
))]
pub const PRICE_PRECISION: u32 = 6;
#[cfg(all(
    feature = "symbol-xrpusdc",
    not(any(feature = "symbol-btcusdc", feature = "symbol-btcusdt"))
))]
pub const QTY_PRECISION: u32 = 3;

/// Scale of PnL values: one unit of `price_raw * qty_raw`.
pub const PNL_SCALE: i128 = (PRICE_SCALE as i128) * (QTY_SCALE as i128);

/// Scale used by integer z-scores and other dimensionless signals
/// (four implied decimal places).
pub const SIGNAL_SCALE: i64 = 10_000;

const _: () = assert!(PRICE_SCALE > 0 && QTY_SCALE > 0);
const _: () = assert!(PRICE_SCALE % PRICE_SCALE_ACTUAL == 0);
const _: () = assert!(QTY_SCALE % QTY_SCALE_ACTUAL == 0);
