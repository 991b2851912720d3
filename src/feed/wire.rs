//! Decoded wire-message model for the market-data feed.
//!
//! Prices and quantities are already converted to the internal fixed-point
//! raw representation by the decoders; everything downstream of
//! [`WireMessage`] is float-free. Both decoder paths produce identical
//! values for the same payload, which the equivalence tests rely on.

use crate::types::{Price, Qty};

/// One price level as decoded from the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireLevel {
    pub price_raw: i64,
    pub qty_raw: i64,
}

impl WireLevel {
    pub fn price(&self) -> Price {
        Price::from_raw(self.price_raw)
    }

    pub fn qty(&self) -> Qty {
        Qty::from_raw(self.qty_raw)
    }
}

/// Incremental depth update (`<symbol>@depth`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DepthUpdate {
    pub symbol: String,
    pub first_update_id: u64,
    pub last_update_id: u64,
    /// Final update id of the previous stream event (`pu`), used for gap
    /// detection.
    pub prev_end_update_id: u64,
    pub bids: Vec<WireLevel>,
    pub asks: Vec<WireLevel>,
}

/// Aggregated trade print (`<symbol>@aggTrade`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TradeEvent {
    pub symbol: String,
    pub price_raw: i64,
    pub qty_raw: i64,
    /// `true` when the buyer was the resting maker, i.e. the aggressor
    /// sold.
    pub is_buyer_maker: bool,
}

/// Top-of-book ticker (`<symbol>@bookTicker`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BookTickerEvent {
    pub symbol: String,
    pub update_id: u64,
    pub bid_price_raw: i64,
    pub bid_qty_raw: i64,
    pub ask_price_raw: i64,
    pub ask_qty_raw: i64,
}

/// Depth snapshot response to an explicit request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DepthSnapshot {
    /// Request id, `snapshot_<SYMBOL>` by convention.
    pub id: String,
    pub last_update_id: u64,
    pub bids: Vec<WireLevel>,
    pub asks: Vec<WireLevel>,
}

impl DepthSnapshot {
    /// Symbol embedded in the request id, when present.
    pub fn symbol(&self) -> Option<&str> {
        let (_, symbol) = self.id.split_once('_')?;
        if symbol.is_empty() { None } else { Some(symbol) }
    }
}

/// Error payload of a rejected API request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiError {
    pub code: i64,
    pub msg: String,
}

/// Generic API acknowledgement/rejection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiResponse {
    pub id: String,
    pub status: i64,
    pub error: Option<ApiError>,
}

/// One tradable symbol from the exchange-info endpoint, reduced to the
/// filters the engine consumes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExchangeSymbol {
    pub symbol: String,
    pub quote_asset: String,
    pub tick_size: Option<String>,
    pub min_qty: Option<String>,
    pub max_qty: Option<String>,
    pub step_size: Option<String>,
}

/// Exchange-info response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExchangeInfo {
    pub symbols: Vec<ExchangeSymbol>,
}

/// Tagged union over every message the feed can decode. `MonoState` is
/// the no-op result for unrecognised or malformed payloads.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WireMessage {
    #[default]
    MonoState,
    Depth(DepthUpdate),
    Trade(TradeEvent),
    BookTicker(BookTickerEvent),
    Snapshot(DepthSnapshot),
    Api(ApiResponse),
    ExchangeInfo(ExchangeInfo),
}

impl WireMessage {
    pub fn is_mono_state(&self) -> bool {
        matches!(self, WireMessage::MonoState)
    }
}
