//! Generic serde-based market-data decoder.
//!
//! Dispatch is prefix-driven: the first bytes of the payload and the
//! character after the `@` in the stream name select a branch, then a
//! schema-directed `serde_json` parse runs. This is the default decode
//! path; the one-pass decoder is an interchangeable fast alternative that
//! must produce byte-identical results.

use serde::Deserialize;

use crate::logging::LogProducer;
use crate::types::{Price, Qty};

use super::traits::MarketDecoder;
use super::wire::{
    ApiError, ApiResponse, BookTickerEvent, DepthSnapshot, DepthUpdate, ExchangeInfo,
    ExchangeSymbol, TradeEvent, WireLevel, WireMessage,
};

/// Position of the first key character in `{"X...`.
const FIRST_CHAR_OFFSET: usize = 2;
/// Minimum bytes before the `@` of a stream name.
const AT_SEARCH_START: usize = 12;
const MIN_PAYLOAD_LEN: usize = 8;

#[derive(Deserialize)]
struct RawEnvelope<T> {
    #[allow(dead_code)]
    stream: String,
    data: T,
}

#[derive(Deserialize)]
struct RawDepthData {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "U")]
    first_update_id: u64,
    #[serde(rename = "u")]
    last_update_id: u64,
    #[serde(rename = "pu", default)]
    prev_end_update_id: u64,
    #[serde(rename = "b")]
    bids: Vec<(String, String)>,
    #[serde(rename = "a")]
    asks: Vec<(String, String)>,
}

#[derive(Deserialize)]
struct RawTradeData {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "p")]
    price: String,
    #[serde(rename = "q")]
    quantity: String,
    #[serde(rename = "m")]
    is_buyer_maker: bool,
}

#[derive(Deserialize)]
struct RawBookTickerData {
    #[serde(rename = "u")]
    update_id: u64,
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "b")]
    bid_price: String,
    #[serde(rename = "B")]
    bid_qty: String,
    #[serde(rename = "a")]
    ask_price: String,
    #[serde(rename = "A")]
    ask_qty: String,
}

#[derive(Deserialize)]
struct RawSnapshot {
    id: String,
    #[allow(dead_code)]
    status: i64,
    result: RawSnapshotResult,
}

#[derive(Deserialize)]
struct RawSnapshotResult {
    #[serde(rename = "lastUpdateId")]
    last_update_id: u64,
    bids: Vec<(String, String)>,
    asks: Vec<(String, String)>,
}

#[derive(Deserialize)]
struct RawApiResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: i64,
    #[serde(default)]
    error: Option<RawApiError>,
}

#[derive(Deserialize)]
struct RawApiError {
    code: i64,
    msg: String,
}

#[derive(Deserialize)]
struct RawExchangeInfo {
    symbols: Vec<RawExchangeSymbol>,
}

#[derive(Deserialize)]
struct RawExchangeSymbol {
    symbol: String,
    #[serde(rename = "quoteAsset", default)]
    quote_asset: String,
    #[serde(default)]
    filters: Vec<RawSymbolFilter>,
}

#[derive(Deserialize)]
struct RawSymbolFilter {
    #[serde(rename = "filterType")]
    filter_type: String,
    #[serde(rename = "tickSize", default)]
    tick_size: Option<String>,
    #[serde(rename = "minQty", default)]
    min_qty: Option<String>,
    #[serde(rename = "maxQty", default)]
    max_qty: Option<String>,
    #[serde(rename = "stepSize", default)]
    step_size: Option<String>,
}

fn parse_levels(raw: &[(String, String)]) -> Option<Vec<WireLevel>> {
    let mut out = Vec::with_capacity(raw.len());
    for (price, qty) in raw {
        out.push(WireLevel {
            price_raw: Price::parse(price)?.raw(),
            qty_raw: Qty::parse(qty)?.raw(),
        });
    }
    Some(out)
}

/// Serde-backed decoder over the documented stream schema.
pub struct GenericJsonDecoder {
    log: LogProducer,
}

impl GenericJsonDecoder {
    pub fn new(log: LogProducer) -> Self {
        Self { log }
    }

    fn decode_depth(&self, payload: &str) -> WireMessage {
        let Ok(raw) = serde_json::from_str::<RawEnvelope<RawDepthData>>(payload) else {
            self.log.debug("malformed depth payload");
            return WireMessage::MonoState;
        };
        let (Some(bids), Some(asks)) = (parse_levels(&raw.data.bids), parse_levels(&raw.data.asks))
        else {
            self.log.debug("unparsable depth level");
            return WireMessage::MonoState;
        };
        WireMessage::Depth(DepthUpdate {
            symbol: raw.data.symbol,
            first_update_id: raw.data.first_update_id,
            last_update_id: raw.data.last_update_id,
            prev_end_update_id: raw.data.prev_end_update_id,
            bids,
            asks,
        })
    }

    fn decode_trade(&self, payload: &str) -> WireMessage {
        let Ok(raw) = serde_json::from_str::<RawEnvelope<RawTradeData>>(payload) else {
            self.log.debug("malformed trade payload");
            return WireMessage::MonoState;
        };
        let (Some(price), Some(qty)) = (Price::parse(&raw.data.price), Qty::parse(&raw.data.quantity))
        else {
            return WireMessage::MonoState;
        };
        WireMessage::Trade(TradeEvent {
            symbol: raw.data.symbol,
            price_raw: price.raw(),
            qty_raw: qty.raw(),
            is_buyer_maker: raw.data.is_buyer_maker,
        })
    }

    fn decode_book_ticker(&self, payload: &str) -> WireMessage {
        let Ok(raw) = serde_json::from_str::<RawEnvelope<RawBookTickerData>>(payload) else {
            self.log.debug("malformed bookTicker payload");
            return WireMessage::MonoState;
        };
        let data = raw.data;
        let parsed = (
            Price::parse(&data.bid_price),
            Qty::parse(&data.bid_qty),
            Price::parse(&data.ask_price),
            Qty::parse(&data.ask_qty),
        );
        let (Some(bp), Some(bq), Some(ap), Some(aq)) = parsed else {
            return WireMessage::MonoState;
        };
        WireMessage::BookTicker(BookTickerEvent {
            symbol: data.symbol,
            update_id: data.update_id,
            bid_price_raw: bp.raw(),
            bid_qty_raw: bq.raw(),
            ask_price_raw: ap.raw(),
            ask_qty_raw: aq.raw(),
        })
    }

    fn decode_snapshot(&self, payload: &str) -> WireMessage {
        let Ok(raw) = serde_json::from_str::<RawSnapshot>(payload) else {
            // Plain API acks/rejects share the `{"id":...` prefix.
            return self.decode_api_response(payload);
        };
        let (Some(bids), Some(asks)) = (
            parse_levels(&raw.result.bids),
            parse_levels(&raw.result.asks),
        ) else {
            return WireMessage::MonoState;
        };
        WireMessage::Snapshot(DepthSnapshot {
            id: raw.id,
            last_update_id: raw.result.last_update_id,
            bids,
            asks,
        })
    }

    fn decode_exchange_info(&self, payload: &str) -> WireMessage {
        let Ok(raw) = serde_json::from_str::<RawExchangeInfo>(payload) else {
            self.log.debug("malformed exchangeInfo payload");
            return WireMessage::MonoState;
        };
        let symbols = raw
            .symbols
            .into_iter()
            .map(|sym| {
                let mut out = ExchangeSymbol {
                    symbol: sym.symbol,
                    quote_asset: sym.quote_asset,
                    ..ExchangeSymbol::default()
                };
                for filter in sym.filters {
                    match filter.filter_type.as_str() {
                        "PRICE_FILTER" => out.tick_size = filter.tick_size,
                        "LOT_SIZE" => {
                            out.min_qty = filter.min_qty;
                            out.max_qty = filter.max_qty;
                            out.step_size = filter.step_size;
                        }
                        _ => {}
                    }
                }
                out
            })
            .collect();
        WireMessage::ExchangeInfo(ExchangeInfo { symbols })
    }

    fn decode_api_response(&self, payload: &str) -> WireMessage {
        let Ok(raw) = serde_json::from_str::<RawApiResponse>(payload) else {
            return WireMessage::MonoState;
        };
        if raw.id.is_empty() && raw.error.is_none() {
            // Not addressed to any request: nothing to dispatch.
            return WireMessage::MonoState;
        }
        WireMessage::Api(ApiResponse {
            id: raw.id,
            status: raw.status,
            error: raw.error.map(|e| ApiError {
                code: e.code,
                msg: e.msg,
            }),
        })
    }
}

impl MarketDecoder for GenericJsonDecoder {
    fn decode(&self, payload: &str) -> WireMessage {
        let bytes = payload.as_bytes();
        if bytes.len() < MIN_PAYLOAD_LEN {
            return WireMessage::MonoState;
        }

        // snapshot:    {"id":"snapshot_...
        // stream data: {"stream":"<sym>@<type>...
        // exchange:    {"timezone":"UTC"...
        match bytes[FIRST_CHAR_OFFSET] {
            b's' => {
                let tail = &bytes[AT_SEARCH_START.min(bytes.len())..];
                if let Some(at) = tail.iter().position(|&b| b == b'@') {
                    match tail.get(at + 1) {
                        Some(b'd') => return self.decode_depth(payload),
                        Some(b'a') => return self.decode_trade(payload),
                        Some(b'b') => return self.decode_book_ticker(payload),
                        _ => {}
                    }
                }
            }
            b'i' => return self.decode_snapshot(payload),
            b't' => return self.decode_exchange_info(payload),
            _ => {}
        }
        self.decode_api_response(payload)
    }
}
