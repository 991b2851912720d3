//! One-pass market-data decoder for the hot streams.
//!
//! Bypasses generic JSON parsing for depth, aggregated-trade, book-ticker
//! and snapshot payloads: fixed textual offsets advance a cursor through
//! the compact JSON and inline integer parsers convert prices and
//! quantities directly to fixed-point raw values. The path assumes
//! compact JSON in the documented field order with quoted decimal prices;
//! any violated assumption routes the payload to the generic decoder, so
//! the two paths are observationally identical.

use crate::logging::LogProducer;
use crate::types::scale;

use super::generic::GenericJsonDecoder;
use super::traits::MarketDecoder;
use super::wire::{
    BookTickerEvent, DepthSnapshot, DepthUpdate, TradeEvent, WireLevel, WireMessage,
};

// Offsets measured from the documented compact payload patterns.
const STREAM_VALUE_START: usize = r#"{"stream":""#.len();
const DATA_EVENT_START: usize = r#"","data":{"e":""#.len();
const PRICE_QTY_ENTRY: usize = r#"[""#.len();

const SKIP_QUOTE_KEY_VALUE: usize = r#"","X":"#.len();
const SKIP_KEY_VALUE: usize = r#","X":"#.len();
const SKIP_QUOTE_KEY_QUOTE: usize = r#","X":""#.len();

const DEPTH_PU_SKIP: usize = r#","pu":"#.len();
const DEPTH_BIDS_START: usize = r#","b":["#.len();
const DEPTH_ASKS_START: usize = r#"],"a":["#.len();

const TRADE_AGG_ID_SKIP: usize = r#","a":"#.len();
const TRADE_PRICE_SKIP: usize = r#"","p":""#.len();
const TRADE_QTY_SKIP: usize = r#","q":""#.len();
const TRADE_FIRST_ID_SKIP: usize = r#","f":"#.len();

const BOOK_TICKER_BID_PRICE_SKIP: usize = r#"","b":""#.len();
const BOOK_TICKER_BID_QTY_SKIP: usize = r#","B":""#.len();
const BOOK_TICKER_ASK_PRICE_SKIP: usize = r#","a":""#.len();
const BOOK_TICKER_ASK_QTY_SKIP: usize = r#","A":""#.len();

const SNAPSHOT_ID_START: usize = r#"{"id":""#.len();
const SNAPSHOT_STATUS_SKIP: usize = r#"","status":"#.len();
const SNAPSHOT_RESULT_SKIP: usize = r#","result":{"lastUpdateId":"#.len();
const SNAPSHOT_BIDS_START: usize = r#","bids":["#.len();
const SNAPSHOT_ASKS_START: usize = r#"],"asks":["#.len();

const DEPTH_RESERVE: usize = 300;
const SNAPSHOT_RESERVE: usize = 1000;
const MAX_STRING_SEARCH_LEN: usize = 64;
const MIN_PAYLOAD_LEN: usize = r#"{"s":""}"#.len();
const FIRST_CHAR_OFFSET: usize = 2;
const AT_SEARCH_START: usize = r#"{"stream":"x"#.len();
const MAX_FRAC_DIGITS: u32 = 10;

const POWERS_OF_10: [i64; 11] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
    10_000_000_000,
];

/// Byte cursor over a compact JSON payload. Every method returns `None`
/// on a violated layout assumption so the caller can fall back.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Cursor { buf, pos: 0 }
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    #[inline]
    fn advance(&mut self, n: usize) -> Option<()> {
        self.pos += n;
        if self.pos <= self.buf.len() { Some(()) } else { None }
    }

    /// Move onto the next `target` byte within a bounded window.
    fn skip_to(&mut self, target: u8) -> Option<()> {
        let window = self
            .buf
            .get(self.pos..(self.pos + MAX_STRING_SEARCH_LEN).min(self.buf.len()))?;
        let found = window.iter().position(|&b| b == target)?;
        self.pos += found;
        Some(())
    }

    /// Borrow bytes up to the next `"` and step past the content (not the
    /// quote).
    fn take_until_quote(&mut self) -> Option<&'a [u8]> {
        let start = self.pos;
        self.skip_to(b'"')?;
        Some(&self.buf[start..self.pos])
    }

    fn skip_digits(&mut self) {
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
    }

    fn parse_uint(&mut self) -> Option<u64> {
        let start = self.pos;
        let mut val: u64 = 0;
        while let Some(b @ b'0'..=b'9') = self.peek() {
            val = val.checked_mul(10)?.checked_add(u64::from(b - b'0'))?;
            self.pos += 1;
        }
        if self.pos == start { None } else { Some(val) }
    }

    /// Parse a quoted decimal into fixed-point raw at `scale` and step
    /// past the closing quote.
    fn parse_fixed(&mut self, scale: i64) -> Option<i64> {
        let mut mantissa: i64 = 0;
        let mut frac_digits: u32 = 0;
        let mut in_frac = false;
        let mut digits = 0usize;
        loop {
            match self.peek() {
                Some(b @ b'0'..=b'9') => {
                    mantissa = mantissa
                        .checked_mul(10)?
                        .checked_add(i64::from(b - b'0'))?;
                    if in_frac {
                        frac_digits += 1;
                    }
                    digits += 1;
                    self.pos += 1;
                }
                Some(b'.') if !in_frac => {
                    in_frac = true;
                    self.pos += 1;
                }
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                _ => return None,
            }
        }
        if digits == 0 || frac_digits > MAX_FRAC_DIGITS {
            return None;
        }
        if frac_digits == 0 {
            return mantissa.checked_mul(scale);
        }
        let divisor = POWERS_OF_10[frac_digits as usize];
        if scale % divisor != 0 {
            // More fractional digits than the internal scale carries.
            return None;
        }
        Some(mantissa * (scale / divisor))
    }

    /// Parse consecutive `["price","qty"]` entries up to the terminating
    /// `]` of the enclosing array. Anything else at the cursor means the
    /// layout assumption failed.
    fn parse_level_array(&mut self, reserve: usize) -> Option<Vec<WireLevel>> {
        let mut out = Vec::with_capacity(reserve);
        while self.peek() == Some(b'[') {
            self.advance(PRICE_QTY_ENTRY)?;
            let price_raw = self.parse_fixed(scale::PRICE_SCALE)?;
            self.advance(PRICE_QTY_ENTRY)?;
            let qty_raw = self.parse_fixed(scale::QTY_SCALE)?;
            // Past the closing ']' of the pair.
            if self.peek() != Some(b']') {
                return None;
            }
            self.pos += 1;
            out.push(WireLevel { price_raw, qty_raw });
            if self.peek() == Some(b',') {
                self.pos += 1;
            }
        }
        if self.peek() != Some(b']') {
            return None;
        }
        Some(out)
    }
}

/// Hot-path decoder with a verified generic fallback.
pub struct OnePassDecoder {
    log: LogProducer,
    fallback: GenericJsonDecoder,
}

impl OnePassDecoder {
    pub fn new(log: LogProducer) -> Self {
        let fallback = GenericJsonDecoder::new(log.clone());
        Self { log, fallback }
    }

    fn decode_depth(&self, payload: &str) -> Option<WireMessage> {
        let mut cur = Cursor::new(payload.as_bytes());
        let mut result = DepthUpdate::default();

        cur.advance(STREAM_VALUE_START)?;
        cur.skip_to(b'"')?;
        cur.advance(DATA_EVENT_START)?;
        cur.skip_to(b'"')?;

        cur.advance(SKIP_QUOTE_KEY_VALUE)?; // ","E":
        cur.skip_digits();
        cur.advance(SKIP_KEY_VALUE)?; // ,"T":
        cur.skip_digits();

        cur.advance(SKIP_QUOTE_KEY_QUOTE)?; // ,"s":"
        result.symbol = String::from_utf8(cur.take_until_quote()?.to_vec()).ok()?;

        cur.advance(SKIP_QUOTE_KEY_VALUE)?; // ","U":
        result.first_update_id = cur.parse_uint()?;
        cur.advance(SKIP_KEY_VALUE)?; // ,"u":
        result.last_update_id = cur.parse_uint()?;
        cur.advance(DEPTH_PU_SKIP)?; // ,"pu":
        result.prev_end_update_id = cur.parse_uint()?;

        cur.advance(DEPTH_BIDS_START)?; // ,"b":[
        result.bids = cur.parse_level_array(DEPTH_RESERVE)?;
        cur.advance(DEPTH_ASKS_START)?; // ],"a":[
        result.asks = cur.parse_level_array(DEPTH_RESERVE)?;

        Some(WireMessage::Depth(result))
    }

    fn decode_trade(&self, payload: &str) -> Option<WireMessage> {
        let mut cur = Cursor::new(payload.as_bytes());
        let mut result = TradeEvent::default();

        cur.advance(STREAM_VALUE_START)?;
        cur.skip_to(b'"')?;
        cur.advance(DATA_EVENT_START)?;
        cur.skip_to(b'"')?;

        cur.advance(SKIP_QUOTE_KEY_VALUE)?; // ","E":
        cur.skip_digits();
        cur.advance(TRADE_AGG_ID_SKIP)?; // ,"a":
        cur.skip_digits();

        cur.advance(SKIP_QUOTE_KEY_QUOTE)?; // ,"s":"
        result.symbol = String::from_utf8(cur.take_until_quote()?.to_vec()).ok()?;

        cur.advance(TRADE_PRICE_SKIP)?; // ","p":"
        result.price_raw = cur.parse_fixed(scale::PRICE_SCALE)?;
        cur.advance(TRADE_QTY_SKIP)?; // ,"q":"
        result.qty_raw = cur.parse_fixed(scale::QTY_SCALE)?;

        cur.advance(TRADE_FIRST_ID_SKIP)?; // ,"f":
        cur.skip_digits();
        cur.advance(SKIP_KEY_VALUE)?; // ,"l":
        cur.skip_digits();
        cur.advance(SKIP_KEY_VALUE)?; // ,"T":
        cur.skip_digits();
        cur.advance(SKIP_KEY_VALUE)?; // ,"m":
        result.is_buyer_maker = cur.peek()? == b't';

        Some(WireMessage::Trade(result))
    }

    fn decode_book_ticker(&self, payload: &str) -> Option<WireMessage> {
        let mut cur = Cursor::new(payload.as_bytes());
        let mut result = BookTickerEvent::default();

        cur.advance(STREAM_VALUE_START)?;
        cur.skip_to(b'"')?;
        cur.advance(DATA_EVENT_START)?;
        cur.skip_to(b'"')?;

        cur.advance(SKIP_QUOTE_KEY_VALUE)?; // ","u":
        result.update_id = cur.parse_uint()?;

        cur.advance(SKIP_QUOTE_KEY_QUOTE)?; // ,"s":"
        result.symbol = String::from_utf8(cur.take_until_quote()?.to_vec()).ok()?;

        cur.advance(BOOK_TICKER_BID_PRICE_SKIP)?; // ","b":"
        result.bid_price_raw = cur.parse_fixed(scale::PRICE_SCALE)?;
        cur.advance(BOOK_TICKER_BID_QTY_SKIP)?; // ,"B":"
        result.bid_qty_raw = cur.parse_fixed(scale::QTY_SCALE)?;
        cur.advance(BOOK_TICKER_ASK_PRICE_SKIP)?; // ,"a":"
        result.ask_price_raw = cur.parse_fixed(scale::PRICE_SCALE)?;
        cur.advance(BOOK_TICKER_ASK_QTY_SKIP)?; // ,"A":"
        result.ask_qty_raw = cur.parse_fixed(scale::QTY_SCALE)?;

        Some(WireMessage::BookTicker(result))
    }

    fn decode_snapshot(&self, payload: &str) -> Option<WireMessage> {
        let mut cur = Cursor::new(payload.as_bytes());
        let mut result = DepthSnapshot::default();

        cur.advance(SNAPSHOT_ID_START)?; // {"id":"
        result.id = String::from_utf8(cur.take_until_quote()?.to_vec()).ok()?;

        cur.advance(SNAPSHOT_STATUS_SKIP)?; // ","status":
        cur.skip_digits();
        cur.advance(SNAPSHOT_RESULT_SKIP)?; // ,"result":{"lastUpdateId":
        result.last_update_id = cur.parse_uint()?;

        cur.advance(SKIP_KEY_VALUE)?; // ,"E":
        cur.skip_digits();
        cur.advance(SKIP_KEY_VALUE)?; // ,"T":
        cur.skip_digits();

        cur.advance(SNAPSHOT_BIDS_START)?; // ,"bids":[
        result.bids = cur.parse_level_array(SNAPSHOT_RESERVE)?;
        cur.advance(SNAPSHOT_ASKS_START)?; // ],"asks":[
        result.asks = cur.parse_level_array(SNAPSHOT_RESERVE)?;

        Some(WireMessage::Snapshot(result))
    }

    fn fall_back(&self, payload: &str, branch: &str) -> WireMessage {
        self.log
            .debug(format!("one-pass {branch} assumption violated; using generic path"));
        self.fallback.decode(payload)
    }
}

impl MarketDecoder for OnePassDecoder {
    fn decode(&self, payload: &str) -> WireMessage {
        let bytes = payload.as_bytes();
        if bytes.len() < MIN_PAYLOAD_LEN {
            return WireMessage::MonoState;
        }

        match bytes[FIRST_CHAR_OFFSET] {
            b's' => {
                let tail = &bytes[AT_SEARCH_START.min(bytes.len())..];
                if let Some(at) = tail.iter().position(|&b| b == b'@') {
                    let decoded = match tail.get(at + 1) {
                        Some(b'd') => self
                            .decode_depth(payload)
                            .unwrap_or_else(|| self.fall_back(payload, "depth")),
                        Some(b'a') => self
                            .decode_trade(payload)
                            .unwrap_or_else(|| self.fall_back(payload, "trade")),
                        Some(b'b') => self
                            .decode_book_ticker(payload)
                            .unwrap_or_else(|| self.fall_back(payload, "bookTicker")),
                        _ => self.fallback.decode(payload),
                    };
                    return decoded;
                }
                self.fallback.decode(payload)
            }
            b'i' => self
                .decode_snapshot(payload)
                .unwrap_or_else(|| self.fall_back(payload, "snapshot")),
            // Exchange info and API responses are not hot; always generic.
            _ => self.fallback.decode(payload),
        }
    }
}
