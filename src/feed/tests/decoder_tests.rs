use crate::feed::tests::*;
use crate::feed::{GenericJsonDecoder, MarketDecoder, OnePassDecoder, WireMessage};
use crate::logging::Logger;
use crate::types::{Price, Qty, scale};

fn decoders() -> (Logger, GenericJsonDecoder, OnePassDecoder) {
    let logger = Logger::with_capacity(1024);
    let generic = GenericJsonDecoder::new(logger.producer());
    let onepass = OnePassDecoder::new(logger.producer());
    (logger, generic, onepass)
}

#[test]
fn generic_decodes_depth_fields() {
    let (_l, generic, _) = decoders();
    let WireMessage::Depth(depth) = generic.decode(DEPTH_FRAME) else {
        panic!("expected depth");
    };
    assert_eq!(depth.symbol, "BTCUSDC");
    assert_eq!(depth.first_update_id, 100);
    assert_eq!(depth.last_update_id, 109);
    assert_eq!(depth.prev_end_update_id, 99);
    assert_eq!(depth.bids.len(), 3);
    assert_eq!(depth.asks.len(), 2);
    assert_eq!(depth.bids[0].price(), Price::parse("98234.1").unwrap());
    assert_eq!(depth.bids[0].qty(), Qty::parse("0.525").unwrap());
    assert_eq!(depth.bids[2].qty_raw, 0);
}

#[test]
fn generic_decodes_trade_sides() {
    let (_l, generic, _) = decoders();
    let WireMessage::Trade(taker_buy) = generic.decode(TRADE_FRAME) else {
        panic!("expected trade");
    };
    assert!(!taker_buy.is_buyer_maker);
    assert_eq!(taker_buy.price_raw, Price::parse("98234.5").unwrap().raw());
    assert_eq!(taker_buy.qty_raw, Qty::parse("0.125").unwrap().raw());

    let WireMessage::Trade(taker_sell) = generic.decode(TRADE_FRAME_MAKER) else {
        panic!("expected trade");
    };
    assert!(taker_sell.is_buyer_maker);
}

#[test]
fn generic_decodes_book_ticker() {
    let (_l, generic, _) = decoders();
    let WireMessage::BookTicker(bt) = generic.decode(BOOK_TICKER_FRAME) else {
        panic!("expected bookTicker");
    };
    assert_eq!(bt.update_id, 555123);
    assert_eq!(bt.bid_price_raw, Price::parse("98234.1").unwrap().raw());
    assert_eq!(bt.ask_qty_raw, Qty::parse("0.75").unwrap().raw());
}

#[test]
fn generic_decodes_snapshot() {
    let (_l, generic, _) = decoders();
    let WireMessage::Snapshot(snap) = generic.decode(SNAPSHOT_FRAME) else {
        panic!("expected snapshot");
    };
    assert_eq!(snap.id, "snapshot_BTCUSDC");
    assert_eq!(snap.symbol(), Some("BTCUSDC"));
    assert_eq!(snap.last_update_id, 25);
    assert_eq!(snap.bids.len(), 2);
    assert_eq!(snap.asks.len(), 1);
}

#[test]
fn generic_decodes_api_error_and_exchange_info() {
    let (_l, generic, _) = decoders();
    let WireMessage::Api(api) = generic.decode(API_ERROR_FRAME) else {
        panic!("expected api response");
    };
    assert_eq!(api.status, 400);
    assert_eq!(api.error.as_ref().unwrap().code, -1121);

    let WireMessage::ExchangeInfo(info) = generic.decode(EXCHANGE_INFO_FRAME) else {
        panic!("expected exchange info");
    };
    assert_eq!(info.symbols.len(), 1);
    assert_eq!(info.symbols[0].symbol, "BTCUSDC");
    assert_eq!(info.symbols[0].tick_size.as_deref(), Some("0.1"));
    assert_eq!(info.symbols[0].step_size.as_deref(), Some("0.001"));
}

#[test]
fn malformed_input_yields_mono_state() {
    let (_l, generic, onepass) = decoders();
    for payload in ["", "{", "{\"x\":1}", "not json at all"] {
        assert!(generic.decode(payload).is_mono_state(), "generic: {payload:?}");
        assert!(onepass.decode(payload).is_mono_state(), "onepass: {payload:?}");
    }
}

/// Property 7: the one-pass path is field-for-field identical to the
/// generic path over the recorded corpus.
#[test]
fn one_pass_equals_generic_over_corpus() {
    let (_l, generic, onepass) = decoders();
    let corpus = [
        DEPTH_FRAME,
        TRADE_FRAME,
        TRADE_FRAME_MAKER,
        BOOK_TICKER_FRAME,
        SNAPSHOT_FRAME,
        API_ERROR_FRAME,
        EXCHANGE_INFO_FRAME,
    ];
    for payload in corpus {
        assert_eq!(
            onepass.decode(payload),
            generic.decode(payload),
            "decoder divergence on {payload}"
        );
    }
}

#[test]
fn one_pass_falls_back_on_unexpected_layout() {
    let (_l, generic, onepass) = decoders();
    // Whitespace violates the compact-JSON assumption; the one-pass
    // decoder must route to the generic path rather than misparse.
    let spaced = DEPTH_FRAME.replace(":[", ": [");
    assert_eq!(onepass.decode(&spaced), generic.decode(&spaced));
}

#[test]
fn decoded_values_are_in_internal_scale() {
    let (_l, _, onepass) = decoders();
    let WireMessage::Trade(trade) = onepass.decode(TRADE_FRAME) else {
        panic!("expected trade");
    };
    // "98234.5" at the internal price scale.
    assert_eq!(trade.price_raw, 982_345 * (scale::PRICE_SCALE / 10));
}
