//! Concrete end-to-end scenarios over the book and the engine pipeline.

use tradecore_rs::book::{BookConfig, MarketOrderBook};
use tradecore_rs::engine::{EngineConfig, TradeEngine};
use tradecore_rs::logging::Logger;
use tradecore_rs::risk::RiskConfig;
use tradecore_rs::transport::CONNECTED_SENTINEL;
use tradecore_rs::types::{
    MarketData, MarketUpdateType, OrderId, Price, Qty, Side, TickerId, scale,
};

use crate::{SharedRecordingTransport, wait_for};

fn entry(update: MarketUpdateType, side: Side, price: &str, qty: &str) -> MarketData {
    MarketData::new(
        update,
        OrderId(1),
        TickerId::new("T"),
        side,
        Price::parse(price).unwrap(),
        Qty::parse(qty).unwrap(),
    )
}

/// S1: book maintenance on one side.
#[test]
fn s1_book_maintenance() {
    let logger = Logger::with_capacity(4096);
    let mut book = MarketOrderBook::new(
        TickerId::new("T"),
        BookConfig::new(0, 20_000 * scale::PRICE_SCALE),
        logger.producer(),
    );

    book.apply(&entry(MarketUpdateType::Add, Side::Buy, "1000.00", "5.0"));
    book.apply(&entry(MarketUpdateType::Add, Side::Buy, "1001.00", "4.0"));
    book.apply(&entry(MarketUpdateType::Modify, Side::Buy, "1001.00", "3.0"));
    book.apply(&entry(MarketUpdateType::Trade, Side::Buy, "1001.00", "2.0"));

    let bbo = book.get_bbo();
    assert_eq!(bbo.bid_price, Price::parse("1001.00").unwrap());
    assert_eq!(bbo.bid_qty, Qty::parse("1.0").unwrap());
    assert!(!bbo.ask_price.is_valid());
}

/// S2: cross-side insertion is accepted as a transient crossed book.
#[test]
fn s2_crossed_book_accepted() {
    let logger = Logger::with_capacity(4096);
    let mut book = MarketOrderBook::new(
        TickerId::new("T"),
        BookConfig::new(0, 20_000 * scale::PRICE_SCALE),
        logger.producer(),
    );

    book.apply(&entry(MarketUpdateType::Add, Side::Buy, "1000.00", "5.0"));
    book.apply(&entry(MarketUpdateType::Add, Side::Buy, "1001.00", "4.0"));
    book.apply(&entry(MarketUpdateType::Modify, Side::Buy, "1001.00", "3.0"));
    book.apply(&entry(MarketUpdateType::Trade, Side::Buy, "1001.00", "2.0"));
    book.apply(&entry(MarketUpdateType::Add, Side::Sell, "1000.00", "2.0"));
    book.apply(&entry(MarketUpdateType::Add, Side::Sell, "999.00", "3.0"));

    let bbo = book.get_bbo();
    assert_eq!(bbo.bid_price, Price::parse("1001.00").unwrap());
    assert_eq!(bbo.bid_qty, Qty::parse("1.0").unwrap());
    assert_eq!(bbo.ask_price, Price::parse("999.00").unwrap());
    assert_eq!(bbo.ask_qty, Qty::parse("3.0").unwrap());
    assert!(bbo.spread_raw().unwrap() < 0);
}

fn depth_frame(first: u64, last: u64, prev: u64, bid_price: &str, bid_qty: &str) -> String {
    format!(
        r#"{{"stream":"t@depth","data":{{"e":"depthUpdate","E":1,"T":1,"s":"T","U":{first},"u":{last},"pu":{prev},"b":[["{bid_price}","{bid_qty}"]],"a":[]}}}}"#
    )
}

fn snapshot_frame(last_update_id: u64, bid_price: &str, bid_qty: &str) -> String {
    format!(
        r#"{{"id":"snapshot_T","status":200,"result":{{"lastUpdateId":{last_update_id},"E":1,"T":1,"bids":[["{bid_price}","{bid_qty}"]],"asks":[]}}}}"#
    )
}

fn engine_config() -> EngineConfig {
    let mut config = EngineConfig::for_ticker(TickerId::new("T"));
    config.min_price_raw = 0;
    config.max_price_raw = 20_000 * scale::PRICE_SCALE;
    config.risk = RiskConfig {
        max_position: Qty::from_int(1_000),
        max_order_size: Qty::from_int(100),
        max_loss: -1_000_000 * scale::PNL_SCALE,
    };
    config
}

/// S3: snapshot gap recovery: on a sequence gap the engine requests a
/// snapshot, discards the stale flow, applies the snapshot and resumes
/// only from a consistent update.
#[test]
fn s3_snapshot_gap_recovery() {
    let logger = Logger::with_capacity(16 * 1024);
    let stream_control = SharedRecordingTransport::new();
    let order_transport = SharedRecordingTransport::new();
    let mut handles = TradeEngine::start(
        engine_config(),
        &logger,
        Box::new(stream_control.clone()),
        Box::new(order_transport.clone()),
    );

    // Cold start: first update applies directly.
    handles
        .market_handler
        .on_payload(&depth_frame(10, 19, 9, "1000.0", "1.0"));
    assert!(
        wait_for(
            || handles.engine.bbo().bid_price == Price::parse("1000.0").unwrap(),
            2_000
        ),
        "first update should reach the book"
    );

    // Gap: pu=29 does not continue u=19. The book must not move and a
    // snapshot request must go out.
    let snapshot_requests_before = stream_control.count_containing("snapshot_T");
    handles
        .market_handler
        .on_payload(&depth_frame(30, 39, 29, "1001.0", "1.0"));
    // The flag raised by the book consumer is serviced on the next
    // transport callback.
    std::thread::sleep(std::time::Duration::from_millis(50));
    handles.market_handler.on_payload("{\"noop\":1}");
    assert!(
        wait_for(
            || stream_control.count_containing("snapshot_T") > snapshot_requests_before,
            2_000
        ),
        "gap should trigger a snapshot request"
    );
    assert_eq!(
        handles.engine.bbo().bid_price,
        Price::parse("1000.0").unwrap(),
        "gapped update must not be applied"
    );

    // Updates while awaiting the snapshot are discarded.
    handles
        .market_handler
        .on_payload(&depth_frame(40, 49, 39, "1002.0", "1.0"));
    std::thread::sleep(std::time::Duration::from_millis(50));
    assert_eq!(
        handles.engine.bbo().bid_price,
        Price::parse("1000.0").unwrap()
    );

    // The snapshot replaces the book wholesale.
    handles
        .market_handler
        .on_payload(&snapshot_frame(25, "2000.0", "2.0"));
    assert!(
        wait_for(
            || handles.engine.bbo().bid_price == Price::parse("2000.0").unwrap(),
            2_000
        ),
        "snapshot should reset the book"
    );

    // A stale update (entirely before the snapshot) is dropped.
    handles
        .market_handler
        .on_payload(&depth_frame(10, 19, 9, "1003.0", "1.0"));
    std::thread::sleep(std::time::Duration::from_millis(50));
    assert_eq!(
        handles.engine.bbo().bid_price,
        Price::parse("2000.0").unwrap()
    );

    // The straddling update (U <= 25+1 <= u, pu = 25) resumes the flow.
    handles
        .market_handler
        .on_payload(&depth_frame(20, 29, 25, "2001.0", "2.0"));
    assert!(
        wait_for(
            || handles.engine.bbo().bid_price == Price::parse("2001.0").unwrap(),
            2_000
        ),
        "straddling update should apply after the snapshot"
    );

    // And the continuation (pu = 29) flows normally.
    handles
        .market_handler
        .on_payload(&depth_frame(30, 31, 29, "2002.0", "2.0"));
    assert!(wait_for(
        || handles.engine.bbo().bid_price == Price::parse("2002.0").unwrap(),
        2_000
    ));

    handles.engine.stop();
}

/// The connected sentinel subscribes the streams and requests an initial
/// snapshot.
#[test]
fn connected_sentinel_subscribes_and_snapshots() {
    let logger = Logger::with_capacity(4096);
    let stream_control = SharedRecordingTransport::new();
    let order_transport = SharedRecordingTransport::new();
    let mut handles = TradeEngine::start(
        engine_config(),
        &logger,
        Box::new(stream_control.clone()),
        Box::new(order_transport.clone()),
    );

    handles.market_handler.on_payload(CONNECTED_SENTINEL);
    assert!(wait_for(
        || stream_control.count_containing("SUBSCRIBE") == 1,
        2_000
    ));
    assert_eq!(stream_control.count_containing("snapshot_T"), 1);
    let frames = stream_control.frames();
    assert!(frames[0].contains("t@depth"));
    assert!(frames[0].contains("t@aggTrade"));
    assert!(frames[0].contains("t@bookTicker"));

    handles.engine.stop();
}
