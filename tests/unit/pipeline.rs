//! Full-pipeline test: payloads in, wire frames out.

use serde_json::Value;

use tradecore_rs::engine::{EngineConfig, TradeEngine};
use tradecore_rs::logging::Logger;
use tradecore_rs::risk::RiskConfig;
use tradecore_rs::transport::CONNECTED_SENTINEL;
use tradecore_rs::types::{Qty, TickerId, scale};

use crate::{SharedRecordingTransport, wait_for};

fn two_sided_depth(first: u64, last: u64, prev: u64) -> String {
    format!(
        r#"{{"stream":"t@depth","data":{{"e":"depthUpdate","E":1,"T":1,"s":"T","U":{first},"u":{last},"pu":{prev},"b":[["1000.0","2.0"]],"a":[["1001.0","2.0"]]}}}}"#
    )
}

fn exec_report(cl_order_id: &str, status: &str, exec_type: &str) -> String {
    format!(
        r#"{{"e":"executionReport","s":"T","c":"{cl_order_id}","S":"BUY","x":"{exec_type}","X":"{status}","p":"997.0","q":"1","l":"0","z":"0","L":"0","m":true}}"#
    )
}

#[test]
fn maker_pipeline_quotes_and_tracks_reports() {
    let logger = Logger::with_capacity(16 * 1024);
    let mut config = EngineConfig::for_ticker(TickerId::new("T"));
    config.min_price_raw = 0;
    config.max_price_raw = 20_000 * scale::PRICE_SCALE;
    config.strategy_name = "market_maker".to_string();
    config.strategy.clip_qty = Qty::from_int(1);
    config.strategy.safety_margin_raw = 3 * scale::PRICE_SCALE;
    config.risk = RiskConfig {
        max_position: Qty::from_int(100),
        max_order_size: Qty::from_int(10),
        max_loss: -1_000_000 * scale::PNL_SCALE,
    };

    let stream_control = SharedRecordingTransport::new();
    let order_transport = SharedRecordingTransport::new();
    let mut handles = TradeEngine::start(
        config,
        &logger,
        Box::new(stream_control.clone()),
        Box::new(order_transport.clone()),
    );

    // Bring both sessions up.
    handles.market_handler.on_payload(CONNECTED_SENTINEL);
    handles.response_handler.on_payload(CONNECTED_SENTINEL);

    // A two-sided book makes the maker quote both sides.
    handles.market_handler.on_payload(&two_sided_depth(1, 5, 0));

    assert!(
        wait_for(|| order_transport.count_containing("order.place") >= 2, 3_000),
        "maker should emit a quote on each side"
    );
    let frames = order_transport.frames();
    let places: Vec<&String> = frames
        .iter()
        .filter(|f| f.contains("order.place"))
        .collect();
    let buys: Vec<&&String> = places.iter().filter(|f| f.contains("\"BUY\"")).collect();
    let sells: Vec<&&String> = places.iter().filter(|f| f.contains("\"SELL\"")).collect();
    assert!(!buys.is_empty() && !sells.is_empty());
    // BBO 1000.0 x 1001.0 with a 3-unit margin.
    assert!(buys[0].contains("\"price\":\"997\""));
    assert!(sells[0].contains("\"price\":\"1004\""));
    assert!(buys[0].contains("\"quantity\":\"1\""));

    // Acknowledge the buy quote and fill it; the report must round-trip
    // through the response thread without disturbing the pipeline.
    let place: Value = serde_json::from_str(buys[0]).unwrap();
    let cl_order_id = place["params"]["newClientOrderId"]
        .as_str()
        .unwrap()
        .to_string();
    handles
        .response_handler
        .on_payload(&exec_report(&cl_order_id, "NEW", "NEW"));
    handles
        .response_handler
        .on_payload(&exec_report(&cl_order_id, "CANCELED", "CANCELED"));

    // The book keeps flowing after the order round trip.
    let resize = r#"{"stream":"t@depth","data":{"e":"depthUpdate","E":1,"T":1,"s":"T","U":6,"u":9,"pu":5,"b":[["1000.0","3.0"]],"a":[]}}"#;
    handles.market_handler.on_payload(resize);
    assert!(wait_for(
        || handles.engine.bbo().bid_qty == Qty::from_int(3),
        2_000
    ));

    handles.engine.stop();
    assert_eq!(handles.market_handler.dropped_batches(), 0);
    assert_eq!(handles.response_handler.dropped_reports(), 0);
}

#[test]
fn sidecar_tap_receives_decoded_frames() {
    let logger = Logger::with_capacity(4096);
    let mut config = EngineConfig::for_ticker(TickerId::new("T"));
    config.min_price_raw = 0;
    config.max_price_raw = 20_000 * scale::PRICE_SCALE;

    let stream_control = SharedRecordingTransport::new();
    let order_transport = SharedRecordingTransport::new();
    let mut handles = TradeEngine::start(
        config,
        &logger,
        Box::new(stream_control.clone()),
        Box::new(order_transport.clone()),
    );

    handles.market_handler.on_payload(&two_sided_depth(1, 5, 0));

    let mut depth_frames = 0;
    handles.sidecar.read_all(|frame_type, meta, entries| {
        if frame_type == tradecore_rs::sync::FeedFrameType::Depth {
            depth_frames += 1;
            assert_eq!(meta.start_update_id, 1);
            assert_eq!(meta.end_update_id, 5);
            assert_eq!(entries.len(), 2);
        }
    });
    assert_eq!(depth_frames, 1);

    handles.engine.stop();
}
