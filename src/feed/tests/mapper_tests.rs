use crate::feed::tests::*;
use crate::feed::{DomainMapper, GenericJsonDecoder, MarketDecoder, MarketPools, WireMessage};
use crate::logging::Logger;
use crate::types::{BatchKind, MarketUpdateType, Price, Qty, Side, TickerId};

fn mapper_fixture() -> (Logger, GenericJsonDecoder, DomainMapper) {
    let logger = Logger::with_capacity(1024);
    let decoder = GenericJsonDecoder::new(logger.producer());
    let mapper = DomainMapper::new(
        logger.producer(),
        TickerId::new("BTCUSDC"),
        MarketPools::new(4096, 64),
    );
    (logger, decoder, mapper)
}

#[test]
fn depth_batch_carries_gap_detection_ids() {
    let (_l, decoder, mapper) = mapper_fixture();
    let batch = mapper
        .map_market_data(&decoder.decode(DEPTH_FRAME))
        .expect("depth maps to a batch");
    assert_eq!(batch.kind, BatchKind::Market);
    assert_eq!(batch.first_update_id, 100);
    assert_eq!(batch.last_update_id, 109);
    assert_eq!(batch.prev_end_update_id, 99);
    assert_eq!(batch.entries.len(), 5);
    mapper.pools().release_batch(batch);
}

#[test]
fn zero_qty_level_becomes_cancel() {
    let (_l, decoder, mapper) = mapper_fixture();
    let batch = mapper
        .map_market_data(&decoder.decode(DEPTH_FRAME))
        .unwrap();
    // Third bid level has qty "0".
    let cancel = &batch.entries[2];
    assert_eq!(cancel.update, MarketUpdateType::Cancel);
    assert_eq!(cancel.side, Side::Buy);
    let adds = batch
        .entries
        .iter()
        .filter(|e| e.update == MarketUpdateType::Add)
        .count();
    assert_eq!(adds, 4);
    mapper.pools().release_batch(batch);
}

#[test]
fn trade_maps_aggressor_side() {
    let (_l, decoder, mapper) = mapper_fixture();

    let taker_buy = mapper
        .map_market_data(&decoder.decode(TRADE_FRAME))
        .unwrap();
    assert_eq!(taker_buy.kind, BatchKind::Trade);
    assert_eq!(taker_buy.entries.len(), 1);
    assert_eq!(taker_buy.entries[0].side, Side::Buy);
    assert_eq!(taker_buy.entries[0].update, MarketUpdateType::Trade);
    mapper.pools().release_batch(taker_buy);

    let taker_sell = mapper
        .map_market_data(&decoder.decode(TRADE_FRAME_MAKER))
        .unwrap();
    assert_eq!(taker_sell.entries[0].side, Side::Sell);
    mapper.pools().release_batch(taker_sell);
}

#[test]
fn snapshot_batch_starts_with_clear() {
    let (_l, decoder, mapper) = mapper_fixture();
    let batch = mapper
        .map_market_data(&decoder.decode(SNAPSHOT_FRAME))
        .unwrap();
    assert_eq!(batch.kind, BatchKind::Snapshot);
    assert_eq!(batch.first_update_id, 25);
    assert_eq!(batch.entries[0].update, MarketUpdateType::SnapshotClear);
    assert_eq!(batch.entries.len(), 1 + 2 + 1);
    assert_eq!(batch.entries[1].ticker, TickerId::new("BTCUSDC"));
    assert_eq!(batch.entries[1].price, Price::parse("98230.0").unwrap());
    mapper.pools().release_batch(batch);
}

#[test]
fn book_ticker_maps_both_sides() {
    let (_l, decoder, mapper) = mapper_fixture();
    let batch = mapper
        .map_market_data(&decoder.decode(BOOK_TICKER_FRAME))
        .unwrap();
    assert_eq!(batch.kind, BatchKind::BookTicker);
    assert_eq!(batch.entries.len(), 2);
    assert_eq!(batch.entries[0].side, Side::Buy);
    assert_eq!(batch.entries[0].qty, Qty::parse("0.525").unwrap());
    assert_eq!(batch.entries[1].side, Side::Sell);
    mapper.pools().release_batch(batch);
}

#[test]
fn non_market_messages_map_to_none() {
    let (_l, decoder, mapper) = mapper_fixture();
    assert!(mapper.map_market_data(&WireMessage::MonoState).is_none());
    assert!(
        mapper
            .map_market_data(&decoder.decode(API_ERROR_FRAME))
            .is_none()
    );
}

#[test]
fn reject_and_instrument_mapping() {
    let (_l, decoder, mapper) = mapper_fixture();

    let reject = mapper
        .map_reject(&decoder.decode(API_ERROR_FRAME))
        .expect("api error maps to reject");
    assert_eq!(reject.code, -1121);
    assert_eq!(reject.message, "Invalid symbol.");

    let info = mapper.map_instrument_info(&decoder.decode(EXCHANGE_INFO_FRAME));
    assert_eq!(info.len(), 1);
    assert_eq!(info[0].symbol, "BTCUSDC");
    assert_eq!(info[0].tick_size, Price::parse("0.1"));
    assert_eq!(info[0].min_qty, Qty::parse("0.001"));
}

#[test]
fn release_returns_capacity_to_pools() {
    let (_l, decoder, mapper) = mapper_fixture();
    let before_entries = mapper.pools().entries.available();
    let before_batches = mapper.pools().batches.available();
    let batch = mapper
        .map_market_data(&decoder.decode(DEPTH_FRAME))
        .unwrap();
    assert_eq!(mapper.pools().entries.available(), before_entries - 5);
    assert_eq!(mapper.pools().batches.available(), before_batches - 1);
    mapper.pools().release_batch(batch);
    assert_eq!(mapper.pools().entries.available(), before_entries);
    assert_eq!(mapper.pools().batches.available(), before_batches);
}
