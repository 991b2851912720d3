//! Criterion benchmarks for the hot paths: book mutation, depth peeking,
//! the two decoder paths and the SPSC ring.

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use tradecore_rs::book::{BookConfig, MarketOrderBook};
use tradecore_rs::feed::{GenericJsonDecoder, MarketDecoder, OnePassDecoder};
use tradecore_rs::logging::Logger;
use tradecore_rs::sync::spsc_channel;
use tradecore_rs::types::{MarketData, MarketUpdateType, OrderId, Price, Qty, Side, TickerId};

const DEPTH_FRAME: &str = r#"{"stream":"btcusdc@depth","data":{"e":"depthUpdate","E":1700000001234,"T":1700000001230,"s":"BTCUSDC","U":100,"u":109,"pu":99,"b":[["98234.1","0.525"],["98234.0","1.2"],["98233.9","0.8"],["98233.8","2.1"],["98233.7","0.4"]],"a":[["98235.2","0.75"],["98235.3","2"],["98235.4","1.1"],["98235.5","0.6"],["98235.6","3.2"]]}}"#;

fn entry(update: MarketUpdateType, side: Side, price_raw: i64, qty_raw: i64) -> MarketData {
    MarketData::new(
        update,
        OrderId(1),
        TickerId::new("BENCH"),
        side,
        Price::from_raw(price_raw),
        Qty::from_raw(qty_raw),
    )
}

fn bench_book(c: &mut Criterion) {
    let logger = Logger::with_capacity(1024);
    let mut group = c.benchmark_group("order_book");

    group.bench_function("add_modify_cancel", |b| {
        let mut book = MarketOrderBook::new(
            TickerId::new("BENCH"),
            BookConfig::new(0, 1 << 20),
            logger.producer(),
        );
        let mut price = 500_000i64;
        b.iter(|| {
            price = 500_000 + (price * 31 + 7) % 8_192;
            book.apply(&entry(MarketUpdateType::Add, Side::Buy, price, 100));
            book.apply(&entry(MarketUpdateType::Modify, Side::Buy, price, 50));
            book.apply(&entry(MarketUpdateType::Cancel, Side::Buy, price, 0));
        });
    });

    group.bench_function("peek_qty_16", |b| {
        let mut book = MarketOrderBook::new(
            TickerId::new("BENCH"),
            BookConfig::new(0, 1 << 20),
            logger.producer(),
        );
        for i in 0..256 {
            book.apply(&entry(
                MarketUpdateType::Add,
                Side::Sell,
                500_000 + i * 37,
                100 + i,
            ));
        }
        let mut qty_out = Vec::new();
        let mut idx_out = Vec::new();
        b.iter(|| {
            let n = book.peek_qty(Side::Sell, 16, &mut qty_out, &mut idx_out);
            black_box(n);
        });
    });

    group.finish();
}

fn bench_decoders(c: &mut Criterion) {
    let logger = Logger::with_capacity(1024);
    let generic = GenericJsonDecoder::new(logger.producer());
    let onepass = OnePassDecoder::new(logger.producer());

    let mut group = c.benchmark_group("decode_depth");
    group.bench_function("generic", |b| {
        b.iter(|| black_box(generic.decode(black_box(DEPTH_FRAME))));
    });
    group.bench_function("one_pass", |b| {
        b.iter(|| black_box(onepass.decode(black_box(DEPTH_FRAME))));
    });
    group.finish();
}

fn bench_spsc(c: &mut Criterion) {
    c.bench_function("spsc_push_pop", |b| {
        let (mut tx, mut rx) = spsc_channel::<u64>(1024);
        b.iter(|| {
            tx.push(black_box(42)).ok();
            black_box(rx.pop());
        });
    });
}

criterion_group!(benches, bench_book, bench_decoders, bench_spsc);
criterion_main!(benches);
