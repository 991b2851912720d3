//! Properties 1 and 2: the bitmap book agrees with a sorted model.

use std::collections::BTreeMap;

use proptest::prelude::*;

use tradecore_rs::book::{BookConfig, MarketOrderBook};
use tradecore_rs::logging::Logger;
use tradecore_rs::types::{MarketData, MarketUpdateType, OrderId, Price, Qty, Side, TickerId};

const MIN_RAW: i64 = 1_000;
const MAX_RAW: i64 = 12_000;

fn make_book(logger: &Logger) -> MarketOrderBook {
    MarketOrderBook::new(
        TickerId::new("PROP"),
        BookConfig::new(MIN_RAW, MAX_RAW),
        logger.producer(),
    )
}

fn entry(update: MarketUpdateType, side: Side, price_raw: i64, qty_raw: i64) -> MarketData {
    MarketData::new(
        update,
        OrderId(1),
        TickerId::new("PROP"),
        side,
        Price::from_raw(price_raw),
        Qty::from_raw(qty_raw),
    )
}

#[derive(Debug, Clone)]
enum Op {
    Add(i64, i64),
    Modify(i64, i64),
    Cancel(i64),
}

fn op_strategy() -> impl proptest::strategy::Strategy<Value = Op> {
    prop_oneof![
        (MIN_RAW..=MAX_RAW, 1i64..10_000).prop_map(|(p, q)| Op::Add(p, q)),
        (MIN_RAW..=MAX_RAW, 1i64..10_000).prop_map(|(p, q)| Op::Modify(p, q)),
        (MIN_RAW..=MAX_RAW).prop_map(Op::Cancel),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Replaying any Add/Modify/Cancel sequence and peeking the full
    /// depth matches the sorted truth, for both sides.
    #[test]
    fn replay_matches_sorted_truth(
        ops in prop::collection::vec((op_strategy(), any::<bool>()), 0..200)
    ) {
        let logger = Logger::with_capacity(4096);
        let mut book = make_book(&logger);
        let mut models: [BTreeMap<i64, i64>; 2] = [BTreeMap::new(), BTreeMap::new()];

        for (op, is_bid) in ops {
            let side = if is_bid { Side::Buy } else { Side::Sell };
            let model = &mut models[usize::from(!is_bid)];
            match op {
                Op::Add(price, qty) | Op::Modify(price, qty) => {
                    let update = if matches!(op, Op::Add(..)) {
                        MarketUpdateType::Add
                    } else {
                        MarketUpdateType::Modify
                    };
                    book.apply(&entry(update, side, price, qty));
                    model.insert(price, qty);
                }
                Op::Cancel(price) => {
                    book.apply(&entry(MarketUpdateType::Cancel, side, price, 0));
                    model.remove(&price);
                }
            }
        }

        for (side, model) in [(Side::Buy, &models[0]), (Side::Sell, &models[1])] {
            let mut qty_out = Vec::new();
            let mut idx_out = Vec::new();
            let n = book.peek_qty(side, usize::MAX, &mut qty_out, &mut idx_out);
            prop_assert_eq!(n, model.len(), "{} level count", side);

            let truth: Vec<(i64, i64)> = if side == Side::Buy {
                model.iter().rev().map(|(&p, &q)| (p, q)).collect()
            } else {
                model.iter().map(|(&p, &q)| (p, q)).collect()
            };
            for (i, (price, qty)) in truth.iter().enumerate() {
                let observed_price = MIN_RAW + idx_out[i] as i64;
                prop_assert_eq!(observed_price, *price, "{} level {} price", side, i);
                prop_assert_eq!(qty_out[i].raw(), *qty, "{} level {} qty", side, i);
            }

            // BBO is the first emitted level, or invalid when empty.
            let bbo = book.get_bbo();
            let best = if side == Side::Buy { bbo.bid_price } else { bbo.ask_price };
            match truth.first() {
                Some((price, _)) => prop_assert_eq!(best.raw(), *price),
                None => prop_assert!(!best.is_valid()),
            }
        }
    }

    /// After a trade against an active level, the remaining quantity is
    /// `prior - traded` and activity tracks the sign of the remainder.
    #[test]
    fn trade_reduces_exactly(
        price in MIN_RAW..=MAX_RAW,
        prior in 1i64..10_000,
        traded in 1i64..12_000,
    ) {
        let logger = Logger::with_capacity(1024);
        let mut book = make_book(&logger);
        book.apply(&entry(MarketUpdateType::Add, Side::Buy, price, prior));
        book.apply(&entry(MarketUpdateType::Trade, Side::Buy, price, traded));

        let idx = book.config().price_to_index(Price::from_raw(price)).unwrap();
        let remaining = prior - traded;
        if remaining > 0 {
            prop_assert!(book.is_active(Side::Buy, idx));
            prop_assert_eq!(book.qty_at(Side::Buy, idx).unwrap().raw(), remaining);
        } else {
            prop_assert!(!book.is_active(Side::Buy, idx));
        }
    }
}
