use crate::logging::Logger;
use crate::oe::{
    ExecType, ExecutionReport, OrdStatus, OrderRequest, RequestKind,
};
use crate::orders::{OrderManager, QuoteIntent, SlotState, TickConverter};
use crate::risk::{PositionKeeper, RiskConfig, RiskManager};
use crate::sync::{SpscConsumer, spsc_channel};
use crate::types::{OrderId, Price, Qty, Side, TickerId, scale};

fn ticker() -> TickerId {
    TickerId::new("T")
}

fn fixture() -> (Logger, SpscConsumer<OrderRequest>, OrderManager) {
    let logger = Logger::with_capacity(4096);
    let (tx, rx) = spsc_channel(64);
    let mut risk = RiskManager::new(logger.producer());
    risk.set_limits(
        ticker(),
        RiskConfig {
            max_position: Qty::from_int(1_000),
            max_order_size: Qty::from_int(100),
            max_loss: -1_000_000 * scale::PNL_SCALE,
        },
    );
    let keeper = PositionKeeper::new(logger.producer());
    let manager = OrderManager::new(
        logger.producer(),
        risk,
        keeper,
        TickConverter::default(),
        tx,
    );
    (logger, rx, manager)
}

fn intent(side: Side, price: i64, qty: i64) -> QuoteIntent {
    QuoteIntent::maker(ticker(), side, Price::from_int(price), Qty::from_int(qty))
}

fn report(
    cl_order_id: OrderId,
    ord_status: OrdStatus,
    exec_type: ExecType,
    side: Side,
    price: i64,
    leaves: i64,
    last: i64,
) -> ExecutionReport {
    ExecutionReport {
        cl_order_id,
        symbol: ticker(),
        exec_type,
        ord_status,
        side,
        price: Price::from_int(price),
        cum_qty: Qty::ZERO,
        leaves_qty: Qty::from_int(leaves),
        last_qty: Qty::from_int(last),
        error_code: 0,
        text: String::new(),
        is_maker: true,
    }
}

fn reserved_buy(manager: &OrderManager) -> i64 {
    manager
        .reserved_tracker(&ticker())
        .map_or(0, |t| t.reserved_for(Side::Buy))
}

/// Reserved counter equals the committed quantity derived from the slots
/// after every accepted transition.
fn assert_reserved_invariant(manager: &OrderManager, side: Side) {
    let book = manager.side_book(&ticker(), side).expect("side book exists");
    let tracker = manager.reserved_tracker(&ticker()).expect("tracker exists");
    assert_eq!(
        tracker.reserved_for(side),
        book.committed_qty_raw(),
        "reserved counter drifted from slot state"
    );
}

/// Walk a quote to Live and return its client order id.
fn establish_live_quote(
    manager: &mut OrderManager,
    rx: &mut SpscConsumer<OrderRequest>,
    price: i64,
    qty: i64,
) -> OrderId {
    manager.apply(&[intent(Side::Buy, price, qty)]);
    let request = rx.pop().expect("new order emitted");
    assert_eq!(request.kind, RequestKind::NewOrder);
    let id = request.cl_order_id;
    manager.on_order_updated(&report(
        id,
        OrdStatus::PendingNew,
        ExecType::New,
        Side::Buy,
        price,
        qty,
        0,
    ));
    manager.on_order_updated(&report(
        id,
        OrdStatus::New,
        ExecType::New,
        Side::Buy,
        price,
        qty,
        0,
    ));
    id
}

#[test]
fn new_quote_reserves_and_goes_live() {
    let (_l, mut rx, mut manager) = fixture();
    let id = establish_live_quote(&mut manager, &mut rx, 100, 5);

    let book = manager.side_book(&ticker(), Side::Buy).unwrap();
    let layer = book.find_layer_by_id(id).unwrap();
    assert_eq!(book.slots[layer].state, SlotState::Live);
    assert_eq!(book.slots[layer].qty, Qty::from_int(5));
    assert_eq!(reserved_buy(&manager), Qty::from_int(5).raw());
    assert_reserved_invariant(&manager, Side::Buy);
}

#[test]
fn requote_same_level_is_idempotent() {
    let (_l, mut rx, mut manager) = fixture();
    establish_live_quote(&mut manager, &mut rx, 100, 5);
    manager.apply(&[intent(Side::Buy, 100, 5)]);
    assert!(rx.pop().is_none(), "idempotent re-quote must not emit");
    assert_reserved_invariant(&manager, Side::Buy);
}

#[test]
fn partial_fill_releases_filled_quantity() {
    let (_l, mut rx, mut manager) = fixture();
    let id = establish_live_quote(&mut manager, &mut rx, 100, 5);
    manager.on_order_updated(&report(
        id,
        OrdStatus::PartiallyFilled,
        ExecType::Trade,
        Side::Buy,
        100,
        3,
        2,
    ));
    assert_eq!(reserved_buy(&manager), Qty::from_int(3).raw());
    assert_reserved_invariant(&manager, Side::Buy);
    // The fill reached the position keeper.
    assert_eq!(
        manager
            .position_keeper()
            .position(&ticker())
            .unwrap()
            .position_raw(),
        Qty::from_int(2).raw()
    );
}

#[test]
fn fill_kills_slot_and_releases_reserve() {
    let (_l, mut rx, mut manager) = fixture();
    let id = establish_live_quote(&mut manager, &mut rx, 100, 5);
    manager.on_order_updated(&report(
        id,
        OrdStatus::Filled,
        ExecType::Trade,
        Side::Buy,
        100,
        0,
        5,
    ));
    let book = manager.side_book(&ticker(), Side::Buy).unwrap();
    let layer = book.find_layer_by_id(id).unwrap();
    assert_eq!(book.slots[layer].state, SlotState::Dead);
    assert_eq!(reserved_buy(&manager), 0);
    assert_reserved_invariant(&manager, Side::Buy);
}

#[test]
fn cancel_replace_happy_path() {
    // S4: live at P1, intent moves to P2; Canceled(A) parks the layer,
    // New(B) completes the swap.
    let (_l, mut rx, mut manager) = fixture();
    let id_a = establish_live_quote(&mut manager, &mut rx, 100, 5);
    let tick_p1 = manager
        .side_book(&ticker(), Side::Buy)
        .unwrap()
        .layer_ticks[0];

    manager.apply(&[intent(Side::Buy, 101, 5)]);
    let request = rx.pop().expect("replace emitted");
    assert_eq!(request.kind, RequestKind::CancelReplace);
    assert_eq!(request.orig_cl_order_id, id_a);
    let id_b = request.cl_order_id;
    assert_ne!(id_b, id_a);

    {
        let book = manager.side_book(&ticker(), Side::Buy).unwrap();
        assert!(book.pending_replace[0].is_some());
        assert_eq!(book.orig_id_to_layer.get(&id_a.value()), Some(&0));
        assert_eq!(book.new_id_to_layer.get(&id_b.value()), Some(&0));
    }
    assert_reserved_invariant(&manager, Side::Buy);

    // Cancel leg acknowledged: slot parked, tick still owned.
    manager.on_order_updated(&report(
        id_a,
        OrdStatus::Canceled,
        ExecType::Canceled,
        Side::Buy,
        100,
        5,
        0,
    ));
    {
        let book = manager.side_book(&ticker(), Side::Buy).unwrap();
        assert_eq!(book.slots[0].state, SlotState::Reserved);
        assert_eq!(book.layer_ticks[0], tick_p1);
        assert!(book.orig_id_to_layer.is_empty());
    }
    assert_reserved_invariant(&manager, Side::Buy);

    // New leg lands: price/tick swap in, replace bookkeeping clears.
    manager.on_order_updated(&report(
        id_b,
        OrdStatus::New,
        ExecType::Replaced,
        Side::Buy,
        101,
        5,
        0,
    ));
    let book = manager.side_book(&ticker(), Side::Buy).unwrap();
    assert_eq!(book.slots[0].state, SlotState::Live);
    assert_eq!(book.slots[0].cl_order_id, id_b);
    assert_eq!(book.slots[0].price, Price::from_int(101));
    assert_ne!(book.layer_ticks[0], tick_p1);
    assert!(book.pending_replace[0].is_none());
    assert!(book.new_id_to_layer.is_empty());
    assert_eq!(reserved_buy(&manager), Qty::from_int(5).raw());
    assert_reserved_invariant(&manager, Side::Buy);
}

#[test]
fn cancel_replace_rejection_rolls_back() {
    // S5: from the post-Canceled(A) state, Rejected(B) must restore the
    // original order exactly, including the reserved delta of an upsize.
    let (_l, mut rx, mut manager) = fixture();
    let id_a = establish_live_quote(&mut manager, &mut rx, 100, 5);
    let tick_p1 = manager
        .side_book(&ticker(), Side::Buy)
        .unwrap()
        .layer_ticks[0];

    // Upsized replace: qty 5 -> 8.
    manager.apply(&[intent(Side::Buy, 101, 8)]);
    let request = rx.pop().expect("replace emitted");
    let id_b = request.cl_order_id;
    assert_eq!(reserved_buy(&manager), Qty::from_int(8).raw());

    manager.on_order_updated(&report(
        id_a,
        OrdStatus::Canceled,
        ExecType::Canceled,
        Side::Buy,
        100,
        5,
        0,
    ));
    manager.on_order_updated(&report(
        id_b,
        OrdStatus::Rejected,
        ExecType::Rejected,
        Side::Buy,
        101,
        0,
        0,
    ));

    let book = manager.side_book(&ticker(), Side::Buy).unwrap();
    assert_eq!(book.slots[0].state, SlotState::Live);
    assert_eq!(book.slots[0].cl_order_id, id_a);
    assert_eq!(book.slots[0].price, Price::from_int(100));
    assert_eq!(book.slots[0].qty, Qty::from_int(5));
    assert_eq!(book.layer_ticks[0], tick_p1);
    assert!(book.pending_replace[0].is_none());
    assert!(book.new_id_to_layer.is_empty());
    assert!(book.orig_id_to_layer.is_empty());
    assert_eq!(reserved_buy(&manager), Qty::from_int(5).raw());
    assert_reserved_invariant(&manager, Side::Buy);
}

#[test]
fn straight_cancel_releases_reserve() {
    let (_l, mut rx, mut manager) = fixture();
    let id = establish_live_quote(&mut manager, &mut rx, 100, 5);
    manager.on_order_updated(&report(
        id,
        OrdStatus::Canceled,
        ExecType::Canceled,
        Side::Buy,
        100,
        5,
        0,
    ));
    assert_eq!(reserved_buy(&manager), 0);
    assert_reserved_invariant(&manager, Side::Buy);
}

#[test]
fn unmatched_report_touches_nothing() {
    let (_l, mut rx, mut manager) = fixture();
    establish_live_quote(&mut manager, &mut rx, 100, 5);
    let before = reserved_buy(&manager);
    manager.on_order_updated(&report(
        OrderId(999_999),
        OrdStatus::Canceled,
        ExecType::Canceled,
        Side::Buy,
        777,
        1,
        0,
    ));
    assert_eq!(reserved_buy(&manager), before);
    assert_reserved_invariant(&manager, Side::Buy);
}

#[test]
fn risk_breach_blocks_emission() {
    let (_l, mut rx, mut manager) = fixture();
    // max_order_size is 100.
    manager.apply(&[intent(Side::Buy, 100, 500)]);
    assert!(rx.pop().is_none());
    assert_eq!(reserved_buy(&manager), 0);
}

#[test]
fn full_side_evicts_lru_before_quoting() {
    let (_l, mut rx, mut manager) = fixture();
    // Fill all eight layers with live quotes at distinct ticks.
    let mut batch = Vec::new();
    for i in 0..8 {
        batch.push(intent(Side::Buy, 100 + i, 1));
    }
    manager.apply(&batch);
    let mut ids = Vec::new();
    while let Some(request) = rx.pop() {
        ids.push((request.cl_order_id, request.price));
    }
    assert_eq!(ids.len(), 8);
    for (id, price) in &ids {
        manager.on_order_updated(&report(
            *id,
            OrdStatus::New,
            ExecType::New,
            Side::Buy,
            price.raw() / crate::types::scale::PRICE_SCALE,
            1,
            0,
        ));
    }

    // A ninth level while all eight stay desired: evict the LRU.
    let mut bigger = batch.clone();
    bigger.push(intent(Side::Buy, 200, 1));
    manager.apply(&bigger);
    let request = rx.pop().expect("eviction cancel emitted");
    assert_eq!(request.kind, RequestKind::Cancel);
    let book = manager.side_book(&ticker(), Side::Buy).unwrap();
    let pending_cancels = book
        .slots
        .iter()
        .filter(|slot| slot.state == SlotState::PendingCancel)
        .count();
    assert_eq!(pending_cancels, 1);
}

#[test]
fn moving_quote_reuses_live_layer() {
    let (_l, mut rx, mut manager) = fixture();
    establish_live_quote(&mut manager, &mut rx, 100, 5);
    // The batch abandons tick 100 in favour of 102: replace, not a
    // second quote.
    manager.apply(&[intent(Side::Buy, 102, 5)]);
    let request = rx.pop().expect("replace emitted");
    assert_eq!(request.kind, RequestKind::CancelReplace);
    assert!(rx.pop().is_none());
}
