//! Order manager: quote intents in, exchange requests out.
//!
//! Owns the layer book, reserved trackers, position keeper, risk gate and
//! the request-ring producer. Strategies hand it batches of
//! [`QuoteIntent`]s; it plans a layer per intent, runs the pre-trade
//! gate, emits new/cancel/cancel-replace requests and keeps the reserved
//! counters exact between request emit and terminal response.

use rustc_hash::FxHashMap;

use crate::logging::LogProducer;
use crate::oe::{ExecType, ExecutionReport, OrderRequest, TimeInForce};
use crate::risk::{PositionKeeper, RiskCheckResult, RiskManager};
use crate::sync::SpscProducer;
use crate::types::{OrderId, Price, Qty, Side, TickerId};
use crate::utils::current_time_nanos;

use super::layer_book::{
    LayerBook, PendingReplace, SLOTS_PER_SIDE, SideBook, SlotState, TICK_INVALID, TickConverter,
};
use super::reserved::ReservedPositionTracker;
use super::state::OrderStateManager;

const SEND_RETRY_ATTEMPTS: u32 = 64;

/// One desired quote level, as produced by a strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteIntent {
    pub ticker: TickerId,
    pub side: Side,
    pub price: Price,
    pub qty: Qty,
    pub time_in_force: TimeInForce,
}

impl QuoteIntent {
    /// Passive quote resting on the book.
    pub fn maker(ticker: TickerId, side: Side, price: Price, qty: Qty) -> Self {
        QuoteIntent {
            ticker,
            side,
            price,
            qty,
            time_in_force: TimeInForce::GoodTillCancel,
        }
    }

    /// Aggressive immediate-or-cancel order.
    pub fn taker(ticker: TickerId, side: Side, price: Price, qty: Qty) -> Self {
        QuoteIntent {
            ticker,
            side,
            price,
            qty,
            time_in_force: TimeInForce::ImmediateOrCancel,
        }
    }
}

/// Where strategies submit intents. On the response thread this is the
/// order manager itself; on the market-data thread it is a ring that
/// ferries intents across.
pub trait OrderSink {
    fn submit(&mut self, intents: &[QuoteIntent]);
}

pub struct OrderManager {
    log: LogProducer,
    layer_book: LayerBook,
    reserved: FxHashMap<TickerId, ReservedPositionTracker>,
    state: OrderStateManager,
    risk: RiskManager,
    position_keeper: PositionKeeper,
    tick_converter: TickConverter,
    requests: SpscProducer<OrderRequest>,
    next_order_id: u64,
    dropped_requests: u64,
}

impl OrderManager {
    pub fn new(
        log: LogProducer,
        risk: RiskManager,
        position_keeper: PositionKeeper,
        tick_converter: TickConverter,
        requests: SpscProducer<OrderRequest>,
    ) -> Self {
        let state = OrderStateManager::new(log.clone(), tick_converter);
        OrderManager {
            log,
            layer_book: LayerBook::new(),
            reserved: FxHashMap::default(),
            state,
            risk,
            position_keeper,
            tick_converter,
            requests,
            // Seed well clear of the reserved 0/MAX values and of any
            // ids from a previous run.
            next_order_id: current_time_nanos().max(1),
            dropped_requests: 0,
        }
    }

    fn next_id(&mut self) -> OrderId {
        let id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        id
    }

    /// Net signed exposure for the risk gate: current position plus net
    /// reserved quantity.
    pub fn signed_exposure_raw(&self, ticker: &TickerId) -> i64 {
        let position = self
            .position_keeper
            .position(ticker)
            .map_or(0, |p| p.position_raw());
        let reserved = self
            .reserved
            .get(ticker)
            .map_or(0, ReservedPositionTracker::net_reserved);
        position + reserved
    }

    pub fn position_keeper(&self) -> &PositionKeeper {
        &self.position_keeper
    }

    pub fn position_keeper_mut(&mut self) -> &mut PositionKeeper {
        &mut self.position_keeper
    }

    pub fn layer_book(&self) -> &LayerBook {
        &self.layer_book
    }

    pub fn reserved_tracker(&self, ticker: &TickerId) -> Option<&ReservedPositionTracker> {
        self.reserved.get(ticker)
    }

    pub fn dropped_requests(&self) -> u64 {
        self.dropped_requests
    }

    /// Route one execution report: fills to the position keeper, then the
    /// slot transition through the state manager.
    pub fn on_order_updated(&mut self, report: &ExecutionReport) {
        if report.exec_type == ExecType::Trade && report.last_qty.raw() > 0 {
            self.position_keeper.add_fill(report);
        }
        if !report.side.is_tradable() {
            self.log
                .error(format!("[OrderManager] sideless report {report}"));
            return;
        }
        let side_book = self.layer_book.side_book_mut(&report.symbol, report.side);
        let tracker = self.reserved.entry(report.symbol.clone()).or_default();
        self.state
            .handle_execution_report(report, side_book, tracker, current_time_nanos());
    }

    /// Apply a batch of quote intents. The batch expresses the desired
    /// quote set per (ticker, side): an intent landing on an owned tick
    /// is idempotent, an intent at a fresh tick moves a live quote the
    /// batch no longer wants (cancel-replace) before claiming free slots.
    pub fn apply(&mut self, intents: &[QuoteIntent]) {
        for intent in intents {
            self.apply_one(intent, intents);
        }
    }

    fn apply_one(&mut self, intent: &QuoteIntent, batch: &[QuoteIntent]) {
        if !intent.side.is_tradable() || !intent.price.is_valid() || intent.qty.raw() <= 0 {
            self.log
                .warn(format!("[OrderManager] unusable intent {intent:?}"));
            return;
        }
        let tick = self.tick_converter.to_tick(intent.price);
        if tick == TICK_INVALID {
            return;
        }

        let now_ns = current_time_nanos();
        let side_book = self.layer_book.side_book_mut(&intent.ticker, intent.side);

        if let Some(layer) = side_book.find_layer_by_tick(tick) {
            match side_book.slots[layer].state {
                // Same tick: re-quote in place (no-op unless qty moved).
                SlotState::Live => self.replace_quote(intent, tick, layer, now_ns),
                SlotState::Dead | SlotState::Invalid => {
                    self.place_quote(intent, tick, layer, now_ns);
                }
                // In-flight transitions settle first.
                SlotState::PendingNew | SlotState::PendingCancel | SlotState::Reserved => {}
            }
            return;
        }

        // Fresh tick: prefer moving a live quote this batch abandoned.
        let desired: Vec<u64> = batch
            .iter()
            .filter(|other| other.ticker == intent.ticker && other.side == intent.side)
            .map(|other| self.tick_converter.to_tick(other.price))
            .collect();
        let side_book = self.layer_book.side_book_mut(&intent.ticker, intent.side);
        let movable = (0..SLOTS_PER_SIDE).find(|&layer| {
            side_book.slots[layer].state == SlotState::Live
                && side_book.pending_replace[layer].is_none()
                && !desired.contains(&side_book.layer_ticks[layer])
        });
        if let Some(layer) = movable {
            self.replace_quote(intent, tick, layer, now_ns);
            return;
        }

        if let Some(layer) = side_book.find_free_layer() {
            self.place_quote(intent, tick, layer, now_ns);
            return;
        }

        // All layers busy and wanted: cancel the LRU live order now and
        // let the next strategy pass claim the freed slot.
        let plan = side_book.plan_layer(tick);
        if let Some(victim) = plan.victim_live_layer {
            let victim_id = side_book.slots[victim].cl_order_id;
            side_book.slots[victim].state = SlotState::PendingCancel;
            let cancel_id = self.next_id();
            let request = OrderRequest::cancel(cancel_id, victim_id, intent.ticker.clone());
            self.log.info(format!(
                "[OrderManager] evicting layer {victim} (order {victim_id}) for tick {tick}"
            ));
            self.send_request(request);
        }
    }

    fn place_quote(&mut self, intent: &QuoteIntent, tick: u64, layer: usize, now_ns: u64) {
        if !self.pre_trade_allowed(intent) {
            return;
        }
        let cl_order_id = self.next_id();
        let side_book = self.layer_book.side_book_mut(&intent.ticker, intent.side);
        assert!(
            side_book.find_layer_by_id(cl_order_id).is_none(),
            "duplicate client order id {cl_order_id} across live slots"
        );
        side_book.layer_ticks[layer] = tick;
        side_book.slots[layer] = super::layer_book::OrderSlot {
            state: SlotState::PendingNew,
            price: intent.price,
            qty: intent.qty,
            cl_order_id,
            last_used_ns: now_ns,
        };
        self.reserved
            .entry(intent.ticker.clone())
            .or_default()
            .add_reserved(intent.side, intent.qty.raw());

        let request = OrderRequest::new_order(
            cl_order_id,
            intent.ticker.clone(),
            intent.side,
            intent.price,
            intent.qty,
            intent.time_in_force,
        );
        self.log
            .info(format!("[OrderManager] new quote layer {layer} {request}"));
        if !self.send_request(request) {
            // Undo the claim so the slot does not leak a phantom order.
            let side_book = self.layer_book.side_book_mut(&intent.ticker, intent.side);
            side_book.slots[layer].state = SlotState::Dead;
            side_book.unmap_layer(layer);
            self.reserved
                .entry(intent.ticker.clone())
                .or_default()
                .remove_reserved(intent.side, intent.qty.raw());
        }
    }

    fn replace_quote(&mut self, intent: &QuoteIntent, tick: u64, layer: usize, now_ns: u64) {
        {
            let side_book = self.layer_book.side_book_mut(&intent.ticker, intent.side);
            let slot = &mut side_book.slots[layer];
            if slot.price == intent.price && slot.qty == intent.qty {
                // Idempotent re-quote of the same level.
                slot.last_used_ns = now_ns;
                return;
            }
            if side_book.pending_replace[layer].is_some() {
                // One replace in flight per layer.
                return;
            }
        }
        if !self.pre_trade_allowed(intent) {
            return;
        }

        let cancel_id = self.next_id();
        let new_id = self.next_id();
        let side_book = self.layer_book.side_book_mut(&intent.ticker, intent.side);
        let slot = &side_book.slots[layer];
        let orig_id = slot.cl_order_id;
        let delta_raw = intent.qty.raw() - slot.qty.raw();

        side_book.pending_replace[layer] = Some(PendingReplace {
            original_price: slot.price,
            original_qty: slot.qty,
            original_tick: side_book.layer_ticks[layer],
            original_cl_order_id: orig_id,
            cancel_cl_order_id: cancel_id,
            new_cl_order_id: new_id,
            new_qty: intent.qty,
            new_tick: tick,
        });
        side_book.orig_id_to_layer.insert(orig_id.value(), layer);
        side_book.new_id_to_layer.insert(new_id.value(), layer);
        side_book.slots[layer].last_used_ns = now_ns;

        self.reserved
            .entry(intent.ticker.clone())
            .or_default()
            .add_reserved(intent.side, delta_raw);

        let request = OrderRequest::cancel_replace(
            cancel_id,
            new_id,
            orig_id,
            intent.ticker.clone(),
            intent.side,
            intent.price,
            intent.qty,
        );
        self.log
            .info(format!("[OrderManager] replace layer {layer} {request}"));
        if !self.send_request(request) {
            let side_book = self.layer_book.side_book_mut(&intent.ticker, intent.side);
            side_book.pending_replace[layer] = None;
            side_book.orig_id_to_layer.remove(&orig_id.value());
            side_book.new_id_to_layer.remove(&new_id.value());
            self.reserved
                .entry(intent.ticker.clone())
                .or_default()
                .remove_reserved(intent.side, delta_raw);
        }
    }

    fn pre_trade_allowed(&mut self, intent: &QuoteIntent) -> bool {
        let exposure = self.signed_exposure_raw(&intent.ticker);
        let total_pnl = self.position_keeper.total_pnl();
        let result = self.risk.check_pre_trade(
            &intent.ticker,
            intent.side,
            intent.qty,
            exposure,
            total_pnl,
        );
        if result != RiskCheckResult::Allowed {
            self.log.info(format!(
                "[OrderManager] {} {} {}@{} blocked: {result}",
                intent.ticker, intent.side, intent.qty, intent.price
            ));
            return false;
        }
        true
    }

    /// Push a request onto the ring, retrying briefly on a full ring,
    /// then dropping with an error log.
    fn send_request(&mut self, request: OrderRequest) -> bool {
        let mut request = request;
        for _ in 0..SEND_RETRY_ATTEMPTS {
            match self.requests.push(request) {
                Ok(()) => return true,
                Err(back) => {
                    request = back;
                    std::hint::spin_loop();
                }
            }
        }
        self.dropped_requests += 1;
        self.log
            .error(format!("[OrderManager] request ring full; dropped {request}"));
        false
    }

    #[cfg(test)]
    pub(crate) fn side_book(&self, ticker: &TickerId, side: Side) -> Option<&SideBook> {
        self.layer_book.side_book(ticker, side)
    }
}

impl OrderSink for OrderManager {
    fn submit(&mut self, intents: &[QuoteIntent]) {
        self.apply(intents);
    }
}
