//! Order-state manager: reconciles exchange execution reports with the
//! layer book and the reserved-quantity tracker.
//!
//! Every transition that changes a slot's committed quantity adjusts the
//! tracker in the same step. A report that matches no slot by id or tick
//! is a hard error: it is logged and neither slot state nor reserved
//! counters are touched, so the counters cannot drift on inconsistent
//! input.

use crate::logging::LogProducer;
use crate::oe::{ExecutionReport, OrdStatus};

use super::layer_book::{SideBook, SlotState, TickConverter};
use super::reserved::ReservedPositionTracker;

pub struct OrderStateManager {
    log: LogProducer,
    tick_converter: TickConverter,
}

impl OrderStateManager {
    pub fn new(log: LogProducer, tick_converter: TickConverter) -> Self {
        OrderStateManager {
            log,
            tick_converter,
        }
    }

    pub fn handle_execution_report(
        &self,
        report: &ExecutionReport,
        side_book: &mut SideBook,
        tracker: &mut ReservedPositionTracker,
        now_ns: u64,
    ) {
        match report.ord_status {
            OrdStatus::PendingNew => self.handle_pending_new(report, side_book),
            OrdStatus::New => self.handle_new(report, side_book),
            OrdStatus::PartiallyFilled => {
                self.handle_partially_filled(report, side_book, tracker, now_ns);
            }
            OrdStatus::Filled => self.handle_filled(report, side_book, tracker),
            OrdStatus::PendingCancel => self.handle_pending_cancel(report, side_book),
            OrdStatus::Canceled => self.handle_canceled(report, side_book, tracker),
            OrdStatus::Rejected | OrdStatus::Expired => {
                self.handle_rejected_or_expired(report, side_book, tracker);
            }
            OrdStatus::Invalid => {
                self.log
                    .error(format!("[OrderState] unknown order status {report}"));
            }
        }
    }

    fn find_layer(&self, side_book: &SideBook, report: &ExecutionReport) -> Option<usize> {
        if let Some(layer) = side_book.find_layer_by_id(report.cl_order_id) {
            return Some(layer);
        }
        side_book.find_layer_by_tick(self.tick_converter.to_tick(report.price))
    }

    fn handle_pending_new(&self, report: &ExecutionReport, side_book: &mut SideBook) {
        let Some(layer) = self.find_layer(side_book, report) else {
            self.log
                .error(format!("[OrderState] PendingNew: layer not found {report}"));
            return;
        };
        side_book.slots[layer].state = SlotState::PendingNew;
        self.log.info(format!("[OrderState] PendingNew {report}"));
    }

    fn handle_new(&self, report: &ExecutionReport, side_book: &mut SideBook) {
        let layer = side_book
            .new_id_to_layer
            .get(&report.cl_order_id.value())
            .copied()
            .or_else(|| self.find_layer(side_book, report));
        let Some(layer) = layer else {
            self.log
                .error(format!("[OrderState] New: layer not found {report}"));
            return;
        };

        if let Some(pend) = side_book.pending_replace[layer].take() {
            // New leg of a cancel-replace: swap in the replacement.
            side_book.layer_ticks[layer] = pend.new_tick;
            let slot = &mut side_book.slots[layer];
            slot.price = report.price;
            slot.qty = report.leaves_qty;
            slot.cl_order_id = report.cl_order_id;
            slot.state = SlotState::Live;
            side_book
                .new_id_to_layer
                .remove(&report.cl_order_id.value());
            self.log
                .info(format!("[OrderState] New (replace complete) {report}"));
        } else {
            side_book.layer_ticks[layer] = self.tick_converter.to_tick(report.price);
            let slot = &mut side_book.slots[layer];
            slot.price = report.price;
            slot.qty = report.leaves_qty;
            slot.cl_order_id = report.cl_order_id;
            slot.state = SlotState::Live;
            self.log.info(format!("[OrderState] New {report}"));
        }
    }

    fn handle_partially_filled(
        &self,
        report: &ExecutionReport,
        side_book: &mut SideBook,
        tracker: &mut ReservedPositionTracker,
        now_ns: u64,
    ) {
        let Some(layer) = self.find_layer(side_book, report) else {
            self.log.error(format!(
                "[OrderState] PartiallyFilled: layer not found {report}"
            ));
            return;
        };
        let slot = &mut side_book.slots[layer];
        let filled_raw = slot.qty.raw() - report.leaves_qty.raw();
        tracker.remove_partial_fill(report.side, filled_raw);
        slot.qty = report.leaves_qty;
        slot.state = if report.leaves_qty.raw() <= 0 {
            SlotState::Dead
        } else {
            SlotState::Live
        };
        if slot.state == SlotState::Dead {
            side_book.unmap_layer(layer);
        } else {
            slot.last_used_ns = now_ns;
        }
        self.log
            .info(format!("[OrderState] PartiallyFilled {report}"));
    }

    fn handle_filled(
        &self,
        report: &ExecutionReport,
        side_book: &mut SideBook,
        tracker: &mut ReservedPositionTracker,
    ) {
        let Some(layer) = self.find_layer(side_book, report) else {
            self.log
                .error(format!("[OrderState] Filled: layer not found {report}"));
            return;
        };
        let slot = &mut side_book.slots[layer];
        tracker.remove_reserved(report.side, slot.qty.raw());
        slot.qty = report.leaves_qty;
        slot.state = SlotState::Dead;
        side_book.unmap_layer(layer);
        self.log.info(format!("[OrderState] Filled {report}"));
    }

    fn handle_pending_cancel(&self, report: &ExecutionReport, side_book: &mut SideBook) {
        let Some(layer) = self.find_layer(side_book, report) else {
            self.log.error(format!(
                "[OrderState] PendingCancel: layer not found {report}"
            ));
            return;
        };
        side_book.slots[layer].state = SlotState::PendingCancel;
        self.log
            .info(format!("[OrderState] PendingCancel {report}"));
    }

    fn handle_canceled(
        &self,
        report: &ExecutionReport,
        side_book: &mut SideBook,
        tracker: &mut ReservedPositionTracker,
    ) {
        // Cancel leg of a replace: the layer is parked until the new leg
        // lands. The tick mapping and reserved quantity stay put: the
        // replace delta was accounted when the replace was emitted.
        if let Some(layer) = side_book
            .orig_id_to_layer
            .remove(&report.cl_order_id.value())
        {
            side_book.slots[layer].state = SlotState::Reserved;
            self.log
                .info(format!("[OrderState] Canceled (for replace) {report}"));
            return;
        }

        let Some(layer) = self.find_layer(side_book, report) else {
            self.log
                .error(format!("[OrderState] Canceled: layer not found {report}"));
            return;
        };
        let slot = &mut side_book.slots[layer];
        tracker.remove_reserved(report.side, slot.qty.raw());
        slot.state = SlotState::Dead;
        side_book.unmap_layer(layer);
        self.log.info(format!("[OrderState] Canceled {report}"));
    }

    fn handle_rejected_or_expired(
        &self,
        report: &ExecutionReport,
        side_book: &mut SideBook,
        tracker: &mut ReservedPositionTracker,
    ) {
        let replace_layer = side_book
            .new_id_to_layer
            .get(&report.cl_order_id.value())
            .copied();

        if let Some(layer) = replace_layer {
            if let Some(pend) = side_book.pending_replace[layer].take() {
                // The new leg of a replace failed: restore the original
                // order exactly and roll back the reserved delta.
                let delta_raw = pend.new_qty.raw() - pend.original_qty.raw();
                tracker.remove_reserved(report.side, delta_raw);

                side_book
                    .new_id_to_layer
                    .remove(&report.cl_order_id.value());
                side_book
                    .orig_id_to_layer
                    .remove(&pend.original_cl_order_id.value());

                side_book.layer_ticks[layer] = pend.original_tick;
                let slot = &mut side_book.slots[layer];
                slot.state = SlotState::Live;
                slot.price = pend.original_price;
                slot.qty = pend.original_qty;
                slot.cl_order_id = pend.original_cl_order_id;

                self.log.info(format!(
                    "[OrderState] {} (replace failed, restored original id:{} {}@{}) {report}",
                    report.ord_status,
                    pend.original_cl_order_id,
                    pend.original_qty,
                    pend.original_price,
                ));
                return;
            }
        }

        // A straight reject/expiry is a late cancel.
        if let Some(layer) = self.find_layer(side_book, report) {
            let slot = &mut side_book.slots[layer];
            tracker.remove_reserved(report.side, slot.qty.raw());
            slot.state = SlotState::Dead;
            side_book.unmap_layer(layer);
            self.log
                .error(format!("[OrderState] {} {report}", report.ord_status));
        } else {
            self.log.error(format!(
                "[OrderState] {}: layer not found {report}",
                report.ord_status
            ));
        }
    }
}
