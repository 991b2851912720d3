//! Per-side quote slots ("layers") and their tick ownership.
//!
//! Each (ticker, side) owns eight slots; a slot hosts at most one live
//! exchange order and is keyed by the integer tick of its quote level.
//! Slot selection is idempotent on tick, falls back to a free slot, and
//! finally evicts the least-recently-used live slot (the caller must
//! cancel the victim's order before reusing the layer).

use rustc_hash::FxHashMap;
use std::fmt;

use crate::types::{OrderId, Price, Qty, SIDE_COUNT, Side, TickerId};

/// Quote slots per (ticker, side).
pub const SLOTS_PER_SIDE: usize = 8;

/// Tick value marking an unmapped layer.
pub const TICK_INVALID: u64 = u64::MAX;

/// Lifecycle of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotState {
    #[default]
    Invalid,
    PendingNew,
    Live,
    PendingCancel,
    /// Cancel leg of a replace acknowledged; the layer is held for the
    /// incoming new leg.
    Reserved,
    Dead,
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SlotState::Invalid => "INVALID",
            SlotState::PendingNew => "PENDING_NEW",
            SlotState::Live => "LIVE",
            SlotState::PendingCancel => "PENDING_CANCEL",
            SlotState::Reserved => "RESERVED",
            SlotState::Dead => "DEAD",
        };
        f.write_str(s)
    }
}

/// One quote slot.
#[derive(Debug, Clone, Default)]
pub struct OrderSlot {
    pub state: SlotState,
    pub price: Price,
    pub qty: Qty,
    pub cl_order_id: OrderId,
    pub last_used_ns: u64,
}

impl OrderSlot {
    /// Quantity currently committed to the exchange by this slot.
    pub fn commits_qty(&self) -> bool {
        matches!(
            self.state,
            SlotState::PendingNew | SlotState::Live | SlotState::PendingCancel | SlotState::Reserved
        )
    }
}

/// Saved state for an in-flight cancel-replace, used to roll the slot
/// back if the new leg is rejected.
#[derive(Debug, Clone)]
pub struct PendingReplace {
    pub original_price: Price,
    pub original_qty: Qty,
    pub original_tick: u64,
    pub original_cl_order_id: OrderId,
    pub cancel_cl_order_id: OrderId,
    pub new_cl_order_id: OrderId,
    pub new_qty: Qty,
    pub new_tick: u64,
}

/// Slot assignment decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignPlan {
    pub layer: usize,
    /// Set when the layer currently hosts a live order that must be
    /// cancelled before the new quote can use it.
    pub victim_live_layer: Option<usize>,
    pub tick: u64,
}

/// All slots of one (ticker, side).
#[derive(Debug)]
pub struct SideBook {
    pub slots: [OrderSlot; SLOTS_PER_SIDE],
    pub layer_ticks: [u64; SLOTS_PER_SIDE],
    /// New-leg client id of an in-flight replace -> layer.
    pub new_id_to_layer: FxHashMap<u64, usize>,
    /// Original order id of an in-flight replace -> layer.
    pub orig_id_to_layer: FxHashMap<u64, usize>,
    pub pending_replace: [Option<PendingReplace>; SLOTS_PER_SIDE],
}

impl Default for SideBook {
    fn default() -> Self {
        SideBook {
            slots: Default::default(),
            layer_ticks: [TICK_INVALID; SLOTS_PER_SIDE],
            new_id_to_layer: FxHashMap::default(),
            orig_id_to_layer: FxHashMap::default(),
            pending_replace: Default::default(),
        }
    }
}

impl SideBook {
    pub fn find_layer_by_tick(&self, tick: u64) -> Option<usize> {
        if tick == TICK_INVALID {
            return None;
        }
        self.layer_ticks.iter().position(|&t| t == tick)
    }

    pub fn find_layer_by_id(&self, order_id: OrderId) -> Option<usize> {
        if !order_id.is_valid() {
            return None;
        }
        self.slots
            .iter()
            .position(|slot| slot.cl_order_id == order_id)
    }

    /// A slot that can host a new quote without eviction: dead/invalid
    /// state or an unmapped tick.
    pub fn find_free_layer(&self) -> Option<usize> {
        for (layer, slot) in self.slots.iter().enumerate() {
            if matches!(slot.state, SlotState::Invalid | SlotState::Dead) {
                return Some(layer);
            }
            if self.layer_ticks[layer] == TICK_INVALID {
                return Some(layer);
            }
        }
        None
    }

    /// Least-recently-used layer.
    pub fn pick_victim_layer(&self) -> usize {
        let mut victim = 0;
        for layer in 1..SLOTS_PER_SIDE {
            if self.slots[layer].last_used_ns < self.slots[victim].last_used_ns {
                victim = layer;
            }
        }
        victim
    }

    /// Choose the layer that will host a quote at `tick`.
    pub fn plan_layer(&self, tick: u64) -> AssignPlan {
        if let Some(layer) = self.find_layer_by_tick(tick) {
            return AssignPlan {
                layer,
                victim_live_layer: None,
                tick,
            };
        }
        if let Some(layer) = self.find_free_layer() {
            return AssignPlan {
                layer,
                victim_live_layer: None,
                tick,
            };
        }
        let victim = self.pick_victim_layer();
        let victim_live_layer =
            (self.slots[victim].state == SlotState::Live).then_some(victim);
        AssignPlan {
            layer: victim,
            victim_live_layer,
            tick,
        }
    }

    pub fn unmap_layer(&mut self, layer: usize) {
        self.layer_ticks[layer] = TICK_INVALID;
    }

    /// Quantity committed to the exchange by this side: live/pending
    /// slots plus the delta of any in-flight replace. The side-level
    /// reserved counter must always equal this sum.
    pub fn committed_qty_raw(&self) -> i64 {
        let mut total = 0i64;
        for (layer, slot) in self.slots.iter().enumerate() {
            if slot.commits_qty() {
                total += slot.qty.raw();
            }
            if let Some(pend) = &self.pending_replace[layer] {
                total += pend.new_qty.raw() - pend.original_qty.raw();
            }
        }
        total
    }

    /// Most recent `last_used_ns` across the slots.
    pub fn last_used_ns(&self) -> u64 {
        self.slots
            .iter()
            .map(|slot| slot.last_used_ns)
            .max()
            .unwrap_or(0)
    }
}

/// Slot tables for every (ticker, side).
#[derive(Debug, Default)]
pub struct LayerBook {
    books: FxHashMap<TickerId, [SideBook; SIDE_COUNT]>,
}

impl LayerBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn side_book_mut(&mut self, ticker: &TickerId, side: Side) -> &mut SideBook {
        &mut self.books.entry(ticker.clone()).or_default()[side.index()]
    }

    pub fn side_book(&self, ticker: &TickerId, side: Side) -> Option<&SideBook> {
        self.books.get(ticker).map(|sides| &sides[side.index()])
    }

    /// Latest quoting activity per side of a symbol.
    pub fn last_used(&self, ticker: &TickerId) -> (u64, u64) {
        match self.books.get(ticker) {
            Some(sides) => (
                sides[Side::Buy.index()].last_used_ns(),
                sides[Side::Sell.index()].last_used_ns(),
            ),
            None => (0, 0),
        }
    }
}

/// Converts prices to the integer ticks that key quote layers.
#[derive(Debug, Clone, Copy)]
pub struct TickConverter {
    tick_size_raw: i64,
}

impl TickConverter {
    pub fn new(tick_size_raw: i64) -> Self {
        TickConverter {
            tick_size_raw: tick_size_raw.max(1),
        }
    }

    #[inline]
    pub fn to_tick(&self, price: Price) -> u64 {
        if !price.is_valid() {
            return TICK_INVALID;
        }
        (price.raw() / self.tick_size_raw) as u64
    }
}

impl Default for TickConverter {
    fn default() -> Self {
        TickConverter::new(1)
    }
}
