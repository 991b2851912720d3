//! Order management: layer book, reserved-quantity accounting, the order
//! state manager and the intent-driven order manager.

mod layer_book;
mod manager;
mod reserved;
mod state;

#[cfg(test)]
mod tests;

pub use layer_book::{
    AssignPlan, LayerBook, OrderSlot, PendingReplace, SLOTS_PER_SIDE, SideBook, SlotState,
    TICK_INVALID, TickConverter,
};
pub use manager::{OrderManager, OrderSink, QuoteIntent};
pub use reserved::ReservedPositionTracker;
pub use state::OrderStateManager;
