//! Outbound order-entry request model.

use std::fmt;

use crate::types::{OrderId, Price, Qty, Side, TickerId};

/// What kind of request travels to the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    NewOrder,
    Cancel,
    /// Atomic cancel of `orig_cl_order_id` plus placement of a new order.
    CancelReplace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderKind {
    #[default]
    Limit,
    Market,
}

impl OrderKind {
    pub fn wire_name(self) -> &'static str {
        match self {
            OrderKind::Limit => "LIMIT",
            OrderKind::Market => "MARKET",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeInForce {
    #[default]
    GoodTillCancel,
    ImmediateOrCancel,
    FillOrKill,
}

impl TimeInForce {
    pub fn wire_name(self) -> &'static str {
        match self {
            TimeInForce::GoodTillCancel => "GTC",
            TimeInForce::ImmediateOrCancel => "IOC",
            TimeInForce::FillOrKill => "FOK",
        }
    }
}

/// One outbound request, produced by the order manager and consumed by
/// the gateway/encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub kind: RequestKind,
    pub cl_order_id: OrderId,
    /// Original order id for cancels and the cancel leg of a replace.
    pub orig_cl_order_id: OrderId,
    /// Client id of the cancel leg of a replace.
    pub cancel_cl_order_id: OrderId,
    pub symbol: TickerId,
    pub side: Side,
    pub qty: Qty,
    pub price: Price,
    pub order_kind: OrderKind,
    pub time_in_force: TimeInForce,
}

impl OrderRequest {
    pub fn new_order(
        cl_order_id: OrderId,
        symbol: TickerId,
        side: Side,
        price: Price,
        qty: Qty,
        time_in_force: TimeInForce,
    ) -> Self {
        OrderRequest {
            kind: RequestKind::NewOrder,
            cl_order_id,
            orig_cl_order_id: OrderId::INVALID,
            cancel_cl_order_id: OrderId::INVALID,
            symbol,
            side,
            qty,
            price,
            order_kind: OrderKind::Limit,
            time_in_force,
        }
    }

    pub fn cancel(cl_order_id: OrderId, orig_cl_order_id: OrderId, symbol: TickerId) -> Self {
        OrderRequest {
            kind: RequestKind::Cancel,
            cl_order_id,
            orig_cl_order_id,
            cancel_cl_order_id: OrderId::INVALID,
            symbol,
            side: Side::Invalid,
            qty: Qty::ZERO,
            price: Price::INVALID,
            order_kind: OrderKind::Limit,
            time_in_force: TimeInForce::GoodTillCancel,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn cancel_replace(
        cancel_cl_order_id: OrderId,
        new_cl_order_id: OrderId,
        orig_cl_order_id: OrderId,
        symbol: TickerId,
        side: Side,
        price: Price,
        qty: Qty,
    ) -> Self {
        OrderRequest {
            kind: RequestKind::CancelReplace,
            cl_order_id: new_cl_order_id,
            orig_cl_order_id,
            cancel_cl_order_id,
            symbol,
            side,
            qty,
            price,
            order_kind: OrderKind::Limit,
            time_in_force: TimeInForce::GoodTillCancel,
        }
    }
}

impl fmt::Display for OrderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OrderRequest{{{:?} id:{} orig:{} {} {} {}@{}}}",
            self.kind,
            self.cl_order_id,
            self.orig_cl_order_id,
            self.symbol,
            self.side,
            self.qty,
            self.price
        )
    }
}
