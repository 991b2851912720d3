//! Normalised execution reports from the exchange.

use std::fmt;

use crate::types::{OrderId, Price, Qty, Side, TickerId};

/// Order status as reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrdStatus {
    #[default]
    Invalid,
    PendingNew,
    New,
    PartiallyFilled,
    Filled,
    PendingCancel,
    Canceled,
    Rejected,
    Expired,
}

impl OrdStatus {
    pub fn from_wire(s: &str) -> OrdStatus {
        match s {
            "NEW" => OrdStatus::New,
            "PARTIALLY_FILLED" => OrdStatus::PartiallyFilled,
            "FILLED" => OrdStatus::Filled,
            "CANCELED" => OrdStatus::Canceled,
            "PENDING_CANCEL" => OrdStatus::PendingCancel,
            "REJECTED" => OrdStatus::Rejected,
            "PENDING_NEW" => OrdStatus::PendingNew,
            "EXPIRED" => OrdStatus::Expired,
            _ => OrdStatus::Invalid,
        }
    }
}

impl fmt::Display for OrdStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrdStatus::Invalid => "INVALID",
            OrdStatus::PendingNew => "PENDING_NEW",
            OrdStatus::New => "NEW",
            OrdStatus::PartiallyFilled => "PARTIALLY_FILLED",
            OrdStatus::Filled => "FILLED",
            OrdStatus::PendingCancel => "PENDING_CANCEL",
            OrdStatus::Canceled => "CANCELED",
            OrdStatus::Rejected => "REJECTED",
            OrdStatus::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

/// Execution type of the report (what happened, as opposed to the
/// resulting order state).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecType {
    #[default]
    New,
    Canceled,
    Replaced,
    Rejected,
    Trade,
    Expired,
}

impl ExecType {
    pub fn from_wire(s: &str) -> ExecType {
        match s {
            "TRADE" => ExecType::Trade,
            "CANCELED" => ExecType::Canceled,
            "REPLACED" => ExecType::Replaced,
            "REJECTED" => ExecType::Rejected,
            "EXPIRED" => ExecType::Expired,
            _ => ExecType::New,
        }
    }
}

/// One normalised execution report routed through the response ring.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub cl_order_id: OrderId,
    pub symbol: TickerId,
    pub exec_type: ExecType,
    pub ord_status: OrdStatus,
    pub side: Side,
    pub price: Price,
    pub cum_qty: Qty,
    pub leaves_qty: Qty,
    pub last_qty: Qty,
    pub error_code: i64,
    pub text: String,
    pub is_maker: bool,
}

impl fmt::Display for ExecutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExecutionReport{{id:{} {} {:?}/{} {} leaves:{} last:{} @{}}}",
            self.cl_order_id,
            self.symbol,
            self.exec_type,
            self.ord_status,
            self.side,
            self.leaves_qty,
            self.last_qty,
            self.price
        )
    }
}
