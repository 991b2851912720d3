//! Response mapper: order-entry wire payloads to execution reports.

use serde::Deserialize;

use crate::logging::LogProducer;
use crate::types::{OrderId, Price, Qty, Side, TickerId};

use super::report::{ExecType, ExecutionReport, OrdStatus};

const EXEC_REPORT_PREFIX: &str = r#"{"e":"executionReport""#;

#[derive(Deserialize)]
struct RawExecutionReport {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "c")]
    client_order_id: String,
    #[serde(rename = "S")]
    side: String,
    #[serde(rename = "x")]
    exec_type: String,
    #[serde(rename = "X")]
    ord_status: String,
    #[serde(rename = "p")]
    price: String,
    #[serde(rename = "q")]
    order_qty: String,
    #[serde(rename = "l", default)]
    last_qty: String,
    #[serde(rename = "z", default)]
    cum_qty: String,
    #[serde(rename = "L", default)]
    last_price: String,
    #[serde(rename = "r", default)]
    reject_reason: String,
    #[serde(rename = "m", default)]
    is_maker: bool,
}

/// Normalises order-entry stream payloads. Payloads that are not
/// execution reports (acks, pings) map to `None` and dispatch as no-ops.
pub struct ResponseMapper {
    log: LogProducer,
}

impl ResponseMapper {
    pub fn new(log: LogProducer) -> Self {
        Self { log }
    }

    pub fn map_execution_report(&self, payload: &str) -> Option<ExecutionReport> {
        if !payload.starts_with(EXEC_REPORT_PREFIX) {
            return None;
        }
        let raw: RawExecutionReport = match serde_json::from_str(payload) {
            Ok(raw) => raw,
            Err(err) => {
                self.log
                    .error(format!("malformed execution report: {err}"));
                return None;
            }
        };

        let cl_order_id = raw
            .client_order_id
            .parse::<u64>()
            .map(OrderId)
            .unwrap_or(OrderId::INVALID);
        let side = match raw.side.as_str() {
            "BUY" => Side::Buy,
            "SELL" => Side::Sell,
            _ => Side::Invalid,
        };
        let exec_type = ExecType::from_wire(&raw.exec_type);
        let ord_status = OrdStatus::from_wire(&raw.ord_status);

        let order_qty = Qty::parse(&raw.order_qty).unwrap_or(Qty::ZERO);
        let cum_qty = Qty::parse(&raw.cum_qty).unwrap_or(Qty::ZERO);
        let last_qty = Qty::parse(&raw.last_qty).unwrap_or(Qty::ZERO);
        let leaves_qty = order_qty.saturating_sub(cum_qty);

        // Fills are accounted at the execution price, everything else at
        // the order's limit price.
        let order_price = Price::parse(&raw.price).unwrap_or(Price::INVALID);
        let price = if exec_type == ExecType::Trade {
            Price::parse(&raw.last_price).unwrap_or(order_price)
        } else {
            order_price
        };

        Some(ExecutionReport {
            cl_order_id,
            symbol: TickerId::new(&raw.symbol),
            exec_type,
            ord_status,
            side,
            price,
            cum_qty,
            leaves_qty,
            last_qty,
            error_code: 0,
            text: raw.reject_reason,
            is_maker: raw.is_maker,
        })
    }
}
