//! Order-entry request encoder.
//!
//! Produces complete wire frames as owned strings. Prices and quantities
//! are truncated toward zero onto the exchange-visible precision grid
//! before formatting, so an order can never carry more precision than the
//! venue accepts.

use thiserror::Error;

use crate::logging::LogProducer;
use crate::types::{Price, Qty, Side, scale};

use super::request::{OrderRequest, RequestKind};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("request carries no valid client order id")]
    MissingOrderId,
    #[error("request side is not tradable")]
    InvalidSide,
    #[error("limit order without a valid price")]
    InvalidPrice,
    #[error("order quantity is not positive")]
    InvalidQty,
    #[error("cancel without a valid original order id")]
    MissingOrigOrderId,
}

/// Encoder over one exchange dialect. Implementations produce complete,
/// owned frames; the gateway owns delivery and retries.
pub trait OrderEncoder: Send {
    fn encode(&self, request: &OrderRequest) -> Result<String, EncodeError>;

    /// Frame initiating a session logon, if the dialect needs one.
    fn logon_frame(&self) -> Option<String> {
        None
    }
}

fn side_name(side: Side) -> &'static str {
    if side == Side::Buy { "BUY" } else { "SELL" }
}

fn format_price(price: Price) -> String {
    price
        .truncate_to_step(scale::PRICE_SCALE / scale::PRICE_SCALE_ACTUAL)
        .to_string()
}

fn format_qty(qty: Qty) -> String {
    qty.truncate_to_step(scale::QTY_SCALE / scale::QTY_SCALE_ACTUAL)
        .to_string()
}

/// JSON websocket-API encoder.
pub struct JsonOrderEncoder {
    log: LogProducer,
}

impl JsonOrderEncoder {
    pub fn new(log: LogProducer) -> Self {
        Self { log }
    }

    fn encode_new(&self, request: &OrderRequest) -> Result<String, EncodeError> {
        if !request.side.is_tradable() {
            return Err(EncodeError::InvalidSide);
        }
        if !request.price.is_valid() {
            return Err(EncodeError::InvalidPrice);
        }
        if request.qty.raw() <= 0 {
            return Err(EncodeError::InvalidQty);
        }
        Ok(format!(
            "{{\"id\":\"{id}\",\"method\":\"order.place\",\"params\":{{\"symbol\":\"{symbol}\",\"side\":\"{side}\",\"type\":\"{kind}\",\"timeInForce\":\"{tif}\",\"price\":\"{price}\",\"quantity\":\"{qty}\",\"newClientOrderId\":\"{id}\"}}}}",
            id = request.cl_order_id.value(),
            symbol = request.symbol,
            side = side_name(request.side),
            kind = request.order_kind.wire_name(),
            tif = request.time_in_force.wire_name(),
            price = format_price(request.price),
            qty = format_qty(request.qty),
        ))
    }

    fn encode_cancel(&self, request: &OrderRequest) -> Result<String, EncodeError> {
        if !request.orig_cl_order_id.is_valid() {
            return Err(EncodeError::MissingOrigOrderId);
        }
        Ok(format!(
            "{{\"id\":\"{id}\",\"method\":\"order.cancel\",\"params\":{{\"symbol\":\"{symbol}\",\"origClientOrderId\":\"{orig}\"}}}}",
            id = request.cl_order_id.value(),
            symbol = request.symbol,
            orig = request.orig_cl_order_id.value(),
        ))
    }

    fn encode_cancel_replace(&self, request: &OrderRequest) -> Result<String, EncodeError> {
        if !request.orig_cl_order_id.is_valid() {
            return Err(EncodeError::MissingOrigOrderId);
        }
        if !request.side.is_tradable() {
            return Err(EncodeError::InvalidSide);
        }
        if !request.price.is_valid() {
            return Err(EncodeError::InvalidPrice);
        }
        if request.qty.raw() <= 0 {
            return Err(EncodeError::InvalidQty);
        }
        Ok(format!(
            "{{\"id\":\"{cancel_id}\",\"method\":\"order.cancelReplace\",\"params\":{{\"symbol\":\"{symbol}\",\"cancelOrigClientOrderId\":\"{orig}\",\"side\":\"{side}\",\"type\":\"{kind}\",\"timeInForce\":\"{tif}\",\"price\":\"{price}\",\"quantity\":\"{qty}\",\"newClientOrderId\":\"{new_id}\"}}}}",
            cancel_id = request.cancel_cl_order_id.value(),
            symbol = request.symbol,
            orig = request.orig_cl_order_id.value(),
            side = side_name(request.side),
            kind = request.order_kind.wire_name(),
            tif = request.time_in_force.wire_name(),
            price = format_price(request.price),
            qty = format_qty(request.qty),
            new_id = request.cl_order_id.value(),
        ))
    }
}

impl OrderEncoder for JsonOrderEncoder {
    fn encode(&self, request: &OrderRequest) -> Result<String, EncodeError> {
        if !request.cl_order_id.is_valid() {
            self.log
                .error(format!("refusing to encode id-less request {request}"));
            return Err(EncodeError::MissingOrderId);
        }
        match request.kind {
            RequestKind::NewOrder => self.encode_new(request),
            RequestKind::Cancel => self.encode_cancel(request),
            RequestKind::CancelReplace => self.encode_cancel_replace(request),
        }
    }

    fn logon_frame(&self) -> Option<String> {
        // Session auth is pre-bound by the credentials service; the
        // websocket API carries signed params per request instead of a
        // session logon.
        None
    }
}
