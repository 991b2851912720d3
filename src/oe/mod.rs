//! Order entry: request model, execution reports, wire encoder, response
//! mapper and the transport-facing gateway.

mod encoder;
mod gateway;
mod report;
mod request;
mod response;

pub use encoder::{EncodeError, JsonOrderEncoder, OrderEncoder};
pub use gateway::OrderGateway;
pub use report::{ExecType, ExecutionReport, OrdStatus};
pub use request::{OrderKind, OrderRequest, RequestKind, TimeInForce};
pub use response::ResponseMapper;
