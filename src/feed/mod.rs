//! Market-data ingestion: wire schema, generic and one-pass decoders, and
//! the domain mapper that produces pooled book-update batches.

mod generic;
mod mapper;
mod onepass;
mod traits;
mod wire;

#[cfg(test)]
mod tests;

pub use generic::GenericJsonDecoder;
pub use mapper::{DomainMapper, FeedReject, InstrumentInfo, MarketPools};
pub use onepass::OnePassDecoder;
pub use traits::{
    MarketDecoder, default_streams, snapshot_request_message, subscription_message,
};
pub use wire::{
    ApiError, ApiResponse, BookTickerEvent, DepthSnapshot, DepthUpdate, ExchangeInfo,
    ExchangeSymbol, TradeEvent, WireLevel, WireMessage,
};
