//! Per-symbol trade engine: configuration, transport-thread handlers and
//! the two-thread pipeline orchestrator.

mod config;
mod handler;
mod trade_engine;

pub use config::{EngineConfig, PoolConfig, RingConfig};
pub use handler::{
    MarketFeedHandler, ResponseFeedHandler, SESSION_DOWN, SESSION_UNKNOWN, SESSION_UP, SessionFlag,
    SnapshotRequestFlag,
};
pub use trade_engine::{EngineHandles, TradeEngine};
