//! Convenience re-exports for building and driving an engine.

pub use crate::book::{Bbo, BookConfig, BookEvent, LevelView, MarketOrderBook};
pub use crate::engine::{
    EngineConfig, EngineHandles, MarketFeedHandler, PoolConfig, ResponseFeedHandler, RingConfig,
    TradeEngine,
};
pub use crate::feed::{
    DomainMapper, GenericJsonDecoder, MarketDecoder, MarketPools, OnePassDecoder, WireMessage,
};
pub use crate::features::FeatureEngine;
pub use crate::logging::{LogLevel, LogProducer, Logger, init_tracing};
pub use crate::oe::{
    ExecType, ExecutionReport, JsonOrderEncoder, OrdStatus, OrderEncoder, OrderGateway,
    OrderRequest, RequestKind, ResponseMapper, TimeInForce,
};
pub use crate::orders::{
    LayerBook, OrderManager, OrderSink, QuoteIntent, ReservedPositionTracker, SLOTS_PER_SIDE,
    SlotState, TickConverter,
};
pub use crate::risk::{PositionInfo, PositionKeeper, RiskCheckResult, RiskConfig, RiskManager};
pub use crate::strategy::{
    Strategy, StrategyConfig, StrategyContext, StrategyHandle, register_builtin_strategies,
    register_strategy,
};
pub use crate::sync::{
    MemoryPool, SpscConsumer, SpscProducer, WaitStrategy, market_feed_ring, spsc_channel,
};
pub use crate::transport::{CONNECTED_SENTINEL, RecordingTransport, TransportOut};
pub use crate::types::{
    FixedPoint, MarketData, MarketUpdateData, MarketUpdateType, OrderId, PnlRaw, Price, Qty, Side,
    TickerId, scale,
};
