//! Lock-free substrate: SPSC queues, fixed-capacity memory pools, the
//! tiered wait strategy and variable-length framed byte rings.

pub mod feed_ring;
pub mod pool;
pub mod spsc;
pub mod var_ring;
pub mod wait;

pub use feed_ring::{
    DepthFrameMeta, FeedEntry, FeedFrameType, FeedReader, FeedWriter, market_feed_ring,
    market_feed_ring_with,
};
pub use pool::MemoryPool;
pub use spsc::{SpscConsumer, SpscProducer, spsc_channel};
pub use var_ring::{FrameHeader, VarRingReader, VarRingWriter, WRAP_LEN, byte_ring};
pub use wait::WaitStrategy;
