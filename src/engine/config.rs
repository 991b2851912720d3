//! Per-symbol engine configuration.
//!
//! Configuration loading lives outside the core; these structs are the
//! pre-bound values the engine consumes. Everything is written once at
//! startup and read-only afterwards.

use crate::risk::RiskConfig;
use crate::strategy::StrategyConfig;
use crate::types::{Qty, TickerId, scale};

/// Everything one symbol's engine needs to run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub ticker: TickerId,
    /// Book price range, raw units.
    pub min_price_raw: i64,
    pub max_price_raw: i64,
    /// Quote-layer tick size, raw price units.
    pub tick_size_raw: i64,
    /// Depth requested for snapshots.
    pub snapshot_depth: u32,
    /// Use the one-pass decoder on the hot streams instead of the
    /// default generic path.
    pub one_pass_decoder: bool,
    pub risk: RiskConfig,
    pub strategy_name: String,
    pub strategy: StrategyConfig,
    /// Cores to pin the hot threads to; unpinned when `None`.
    pub market_cpu: Option<usize>,
    pub response_cpu: Option<usize>,
    pub rings: RingConfig,
    pub pools: PoolConfig,
}

/// Ring capacities (powers of two).
#[derive(Debug, Clone, Copy)]
pub struct RingConfig {
    pub book_updates: usize,
    pub responses: usize,
    /// Strategy intents crossing from the market-data thread. Sized for
    /// bursts: a response-side callback may submit synchronously, so this
    /// ring only carries market-thread traffic.
    pub intents: usize,
    pub requests: usize,
    /// Execution-report echoes to the strategy thread.
    pub report_echo: usize,
}

impl Default for RingConfig {
    fn default() -> Self {
        RingConfig {
            book_updates: 128,
            responses: 64,
            intents: 256,
            requests: 64,
            report_echo: 128,
        }
    }
}

/// Market-data pool capacities.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub entries: usize,
    pub batches: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            entries: 16_384,
            batches: 256,
        }
    }
}

impl EngineConfig {
    /// Conservative defaults for one symbol; real deployments override
    /// the risk and strategy blocks.
    pub fn for_ticker(ticker: TickerId) -> Self {
        let strategy = StrategyConfig {
            ticker: ticker.clone(),
            ..StrategyConfig::default()
        };
        EngineConfig {
            ticker,
            min_price_raw: scale::PRICE_SCALE,
            max_price_raw: scale::PRICE_SCALE * 1_000_000,
            tick_size_raw: 1,
            snapshot_depth: 1_000,
            one_pass_decoder: false,
            risk: RiskConfig {
                max_position: Qty::from_int(10),
                max_order_size: Qty::from_int(1),
                max_loss: -100 * scale::PNL_SCALE,
            },
            strategy_name: "market_maker".to_string(),
            strategy,
            market_cpu: None,
            response_cpu: None,
            rings: RingConfig::default(),
            pools: PoolConfig::default(),
        }
    }
}
