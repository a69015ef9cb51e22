//! Execution core of an automated trading strategy runner for Uniswap
//! v2-style decentralized exchanges.
//!
//! The crate covers four concerns: resolving which tokens a trade must move
//! through (`routing::route`), per-cycle approval and swap construction
//! (`routing`), the authoritative position ledger (`domain`, `engine`), and
//! the strategy-facing position manager (`strategy`). Chain access, pricing
//! and the pair universe are collaborator traits with deterministic
//! in-memory implementations for tests and backtests.

pub mod chain;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod pricing;
pub mod routing;
pub mod strategy;
pub mod universe;

pub use chain::{ChainError, MockTransactionBuilder, SignedTransaction, TransactionBuilder};
pub use config::Config;
pub use domain::{
    AssetIdentifier, BlockchainTransaction, Decimal, PairKey, Portfolio, ReservePosition,
    TradeExecution, TradeStatus, TradeType, TradingPairIdentifier, TradingPosition,
    UsDollarAmount,
};
pub use engine::{
    revalue_positions, CreatedTrade, Ledger, LedgerError, PositionValuation, TradeOptions,
    TradeSize,
};
pub use error::ExecutorError;
pub use pricing::{ConstantProductPricing, PriceStructure, PricingError, PricingModel};
pub use routing::{RoutingError, RoutingModel, RoutingState, UniswapV2Routing};
pub use strategy::{PositionManager, PositionManagerError};
pub use universe::{PairUniverse, StaticPairUniverse};
