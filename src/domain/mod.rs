//! Domain types for the execution core.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Asset and pair identity (AssetIdentifier, TradingPairIdentifier)
//! - Trade records with a planned → executed lifecycle
//! - The position and portfolio ledger entities

pub mod decimal;
pub mod identifier;
pub mod portfolio;
pub mod position;
pub mod trade;

pub use decimal::{Decimal, DecimalConversionError, UsDollarAmount};
pub use identifier::{AssetIdentifier, PairKey, TokenAmountError, TradingPairIdentifier};
pub use portfolio::{Portfolio, ReservePosition};
pub use position::TradingPosition;
pub use trade::{BlockchainTransaction, TradeExecution, TradeStatus, TradeType};
