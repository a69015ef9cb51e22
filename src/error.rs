//! Crate-level error aggregation.
//!
//! Each subsystem keeps its own error enum; this type exists for callers
//! that drive a whole cycle and want one `?`-able error. The taxonomy
//! matters more than the nesting: precondition violations (ledger, position
//! manager, routing validation) are programming or configuration errors,
//! `OutOfBalance` and missing price samples are operational conditions the
//! caller may recover from.

use crate::chain::ChainError;
use crate::config::ConfigError;
use crate::domain::DecimalConversionError;
use crate::engine::{LedgerError, ValuationError};
use crate::pricing::PricingError;
use crate::routing::RoutingError;
use crate::strategy::PositionManagerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Routing(#[from] RoutingError),
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error(transparent)]
    Valuation(#[from] ValuationError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    PositionManager(#[from] PositionManagerError),
    #[error(transparent)]
    Conversion(#[from] DecimalConversionError),
}
