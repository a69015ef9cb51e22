//! Strategy-facing API over the ledger and pricing collaborator.

pub mod position_manager;

pub use position_manager::{PositionManager, PositionManagerError};
