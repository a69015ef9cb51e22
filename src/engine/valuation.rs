//! Valuation pass over the open positions.
//!
//! Positions are revalued at what they would actually fetch: the sell quote
//! for the position's full quantity, not the mid price. The pass is pure
//! over position state — its only effect is the stored (price, mid price,
//! timestamp) triple on each open position, so running it twice with the
//! same timestamp and model stores the same values.

use crate::engine::ledger::{Ledger, LedgerError};
use crate::pricing::{PricingError, PricingModel};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

/// One position's freshly computed valuation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionValuation {
    pub position_id: u64,
    /// Realizable price for the position's full quantity.
    pub price: f64,
    pub mid_price: f64,
}

/// Error type for the valuation pass.
#[derive(Debug, Error)]
pub enum ValuationError {
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Revalue every open position and store the results on the ledger.
///
/// Positions whose executed quantity is still zero (entry trade in flight)
/// keep their previous valuation — there is nothing to quote yet.
pub async fn revalue_positions(
    ledger: &mut Ledger,
    at: DateTime<Utc>,
    pricing: &dyn PricingModel,
) -> Result<Vec<PositionValuation>, ValuationError> {
    let snapshots: Vec<_> = ledger
        .portfolio()
        .open_positions
        .values()
        .map(|p| (p.position_id, p.pair.clone(), p.get_quantity()))
        .collect();

    let mut valuations = Vec::with_capacity(snapshots.len());
    for (position_id, pair, quantity) in snapshots {
        if !quantity.is_positive() {
            debug!(position_id, "skipping valuation, no executed quantity");
            continue;
        }
        let quote = pricing.get_sell_price(at, &pair, quantity).await?;
        valuations.push(PositionValuation {
            position_id,
            price: quote.price,
            mid_price: quote.mid_price,
        });
    }

    ledger.apply_valuations(at, &valuations)?;
    Ok(valuations)
}
