//! Pure route resolution over pair and asset identifiers.
//!
//! No chain access here: these functions only decide which token is spent,
//! which is acquired, and whether two pairs can be chained into a two-hop
//! route. The reserve asset must be one side of every tradable pair,
//! directly or through exactly one intermediary hop.

use super::RoutingError;
use crate::domain::{AssetIdentifier, TradingPairIdentifier};
use alloy_primitives::Address;

/// Resolve trade direction on a single pair.
///
/// Returns `(acquired, spent)`: buying with the reserve on the quote side
/// keeps the standard direction, a reserve on the base side flips it. Any
/// other configuration cannot be routed.
pub fn get_base_quote(
    pair: &TradingPairIdentifier,
    reserve: &AssetIdentifier,
) -> Result<(AssetIdentifier, AssetIdentifier), RoutingError> {
    if *reserve == pair.quote {
        Ok((pair.base.clone(), pair.quote.clone()))
    } else if *reserve == pair.base {
        // Sell direction: the nominal quote side is what we acquire.
        Ok((pair.quote.clone(), pair.base.clone()))
    } else {
        Err(RoutingError::CannotRouteThroughPair {
            pair: pair.to_string(),
            reserve: reserve.to_string(),
        })
    }
}

/// Resolve trade direction across a two-hop route.
///
/// Returns `(acquired, spent, intermediary)`. The buy orientation spends
/// the intermediary pair's quote (the reserve); the sell orientation is
/// entered with the target pair's base as the asset being unwound.
pub fn get_base_quote_intermediary(
    target: &TradingPairIdentifier,
    intermediary: &TradingPairIdentifier,
    reserve: &AssetIdentifier,
) -> Result<(AssetIdentifier, AssetIdentifier, AssetIdentifier), RoutingError> {
    if *reserve == intermediary.quote {
        // Buy: reserve -> intermediary -> target base.
        Ok((
            target.base.clone(),
            intermediary.quote.clone(),
            intermediary.base.clone(),
        ))
    } else if *reserve == target.base {
        // Sell: target base -> intermediary -> reserve.
        Ok((
            intermediary.quote.clone(),
            target.base.clone(),
            intermediary.base.clone(),
        ))
    } else {
        Err(RoutingError::UnroutableHop {
            intermediary: intermediary.to_string(),
            target: target.to_string(),
        })
    }
}

/// Convert a route to physical token addresses.
///
/// A direct route yields `(base, quote, None)`; a two-hop route yields
/// `(target.base, intermediary.quote, Some(intermediary.base))`, i.e. the
/// token tuple in base → intermediary → quote order for a multi-hop swap
/// path.
pub fn route_tokens(
    target: &TradingPairIdentifier,
    intermediary: Option<&TradingPairIdentifier>,
) -> (Address, Address, Option<Address>) {
    match intermediary {
        None => (target.base.address, target.quote.address, None),
        Some(intermediary) => (
            target.base.address,
            intermediary.quote.address,
            Some(intermediary.base.address),
        ),
    }
}

/// Check that two pairs chain into a valid two-hop route.
///
/// The intermediary's base must be the target's quote (token continuity),
/// both pairs must carry exchange information, and both legs must trade on
/// the same exchange. A violation is a misconfigured strategy or universe,
/// never a retryable condition.
pub fn validate_pairs(
    target: &TradingPairIdentifier,
    intermediary: &TradingPairIdentifier,
) -> Result<(), RoutingError> {
    if intermediary.base != target.quote {
        return Err(RoutingError::UnroutableHop {
            intermediary: intermediary.to_string(),
            target: target.to_string(),
        });
    }

    if target.exchange_address == Address::ZERO {
        return Err(RoutingError::MissingExchange {
            pair: target.to_string(),
        });
    }
    if intermediary.exchange_address == Address::ZERO {
        return Err(RoutingError::MissingExchange {
            pair: intermediary.to_string(),
        });
    }

    validate_exchange(target, intermediary)
}

/// Check that both legs trade on the same exchange. Address comparison is
/// over the 20 raw bytes, so checksum casing cannot split an exchange in
/// two.
pub fn validate_exchange(
    target: &TradingPairIdentifier,
    intermediary: &TradingPairIdentifier,
) -> Result<(), RoutingError> {
    if intermediary.exchange_address != target.exchange_address {
        return Err(RoutingError::ExchangeMismatch {
            intermediary: intermediary.to_string(),
            intermediary_exchange: intermediary.exchange_address,
            target: target.to_string(),
            target_exchange: target.exchange_address,
        });
    }
    Ok(())
}
