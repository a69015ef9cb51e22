//! Trade routing: turning a decided trade into ordered chain operations.
//!
//! Routing answers two questions. First, through which tokens can this
//! trade physically move — a direct pool, or two hops through an
//! intermediary reserve pair. Second, which operations have to land on
//! chain, in order: zero or more ERC-20 approvals followed by one swap.
//!
//! The approval bookkeeping lives in [`RoutingState`], which is created
//! fresh for every trading cycle and thrown away at the end of it.

use crate::chain::ChainError;
use crate::domain::{Decimal, TokenAmountError};
use alloy_primitives::Address;
use thiserror::Error;

pub mod route;
pub mod state;
pub mod uniswap_v2;

pub use route::{
    get_base_quote, get_base_quote_intermediary, route_tokens, validate_exchange, validate_pairs,
};
pub use state::RoutingState;
pub use uniswap_v2::{RoutingModel, UniswapV2Routing};

/// Error type for route resolution and construction.
///
/// Everything except `OutOfBalance` is a fatal precondition failure: it
/// means the strategy or universe is misconfigured, not that the chain had
/// a bad day.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// The reserve asset is not a side of the pair being traded.
    #[error("cannot route trade through {pair}: {reserve} is not a side of the pair")]
    CannotRouteThroughPair { pair: String, reserve: String },

    /// Two-hop chaining constraint violated; names the pair that broke the
    /// chain.
    #[error("could not hop from intermediary {intermediary} to target {target}")]
    UnroutableHop {
        intermediary: String,
        target: String,
    },

    /// A pair carries no exchange information.
    #[error("pair {pair} is missing exchange information")]
    MissingExchange { pair: String },

    /// Both legs of a two-hop route must trade on the same exchange.
    #[error("route crosses exchanges: intermediary {intermediary} is on {intermediary_exchange}, target {target} is on {target_exchange}")]
    ExchangeMismatch {
        intermediary: String,
        intermediary_exchange: Address,
        target: String,
        target_exchange: Address,
    },

    /// The pair trades on an exchange this routing model does not serve.
    #[error("pair {pair} trades on exchange {exchange}, not the configured one")]
    UnsupportedExchange { pair: String, exchange: Address },

    /// The wallet holds fewer tokens than the trade is about to spend.
    /// Recoverable: the caller can resequence trades or wait for a sell to
    /// settle.
    #[error("wallet {wallet} does not have enough {token}: need {required}, have {available}")]
    OutOfBalance {
        wallet: Address,
        token: String,
        required: Decimal,
        available: Decimal,
    },

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("token amount conversion failed: {0}")]
    TokenAmount(#[from] TokenAmountError),
}
