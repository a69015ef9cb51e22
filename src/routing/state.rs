//! Per-cycle routing state: approval deduplication and balance preflight.
//!
//! One `RoutingState` is created for each trading cycle and discarded when
//! the cycle ends. Approvals remembered here never leak into the next cycle
//! — a later cycle may run with a different signing identity, and stale
//! approval state against the wrong wallet would be invisible until a swap
//! reverts.

use super::RoutingError;
use crate::chain::{SignedTransaction, TransactionBuilder};
use crate::domain::{AssetIdentifier, BlockchainTransaction};
use alloy_primitives::{Address, U256};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Gas budget for an ERC-20 approve; the call cannot plausibly need more.
pub const DEFAULT_APPROVE_GAS_LIMIT: u64 = 100_000;

/// Maximum gas we are willing to pay for a swap.
pub const DEFAULT_SWAP_GAS_LIMIT: u64 = 2_000_000;

pub struct RoutingState {
    tx_builder: Arc<dyn TransactionBuilder>,
    wallet: Address,
    /// router -> tokens already approved for it this cycle.
    approved_routes: HashMap<Address, HashSet<Address>>,
    approve_gas_limit: u64,
    swap_gas_limit: u64,
}

impl RoutingState {
    pub fn new(tx_builder: Arc<dyn TransactionBuilder>) -> Self {
        let wallet = tx_builder.wallet_address();
        Self {
            tx_builder,
            wallet,
            approved_routes: HashMap::new(),
            approve_gas_limit: DEFAULT_APPROVE_GAS_LIMIT,
            swap_gas_limit: DEFAULT_SWAP_GAS_LIMIT,
        }
    }

    pub fn with_gas_limits(mut self, swap_gas_limit: u64, approve_gas_limit: u64) -> Self {
        self.swap_gas_limit = swap_gas_limit;
        self.approve_gas_limit = approve_gas_limit;
        self
    }

    pub fn wallet_address(&self) -> Address {
        self.wallet
    }

    pub fn swap_gas_limit(&self) -> u64 {
        self.swap_gas_limit
    }

    pub fn transaction_builder(&self) -> &Arc<dyn TransactionBuilder> {
        &self.tx_builder
    }

    fn is_approved_this_cycle(&self, token: Address, router: Address) -> bool {
        self.approved_routes
            .get(&router)
            .map(|tokens| tokens.contains(&token))
            .unwrap_or(false)
    }

    fn mark_router_approved(&mut self, token: Address, router: Address) {
        self.approved_routes.entry(router).or_default().insert(token);
    }

    /// Make sure the router can spend `token` on the wallet's behalf.
    ///
    /// Returns at most one approval operation to schedule ahead of the swap.
    /// The in-memory mark is written *before* the on-chain allowance read so
    /// that a second trade routed through the same (router, token) in this
    /// cycle cannot race a duplicate approval in between.
    pub async fn ensure_token_approved(
        &mut self,
        token: Address,
        router: Address,
    ) -> Result<Option<BlockchainTransaction>, RoutingError> {
        if self.is_approved_this_cycle(token, router) {
            debug!(%token, %router, "approval already granted this cycle");
            return Ok(None);
        }

        self.mark_router_approved(token, router);

        let allowance = self
            .tx_builder
            .token_allowance(token, self.wallet, router)
            .await?;
        if allowance > U256::ZERO {
            // Infinite approval from an earlier cycle is still standing.
            debug!(%token, %router, "allowance already on chain");
            return Ok(None);
        }

        info!(%token, %router, "issuing infinite approval");
        let tx = self
            .tx_builder
            .create_transaction(
                token,
                "approve",
                json!([router.to_string(), U256::MAX.to_string()]),
                self.approve_gas_limit,
            )
            .await?;
        Ok(Some(tx))
    }

    /// Check the wallet holds at least `amount` of `asset` before spending.
    ///
    /// Guards against sequencing bugs where a sell's proceeds have not
    /// settled before a dependent buy is attempted.
    pub async fn check_has_enough_tokens(
        &self,
        asset: &AssetIdentifier,
        amount: U256,
    ) -> Result<(), RoutingError> {
        let balance = self
            .tx_builder
            .token_balance(asset.address, self.wallet)
            .await?;
        if balance < amount {
            return Err(RoutingError::OutOfBalance {
                wallet: self.wallet,
                token: asset.to_string(),
                required: asset.convert_to_decimals(amount)?,
                available: asset.convert_to_decimals(balance)?,
            });
        }
        Ok(())
    }

    /// Sign a prepared swap call with the cycle's swap gas budget.
    pub async fn get_signed_swap(
        &self,
        tx: &BlockchainTransaction,
    ) -> Result<SignedTransaction, RoutingError> {
        Ok(self
            .tx_builder
            .sign_transaction(tx, self.swap_gas_limit)
            .await?)
    }
}

impl std::fmt::Debug for RoutingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingState")
            .field("wallet", &self.wallet)
            .field("approved_routes", &self.approved_routes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockTransactionBuilder;
    use alloy_primitives::utils::parse_units;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn usdc() -> AssetIdentifier {
        AssetIdentifier::new(1, addr(0xaa), "USDC", 6)
    }

    fn state_with(builder: MockTransactionBuilder) -> RoutingState {
        RoutingState::new(Arc::new(builder))
    }

    #[tokio::test]
    async fn test_first_approval_is_issued() {
        let mut state = state_with(MockTransactionBuilder::new(1, addr(0x01)));
        let tx = state
            .ensure_token_approved(addr(0xaa), addr(0x77))
            .await
            .unwrap()
            .expect("approval expected");
        assert_eq!(tx.function_name, "approve");
        assert_eq!(tx.gas_limit, DEFAULT_APPROVE_GAS_LIMIT);
        assert_eq!(tx.contract_address, addr(0xaa));
    }

    #[tokio::test]
    async fn test_second_call_same_cycle_is_deduplicated() {
        let mut state = state_with(MockTransactionBuilder::new(1, addr(0x01)));
        let first = state
            .ensure_token_approved(addr(0xaa), addr(0x77))
            .await
            .unwrap();
        let second = state
            .ensure_token_approved(addr(0xaa), addr(0x77))
            .await
            .unwrap();
        assert!(first.is_some());
        assert!(second.is_none(), "at most one approval per cycle");
    }

    #[tokio::test]
    async fn test_existing_on_chain_allowance_skips_approval() {
        let builder = MockTransactionBuilder::new(1, addr(0x01));
        builder.set_allowance(addr(0xaa), addr(0x01), addr(0x77), U256::MAX);
        let mut state = state_with(builder);

        let tx = state
            .ensure_token_approved(addr(0xaa), addr(0x77))
            .await
            .unwrap();
        assert!(tx.is_none(), "approved in an earlier cycle");
    }

    #[tokio::test]
    async fn test_distinct_routers_each_get_an_approval() {
        let mut state = state_with(MockTransactionBuilder::new(1, addr(0x01)));
        let a = state
            .ensure_token_approved(addr(0xaa), addr(0x77))
            .await
            .unwrap();
        let b = state
            .ensure_token_approved(addr(0xaa), addr(0x78))
            .await
            .unwrap();
        assert!(a.is_some());
        assert!(b.is_some());
    }

    #[tokio::test]
    async fn test_out_of_balance_carries_decimal_amounts() {
        let asset = usdc();
        let builder = MockTransactionBuilder::new(1, addr(0x01)).with_balance(
            asset.address,
            addr(0x01),
            parse_units("500", 6).unwrap().get_absolute(),
        );
        let state = state_with(builder);

        let required = parse_units("9500", 6).unwrap().get_absolute();
        let err = state
            .check_has_enough_tokens(&asset, required)
            .await
            .unwrap_err();
        match err {
            RoutingError::OutOfBalance {
                required,
                available,
                token,
                ..
            } => {
                assert_eq!(required.to_canonical_string(), "9500");
                assert_eq!(available.to_canonical_string(), "500");
                assert!(token.contains("USDC"));
            }
            other => panic!("expected OutOfBalance, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sufficient_balance_passes() {
        let asset = usdc();
        let builder = MockTransactionBuilder::new(1, addr(0x01)).with_balance(
            asset.address,
            addr(0x01),
            parse_units("10000", 6).unwrap().get_absolute(),
        );
        let state = state_with(builder);

        let amount = parse_units("9500", 6).unwrap().get_absolute();
        assert!(state.check_has_enough_tokens(&asset, amount).await.is_ok());
    }
}
