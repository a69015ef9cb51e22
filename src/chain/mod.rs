//! Transaction-building collaborator interface.
//!
//! The core never talks to a node directly. Everything it needs from the
//! chain — the signing identity, ERC-20 balance and allowance reads, and
//! turning a described contract call into a signed, broadcastable unit —
//! goes through this trait. Retry and timeout policy is the implementor's
//! problem; the core only sees a complete result or a typed failure.

use crate::domain::BlockchainTransaction;
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod mock;

pub use mock::MockTransactionBuilder;

/// A signed, ready-to-broadcast transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub tx_hash: String,
    /// Raw signed payload in hex, as the broadcaster wants it.
    pub raw: String,
    pub gas_limit: u64,
}

/// Error type for transaction-builder operations.
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("rpc read failed: {0}")]
    Rpc(String),
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("unknown token contract {0}")]
    UnknownToken(Address),
}

#[async_trait]
pub trait TransactionBuilder: Send + Sync + fmt::Debug {
    /// Address of the hot wallet this builder signs with.
    fn wallet_address(&self) -> Address;

    /// ERC-20 `balanceOf(owner)`.
    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, ChainError>;

    /// ERC-20 `allowance(owner, spender)`.
    async fn token_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError>;

    /// Describe a contract call as a transaction record, assigning a nonce.
    /// The ABI encoding happens on the implementor's side at broadcast time.
    async fn create_transaction(
        &self,
        contract: Address,
        function_name: &str,
        args: serde_json::Value,
        gas_limit: u64,
    ) -> Result<BlockchainTransaction, ChainError>;

    /// Sign a previously described transaction.
    async fn sign_transaction(
        &self,
        tx: &BlockchainTransaction,
        gas_limit: u64,
    ) -> Result<SignedTransaction, ChainError>;
}
