//! In-memory transaction builder for tests and backtests.
//!
//! Balances and allowances live in mutexed maps; transaction hashes are
//! derived deterministically from the call description and nonce, so a
//! backtest replays to identical records.

use super::{ChainError, SignedTransaction, TransactionBuilder};
use crate::domain::BlockchainTransaction;
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug)]
pub struct MockTransactionBuilder {
    chain_id: u64,
    wallet: Address,
    balances: Mutex<HashMap<(Address, Address), U256>>,
    allowances: Mutex<HashMap<(Address, Address, Address), U256>>,
    next_nonce: AtomicU64,
}

impl MockTransactionBuilder {
    pub fn new(chain_id: u64, wallet: Address) -> Self {
        Self {
            chain_id,
            wallet,
            balances: Mutex::new(HashMap::new()),
            allowances: Mutex::new(HashMap::new()),
            next_nonce: AtomicU64::new(0),
        }
    }

    /// Seed a token balance for an owner.
    pub fn with_balance(self, token: Address, owner: Address, amount: U256) -> Self {
        self.set_balance(token, owner, amount);
        self
    }

    pub fn set_balance(&self, token: Address, owner: Address, amount: U256) {
        self.balances
            .lock()
            .expect("balance map poisoned")
            .insert((token, owner), amount);
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.allowances
            .lock()
            .expect("allowance map poisoned")
            .insert((token, owner, spender), amount);
    }

    fn hash_call(&self, tx: &BlockchainTransaction) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.chain_id.to_le_bytes());
        hasher.update(tx.contract_address.as_slice());
        hasher.update(tx.function_name.as_bytes());
        hasher.update(tx.args.to_string().as_bytes());
        if let Some(nonce) = tx.nonce {
            hasher.update(nonce.to_le_bytes());
        }
        let digest = hasher.finalize();
        format!("0x{}", hex::encode(digest))
    }
}

#[async_trait]
impl TransactionBuilder for MockTransactionBuilder {
    fn wallet_address(&self) -> Address {
        self.wallet
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
        Ok(self
            .balances
            .lock()
            .expect("balance map poisoned")
            .get(&(token, owner))
            .copied()
            .unwrap_or(U256::ZERO))
    }

    async fn token_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError> {
        Ok(self
            .allowances
            .lock()
            .expect("allowance map poisoned")
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or(U256::ZERO))
    }

    async fn create_transaction(
        &self,
        contract: Address,
        function_name: &str,
        args: serde_json::Value,
        gas_limit: u64,
    ) -> Result<BlockchainTransaction, ChainError> {
        let nonce = self.next_nonce.fetch_add(1, Ordering::SeqCst);
        let mut tx = BlockchainTransaction {
            chain_id: self.chain_id,
            contract_address: contract,
            function_name: function_name.to_string(),
            args,
            gas_limit,
            nonce: Some(nonce),
            tx_hash: None,
        };
        tx.tx_hash = Some(self.hash_call(&tx));

        // Mirror the state change an approve would make, so allowance reads
        // in the same cycle observe it.
        if function_name == "approve" {
            if let (Some(spender), Some(amount)) = (
                tx.args.get(0).and_then(|v| v.as_str()),
                tx.args.get(1).and_then(|v| v.as_str()),
            ) {
                let spender: Address = spender
                    .parse()
                    .map_err(|_| ChainError::Rpc(format!("bad spender address {spender}")))?;
                let amount: U256 = amount
                    .parse()
                    .map_err(|_| ChainError::Rpc(format!("bad approve amount {amount}")))?;
                self.set_allowance(contract, self.wallet, spender, amount);
            }
        }

        Ok(tx)
    }

    async fn sign_transaction(
        &self,
        tx: &BlockchainTransaction,
        gas_limit: u64,
    ) -> Result<SignedTransaction, ChainError> {
        let tx_hash = tx
            .tx_hash
            .clone()
            .unwrap_or_else(|| self.hash_call(tx));
        Ok(SignedTransaction {
            raw: format!("0x{}", hex::encode(tx.args.to_string().as_bytes())),
            tx_hash,
            gas_limit,
        })
    }
}
