//! Chain read/write adapter.
//!
//! `ChainReader` and `ChainWriter` are the seams the rest of the crate talks
//! to; `EvmChainClient` implements both over JSON-RPC with ethers.

pub mod abi;
pub mod bridge;
pub mod client;
pub mod network;

pub use client::EvmChainClient;
pub use network::{BridgeConfig, ContractAddresses, NetworkConfig, NetworkDefinition};

use crate::error::Result;
use crate::models::OnChainAgent;
use async_trait::async_trait;
use ethers::types::{Address, U256};
use futures_util::future::try_join_all;

/// Read-only contract calls
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Escrow contract address (spender for `allowance`/`approve`)
    fn escrow_address(&self) -> Address;

    /// Check the endpoint serves the configured chain
    async fn ensure_network(&self) -> Result<()> {
        Ok(())
    }

    async fn token_balance(&self, owner: Address) -> Result<U256>;
    async fn allowance(&self, owner: Address, spender: Address) -> Result<U256>;
    async fn decimals(&self) -> Result<u8>;
    async fn symbol(&self) -> Result<String>;
    async fn has_claimed_free(&self, user: Address) -> Result<bool>;
    async fn active_agent_ids(&self) -> Result<Vec<u64>>;
    async fn get_agent(&self, agent_id: u64) -> Result<OnChainAgent>;
    /// Amount the user has deposited into escrow
    async fn escrow_balance(&self, user: Address) -> Result<U256>;
}

/// Signed contract calls. Each call waits for the receipt and returns the
/// transaction hash as a 0x-prefixed string.
#[async_trait]
pub trait ChainWriter: Send + Sync {
    /// Address of the signing wallet
    fn signer_address(&self) -> Address;

    async fn approve_escrow(&self, amount: U256) -> Result<String>;
    async fn deposit_to_escrow(&self, amount: U256) -> Result<String>;
    async fn claim_free_credits(&self) -> Result<String>;
}

/// Load every active agent from the registry.
///
/// The registry lists ids first; records are then fetched concurrently and
/// returned in id-list order. Inactive records are dropped.
pub async fn get_active_agents(chain: &dyn ChainReader) -> Result<Vec<OnChainAgent>> {
    let ids = chain.active_agent_ids().await?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let agents = try_join_all(ids.iter().map(|id| chain.get_agent(*id))).await?;
    let active: Vec<OnChainAgent> = agents.into_iter().filter(|a| a.active).collect();

    log::debug!("[chain] {} ids listed, {} active agents loaded", ids.len(), active.len());
    Ok(active)
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory chain used by orchestrator, balance and controller tests.

    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Address the fake signs as
    pub const FAKE_SIGNER: u64 = 0xc11e;

    #[derive(Default)]
    pub struct FakeChain {
        pub agents: Mutex<Vec<OnChainAgent>>,
        pub token_balances: Mutex<HashMap<Address, U256>>,
        pub escrow_balances: Mutex<HashMap<Address, U256>>,
        pub allowances: Mutex<HashMap<Address, U256>>,
        pub claimed: Mutex<HashMap<Address, bool>>,
        pub symbol: Option<String>,
        pub fail_decimals: bool,
        pub fail_escrow: bool,
        pub reads: AtomicUsize,
        pub writes: Mutex<Vec<String>>,
    }

    impl FakeChain {
        pub fn with_agents(agents: Vec<OnChainAgent>) -> Self {
            Self {
                agents: Mutex::new(agents),
                symbol: Some("AGENT".to_string()),
                ..Default::default()
            }
        }

        pub fn set_balances(&self, user: Address, wallet: u64, escrow: u64) {
            self.token_balances.lock().unwrap().insert(user, U256::from(wallet));
            self.escrow_balances.lock().unwrap().insert(user, U256::from(escrow));
        }

        pub fn set_reputation(&self, agent_id: u64, reputation: u16) {
            for a in self.agents.lock().unwrap().iter_mut() {
                if a.id == agent_id {
                    a.reputation = reputation;
                }
            }
        }

        fn count(&self) {
            self.reads.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ChainReader for FakeChain {
        fn escrow_address(&self) -> Address {
            Address::from_low_u64_be(0xe5c0)
        }

        async fn token_balance(&self, owner: Address) -> Result<U256> {
            self.count();
            Ok(self.token_balances.lock().unwrap().get(&owner).copied().unwrap_or_default())
        }

        async fn allowance(&self, owner: Address, _spender: Address) -> Result<U256> {
            self.count();
            Ok(self.allowances.lock().unwrap().get(&owner).copied().unwrap_or_default())
        }

        async fn decimals(&self) -> Result<u8> {
            self.count();
            if self.fail_decimals {
                return Err(AppError::Chain("decimals() reverted".to_string()));
            }
            Ok(0)
        }

        async fn symbol(&self) -> Result<String> {
            self.count();
            self.symbol
                .clone()
                .ok_or_else(|| AppError::Chain("symbol() reverted".to_string()))
        }

        async fn has_claimed_free(&self, user: Address) -> Result<bool> {
            self.count();
            Ok(self.claimed.lock().unwrap().get(&user).copied().unwrap_or(false))
        }

        async fn active_agent_ids(&self) -> Result<Vec<u64>> {
            self.count();
            Ok(self.agents.lock().unwrap().iter().map(|a| a.id).collect())
        }

        async fn get_agent(&self, agent_id: u64) -> Result<OnChainAgent> {
            self.count();
            self.agents
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.id == agent_id)
                .cloned()
                .ok_or_else(|| AppError::Chain(format!("getAgent({}) reverted", agent_id)))
        }

        async fn escrow_balance(&self, user: Address) -> Result<U256> {
            self.count();
            if self.fail_escrow {
                return Err(AppError::Chain("getUserDeposit reverted".to_string()));
            }
            Ok(self.escrow_balances.lock().unwrap().get(&user).copied().unwrap_or_default())
        }
    }

    /// Writes apply directly to the in-memory balances
    #[async_trait]
    impl ChainWriter for FakeChain {
        fn signer_address(&self) -> Address {
            Address::from_low_u64_be(FAKE_SIGNER)
        }

        async fn approve_escrow(&self, amount: U256) -> Result<String> {
            let me = self.signer_address();
            self.allowances.lock().unwrap().insert(me, amount);
            self.writes.lock().unwrap().push(format!("approve:{}", amount));
            Ok("0xapprove".to_string())
        }

        async fn deposit_to_escrow(&self, amount: U256) -> Result<String> {
            let me = self.signer_address();
            let mut wallets = self.token_balances.lock().unwrap();
            let wallet = wallets.entry(me).or_default();
            *wallet = wallet.saturating_sub(amount);
            *self.escrow_balances.lock().unwrap().entry(me).or_default() += amount;
            self.writes.lock().unwrap().push(format!("deposit:{}", amount));
            Ok("0xdeposit".to_string())
        }

        async fn claim_free_credits(&self) -> Result<String> {
            let me = self.signer_address();
            self.claimed.lock().unwrap().insert(me, true);
            *self.token_balances.lock().unwrap().entry(me).or_default() += U256::from(100u64);
            self.writes.lock().unwrap().push("claim".to_string());
            Ok("0xclaim".to_string())
        }
    }
}
