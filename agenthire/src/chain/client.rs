//! JSON-RPC chain client built on ethers.
//!
//! Reads go through `eth_call`; writes are signed locally with the configured
//! wallet, broadcast, and awaited until a receipt is available.

use super::abi::{self, address_arg, uint_arg};
use super::network::{self, ContractAddresses};
use super::{ChainReader, ChainWriter};
use crate::error::{AppError, Result};
use crate::models::OnChainAgent;
use async_trait::async_trait;
use ethers::abi::Token;
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Generic contract caller for one chain
#[derive(Clone)]
pub struct ContractCaller {
    provider: Provider<Http>,
    chain_id: u64,
    signer: Option<SignerClient>,
}

impl ContractCaller {
    pub fn new(rpc_url: &str, chain_id: u64) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| AppError::Config(format!("Invalid RPC URL '{}': {}", rpc_url, e)))?;
        Ok(Self {
            provider,
            chain_id,
            signer: None,
        })
    }

    /// Attach a signing wallet; the chain id is bound for replay protection
    pub fn with_wallet(mut self, wallet: LocalWallet) -> Self {
        let wallet = wallet.with_chain_id(self.chain_id);
        self.signer = Some(SignerMiddleware::new(self.provider.clone(), wallet));
        self
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    pub async fn ensure_network(&self) -> Result<()> {
        network::ensure_network(&self.provider, self.chain_id).await
    }

    /// `eth_call` a view function and return the raw return data
    pub async fn call(&self, to: Address, signature: &str, args: &[Token]) -> Result<Bytes> {
        let data = abi::encode_call(signature, args);
        log::trace!("[chain] eth_call {} {:?} 0x{}", signature, to, hex::encode(&data));
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();

        self.provider
            .call(&tx, None)
            .await
            .map_err(|e| AppError::Chain(format!("{} on {:?} failed: {}", signature, to, e)))
    }

    /// Sign, broadcast and wait for a state-changing call
    pub async fn send(&self, to: Address, signature: &str, args: &[Token]) -> Result<String> {
        let signer = self.signer.as_ref().ok_or(AppError::WalletNotConnected)?;
        let data = abi::encode_call(signature, args);
        let tx = TransactionRequest::new()
            .from(signer.address())
            .to(to)
            .data(data);

        log::info!(
            "[chain] Sending {} to {:?} from {:?} on chain {}",
            signature,
            to,
            signer.address(),
            self.chain_id
        );

        let pending = signer
            .send_transaction(tx, None)
            .await
            .map_err(|e| AppError::Transaction(format!("{} was rejected: {}", signature, e)))?;
        let tx_hash = pending.tx_hash();

        let receipt = pending
            .await
            .map_err(|e| AppError::Transaction(format!("Waiting for {:?} failed: {}", tx_hash, e)))?
            .ok_or_else(|| AppError::Transaction(format!("Transaction {:?} was dropped", tx_hash)))?;

        if receipt.status == Some(U64::zero()) {
            return Err(AppError::Transaction(format!("{} reverted in {:?}", signature, tx_hash)));
        }

        log::info!("[chain] {} confirmed in block {:?}: {:?}", signature, receipt.block_number, tx_hash);
        Ok(format!("{:?}", tx_hash))
    }
}

/// Client for the token, registry and escrow contracts of the demo chain
#[derive(Clone)]
pub struct EvmChainClient {
    caller: ContractCaller,
    contracts: ContractAddresses,
}

impl EvmChainClient {
    pub fn new(rpc_url: &str, chain_id: u64, contracts: ContractAddresses) -> Result<Self> {
        Ok(Self {
            caller: ContractCaller::new(rpc_url, chain_id)?,
            contracts,
        })
    }

    pub fn with_wallet(mut self, wallet: LocalWallet) -> Self {
        self.caller = self.caller.with_wallet(wallet);
        self
    }

    pub fn has_signer(&self) -> bool {
        self.caller.signer_address().is_some()
    }

    pub fn contracts(&self) -> &ContractAddresses {
        &self.contracts
    }

    pub fn caller(&self) -> &ContractCaller {
        &self.caller
    }

    async fn token_call(&self, signature: &str, args: &[Token]) -> Result<Bytes> {
        self.caller.call(self.contracts.agent_token, signature, args).await
    }
}

#[async_trait]
impl ChainReader for EvmChainClient {
    fn escrow_address(&self) -> Address {
        self.contracts.task_escrow
    }

    async fn ensure_network(&self) -> Result<()> {
        self.caller.ensure_network().await
    }

    async fn token_balance(&self, owner: Address) -> Result<U256> {
        let raw = self.token_call(abi::BALANCE_OF, &[address_arg(owner)]).await?;
        abi::decode_uint(abi::BALANCE_OF, &raw)
    }

    async fn allowance(&self, owner: Address, spender: Address) -> Result<U256> {
        let raw = self
            .token_call(abi::ALLOWANCE, &[address_arg(owner), address_arg(spender)])
            .await?;
        abi::decode_uint(abi::ALLOWANCE, &raw)
    }

    async fn decimals(&self) -> Result<u8> {
        let raw = self.token_call(abi::DECIMALS, &[]).await?;
        abi::decode_u8(abi::DECIMALS, &raw)
    }

    async fn symbol(&self) -> Result<String> {
        let raw = self.token_call(abi::SYMBOL, &[]).await?;
        abi::decode_string(abi::SYMBOL, &raw)
    }

    async fn has_claimed_free(&self, user: Address) -> Result<bool> {
        let raw = self
            .token_call(abi::HAS_USER_CLAIMED_FREE, &[address_arg(user)])
            .await?;
        abi::decode_bool(abi::HAS_USER_CLAIMED_FREE, &raw)
    }

    async fn active_agent_ids(&self) -> Result<Vec<u64>> {
        let raw = self
            .caller
            .call(self.contracts.agent_registry, abi::GET_ALL_ACTIVE_AGENTS, &[])
            .await?;
        abi::decode_agent_ids(&raw)
    }

    async fn get_agent(&self, agent_id: u64) -> Result<OnChainAgent> {
        let raw = self
            .caller
            .call(
                self.contracts.agent_registry,
                abi::GET_AGENT,
                &[uint_arg(U256::from(agent_id))],
            )
            .await?;
        abi::decode_agent(agent_id, &raw)
    }

    async fn escrow_balance(&self, user: Address) -> Result<U256> {
        let raw = self
            .caller
            .call(self.contracts.task_escrow, abi::GET_USER_DEPOSIT, &[address_arg(user)])
            .await?;
        abi::decode_uint(abi::GET_USER_DEPOSIT, &raw)
    }
}

#[async_trait]
impl ChainWriter for EvmChainClient {
    fn signer_address(&self) -> Address {
        self.caller.signer_address().unwrap_or_default()
    }

    async fn approve_escrow(&self, amount: U256) -> Result<String> {
        self.caller
            .send(
                self.contracts.agent_token,
                abi::APPROVE,
                &[address_arg(self.contracts.task_escrow), uint_arg(amount)],
            )
            .await
    }

    async fn deposit_to_escrow(&self, amount: U256) -> Result<String> {
        self.caller
            .send(self.contracts.task_escrow, abi::DEPOSIT, &[uint_arg(amount)])
            .await
    }

    async fn claim_free_credits(&self) -> Result<String> {
        self.caller
            .send(self.contracts.agent_token, abi::CLAIM_FREE_CREDITS, &[])
            .await
    }
}
