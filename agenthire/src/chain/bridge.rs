//! USDC → AGENT bridge.
//!
//! Two legs: USDC is transferred to the bridge owner on the source chain, then
//! once that receipt is in, `claimAgentTokens` is called on the demo chain with
//! the whole-USDC amount (the token contract takes human units, not base units).
//! Only whole USDC amounts are bridged.

use super::abi::{self, address_arg, uint_arg};
use super::client::ContractCaller;
use super::network::BridgeConfig;
use crate::error::{AppError, Result};
use crate::units::parse_amount;
use ethers::prelude::LocalWallet;
use ethers::types::{Address, U256};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct BridgeReceipt {
    pub usdc_tx_hash: String,
    pub claim_tx_hash: String,
    /// AGENT the token contract is expected to mint
    pub expected_agent: u64,
}

pub struct Bridge {
    config: BridgeConfig,
    source: ContractCaller,
    agent_token: Address,
    target: ContractCaller,
}

impl Bridge {
    /// `target` must be the demo chain caller with the same wallet attached.
    pub fn new(
        config: BridgeConfig,
        wallet: Option<LocalWallet>,
        target: ContractCaller,
        agent_token: Address,
    ) -> Result<Self> {
        let mut source = ContractCaller::new(&config.source_rpc_url, config.source_chain_id)?;
        if let Some(wallet) = wallet {
            source = source.with_wallet(wallet);
        }
        Ok(Self {
            config,
            source,
            agent_token,
            target,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// USDC balance on the source chain, in base units
    pub async fn usdc_balance(&self, owner: Address) -> Result<U256> {
        let raw = self
            .source
            .call(self.config.usdc_address, abi::BALANCE_OF, &[address_arg(owner)])
            .await?;
        abi::decode_uint(abi::BALANCE_OF, &raw)
    }

    /// Transfer USDC (base units) to the bridge owner and wait for the receipt
    pub async fn transfer_usdc_to_owner(&self, amount: U256) -> Result<String> {
        if amount.is_zero() {
            return Err(AppError::InvalidInput("Amount must be greater than zero".to_string()));
        }
        self.source.ensure_network().await?;
        self.source
            .send(
                self.config.usdc_address,
                abi::TRANSFER,
                &[address_arg(self.config.owner_address), uint_arg(amount)],
            )
            .await
    }

    /// Claim AGENT on the demo chain for a whole-USDC amount
    pub async fn claim_agent_tokens(&self, whole_usdc: u64) -> Result<String> {
        self.target.ensure_network().await?;
        self.target
            .send(self.agent_token, abi::CLAIM_AGENT_TOKENS, &[uint_arg(U256::from(whole_usdc))])
            .await
    }

    /// Both legs. The amount is validated before any USDC moves.
    pub async fn bridge_usdc_to_agent(&self, usdc_amount: &str) -> Result<BridgeReceipt> {
        let (amount, whole) = bridge_amount(usdc_amount, self.config.usdc_decimals)?;

        let usdc_tx_hash = self.transfer_usdc_to_owner(amount).await?;
        log::info!("[bridge] USDC transfer confirmed: {}", usdc_tx_hash);

        let claim_tx_hash = self.claim_agent_tokens(whole).await?;
        log::info!("[bridge] AGENT claim confirmed: {}", claim_tx_hash);

        Ok(BridgeReceipt {
            usdc_tx_hash,
            claim_tx_hash,
            expected_agent: whole.saturating_mul(self.config.agent_per_usdc),
        })
    }
}

/// Parse a bridge amount into (base units, whole USDC).
///
/// The claim credits whole USDC only, so amounts below 1 USDC or with a
/// fractional part are refused instead of transferring USDC that would not
/// be credited.
pub fn bridge_amount(usdc_amount: &str, usdc_decimals: u8) -> Result<(U256, u64)> {
    let amount = parse_amount(usdc_amount, usdc_decimals)?;
    let unit = U256::exp10(usdc_decimals as usize);
    let (whole, remainder) = amount.div_mod(unit);

    if whole.is_zero() {
        return Err(AppError::InvalidInput("Bridge amount must be at least 1 USDC".to_string()));
    }
    if !remainder.is_zero() {
        return Err(AppError::InvalidInput(format!(
            "Bridge amounts must be whole USDC; only {} of {} USDC would be credited",
            whole,
            usdc_amount.trim()
        )));
    }
    if whole > U256::from(u64::MAX) {
        return Err(AppError::InvalidInput(format!("Bridge amount {} is too large", usdc_amount.trim())));
    }
    Ok((amount, whole.as_u64()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_amount_accepts_whole_usdc() {
        assert_eq!(bridge_amount("10", 6).unwrap(), (U256::from(10_000_000u64), 10));
        assert_eq!(bridge_amount(" 3.000 ", 6).unwrap(), (U256::from(3_000_000u64), 3));
    }

    #[test]
    fn test_bridge_amount_refuses_uncredited_usdc() {
        assert_eq!(bridge_amount("0.5", 6).unwrap_err().kind(), "invalid_input");
        assert_eq!(bridge_amount("0", 6).unwrap_err().kind(), "invalid_input");
        let err = bridge_amount("10.99", 6).unwrap_err();
        assert!(err.to_string().contains("only 10 of 10.99 USDC"));
        assert!(bridge_amount("abc", 6).is_err());
        assert!(bridge_amount("-3", 6).is_err());
    }

    #[test]
    fn test_usdc_amount_uses_six_decimals() {
        assert_eq!(parse_amount("1.5", 6).unwrap(), U256::from(1_500_000u64));
    }

    #[tokio::test]
    async fn test_fractional_bridge_is_refused_before_transfer() {
        let config = BridgeConfig {
            source_chain_id: 84532,
            source_rpc_url: "http://localhost:8545".to_string(),
            usdc_address: Address::from_low_u64_be(0x05dc),
            usdc_decimals: 6,
            owner_address: Address::from_low_u64_be(0x0001),
            agent_per_usdc: 1,
        };
        let target = ContractCaller::new("http://localhost:8546", 1).unwrap();
        let bridge = Bridge::new(config, None, target, Address::zero()).unwrap();

        // No RPC is listening; an error other than invalid_input would mean a leg was attempted
        for amount in ["0", "0.5", "10.25"] {
            let err = bridge.bridge_usdc_to_agent(amount).await.unwrap_err();
            assert_eq!(err.kind(), "invalid_input", "amount {}", amount);
        }
        let err = bridge.transfer_usdc_to_owner(U256::zero()).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }
}
