use crate::units::opt_u256_dec;
use ethers::types::U256;
use serde::{Deserialize, Serialize};

/// Token decimals assumed when the `decimals()` read fails
pub const DEFAULT_DECIMALS: u8 = 18;

/// Symbol shown when the `symbol()` read fails
pub const DEFAULT_SYMBOL: &str = "AGENT";

/// Snapshot of a wallet's token, escrow and claim state.
///
/// Each chain read is independent: a failed read leaves its field `None`
/// ("unavailable") instead of failing the whole summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary {
    #[serde(with = "opt_u256_dec")]
    pub wallet_token: Option<U256>,
    /// Amount the escrow contract may pull from the wallet
    #[serde(with = "opt_u256_dec")]
    pub escrow_allowance: Option<U256>,
    /// Amount deposited into escrow and available for new tasks
    #[serde(with = "opt_u256_dec")]
    pub escrow_balance: Option<U256>,
    pub decimals: u8,
    pub symbol: String,
    pub has_claimed_free: Option<bool>,
    /// USDC on the bridge source chain, when a bridge is configured
    #[serde(with = "opt_u256_dec")]
    pub usdc_balance: Option<U256>,
}

impl Default for BalanceSummary {
    fn default() -> Self {
        Self {
            wallet_token: None,
            escrow_allowance: None,
            escrow_balance: None,
            decimals: DEFAULT_DECIMALS,
            symbol: DEFAULT_SYMBOL.to_string(),
            has_claimed_free: None,
            usdc_balance: None,
        }
    }
}

impl BalanceSummary {
    /// The free-credit claim is offered only when the chain confirmed it is unclaimed
    pub fn can_claim_free(&self) -> bool {
        self.has_claimed_free == Some(false)
    }

    /// Whether the escrow deposit covers `budget`; `None` while unavailable
    pub fn covers(&self, budget: U256) -> Option<bool> {
        self.escrow_balance.map(|b| b >= budget)
    }

    /// How much more must be deposited to cover `budget`
    pub fn shortfall(&self, budget: U256) -> Option<U256> {
        self.escrow_balance.map(|b| budget.saturating_sub(b))
    }
}
