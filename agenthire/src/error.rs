//! Error taxonomy for wallet, chain, backend and agent failures.
//!
//! Every failure in a task run is reduced to the `Display` text of one of
//! these variants and surfaced as a single human-readable string.

use ethers::types::U256;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("Wrong network: expected chain {expected}, RPC reports chain {actual}")]
    WrongNetwork { expected: u64, actual: u64 },

    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Chain read failed: {0}")]
    Chain(String),

    /// Business error carrying actionable guidance (how much more is needed).
    #[error("{guidance}")]
    InsufficientFunds {
        required: U256,
        available: U256,
        shortfall: U256,
        guidance: String,
    },

    #[error("{endpoint} API failed: {status} {body}")]
    Backend {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("{endpoint} API request failed: {message}")]
    Transport {
        endpoint: &'static str,
        message: String,
    },

    /// The backend answered but broke its contract (missing ids, success=false).
    #[error("{0}")]
    Protocol(String),

    /// The agent endpoint reported `success: false`.
    #[error("{0}")]
    Agent(String),

    #[error("No active agents found on-chain.")]
    NoActiveAgents,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Shortfall error for the escrow deposit check.
    pub fn insufficient_escrow(
        required: U256,
        available: U256,
        decimals: u8,
        symbol: &str,
    ) -> Self {
        let shortfall = required.saturating_sub(available);
        let guidance = format!(
            "Insufficient escrow balance. Please deposit {} more {} to escrow.",
            crate::units::format_amount(shortfall, decimals),
            symbol
        );
        AppError::InsufficientFunds {
            required,
            available,
            shortfall,
            guidance,
        }
    }

    /// Shortfall error for a wallet balance check (approve/deposit).
    pub fn insufficient_wallet(
        required: U256,
        available: U256,
        decimals: u8,
        symbol: &str,
    ) -> Self {
        let shortfall = required.saturating_sub(available);
        let guidance = format!(
            "Insufficient wallet balance. You need {} more {}.",
            crate::units::format_amount(shortfall, decimals),
            symbol
        );
        AppError::InsufficientFunds {
            required,
            available,
            shortfall,
            guidance,
        }
    }

    /// Stable machine-readable kind for API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::WalletNotConnected => "wallet_not_connected",
            AppError::WrongNetwork { .. } => "wrong_network",
            AppError::Transaction(_) => "transaction",
            AppError::Chain(_) => "chain",
            AppError::InsufficientFunds { .. } => "insufficient_funds",
            AppError::Backend { .. } => "backend",
            AppError::Transport { .. } => "transport",
            AppError::Protocol(_) => "protocol",
            AppError::Agent(_) => "agent",
            AppError::NoActiveAgents => "no_active_agents",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Config(_) => "config",
        }
    }
}
