//! Wallet-side escrow funding: approve, deposit and the one-time free claim.
//!
//! Amounts arrive as human strings ("12.5") and are parsed with the token's
//! decimals. Each successful write refreshes the signer's balances.

use crate::balances::BalanceStore;
use crate::chain::ChainWriter;
use crate::error::{AppError, Result};
use crate::models::balance::{DEFAULT_DECIMALS, DEFAULT_SYMBOL};
use crate::units::{format_amount, parse_amount};
use ethers::types::{Address, U256};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct FundingReceipt {
    pub tx_hash: String,
    #[serde(with = "crate::units::u256_dec")]
    pub amount: U256,
    pub symbol: String,
}

struct Checked {
    owner: Address,
    amount: U256,
    symbol: String,
    decimals: u8,
}

async fn check_amount(store: &BalanceStore, writer: &dyn ChainWriter, amount: &str) -> Result<Checked> {
    let owner = signer(writer)?;
    let chain = store.chain();

    let decimals = chain.decimals().await.unwrap_or(DEFAULT_DECIMALS);
    let symbol = chain.symbol().await.unwrap_or_else(|_| DEFAULT_SYMBOL.to_string());
    let amount = parse_amount(amount, decimals)?;
    if amount.is_zero() {
        return Err(AppError::InvalidInput("Please enter a valid amount".to_string()));
    }

    let wallet = chain
        .token_balance(owner)
        .await
        .map_err(|e| AppError::Chain(format!("Failed to load wallet balance: {}", e)))?;
    if amount > wallet {
        return Err(AppError::insufficient_wallet(amount, wallet, decimals, &symbol));
    }

    Ok(Checked {
        owner,
        amount,
        symbol,
        decimals,
    })
}

fn signer(writer: &dyn ChainWriter) -> Result<Address> {
    let owner = writer.signer_address();
    if owner.is_zero() {
        return Err(AppError::WalletNotConnected);
    }
    Ok(owner)
}

/// Let the escrow contract spend `amount` of the signer's tokens
pub async fn approve_escrow(store: &BalanceStore, writer: &dyn ChainWriter, amount: &str) -> Result<FundingReceipt> {
    let checked = check_amount(store, writer, amount).await?;
    log::info!(
        "[funding] Approving escrow for {} {}",
        format_amount(checked.amount, checked.decimals),
        checked.symbol
    );

    let tx_hash = writer.approve_escrow(checked.amount).await?;
    store.refresh(checked.owner).await;
    Ok(FundingReceipt {
        tx_hash,
        amount: checked.amount,
        symbol: checked.symbol,
    })
}

/// Move `amount` from the wallet into escrow. Needs a prior approval that
/// covers the amount.
pub async fn deposit_to_escrow(store: &BalanceStore, writer: &dyn ChainWriter, amount: &str) -> Result<FundingReceipt> {
    let checked = check_amount(store, writer, amount).await?;

    let chain = store.chain();
    let allowance = chain.allowance(checked.owner, chain.escrow_address()).await?;
    if allowance < checked.amount {
        return Err(AppError::InvalidInput(format!(
            "Escrow allowance is {} {}; approve at least {} before depositing",
            format_amount(allowance, checked.decimals),
            checked.symbol,
            format_amount(checked.amount, checked.decimals)
        )));
    }

    log::info!(
        "[funding] Depositing {} {} to escrow",
        format_amount(checked.amount, checked.decimals),
        checked.symbol
    );
    let tx_hash = writer.deposit_to_escrow(checked.amount).await?;
    store.refresh(checked.owner).await;
    Ok(FundingReceipt {
        tx_hash,
        amount: checked.amount,
        symbol: checked.symbol,
    })
}

/// Claim the one-time free credits; refused once the chain reports a claim
pub async fn claim_free_credits(store: &BalanceStore, writer: &dyn ChainWriter) -> Result<String> {
    let owner = signer(writer)?;
    if store.chain().has_claimed_free(owner).await? {
        return Err(AppError::InvalidInput("Free credits were already claimed".to_string()));
    }

    let tx_hash = writer.claim_free_credits().await?;
    log::info!("[funding] Free credits claimed by {:?}: {}", owner, tx_hash);
    store.refresh(owner).await;
    Ok(tx_hash)
}
