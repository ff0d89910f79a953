//! Wallet session: who the service acts for, and whether it can sign.

use crate::error::{AppError, Result};
use ethers::prelude::{LocalWallet, Signer};
use ethers::types::Address;
use std::str::FromStr;
use std::sync::RwLock;

#[derive(Clone)]
enum Session {
    Disconnected,
    /// Address known, no key (balances and estimates only)
    WatchOnly(Address),
    Signer(LocalWallet),
}

/// Connected wallet, shared across handlers
pub struct WalletSession {
    session: RwLock<Session>,
}

impl WalletSession {
    pub fn disconnected() -> Self {
        Self {
            session: RwLock::new(Session::Disconnected),
        }
    }

    pub fn watch_only(address: Address) -> Self {
        Self {
            session: RwLock::new(Session::WatchOnly(address)),
        }
    }

    pub fn with_signer(wallet: LocalWallet) -> Self {
        Self {
            session: RwLock::new(Session::Signer(wallet)),
        }
    }

    /// Build from `WALLET_PRIVATE_KEY` / `WALLET_ADDRESS` values. The key wins
    /// when both are present.
    pub fn from_settings(private_key: Option<&str>, address: Option<&str>) -> Result<Self> {
        if let Some(key) = private_key.filter(|k| !k.trim().is_empty()) {
            let wallet = LocalWallet::from_str(key.trim().trim_start_matches("0x"))
                .map_err(|e| AppError::Config(format!("Invalid WALLET_PRIVATE_KEY: {}", e)))?;
            log::info!("[wallet] Signing as {:?}", wallet.address());
            return Ok(Self::with_signer(wallet));
        }

        if let Some(addr) = address.filter(|a| !a.trim().is_empty()) {
            let address = parse_address(addr)?;
            log::info!("[wallet] Watch-only session for {:?}", address);
            return Ok(Self::watch_only(address));
        }

        log::warn!("[wallet] No wallet configured; write operations are disabled");
        Ok(Self::disconnected())
    }

    pub fn connected(&self) -> bool {
        !matches!(self.read(), Session::Disconnected)
    }

    pub fn address(&self) -> Option<Address> {
        match self.read() {
            Session::Disconnected => None,
            Session::WatchOnly(address) => Some(address),
            Session::Signer(wallet) => Some(wallet.address()),
        }
    }

    pub fn can_sign(&self) -> bool {
        matches!(self.read(), Session::Signer(_))
    }

    /// Address or `WalletNotConnected`
    pub fn require_address(&self) -> Result<Address> {
        self.address().ok_or(AppError::WalletNotConnected)
    }

    pub fn signer(&self) -> Option<LocalWallet> {
        match self.read() {
            Session::Signer(wallet) => Some(wallet),
            _ => None,
        }
    }

    pub fn disconnect(&self) {
        if let Ok(mut session) = self.session.write() {
            *session = Session::Disconnected;
        }
    }

    fn read(&self) -> Session {
        self.session
            .read()
            .map(|s| s.clone())
            .unwrap_or(Session::Disconnected)
    }
}

pub fn parse_address(s: &str) -> Result<Address> {
    Address::from_str(s.trim())
        .map_err(|e| AppError::InvalidInput(format!("Invalid address '{}': {}", s, e)))
}
