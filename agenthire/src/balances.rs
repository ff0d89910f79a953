//! Balance summary reads and the shared balance store.

use crate::chain::ChainReader;
use crate::chain::bridge::Bridge;
use crate::gateway::{EventBroadcaster, GatewayEvent};
use crate::models::BalanceSummary;
use crate::models::balance::{DEFAULT_DECIMALS, DEFAULT_SYMBOL};
use dashmap::DashMap;
use ethers::types::Address;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

/// Addresses whose last summary is kept
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Read every balance field concurrently. A failed read leaves that field
/// unavailable instead of failing the summary.
pub async fn get_balances(chain: &dyn ChainReader, address: Address) -> BalanceSummary {
    let escrow = chain.escrow_address();
    let (wallet_token, escrow_allowance, escrow_balance, decimals, symbol, claimed) = futures_util::join!(
        chain.token_balance(address),
        chain.allowance(address, escrow),
        chain.escrow_balance(address),
        chain.decimals(),
        chain.symbol(),
        chain.has_claimed_free(address),
    );

    BalanceSummary {
        wallet_token: available("balanceOf", wallet_token),
        escrow_allowance: available("allowance", escrow_allowance),
        escrow_balance: available("getUserDeposit", escrow_balance),
        decimals: available("decimals", decimals).unwrap_or(DEFAULT_DECIMALS),
        symbol: available("symbol", symbol).unwrap_or_else(|| DEFAULT_SYMBOL.to_string()),
        has_claimed_free: available("hasUserClaimedFree", claimed),
        usdc_balance: None,
    }
}

fn available<T>(what: &str, result: crate::error::Result<T>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            log::warn!("[balances] {} unavailable: {}", what, e);
            None
        }
    }
}

struct Cached {
    summary: BalanceSummary,
    /// Refresh sequence number, used to evict the stalest entry
    seq: u64,
}

/// Latest balance summary per address, refreshed on demand.
///
/// Whoever changes on-chain state (task completion, deposits, claims) calls
/// `refresh`; subscribers and WebSocket clients get the new summary.
/// At most `capacity` addresses are cached; the least recently refreshed
/// one is dropped first.
pub struct BalanceStore {
    chain: Arc<dyn ChainReader>,
    bridge: Option<Arc<Bridge>>,
    cache: DashMap<Address, Cached>,
    capacity: usize,
    seq: AtomicU64,
    tx: broadcast::Sender<(Address, BalanceSummary)>,
    broadcaster: Option<Arc<EventBroadcaster>>,
}

impl BalanceStore {
    pub fn new(chain: Arc<dyn ChainReader>) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            chain,
            bridge: None,
            cache: DashMap::new(),
            capacity: DEFAULT_CACHE_CAPACITY,
            seq: AtomicU64::new(0),
            tx,
            broadcaster: None,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn with_broadcaster(mut self, broadcaster: Arc<EventBroadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    /// Include the source-chain USDC balance in summaries
    pub fn with_bridge(mut self, bridge: Arc<Bridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn chain(&self) -> &Arc<dyn ChainReader> {
        &self.chain
    }

    pub fn subscribe(&self) -> broadcast::Receiver<(Address, BalanceSummary)> {
        self.tx.subscribe()
    }

    /// Last summary read for `address`, if any
    pub fn get(&self, address: Address) -> Option<BalanceSummary> {
        self.cache.get(&address).map(|c| c.summary.clone())
    }

    /// Re-read balances from the chain and notify subscribers
    pub async fn refresh(&self, address: Address) -> BalanceSummary {
        let mut summary = get_balances(self.chain.as_ref(), address).await;
        if let Some(ref bridge) = self.bridge {
            summary.usdc_balance = available("USDC balanceOf", bridge.usdc_balance(address).await);
        }

        self.remember(address, summary.clone());
        let _ = self.tx.send((address, summary.clone()));
        if let Some(ref broadcaster) = self.broadcaster {
            broadcaster.broadcast(GatewayEvent::balances_updated(address, &summary));
        }

        log::debug!("[balances] Refreshed {:?}", address);
        summary
    }

    fn remember(&self, address: Address, summary: BalanceSummary) {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.cache.insert(address, Cached { summary, seq });

        while self.cache.len() > self.capacity {
            let stalest = self
                .cache
                .iter()
                .filter(|c| *c.key() != address)
                .min_by_key(|c| c.seq)
                .map(|c| *c.key());
            match stalest {
                Some(evicted) => {
                    self.cache.remove(&evicted);
                    log::debug!("[balances] Dropped cached summary for {:?}", evicted);
                }
                None => break,
            }
        }
    }

    /// Cached summary, reading the chain on first use
    pub async fn get_or_refresh(&self, address: Address) -> BalanceSummary {
        match self.get(address) {
            Some(summary) => summary,
            None => self.refresh(address).await,
        }
    }
}
