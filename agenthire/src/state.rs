//! Shared service graph, built once at startup and handed to every handler.

use crate::backend::{BackendClient, EscrowBackend};
use crate::balances::BalanceStore;
use crate::chain::bridge::Bridge;
use crate::chain::{ChainReader, ChainWriter, EvmChainClient, NetworkConfig};
use crate::config::Config;
use crate::error::Result;
use crate::gateway::EventBroadcaster;
use crate::orchestrator::TaskOrchestrator;
use crate::tracker::ExecutionTracker;
use crate::wallet::WalletSession;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub network: NetworkConfig,
    pub chain: Arc<dyn ChainReader>,
    pub writer: Arc<dyn ChainWriter>,
    pub wallet: Arc<WalletSession>,
    pub bridge: Option<Arc<Bridge>>,
    pub broadcaster: Arc<EventBroadcaster>,
    pub tracker: Arc<ExecutionTracker>,
    pub balances: Arc<BalanceStore>,
    pub orchestrator: Arc<TaskOrchestrator>,
}

impl AppState {
    /// Load `network.ron` and connect the chain, wallet and backend clients
    pub fn from_config(config: Config) -> Result<Self> {
        let network = NetworkConfig::load(&config.config_dir)?;
        let rpc_url = match config.rpc_url {
            Some(ref url) => url.clone(),
            None => network.network.primary_rpc_url()?.to_string(),
        };
        log::info!("Using RPC endpoint {}", rpc_url);

        let wallet = WalletSession::from_settings(
            config.wallet_private_key.as_deref(),
            config.wallet_address.as_deref(),
        )?;

        let mut client = EvmChainClient::new(&rpc_url, network.network.chain_id, network.contracts.clone())?;
        if let Some(signer) = wallet.signer() {
            client = client.with_wallet(signer);
        }

        let bridge = match network.bridge {
            Some(ref bridge_config) => {
                log::info!(
                    "USDC bridge enabled from chain {} ({:?})",
                    bridge_config.source_chain_id,
                    bridge_config.usdc_address
                );
                Some(Arc::new(Bridge::new(
                    bridge_config.clone(),
                    wallet.signer(),
                    client.caller().clone(),
                    network.contracts.agent_token,
                )?))
            }
            None => None,
        };

        log::info!("Escrow backend at {}", config.backend_url);
        let backend = Arc::new(BackendClient::new(&config.backend_url)?);
        let client = Arc::new(client);

        Ok(Self::assemble(
            config,
            network,
            client.clone(),
            client,
            backend,
            Arc::new(wallet),
            bridge,
        ))
    }

    /// Wire the shared services around the given chain and backend clients
    pub fn assemble(
        config: Config,
        network: NetworkConfig,
        chain: Arc<dyn ChainReader>,
        writer: Arc<dyn ChainWriter>,
        backend: Arc<dyn EscrowBackend>,
        wallet: Arc<WalletSession>,
        bridge: Option<Arc<Bridge>>,
    ) -> Self {
        let broadcaster = Arc::new(EventBroadcaster::new());
        let tracker = Arc::new(ExecutionTracker::new(broadcaster.clone()));

        let mut balances = BalanceStore::new(chain.clone()).with_broadcaster(broadcaster.clone());
        if let Some(ref bridge) = bridge {
            balances = balances.with_bridge(bridge.clone());
        }
        let balances = Arc::new(balances);

        let orchestrator = Arc::new(TaskOrchestrator::new(
            chain.clone(),
            backend,
            tracker.clone(),
            balances.clone(),
            config.orchestrator_options(),
        ));

        Self {
            config,
            network,
            chain,
            writer,
            wallet,
            bridge,
            broadcaster,
            tracker,
            balances,
            orchestrator,
        }
    }
}
