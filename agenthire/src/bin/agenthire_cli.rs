//! agenthire CLI
//!
//! Drives the same services as the HTTP server from a terminal, using the
//! wallet and network configured in the environment (`.env`) and
//! `config/network.ron`.
//!
//! ```bash
//! agenthire-cli agents
//! agenthire-cli estimate
//! agenthire-cli approve 25 && agenthire-cli deposit 25
//! agenthire-cli run "Research the stablecoin market"
//! ```

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};

use agenthire::chain::get_active_agents;
use agenthire::config::Config;
use agenthire::error::AppError;
use agenthire::estimate::estimate_cost;
use agenthire::funding;
use agenthire::gateway::{EventType, GatewayEvent};
use agenthire::models::{BalanceSummary, ExecutionStatus, TaskRun, TaskStep};
use agenthire::orchestrator::TaskRequest;
use agenthire::pipeline::select_best_pipeline;
use agenthire::units::format_amount;
use agenthire::wallet::parse_address;
use agenthire::AppState;

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "agenthire-cli")]
#[command(version)]
#[command(about = "Hire on-chain agent teams and pay them from escrow", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Directory holding network.ron (overrides CONFIG_DIR)
    #[arg(long, global = true)]
    config_dir: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the configured chain and contracts
    Network,

    /// List active agents and the team that would be hired
    Agents,

    /// Price the best team and check the escrow deposit
    Estimate,

    /// Show token, escrow and claim state for an address
    Balances {
        /// Address to inspect; defaults to the configured wallet
        address: Option<String>,
    },

    /// Allow the escrow contract to pull tokens from the wallet
    Approve { amount: String },

    /// Move approved tokens into escrow
    Deposit { amount: String },

    /// Claim the one-time free credits
    Claim,

    /// Bridge USDC from the source chain into agent tokens
    Bridge { amount: String },

    /// Hire the best team for a prompt and follow the run
    Run {
        /// Task prompt
        prompt: String,
    },
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run_cli(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_cli(cli: Cli) -> CliResult {
    let mut config = Config::from_env()?;
    if let Some(dir) = cli.config_dir {
        config.config_dir = dir;
    }
    let state = AppState::from_config(config)?;

    match cli.command {
        Commands::Network => show_network(&state),
        Commands::Agents => show_agents(&state).await,
        Commands::Estimate => show_estimate(&state).await,
        Commands::Balances { address } => show_balances(&state, address).await,
        Commands::Approve { amount } => {
            let receipt = funding::approve_escrow(&state.balances, state.writer.as_ref(), &amount).await?;
            print_tx(&state, "Approved", &receipt.tx_hash);
            Ok(())
        }
        Commands::Deposit { amount } => {
            let receipt = funding::deposit_to_escrow(&state.balances, state.writer.as_ref(), &amount).await?;
            print_tx(&state, "Deposited", &receipt.tx_hash);
            Ok(())
        }
        Commands::Claim => {
            let tx_hash = funding::claim_free_credits(&state.balances, state.writer.as_ref()).await?;
            print_tx(&state, "Claimed free credits", &tx_hash);
            Ok(())
        }
        Commands::Bridge { amount } => bridge(&state, &amount).await,
        Commands::Run { prompt } => run_task(&state, prompt).await,
    }
}

fn show_network(state: &AppState) -> CliResult {
    let network = &state.network;
    println!("{} (chain {})", network.network.chain_name, network.network.chain_id);
    println!("  RPC:       {}", network.network.rpc_urls.join(", "));
    if let Some(ref explorer) = network.network.explorer_url {
        println!("  Explorer:  {}", explorer);
    }
    println!("  Token:     {:?}", network.contracts.agent_token);
    println!("  Escrow:    {:?}", network.contracts.task_escrow);
    println!("  Registry:  {:?}", network.contracts.agent_registry);
    if let Some(ref bridge) = network.bridge {
        println!("  Bridge:    USDC {:?} on chain {}", bridge.usdc_address, bridge.source_chain_id);
    }
    Ok(())
}

async fn show_agents(state: &AppState) -> CliResult {
    let agents = get_active_agents(state.chain.as_ref()).await?;
    if agents.is_empty() {
        return Err(AppError::NoActiveAgents.into());
    }

    println!("{:<4} {:<12} {:>6} {:>12}  {}", "ID", "TYPE", "REP", "PRICE", "WALLET");
    for agent in &agents {
        println!(
            "{:<4} {:<12} {:>6} {:>12}  {:?}",
            agent.id, agent.agent_type, agent.reputation, agent.price_per_task, agent.wallet_address
        );
    }

    let pipeline = select_best_pipeline(&agents);
    let team: Vec<String> = pipeline
        .members()
        .map(|a| format!("{} #{}", a.agent_type, a.id))
        .collect();
    println!("\nBest team: {}", team.join(" -> "));
    Ok(())
}

async fn show_estimate(state: &AppState) -> CliResult {
    let estimate = estimate_cost(&state.balances, state.wallet.address()).await?;
    let symbol = estimate
        .balances
        .as_ref()
        .map(|b| b.symbol.clone())
        .unwrap_or_else(|| "AGENT".to_string());

    println!("Total budget: {} {}", estimate.total_budget_display, symbol);
    match (estimate.sufficient, estimate.shortfall) {
        (Some(true), _) => println!("Escrow deposit covers the task"),
        (Some(false), Some(shortfall)) => {
            let decimals = estimate.balances.as_ref().map(|b| b.decimals).unwrap_or(18);
            println!("Deposit {} {} more to run this task", format_amount(shortfall, decimals), symbol);
        }
        _ => println!("Escrow balance unavailable"),
    }
    Ok(())
}

async fn show_balances(state: &AppState, address: Option<String>) -> CliResult {
    let address = match address {
        Some(ref s) => parse_address(s)?,
        None => state.wallet.require_address()?,
    };
    let summary = state.balances.refresh(address).await;
    let usdc_decimals = state.network.bridge.as_ref().map(|b| b.usdc_decimals).unwrap_or(6);
    print_balances(&summary, usdc_decimals);
    Ok(())
}

fn print_balances(summary: &BalanceSummary, usdc_decimals: u8) {
    let show = |value: Option<ethers::types::U256>| match value {
        Some(v) => format!("{} {}", format_amount(v, summary.decimals), summary.symbol),
        None => "unavailable".to_string(),
    };
    println!("Wallet:      {}", show(summary.wallet_token));
    println!("Allowance:   {}", show(summary.escrow_allowance));
    println!("Escrow:      {}", show(summary.escrow_balance));
    if let Some(usdc) = summary.usdc_balance {
        println!("USDC:        {} USDC", format_amount(usdc, usdc_decimals));
    }
    match summary.has_claimed_free {
        Some(true) => println!("Free claim:  used"),
        Some(false) => println!("Free claim:  available"),
        None => println!("Free claim:  unavailable"),
    }
}

fn print_tx(state: &AppState, what: &str, tx_hash: &str) {
    match state.network.network.explorer_tx_url(tx_hash) {
        Some(url) => println!("{}: {}", what, url),
        None => println!("{}: {}", what, tx_hash),
    }
}

async fn bridge(state: &AppState, amount: &str) -> CliResult {
    let bridge = state
        .bridge
        .as_ref()
        .ok_or_else(|| AppError::Config("No bridge configured in network.ron".to_string()))?;
    let receipt = bridge.bridge_usdc_to_agent(amount).await?;
    println!("USDC transfer: {}", receipt.usdc_tx_hash);
    print_tx(state, "Claimed", &receipt.claim_tx_hash);
    println!("Expected: {} AGENT", receipt.expected_agent);
    Ok(())
}

async fn run_task(state: &AppState, prompt: String) -> CliResult {
    let client = state.wallet.require_address()?;
    let agents = get_active_agents(state.chain.as_ref()).await?;
    if agents.is_empty() {
        return Err(AppError::NoActiveAgents.into());
    }

    let request = TaskRequest {
        client,
        prompt,
        pipeline: select_best_pipeline(&agents),
    };
    // Subscribe first so the initial snapshot is printed too
    let events = state.broadcaster.subscribe();
    let prepared = state.orchestrator.prepare(request)?;
    let run_id = prepared.run.id.clone();

    let printer = tokio::spawn(follow_run(events, run_id, std::io::stdout()));

    let run = state.orchestrator.execute(prepared).await;
    // The terminal snapshot is already queued; give the printer time to drain it
    match tokio::time::timeout(Duration::from_secs(2), printer).await {
        Ok(_) => {}
        Err(_) => log::warn!("Progress output did not reach the final step"),
    }

    println!();
    if let Some(ref task_id) = run.task_id {
        println!("Task id: {}", task_id);
    }
    match run.step {
        TaskStep::Completed => {
            println!("{}", run.final_output.as_deref().unwrap_or("(no output)"));
            Ok(())
        }
        _ => Err(run.error.unwrap_or_else(|| "Task failed".to_string()).into()),
    }
}

/// Write each step and agent status change of `run_id` until the run is
/// terminal. Returns the writer.
async fn follow_run<W: Write>(mut events: broadcast::Receiver<GatewayEvent>, run_id: String, mut out: W) -> W {
    let mut last_step: Option<TaskStep> = None;
    let mut last_status: HashMap<u64, ExecutionStatus> = HashMap::new();
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                log::warn!("Progress output skipped {} events", skipped);
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        if !event.is(EventType::TaskUpdated) {
            continue;
        }
        let Ok(run) = serde_json::from_value::<TaskRun>(event.data) else {
            continue;
        };
        if run.id != run_id {
            continue;
        }
        if last_step != Some(run.step) {
            let _ = writeln!(out, "== {}", run.step.label());
            last_step = Some(run.step);
        }
        for execution in &run.executions {
            if last_status.insert(execution.agent_id, execution.status) != Some(execution.status) {
                let _ = writeln!(out, "   {} #{}: {}", execution.agent_type, execution.agent_id, execution.status);
            }
        }
        if run.step.is_terminal() {
            break;
        }
    }
    out
}
