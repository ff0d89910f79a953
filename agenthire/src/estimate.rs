//! Cost estimate shown before a run: who would be hired and whether the
//! escrow deposit covers it.

use crate::balances::BalanceStore;
use crate::chain::get_active_agents;
use crate::error::{AppError, Result};
use crate::models::BalanceSummary;
use crate::models::balance::DEFAULT_DECIMALS;
use crate::pipeline::{calculate_pipeline_budget, select_best_pipeline, PipelineSelection};
use crate::units::{format_amount, opt_u256_dec, u256_dec};
use ethers::types::{Address, U256};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CostEstimate {
    pub pipeline: PipelineSelection,
    #[serde(with = "u256_dec")]
    pub total_budget: U256,
    /// Budget in whole tokens, for display
    pub total_budget_display: String,
    pub balances: Option<BalanceSummary>,
    /// `None` when no wallet is connected or the escrow read failed
    pub sufficient: Option<bool>,
    #[serde(with = "opt_u256_dec")]
    pub shortfall: Option<U256>,
}

/// Load active agents, select a pipeline and price it. With a client
/// address the estimate also checks the escrow deposit.
pub async fn estimate_cost(balances: &BalanceStore, client: Option<Address>) -> Result<CostEstimate> {
    let agents = get_active_agents(balances.chain().as_ref()).await?;
    if agents.is_empty() {
        return Err(AppError::NoActiveAgents);
    }

    let pipeline = select_best_pipeline(&agents);
    let total_budget = calculate_pipeline_budget(&pipeline);

    let summary = match client {
        Some(address) => Some(balances.refresh(address).await),
        None => None,
    };
    let decimals = summary.as_ref().map(|s| s.decimals).unwrap_or(DEFAULT_DECIMALS);

    Ok(CostEstimate {
        total_budget_display: format_amount(total_budget, decimals),
        sufficient: summary.as_ref().and_then(|s| s.covers(total_budget)),
        shortfall: summary.as_ref().and_then(|s| s.shortfall(total_budget)),
        balances: summary,
        pipeline,
        total_budget,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::FakeChain;
    use crate::models::AgentType;
    use crate::pipeline::tests::agent;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_estimate_with_shortfall() {
        let chain = Arc::new(FakeChain::with_agents(vec![
            agent(1, AgentType::Coordinator, 900, 15),
            agent(2, AgentType::Research, 850, 10),
        ]));
        let user = Address::from_low_u64_be(7);
        chain.set_balances(user, 100, 10);
        let store = BalanceStore::new(chain);

        let estimate = estimate_cost(&store, Some(user)).await.unwrap();
        assert_eq!(estimate.total_budget, U256::from(25u64));
        assert_eq!(estimate.total_budget_display, "25");
        assert_eq!(estimate.sufficient, Some(false));
        assert_eq!(estimate.shortfall, Some(U256::from(15u64)));
        assert_eq!(estimate.pipeline.coordinator().unwrap().id, 1);
    }

    #[tokio::test]
    async fn test_estimate_without_wallet() {
        let chain = Arc::new(FakeChain::with_agents(vec![agent(1, AgentType::Coordinator, 900, 15)]));
        let store = BalanceStore::new(chain);

        let estimate = estimate_cost(&store, None).await.unwrap();
        assert!(estimate.balances.is_none());
        assert_eq!(estimate.sufficient, None);
        let json = serde_json::to_value(&estimate).unwrap();
        assert_eq!(json["total_budget"], "15");
    }

    #[tokio::test]
    async fn test_estimate_with_empty_registry() {
        let store = BalanceStore::new(Arc::new(FakeChain::with_agents(vec![])));
        let err = estimate_cost(&store, None).await.unwrap_err();
        assert_eq!(err.to_string(), "No active agents found on-chain.");
    }
}
