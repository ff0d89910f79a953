//! Pipeline selection and budget calculation.
//!
//! One agent is hired per role: the active agent with the highest reputation.
//! Equal reputations are broken by the lowest agent id, so the choice does not
//! depend on the order the registry returned the agents in.

use crate::models::{AgentType, OnChainAgent};
use ethers::types::U256;
use serde::{Deserialize, Serialize};

/// The selected agent (if any) for each role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PipelineSelection {
    pub coordinator: Option<OnChainAgent>,
    pub research: Option<OnChainAgent>,
    pub analyst: Option<OnChainAgent>,
    pub content: Option<OnChainAgent>,
    pub code: Option<OnChainAgent>,
}

impl PipelineSelection {
    pub fn get(&self, role: AgentType) -> Option<&OnChainAgent> {
        match role {
            AgentType::Coordinator => self.coordinator.as_ref(),
            AgentType::Research => self.research.as_ref(),
            AgentType::Analyst => self.analyst.as_ref(),
            AgentType::Content => self.content.as_ref(),
            AgentType::Code => self.code.as_ref(),
        }
    }

    fn slot_mut(&mut self, role: AgentType) -> &mut Option<OnChainAgent> {
        match role {
            AgentType::Coordinator => &mut self.coordinator,
            AgentType::Research => &mut self.research,
            AgentType::Analyst => &mut self.analyst,
            AgentType::Content => &mut self.content,
            AgentType::Code => &mut self.code,
        }
    }

    pub fn coordinator(&self) -> Option<&OnChainAgent> {
        self.coordinator.as_ref()
    }

    /// Selected agents in fixed pipeline order, skipping empty roles
    pub fn members(&self) -> impl Iterator<Item = &OnChainAgent> {
        AgentType::ALL.into_iter().filter_map(move |role| self.get(role))
    }

    pub fn is_empty(&self) -> bool {
        self.members().next().is_none()
    }
}

/// Pick the best active agent for every role
pub fn select_best_pipeline(agents: &[OnChainAgent]) -> PipelineSelection {
    let mut selection = PipelineSelection::default();

    for agent in agents.iter().filter(|a| a.active) {
        let slot = selection.slot_mut(agent.agent_type);
        let replace = match slot {
            None => true,
            Some(current) => is_better(agent, current),
        };
        if replace {
            *slot = Some(agent.clone());
        }
    }

    selection
}

fn is_better(candidate: &OnChainAgent, current: &OnChainAgent) -> bool {
    candidate.reputation > current.reputation
        || (candidate.reputation == current.reputation && candidate.id < current.id)
}

/// Sum of `price_per_task` over the selected agents
pub fn calculate_pipeline_budget(pipeline: &PipelineSelection) -> U256 {
    pipeline
        .members()
        .fold(U256::zero(), |total, agent| total.saturating_add(agent.price_per_task))
}
