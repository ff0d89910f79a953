use crate::units::u256_dec;
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Upper bound of the registry's reputation score
pub const MAX_REPUTATION: u16 = 1000;

/// Reputation gained by an agent for a successful task (display projection)
pub const REPUTATION_REWARD: u16 = 10;

/// Agent roles, in pipeline order. The discriminant matches the registry's
/// `agentType` enum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum AgentType {
    Coordinator = 0,
    Research = 1,
    Analyst = 2,
    Content = 3,
    Code = 4,
}

impl AgentType {
    /// All roles in fixed pipeline order
    pub const ALL: [AgentType; 5] = [
        AgentType::Coordinator,
        AgentType::Research,
        AgentType::Analyst,
        AgentType::Content,
        AgentType::Code,
    ];

    /// Specialist roles executed after the coordinator, in order
    pub const SPECIALISTS: [AgentType; 4] = [
        AgentType::Research,
        AgentType::Analyst,
        AgentType::Content,
        AgentType::Code,
    ];

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(AgentType::Coordinator),
            1 => Some(AgentType::Research),
            2 => Some(AgentType::Analyst),
            3 => Some(AgentType::Content),
            4 => Some(AgentType::Code),
            _ => None,
        }
    }

    pub fn index(&self) -> u8 {
        *self as u8
    }
}

/// Agent record as stored in the registry contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnChainAgent {
    pub id: u64,
    pub wallet_address: Address,
    pub agent_type: AgentType,
    #[serde(with = "u256_dec")]
    pub price_per_task: U256,
    pub reputation: u16,
    pub active: bool,
}

impl OnChainAgent {
    /// Reputation shown after a successful task, before the chain is re-read
    pub fn projected_reputation(&self) -> u16 {
        project_reputation(self.reputation)
    }
}

pub fn project_reputation(reputation: u16) -> u16 {
    reputation.saturating_add(REPUTATION_REWARD).min(MAX_REPUTATION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_agent_type_index_roundtrip() {
        for t in AgentType::ALL {
            assert_eq!(AgentType::from_index(t.index()), Some(t));
        }
        assert_eq!(AgentType::from_index(5), None);
    }

    #[test]
    fn test_agent_type_names() {
        assert_eq!(AgentType::Research.to_string(), "Research");
        assert_eq!(AgentType::from_str("Analyst").unwrap(), AgentType::Analyst);
        assert_eq!(AgentType::Code.as_ref(), "Code");
    }

    #[test]
    fn test_reputation_projection_is_capped() {
        assert_eq!(project_reputation(850), 860);
        assert_eq!(project_reputation(995), 1000);
        assert_eq!(project_reputation(1000), 1000);
        assert_eq!(project_reputation(u16::MAX), 1000);
    }
}
