pub mod agent;
pub mod balance;
pub mod execution;

pub use agent::{AgentType, OnChainAgent, MAX_REPUTATION, REPUTATION_REWARD};
pub use balance::BalanceSummary;
pub use execution::{AgentExecution, ExecutionStatus, TaskRun, TaskStep};
