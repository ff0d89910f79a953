//! Task run state written by the orchestrator and read by the UI.

use super::agent::AgentType;
use crate::units::{opt_u256_dec, u256_dec};
use chrono::{DateTime, Utc};
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

/// Status of one agent's slot in the pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExecutionStatus {
    #[default]
    Pending,
    Allocating,
    Processing,
    Completed,
    Failed,
}

/// Per-role execution record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentExecution {
    pub agent_type: AgentType,
    pub agent_id: u64,
    pub status: ExecutionStatus,
    pub input: Option<String>,
    pub output: Option<String>,
    /// Escrow request id returned by the allocate call
    pub request_id: Option<String>,
    pub allocation_tx_hash: Option<String>,
    pub completion_tx_hash: Option<String>,
    #[serde(with = "opt_u256_dec")]
    pub payment_amount: Option<U256>,
    pub reputation_before: Option<u16>,
    pub reputation_after: Option<u16>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl AgentExecution {
    pub fn pending(agent_type: AgentType, agent_id: u64) -> Self {
        Self {
            agent_type,
            agent_id,
            status: ExecutionStatus::Pending,
            input: None,
            output: None,
            request_id: None,
            allocation_tx_hash: None,
            completion_tx_hash: None,
            payment_amount: None,
            reputation_before: None,
            reputation_after: None,
            timestamp: None,
        }
    }
}

/// Orchestrator step. `Failed` is terminal; the step that was active when the
/// run failed is kept in [`TaskRun::failed_during`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskStep {
    Checking,
    Creating,
    Executing,
    Completed,
    Failed,
}

impl TaskStep {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStep::Completed | TaskStep::Failed)
    }

    /// Human-readable label for progress display
    pub fn label(&self) -> &'static str {
        match self {
            TaskStep::Checking => "Checking escrow balance",
            TaskStep::Creating => "Creating task",
            TaskStep::Executing => "Executing agents",
            TaskStep::Completed => "Task completed",
            TaskStep::Failed => "Task failed",
        }
    }
}

/// Client-side record of one task run. Lives in memory only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRun {
    /// Local run id (the backend's task id is only known after creation)
    pub id: String,
    pub client: Address,
    pub prompt: String,
    pub step: TaskStep,
    pub failed_during: Option<TaskStep>,
    pub error: Option<String>,
    /// Task id assigned by the escrow backend
    pub task_id: Option<String>,
    pub creation_tx_hash: Option<String>,
    pub completion_tx_hash: Option<String>,
    #[serde(with = "u256_dec")]
    pub total_budget: U256,
    pub token_symbol: String,
    pub executions: Vec<AgentExecution>,
    pub final_output: Option<String>,
    pub coordinator_paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRun {
    pub fn new(client: Address, prompt: impl Into<String>, total_budget: U256, token_symbol: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            client,
            prompt: prompt.into(),
            step: TaskStep::Checking,
            failed_during: None,
            error: None,
            task_id: None,
            creation_tx_hash: None,
            completion_tx_hash: None,
            total_budget,
            token_symbol: token_symbol.into(),
            executions: Vec::new(),
            final_output: None,
            coordinator_paid: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn execution(&self, agent_type: AgentType) -> Option<&AgentExecution> {
        self.executions.iter().find(|e| e.agent_type == agent_type)
    }

    pub fn execution_mut(&mut self, agent_type: AgentType) -> Option<&mut AgentExecution> {
        self.executions.iter_mut().find(|e| e.agent_type == agent_type)
    }

    /// Count executions per status: (completed, failed, pending)
    pub fn progress(&self) -> (usize, usize, usize) {
        let mut completed = 0;
        let mut failed = 0;
        let mut pending = 0;
        for e in &self.executions {
            match e.status {
                ExecutionStatus::Completed => completed += 1,
                ExecutionStatus::Failed => failed += 1,
                ExecutionStatus::Pending => pending += 1,
                _ => {}
            }
        }
        (completed, failed, pending)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
