//! Payloads for the escrow endpoints (camelCase on the wire).

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskPayload {
    pub client: String,
    pub coordinator_agent_id: u64,
    /// Base units as a decimal string
    pub total_budget: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_hash: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskResponse {
    pub success: bool,
    pub task_id: Option<IdValue>,
    pub tx_hash: Option<String>,
    pub gas_used: Option<String>,
}

impl CreateTaskResponse {
    /// The created task id; a missing or empty id is a protocol error
    pub fn require_task_id(&self) -> Result<String> {
        ensure_success("Create task", self.success)?;
        self.task_id
            .as_ref()
            .map(IdValue::to_string)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::Protocol("Server did not return a taskId".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocatePayload {
    pub task_id: String,
    pub to_agent_id: u64,
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocateResponse {
    pub success: bool,
    pub request_id: Option<IdValue>,
    pub tx_hash: Option<String>,
    pub gas_used: Option<String>,
}

impl AllocateResponse {
    pub fn require_request_id(&self) -> Result<String> {
        ensure_success("Allocate", self.success)?;
        self.request_id
            .as_ref()
            .map(IdValue::to_string)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::Protocol("Server did not return a requestId".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequestPayload {
    pub request_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequestResponse {
    pub success: bool,
    pub tx_hash: Option<String>,
    pub gas_used: Option<String>,
    pub output: Option<String>,
}

impl CompleteRequestResponse {
    pub fn ensure_success(&self) -> Result<()> {
        ensure_success("Complete request", self.success)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTaskPayload {
    pub task_id: String,
    pub success: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTaskResponse {
    pub success: bool,
    pub tx_hash: Option<String>,
    pub gas_used: Option<String>,
}

impl CompleteTaskResponse {
    pub fn ensure_success(&self) -> Result<()> {
        ensure_success("Complete task", self.success)
    }
}

/// Ids come back as strings or bare numbers depending on the backend version
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Text(String),
    Number(u64),
}

impl std::fmt::Display for IdValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdValue::Text(s) => write!(f, "{}", s.trim()),
            IdValue::Number(n) => write!(f, "{}", n),
        }
    }
}

fn ensure_success(endpoint: &str, success: bool) -> Result<()> {
    if success {
        Ok(())
    } else {
        Err(AppError::Protocol(format!("{} API reported success=false", endpoint)))
    }
}
