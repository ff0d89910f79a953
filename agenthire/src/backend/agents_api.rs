//! Payloads for the agent run endpoint.

use crate::error::{AppError, Result};
use crate::models::AgentType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAgentPayload {
    pub agent_type: AgentType,
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAgentResponse {
    pub success: bool,
    pub agent_type: Option<String>,
    pub agent_id: Option<u64>,
    pub model: Option<String>,
    pub output: Option<String>,
    pub error: Option<String>,
}

impl RunAgentResponse {
    /// Output of a successful run. An empty or missing output yields `None`
    /// so the caller can pass its input through.
    pub fn into_output(self, agent_type: AgentType) -> Result<Option<String>> {
        if !self.success {
            let message = self
                .error
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| format!("Agent {} failed", agent_type));
            return Err(AppError::Agent(message));
        }
        Ok(self.output.filter(|o| !o.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_serializes_agent_type_name() {
        let payload = RunAgentPayload {
            agent_type: AgentType::Research,
            input: "hello".to_string(),
            options: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["agentType"], "Research");
        assert!(json.get("options").is_none());
    }

    #[test]
    fn test_failed_run_uses_backend_error_or_default() {
        let r: RunAgentResponse = serde_json::from_str(r#"{"success":false,"error":"rate limited"}"#).unwrap();
        assert_eq!(r.into_output(AgentType::Code).unwrap_err().to_string(), "rate limited");

        let r: RunAgentResponse = serde_json::from_str(r#"{"success":false}"#).unwrap();
        assert_eq!(r.into_output(AgentType::Code).unwrap_err().to_string(), "Agent Code failed");
    }

    #[test]
    fn test_empty_output_is_none() {
        let r: RunAgentResponse = serde_json::from_str(r#"{"success":true,"output":"","model":"m"}"#).unwrap();
        assert_eq!(r.into_output(AgentType::Analyst).unwrap(), None);
    }
}
