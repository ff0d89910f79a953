use crate::models::{BalanceSummary, TaskRun};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event types pushed to WebSocket clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    TaskUpdated,
    BalancesUpdated,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskUpdated => "task.updated",
            Self::BalancesUpdated => "balances.updated",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<EventType> for String {
    fn from(event_type: EventType) -> Self {
        event_type.as_str().to_string()
    }
}

/// Server-push event to all connected clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
    #[serde(rename = "type")]
    pub type_: String,
    pub event: String,
    pub data: Value,
}

impl GatewayEvent {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            type_: "event".to_string(),
            event: event.into(),
            data,
        }
    }

    /// Full snapshot of a run after a state write
    pub fn task_updated(run: &TaskRun) -> Self {
        Self::new(
            EventType::TaskUpdated,
            serde_json::to_value(run).unwrap_or(Value::Null),
        )
    }

    pub fn balances_updated(address: Address, summary: &BalanceSummary) -> Self {
        Self::new(
            EventType::BalancesUpdated,
            serde_json::json!({
                "address": address,
                "balances": summary,
            }),
        )
    }

    pub fn is(&self, event_type: EventType) -> bool {
        self.event == event_type.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::U256;

    #[test]
    fn test_task_event_shape() {
        let run = TaskRun::new(Address::zero(), "hello", U256::from(25u64), "AGENT");
        let event = GatewayEvent::task_updated(&run);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "event");
        assert_eq!(json["event"], "task.updated");
        assert_eq!(json["data"]["step"], "checking");
        assert_eq!(json["data"]["total_budget"], "25");
        assert!(event.is(EventType::TaskUpdated));
    }

    #[test]
    fn test_balances_event_shape() {
        let summary = BalanceSummary::default();
        let event = GatewayEvent::balances_updated(Address::from_low_u64_be(1), &summary);
        assert_eq!(event.event, "balances.updated");
        assert_eq!(event.data["balances"]["symbol"], "AGENT");
        assert!(event.data["balances"]["escrow_balance"].is_null());
    }
}
