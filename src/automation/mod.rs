pub mod condition;
pub mod patterns;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::Event;
use condition::AutomationCondition;

/// Basic-auth credentials sent with every delivery to a webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    pub password: Option<String>,
}

/// An external workflow endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub id: String,
    pub name: String,
    pub url: String,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_triggered: Option<DateTime<Utc>>,
    pub trigger_count: u64,
    #[serde(default, skip_serializing)]
    pub auth: Option<BasicAuth>,
}

/// Conditions bound to a webhook. Fires when every condition holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationRule {
    pub id: String,
    pub name: String,
    pub webhook_id: String,
    pub conditions: Vec<AutomationCondition>,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_triggered: Option<DateTime<Utc>>,
    pub trigger_count: u64,
}

impl AutomationRule {
    pub fn matches(&self, event: &Event) -> bool {
        self.is_active && condition::matches_event(&self.conditions, event)
    }

    /// Events in `events` this rule fires on. Empty when inactive or not fired.
    pub fn evaluate<'a>(&self, events: &'a [Event]) -> Vec<&'a Event> {
        if !self.is_active {
            return Vec::new();
        }
        condition::evaluate_batch(&self.conditions, events)
    }
}

/// One logged delivery attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowTrigger {
    pub webhook_id: String,
    pub event_data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub response_time_ms: u64,
}

impl WorkflowTrigger {
    /// Title of the event the trigger carried, if the payload had one.
    pub fn event_title(&self) -> Option<&str> {
        self.event_data
            .get("event")
            .and_then(|e| e.get("title"))
            .or_else(|| self.event_data.get("pattern").and_then(|p| p.get("name")))
            .and_then(|t| t.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationMetrics {
    pub total_webhooks: usize,
    pub active_webhooks: usize,
    pub total_triggers: u64,
    pub today_triggers: usize,
    pub success_rate: f64,
    pub avg_response_time: f64,
}
