//! Webhooks, automation rules and the delivery log as one immutable value.
//!
//! Every mutation returns a new store, so a pipeline pass can work against a
//! snapshot while deliveries for an earlier pass are still being recorded.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::condition::{AutomationCondition, ConditionType, ConditionValue, Operator};
use super::{AutomationMetrics, AutomationRule, BasicAuth, Webhook, WorkflowTrigger};
use crate::config::{AutomationConfig, RuleSpec, WebhookSpec};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StoreError {
    #[error("webhook {0} not found")]
    UnknownWebhook(String),
    #[error("rule {0} not found")]
    UnknownRule(String),
    #[error("rule \"{0}\" has no conditions")]
    NoConditions(String),
    #[error("rule \"{0}\" does not name a webhook")]
    MissingWebhook(String),
    #[error("webhook {webhook} is still used by rule \"{rule}\"")]
    WebhookInUse { webhook: String, rule: String },
    #[error("webhook needs a name and a url")]
    InvalidWebhook,
    #[error("id {0} already exists")]
    DuplicateId(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerStatus {
    #[default]
    All,
    Success,
    Error,
}

/// Query over the delivery log.
#[derive(Debug, Clone, Default)]
pub struct TriggerFilter {
    pub status: TriggerStatus,
    pub webhook_id: Option<String>,
    /// Case-insensitive substring over event title and webhook name.
    pub search: String,
}

fn new_id(id: Option<&String>) -> String {
    match id {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ => Uuid::new_v4().to_string(),
    }
}

impl Webhook {
    pub fn from_spec(spec: &WebhookSpec, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(spec.id.as_ref()),
            name: spec.name.clone(),
            url: spec.url.clone(),
            is_active: spec.active,
            workflow_id: spec.workflow_id.clone(),
            description: spec.description.clone(),
            tags: spec.tags.clone(),
            created_at: now,
            last_triggered: None,
            trigger_count: 0,
            auth: spec.username.as_ref().map(|username| BasicAuth {
                username: username.clone(),
                password: spec.password.clone(),
            }),
        }
    }
}

impl AutomationRule {
    pub fn from_spec(spec: &RuleSpec, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(spec.id.as_ref()),
            name: spec.name.clone(),
            webhook_id: spec.webhook.trim().to_string(),
            conditions: spec.conditions.clone(),
            is_active: spec.active,
            description: spec.description.clone(),
            created_at: now,
            last_triggered: None,
            trigger_count: 0,
        }
    }
}

/// Delivery log size used when none is configured.
pub const DEFAULT_MAX_TRIGGERS: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub struct AutomationStore {
    webhooks: Vec<Webhook>,
    rules: Vec<AutomationRule>,
    /// Shared between snapshots; only `record_delivery` copies it.
    triggers: Arc<VecDeque<WorkflowTrigger>>,
    max_triggers: usize,
}

impl Default for AutomationStore {
    fn default() -> Self {
        Self {
            webhooks: Vec::new(),
            rules: Vec::new(),
            triggers: Arc::default(),
            max_triggers: DEFAULT_MAX_TRIGGERS,
        }
    }
}

impl AutomationStore {
    /// Build the store from config. When no rules are configured the two stock
    /// rules are seeded against the first active webhook, if there is one.
    pub fn from_config(config: &AutomationConfig, now: DateTime<Utc>) -> Result<Self, StoreError> {
        let mut store = Self::default().with_max_triggers(config.max_triggers);
        for spec in &config.webhooks {
            store = store.add_webhook(Webhook::from_spec(spec, now))?;
        }
        if config.rules.is_empty() {
            if let Some(webhook) = store.first_active_webhook() {
                let webhook_id = webhook.id.clone();
                for rule in default_rules(&webhook_id, now) {
                    store = store.add_rule(rule)?;
                }
            }
        } else {
            for spec in &config.rules {
                store = store.add_rule(AutomationRule::from_spec(spec, now))?;
            }
        }
        tracing::info!(
            "Automation: {} webhooks, {} rules",
            store.webhooks.len(),
            store.rules.len()
        );
        Ok(store)
    }

    pub fn webhooks(&self) -> &[Webhook] {
        &self.webhooks
    }

    pub fn rules(&self) -> &[AutomationRule] {
        &self.rules
    }

    /// Retained delivery log, oldest first.
    pub fn triggers(&self) -> &VecDeque<WorkflowTrigger> {
        &self.triggers
    }

    /// Keep at most `max` log entries. Already-logged entries beyond the cap are dropped.
    pub fn with_max_triggers(mut self, max: usize) -> Self {
        self.max_triggers = max;
        let excess = self.triggers.len().saturating_sub(max);
        if excess > 0 {
            Arc::make_mut(&mut self.triggers).drain(..excess);
        }
        self
    }

    pub fn webhook(&self, id: &str) -> Option<&Webhook> {
        self.webhooks.iter().find(|w| w.id == id)
    }

    pub fn rule(&self, id: &str) -> Option<&AutomationRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn first_active_webhook(&self) -> Option<&Webhook> {
        self.webhooks.iter().find(|w| w.is_active)
    }

    /// Active rules whose webhook is also active.
    pub fn live_rules(&self) -> impl Iterator<Item = (&AutomationRule, &Webhook)> {
        self.rules.iter().filter(|r| r.is_active).filter_map(|r| {
            self.webhook(&r.webhook_id)
                .filter(|w| w.is_active)
                .map(|w| (r, w))
        })
    }

    pub fn add_webhook(&self, webhook: Webhook) -> Result<Self, StoreError> {
        if webhook.name.trim().is_empty() || webhook.url.trim().is_empty() {
            return Err(StoreError::InvalidWebhook);
        }
        if self.webhook(&webhook.id).is_some() {
            return Err(StoreError::DuplicateId(webhook.id));
        }
        let mut next = self.clone();
        next.webhooks.push(webhook);
        Ok(next)
    }

    /// Replace a webhook's editable fields. Counters and creation time are kept.
    pub fn update_webhook(&self, id: &str, spec: &WebhookSpec) -> Result<Self, StoreError> {
        if spec.name.trim().is_empty() || spec.url.trim().is_empty() {
            return Err(StoreError::InvalidWebhook);
        }
        self.with_webhook(id, |w| {
            let fresh = Webhook::from_spec(spec, w.created_at);
            w.name = fresh.name;
            w.url = fresh.url;
            w.is_active = fresh.is_active;
            w.workflow_id = fresh.workflow_id;
            w.description = fresh.description;
            w.tags = fresh.tags;
            w.auth = fresh.auth;
        })
    }

    pub fn toggle_webhook(&self, id: &str) -> Result<Self, StoreError> {
        self.with_webhook(id, |w| w.is_active = !w.is_active)
    }

    pub fn remove_webhook(&self, id: &str) -> Result<Self, StoreError> {
        if self.webhook(id).is_none() {
            return Err(StoreError::UnknownWebhook(id.to_string()));
        }
        if let Some(rule) = self.rules.iter().find(|r| r.webhook_id == id) {
            return Err(StoreError::WebhookInUse {
                webhook: id.to_string(),
                rule: rule.name.clone(),
            });
        }
        let mut next = self.clone();
        next.webhooks.retain(|w| w.id != id);
        Ok(next)
    }

    pub fn add_rule(&self, rule: AutomationRule) -> Result<Self, StoreError> {
        if rule.conditions.is_empty() {
            return Err(StoreError::NoConditions(rule.name));
        }
        if rule.webhook_id.is_empty() {
            return Err(StoreError::MissingWebhook(rule.name));
        }
        if self.webhook(&rule.webhook_id).is_none() {
            return Err(StoreError::UnknownWebhook(rule.webhook_id));
        }
        if self.rule(&rule.id).is_some() {
            return Err(StoreError::DuplicateId(rule.id));
        }
        let mut next = self.clone();
        next.rules.push(rule);
        Ok(next)
    }

    pub fn toggle_rule(&self, id: &str) -> Result<Self, StoreError> {
        self.with_rule(id, |r| r.is_active = !r.is_active)
    }

    pub fn remove_rule(&self, id: &str) -> Result<Self, StoreError> {
        if self.rule(id).is_none() {
            return Err(StoreError::UnknownRule(id.to_string()));
        }
        let mut next = self.clone();
        next.rules.retain(|r| r.id != id);
        Ok(next)
    }

    pub fn record_rule_fire(&self, id: &str, now: DateTime<Utc>) -> Result<Self, StoreError> {
        self.with_rule(id, |r| {
            r.trigger_count += 1;
            r.last_triggered = Some(now);
        })
    }

    /// Append a delivery attempt to the log and bump the webhook's counters.
    /// The log keeps the newest `max_triggers` entries.
    pub fn record_delivery(&self, trigger: WorkflowTrigger) -> Result<Self, StoreError> {
        let timestamp = trigger.timestamp;
        let mut next = self.with_webhook(&trigger.webhook_id, |w| {
            w.trigger_count += 1;
            w.last_triggered = Some(timestamp);
        })?;
        let max = next.max_triggers;
        let log = Arc::make_mut(&mut next.triggers);
        log.push_back(trigger);
        while log.len() > max {
            log.pop_front();
        }
        Ok(next)
    }

    /// Logged triggers matching `filter`, newest first.
    pub fn filter_triggers(&self, filter: &TriggerFilter) -> Vec<&WorkflowTrigger> {
        let search = filter.search.trim().to_lowercase();
        let mut out: Vec<&WorkflowTrigger> = self
            .triggers
            .iter()
            .filter(|t| match filter.status {
                TriggerStatus::All => true,
                TriggerStatus::Success => t.success,
                TriggerStatus::Error => !t.success,
            })
            .filter(|t| filter.webhook_id.as_ref().is_none_or(|id| &t.webhook_id == id))
            .filter(|t| {
                if search.is_empty() {
                    return true;
                }
                let title_hit = t
                    .event_title()
                    .is_some_and(|title| title.to_lowercase().contains(&search));
                let name_hit = self
                    .webhook(&t.webhook_id)
                    .is_some_and(|w| w.name.to_lowercase().contains(&search));
                title_hit || name_hit
            })
            .collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        out
    }

    /// Counts per webhook cover the whole session; rates cover the retained log.
    pub fn metrics(&self, now: DateTime<Utc>) -> AutomationMetrics {
        let today = now.date_naive();
        let logged = self.triggers.len();
        let succeeded = self.triggers.iter().filter(|t| t.success).count();
        let (success_rate, avg_response_time) = if logged == 0 {
            (0.0, 0.0)
        } else {
            let total_ms: u64 = self.triggers.iter().map(|t| t.response_time_ms).sum();
            (
                succeeded as f64 / logged as f64 * 100.0,
                total_ms as f64 / logged as f64,
            )
        };
        AutomationMetrics {
            total_webhooks: self.webhooks.len(),
            active_webhooks: self.webhooks.iter().filter(|w| w.is_active).count(),
            total_triggers: self.webhooks.iter().map(|w| w.trigger_count).sum(),
            today_triggers: self
                .triggers
                .iter()
                .filter(|t| t.timestamp.date_naive() == today)
                .count(),
            success_rate,
            avg_response_time,
        }
    }

    fn with_webhook(&self, id: &str, f: impl FnOnce(&mut Webhook)) -> Result<Self, StoreError> {
        let mut next = self.clone();
        let webhook = next
            .webhooks
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| StoreError::UnknownWebhook(id.to_string()))?;
        f(webhook);
        Ok(next)
    }

    fn with_rule(&self, id: &str, f: impl FnOnce(&mut AutomationRule)) -> Result<Self, StoreError> {
        let mut next = self.clone();
        let rule = next
            .rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::UnknownRule(id.to_string()))?;
        f(rule);
        Ok(next)
    }
}

/// The stock rules every fresh install starts with.
pub fn default_rules(webhook_id: &str, now: DateTime<Utc>) -> Vec<AutomationRule> {
    let severity_is = |value: ConditionValue, operator| {
        AutomationCondition::new(ConditionType::Severity, operator, value)
    };
    vec![
        AutomationRule {
            id: "critical-immediate".into(),
            name: "Critical Event Immediate Alert".into(),
            webhook_id: webhook_id.to_string(),
            conditions: vec![severity_is(
                ConditionValue::Text("critical".into()),
                Operator::Equals,
            )],
            is_active: true,
            description: Some("Trigger instant notification for all critical events".into()),
            created_at: now,
            last_triggered: None,
            trigger_count: 0,
        },
        AutomationRule {
            id: "regional-high-threat".into(),
            name: "Regional High-Threat Analysis".into(),
            webhook_id: webhook_id.to_string(),
            conditions: vec![
                severity_is(
                    ConditionValue::List(vec!["critical".into(), "high".into()]),
                    Operator::In,
                ),
                AutomationCondition::new(
                    ConditionType::Region,
                    Operator::Equals,
                    ConditionValue::Text("europe".into()),
                ),
            ],
            is_active: true,
            description: Some("Analyze high-threat events in European region".into()),
            created_at: now,
            last_triggered: None,
            trigger_count: 0,
        },
    ]
}
