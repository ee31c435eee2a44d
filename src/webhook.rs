use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::automation::patterns::ThreatPattern;
use crate::automation::{AutomationRule, Webhook, WorkflowTrigger};
use crate::config::WebhookConfig;
use crate::core::{Event, ScoredEvent};
use crate::signals::sentiment::SentimentScore;

/// Events attached to an alert payload, most relevant first.
const MAX_PAYLOAD_EVENTS: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),
    #[error("webhook answered with status {0}")]
    Status(u16),
    #[error("no response within {0:?}")]
    Timeout(Duration),
}

/// What a successful POST came back with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub status: u16,
    pub elapsed_ms: u64,
}

/// JSON-over-HTTP client for workflow webhooks.
pub struct WebhookClient {
    client: Client,
    timeout: Duration,
    require_success_status: bool,
}

impl WebhookClient {
    pub fn new(config: &WebhookConfig) -> Result<Self, DeliveryError> {
        Self::with_timeout(
            Duration::from_secs(config.timeout_secs),
            config.require_success_status,
        )
    }

    pub fn with_timeout(timeout: Duration, require_success_status: bool) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DeliveryError::Http)?;
        Ok(Self {
            client,
            timeout,
            require_success_status,
        })
    }

    /// POST `payload` to the webhook. Non-2xx answers only fail when
    /// `require_success_status` is set.
    pub async fn deliver(&self, webhook: &Webhook, payload: &Value) -> Result<DeliveryReceipt, DeliveryError> {
        let started = Instant::now();
        let mut request = self
            .client
            .post(&webhook.url)
            .header("Content-Type", "application/json")
            .json(payload);

        if let Some(auth) = &webhook.auth {
            use base64::{engine::general_purpose::STANDARD, Engine};
            let password = auth.password.as_deref().unwrap_or_default();
            let token = STANDARD.encode(format!("{}:{password}", auth.username));
            request = request.header("Authorization", format!("Basic {token}"));
        }

        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DeliveryError::Timeout(self.timeout)
            } else {
                DeliveryError::Http(e)
            }
        })?;

        let status = resp.status();
        if self.require_success_status && !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }
        Ok(DeliveryReceipt {
            status: status.as_u16(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// A payload bound for one webhook.
#[derive(Debug, Clone)]
pub struct DeliveryJob {
    pub webhook: Webhook,
    /// Set when an automation rule produced the payload.
    pub rule_id: Option<String>,
    pub payload: Value,
}

/// Outcome of one delivery, sent back to the pipeline.
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub webhook_id: String,
    pub webhook_name: String,
    pub rule_id: Option<String>,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
    pub status: Option<u16>,
    pub elapsed_ms: u64,
    pub error: Option<String>,
}

impl DeliveryReport {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_trigger(self) -> WorkflowTrigger {
        WorkflowTrigger {
            success: self.success(),
            webhook_id: self.webhook_id,
            event_data: self.payload,
            timestamp: self.timestamp,
            error: self.error,
            response_time_ms: self.elapsed_ms,
        }
    }
}

/// Deliver on a spawned task and report the outcome on `tx`.
pub fn dispatch(
    client: Arc<WebhookClient>,
    job: DeliveryJob,
    tx: mpsc::Sender<DeliveryReport>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let timestamp = Utc::now();
        let started = Instant::now();
        let outcome = client.deliver(&job.webhook, &job.payload).await;
        let (status, elapsed_ms, error) = match outcome {
            Ok(receipt) => {
                tracing::info!(
                    "Webhook {} delivered ({} in {}ms)",
                    job.webhook.name,
                    receipt.status,
                    receipt.elapsed_ms
                );
                (Some(receipt.status), receipt.elapsed_ms, None)
            }
            Err(e) => {
                tracing::warn!("Webhook {} delivery failed: {e}", job.webhook.name);
                let status = match &e {
                    DeliveryError::Status(code) => Some(*code),
                    _ => None,
                };
                (status, started.elapsed().as_millis() as u64, Some(e.to_string()))
            }
        };
        let report = DeliveryReport {
            webhook_id: job.webhook.id,
            webhook_name: job.webhook.name,
            rule_id: job.rule_id,
            payload: job.payload,
            timestamp,
            status,
            elapsed_ms,
            error,
        };
        if tx.send(report).await.is_err() {
            tracing::debug!("Delivery report dropped, pipeline closed");
        }
    })
}

/// Fixed payload used to check a webhook is reachable.
pub fn test_payload(now: DateTime<Utc>) -> Value {
    json!({
        "test": true,
        "timestamp": now.to_rfc3339(),
        "event": {
            "id": "test_event",
            "title": "Test Event from OSINT Dashboard",
            "severity": "medium",
            "location": { "country": "Test Country", "city": "Test City" },
            "description": "This is a test webhook trigger from the dashboard",
        },
    })
}

pub fn rule_alert_payload(
    rule: &AutomationRule,
    scored: &ScoredEvent,
    sentiment: &SentimentScore,
    events: &[&Event],
    now: DateTime<Utc>,
) -> Value {
    let recent: Vec<&Event> = events.iter().copied().take(MAX_PAYLOAD_EVENTS).collect();
    json!({
        "intelligence_alert": false,
        "rule": { "id": rule.id, "name": rule.name },
        "event": scored.event,
        "timestamp": now.to_rfc3339(),
        "events": recent,
        "analysis": {
            "threat_score": scored.threat_score,
            "risk_level": scored.risk_level,
            "sentiment": sentiment,
        },
    })
}

pub fn intelligence_payload(pattern: &ThreatPattern, events: &[Event], now: DateTime<Utc>) -> Value {
    let recent: Vec<&Event> = events.iter().take(MAX_PAYLOAD_EVENTS).collect();
    json!({
        "intelligence_alert": true,
        "pattern": {
            "name": pattern.name,
            "description": pattern.description,
            "severity": pattern.severity,
            "confidence": pattern.confidence,
        },
        "timestamp": now.to_rfc3339(),
        "events": recent,
        "analysis": {
            "threat_level": pattern.severity,
            "confidence_score": pattern.confidence,
            "recommendation": pattern.recommendation(),
        },
    })
}
