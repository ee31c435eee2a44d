use serde::Deserialize;
use std::path::Path;

use crate::automation::condition::AutomationCondition;
use crate::core::filter::FilterState;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub events: EventsConfig,
    pub filters: FilterState,
    pub signals: SignalConfig,
    pub webhook: WebhookConfig,
    pub notifications: NotificationConfig,
    pub export: ExportSettings,
    pub automation: AutomationConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EventsConfig {
    /// JSON array of events. The built-in sample set is used when unset.
    pub path: Option<String>,
    pub rescan_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SignalConfig {
    pub alert_thresholds: AlertThresholds,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AlertThresholds {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WebhookConfig {
    pub timeout_secs: u64,
    /// Treat non-2xx responses as failures. Off by default: delivery is best-effort.
    pub require_success_status: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub min_score: f64,
    pub cooldown_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExportSettings {
    pub output_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AutomationConfig {
    pub webhooks: Vec<WebhookSpec>,
    pub rules: Vec<RuleSpec>,
    /// Delivery log entries kept in memory; the oldest are dropped first.
    pub max_triggers: usize,
}

/// A webhook as declared in `config.toml`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct WebhookSpec {
    pub id: Option<String>,
    pub name: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub active: bool,
    pub workflow_id: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// An automation rule as declared in `config.toml`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RuleSpec {
    pub id: Option<String>,
    pub name: String,
    /// Id of the webhook this rule delivers to.
    pub webhook: String,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub conditions: Vec<AutomationCondition>,
}

fn default_true() -> bool {
    true
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            path: None,
            rescan_interval_secs: 600,
        }
    }
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            critical: 80.0,
            high: 60.0,
            medium: 40.0,
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            require_success_status: false,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_score: 100.0,
            cooldown_seconds: 30,
        }
    }
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            webhooks: Vec::new(),
            rules: Vec::new(),
            max_triggers: 500,
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: "reports".into(),
        }
    }
}

impl Config {
    /// Load config from a TOML file. Falls back to defaults if file doesn't exist.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Config loaded from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {e}, using defaults", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}, using defaults", path.display());
                Self::default()
            }
        }
    }
}
