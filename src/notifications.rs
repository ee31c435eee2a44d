use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::NotificationConfig;
use crate::core::ScoredEvent;
use crate::webhook::DeliveryReport;

/// Desktop notification sender with cooldown to prevent spam.
pub struct Notifier {
    enabled: bool,
    min_score: f64,
    cooldown: Duration,
    last_sent: Mutex<Option<Instant>>,
    /// Failures rate-limit on their own so a dead webhook cannot mute event alerts.
    last_failure: Mutex<Option<Instant>>,
}

impl Notifier {
    pub fn new(config: &NotificationConfig) -> Self {
        Self {
            enabled: config.enabled,
            min_score: config.min_score,
            cooldown: Duration::from_secs(config.cooldown_seconds),
            last_sent: Mutex::new(None),
            last_failure: Mutex::new(None),
        }
    }

    /// Try to send a desktop notification for a scored event.
    /// Returns true if a notification was sent, false if skipped.
    pub fn notify(&self, scored: &ScoredEvent) -> bool {
        if !self.enabled {
            return false;
        }
        if scored.threat_score < self.min_score {
            return false;
        }
        if !self.check_cooldown() {
            return false;
        }

        let title = format!("{} OSINT Radar: {}", scored.risk_level.emoji(), scored.risk_level);
        let mut body = format!(
            "{:.0} | {} | {}",
            scored.threat_score, scored.event.location.country, scored.event.title
        );
        if let Some(hit) = scored.rule_hits.first() {
            body.push_str(&format!(" ({})", hit.rule_name));
        }
        self.send_notification(title, body);
        true
    }

    /// Surface a failed webhook delivery. Ignores the score gate; a burst of
    /// failures within one cooldown produces a single notification.
    pub fn notify_failure(&self, report: &DeliveryReport) -> bool {
        if !self.enabled || report.success() {
            return false;
        }
        if !cooldown_elapsed(&self.last_failure, self.cooldown) {
            return false;
        }
        let title = "⚠ OSINT Radar: webhook failed".to_string();
        let body = format!(
            "{}: {}",
            report.webhook_name,
            report.error.as_deref().unwrap_or("unknown error")
        );
        self.send_notification(title, body);
        true
    }

    /// Check and update cooldown. Returns true if enough time has passed.
    fn check_cooldown(&self) -> bool {
        cooldown_elapsed(&self.last_sent, self.cooldown)
    }

    /// Fire-and-forget on a background thread so the pipeline never blocks.
    fn send_notification(&self, title: String, body: String) {
        std::thread::spawn(move || {
            if let Err(e) = notify_rust::Notification::new()
                .summary(&title)
                .body(&body)
                .show()
            {
                tracing::debug!("Desktop notification failed: {e}");
            }
        });
    }
}

fn cooldown_elapsed(last_sent: &Mutex<Option<Instant>>, cooldown: Duration) -> bool {
    let mut last = last_sent.lock().unwrap_or_else(|e| e.into_inner());
    let now = Instant::now();
    if let Some(prev) = *last {
        if now.duration_since(prev) < cooldown {
            return false;
        }
    }
    *last = Some(now);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{test_event, RiskLevel, Severity};
    use chrono::Utc;

    fn make_scored(score: f64) -> ScoredEvent {
        ScoredEvent {
            event: test_event("1", Severity::Critical, "Missile launch", ""),
            threat_score: score,
            recency_factor: 1.0,
            rule_hits: vec![],
            risk_level: RiskLevel::from_score(score),
        }
    }

    fn make_config(enabled: bool, cooldown_seconds: u64) -> NotificationConfig {
        NotificationConfig {
            enabled,
            min_score: 100.0,
            cooldown_seconds,
        }
    }

    fn make_report(error: Option<&str>) -> DeliveryReport {
        DeliveryReport {
            webhook_id: "w1".into(),
            webhook_name: "Ops".into(),
            rule_id: None,
            payload: serde_json::json!({}),
            timestamp: Utc::now(),
            status: None,
            elapsed_ms: 3,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn cooldown_blocks_rapid_notifications() {
        let notifier = Notifier::new(&make_config(true, 30));

        // First call should pass cooldown
        assert!(notifier.check_cooldown());
        // Second call immediately should be blocked
        assert!(!notifier.check_cooldown());
    }

    #[test]
    fn cooldown_zero_allows_all() {
        let notifier = Notifier::new(&make_config(true, 0));
        assert!(notifier.check_cooldown());
        assert!(notifier.check_cooldown());
    }

    #[test]
    fn disabled_notifier_skips() {
        let notifier = Notifier::new(&make_config(false, 0));
        assert!(!notifier.notify(&make_scored(140.0)));
        assert!(!notifier.notify_failure(&make_report(Some("refused"))));
    }

    #[test]
    fn below_min_score_skips() {
        let notifier = Notifier::new(&make_config(true, 0));
        assert!(!notifier.notify(&make_scored(99.0)));
    }

    #[test]
    fn failures_bypass_score_gate_and_alert_cooldown() {
        let notifier = Notifier::new(&make_config(true, 30));
        assert!(notifier.check_cooldown());
        assert!(notifier.notify_failure(&make_report(Some("refused"))));
        assert!(!notifier.notify_failure(&make_report(None)));
    }

    #[test]
    fn failure_burst_sends_once() {
        let notifier = Notifier::new(&make_config(true, 30));
        let sent = (0..5)
            .filter(|_| notifier.notify_failure(&make_report(Some("refused"))))
            .count();
        assert_eq!(sent, 1);
        // Event alerts keep their own cooldown.
        assert!(notifier.check_cooldown());
    }
}
