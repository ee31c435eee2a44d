pub mod filter;
pub mod geo;
pub mod pipeline;
pub mod source;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AlertThresholds;

/// Discrete urgency level reported with every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    /// Base threat points before keyword multipliers and decay.
    pub fn base_points(self) -> f64 {
        match self {
            Severity::Critical => 100.0,
            Severity::High => 75.0,
            Severity::Medium => 50.0,
            Severity::Low => 25.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Severity::ALL
            .into_iter()
            .find(|sev| sev.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown severity \"{s}\""))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    News,
    Government,
    Social,
    Satellite,
}

impl SourceType {
    pub const ALL: [SourceType; 4] = [
        SourceType::News,
        SourceType::Government,
        SourceType::Social,
        SourceType::Satellite,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::News => "news",
            SourceType::Government => "government",
            SourceType::Social => "social",
            SourceType::Satellite => "satellite",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance of a reported event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SourceType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// `[latitude, longitude]`
    pub coordinates: [f64; 2],
}

/// A single reported geopolitical incident. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub source: SourceInfo,
    pub location: Location,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Event {
    /// Lower-cased `"{title} {description}"`, the text every keyword check runs against.
    pub fn content(&self) -> String {
        format!("{} {}", self.title, self.description).to_lowercase()
    }

    /// Hours elapsed between the event and `now`. Negative for future-dated events.
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.timestamp).num_milliseconds() as f64 / 3_600_000.0
    }
}

/// An event with its threat score and the keyword rules that fired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEvent {
    pub event: Event,
    pub threat_score: f64, // 0-150
    pub recency_factor: f64,
    pub rule_hits: Vec<RuleHit>,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleHit {
    pub rule_name: String,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Critical, // >80
    High,     // >60
    Medium,   // >40
    Low,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        Self::classify(score, &AlertThresholds::default())
    }

    pub fn classify(score: f64, thresholds: &AlertThresholds) -> Self {
        if score > thresholds.critical {
            RiskLevel::Critical
        } else if score > thresholds.high {
            RiskLevel::High
        } else if score > thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Critical => "critical",
            RiskLevel::High => "high",
            RiskLevel::Medium => "medium",
            RiskLevel::Low => "low",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "🔴",
            RiskLevel::High => "🟠",
            RiskLevel::Medium => "🟡",
            RiskLevel::Low => "⚪",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared fixture builder for module tests.
#[cfg(test)]
pub(crate) fn test_event(id: &str, severity: Severity, title: &str, description: &str) -> Event {
    Event {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        severity,
        source: SourceInfo {
            name: "Reuters".to_string(),
            kind: SourceType::News,
        },
        location: Location {
            country: "Germany".to_string(),
            city: None,
            coordinates: [52.52, 13.405],
        },
        timestamp: Utc::now(),
        tags: vec![],
        url: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_bands_are_strict() {
        assert_eq!(RiskLevel::from_score(80.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(80.1), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(60.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(40.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(150.0), RiskLevel::Critical);
    }

    #[test]
    fn severity_parses_case_insensitively() {
        assert_eq!("Critical".parse::<Severity>(), Ok(Severity::Critical));
        assert_eq!(" low ".parse::<Severity>(), Ok(Severity::Low));
        assert!("severe".parse::<Severity>().is_err());
    }

    #[test]
    fn content_joins_and_lowercases() {
        let event = test_event("1", Severity::Low, "Cyber Attack", "On BANKS");
        assert_eq!(event.content(), "cyber attack on banks");
    }

    #[test]
    fn event_wire_format() {
        let json = r#"{
            "id": "5",
            "title": "Cybersecurity breach",
            "description": "Banks targeted",
            "severity": "critical",
            "source": { "name": "EU CERT", "type": "government" },
            "location": { "country": "Germany", "city": "Frankfurt", "coordinates": [50.1109, 8.6821] },
            "timestamp": "2024-03-01T12:00:00Z",
            "tags": ["cybersecurity"]
        }"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.severity, Severity::Critical);
        assert_eq!(event.source.kind, SourceType::Government);
        assert_eq!(event.location.city.as_deref(), Some("Frankfurt"));
        assert!(event.url.is_none());

        let back = serde_json::to_value(&event).unwrap();
        assert_eq!(back["source"]["type"], "government");
        assert!(back.get("url").is_none());
    }

    #[test]
    fn age_hours_signed() {
        let mut event = test_event("1", Severity::Low, "", "");
        let now = event.timestamp;
        event.timestamp = now - chrono::Duration::hours(6);
        assert!((event.age_hours(now) - 6.0).abs() < 1e-9);
        event.timestamp = now + chrono::Duration::hours(2);
        assert!((event.age_hours(now) + 2.0).abs() < 1e-9);
    }
}
