//! Multi-event threat patterns whose confidence grows as matching events arrive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{Event, Severity};

const MAX_CONFIDENCE: f64 = 95.0;
const CONFIDENCE_STEP: f64 = 5.0;
/// Confidence above which a detected pattern raises an intelligence alert.
pub const ALERT_CONFIDENCE: f64 = 80.0;

/// Which events count as evidence for a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PatternMatcher {
    /// Events of `severity` whose title contains the keyword.
    TitleKeyword {
        severity: Severity,
        keyword: &'static str,
    },
    /// Events of `severity` whose country contains the name.
    Country {
        severity: Severity,
        country: &'static str,
    },
    #[default]
    Never,
}

impl PatternMatcher {
    pub fn matches(&self, event: &Event) -> bool {
        match *self {
            PatternMatcher::TitleKeyword { severity, keyword } => {
                event.severity == severity && event.title.to_lowercase().contains(keyword)
            }
            PatternMatcher::Country { severity, country } => {
                event.severity == severity && event.location.country.contains(country)
            }
            PatternMatcher::Never => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternStatus {
    Critical,
    Warning,
    Monitoring,
}

impl PatternStatus {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 80.0 {
            PatternStatus::Critical
        } else if confidence >= 60.0 {
            PatternStatus::Warning
        } else {
            PatternStatus::Monitoring
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatPattern {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Human-readable summary of what the pattern looks for.
    pub conditions: Vec<String>,
    pub severity: Severity,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_detected: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub matcher: PatternMatcher,
}

impl ThreatPattern {
    pub fn status(&self) -> PatternStatus {
        PatternStatus::from_confidence(self.confidence)
    }

    pub fn recommendation(&self) -> &'static str {
        if self.severity == Severity::Critical {
            "Immediate action required"
        } else {
            "Monitor closely"
        }
    }

    pub fn raises_alert(&self) -> bool {
        self.confidence > ALERT_CONFIDENCE && self.last_detected.is_some()
    }
}

pub fn builtin_patterns() -> Vec<ThreatPattern> {
    let conditions = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
    vec![
        ThreatPattern {
            id: "coordinated-cyber".into(),
            name: "Coordinated Cyber Attacks".into(),
            description: "Multiple cyber incidents in related infrastructure sectors".into(),
            conditions: conditions(&["keyword:cyber", "keyword:infrastructure", "severity:critical", "timeframe:6h"]),
            severity: Severity::Critical,
            confidence: 87.0,
            last_detected: None,
            matcher: PatternMatcher::TitleKeyword {
                severity: Severity::Critical,
                keyword: "cyber",
            },
        },
        ThreatPattern {
            id: "regional-escalation".into(),
            name: "Regional Political Escalation".into(),
            description: "Increasing political tension in geographic region".into(),
            conditions: conditions(&["severity:high", "region:same", "count:greater_than_3", "timeframe:24h"]),
            severity: Severity::High,
            confidence: 74.0,
            last_detected: None,
            matcher: PatternMatcher::Country {
                severity: Severity::High,
                country: "Ukraine",
            },
        },
        ThreatPattern {
            id: "economic-warfare".into(),
            name: "Economic Warfare Indicators".into(),
            description: "Patterns suggesting economic warfare or sanctions".into(),
            conditions: conditions(&["keyword:sanctions", "keyword:economic", "keyword:trade"]),
            severity: Severity::Medium,
            confidence: 62.0,
            last_detected: None,
            matcher: PatternMatcher::Never,
        },
    ]
}

/// A pattern after one analysis pass, with the number of events that matched.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternPass {
    pub pattern: ThreatPattern,
    pub matched: usize,
}

/// Run one pass over `events`. Matches raise confidence in steps of 5 up to 95
/// and stamp `last_detected`.
pub fn analyze_patterns(patterns: &[ThreatPattern], events: &[Event], now: DateTime<Utc>) -> Vec<PatternPass> {
    patterns
        .iter()
        .map(|pattern| {
            let matched = events.iter().filter(|e| pattern.matcher.matches(e)).count();
            let mut next = pattern.clone();
            next.confidence = (pattern.confidence + matched as f64 * CONFIDENCE_STEP).min(MAX_CONFIDENCE);
            if matched > 0 {
                next.last_detected = Some(now);
            }
            tracing::debug!(
                "Pattern {} matched {matched} events, confidence {:.0}",
                next.name,
                next.confidence
            );
            PatternPass { pattern: next, matched }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_event;

    #[test]
    fn cyber_pattern_gains_confidence() {
        let now = Utc::now();
        let events = vec![
            test_event("1", Severity::Critical, "Cyber attack on grid", ""),
            test_event("2", Severity::Critical, "Major CYBER outage", ""),
            test_event("3", Severity::High, "Cyber probe", ""),
        ];
        let passes = analyze_patterns(&builtin_patterns(), &events, now);
        assert_eq!(passes[0].matched, 2);
        assert_eq!(passes[0].pattern.confidence, 95.0);
        assert_eq!(passes[0].pattern.last_detected, Some(now));
        assert!(passes[0].pattern.raises_alert());
    }

    #[test]
    fn no_matches_keep_confidence_and_detection() {
        let passes = analyze_patterns(&builtin_patterns(), &[], Utc::now());
        assert_eq!(passes[0].pattern.confidence, 87.0);
        assert!(passes.iter().all(|p| p.pattern.last_detected.is_none()));
        assert!(passes.iter().all(|p| !p.pattern.raises_alert()));
    }

    #[test]
    fn ukraine_pattern_needs_high_severity() {
        let mut high = test_event("1", Severity::High, "Shelling reported", "");
        high.location.country = "Ukraine".into();
        let mut critical = high.clone();
        critical.severity = Severity::Critical;
        let passes = analyze_patterns(&builtin_patterns(), &[high, critical], Utc::now());
        assert_eq!(passes[1].matched, 1);
        assert_eq!(passes[1].pattern.confidence, 79.0);
        assert!(!passes[1].pattern.raises_alert());
    }

    #[test]
    fn economic_pattern_never_matches() {
        let events = vec![test_event("1", Severity::Critical, "Economic sanctions", "trade")];
        let passes = analyze_patterns(&builtin_patterns(), &events, Utc::now());
        assert_eq!(passes[2].matched, 0);
        assert_eq!(passes[2].pattern.status(), PatternStatus::Warning);
    }

    #[test]
    fn status_bands() {
        assert_eq!(PatternStatus::from_confidence(80.0), PatternStatus::Critical);
        assert_eq!(PatternStatus::from_confidence(79.9), PatternStatus::Warning);
        assert_eq!(PatternStatus::from_confidence(60.0), PatternStatus::Warning);
        assert_eq!(PatternStatus::from_confidence(59.0), PatternStatus::Monitoring);
    }

    #[test]
    fn recommendation_follows_severity() {
        let patterns = builtin_patterns();
        assert_eq!(patterns[0].recommendation(), "Immediate action required");
        assert_eq!(patterns[1].recommendation(), "Monitor closely");
    }
}
