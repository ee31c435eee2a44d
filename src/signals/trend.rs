use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::lexicon::contains_any;
use crate::core::{Event, Severity};

/// Absolute change below which a category is considered stable.
const STABLE_BAND: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendCategory {
    Critical,
    Cyber,
    Military,
    Economic,
}

impl TrendCategory {
    pub const ALL: [TrendCategory; 4] = [
        TrendCategory::Critical,
        TrendCategory::Cyber,
        TrendCategory::Military,
        TrendCategory::Economic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TrendCategory::Critical => "critical",
            TrendCategory::Cyber => "cyber",
            TrendCategory::Military => "military",
            TrendCategory::Economic => "economic",
        }
    }

    fn display_name(self) -> &'static str {
        match self {
            TrendCategory::Critical => "Critical",
            TrendCategory::Cyber => "Cyber",
            TrendCategory::Military => "Military",
            TrendCategory::Economic => "Economic",
        }
    }

    fn matches(self, event: &Event) -> bool {
        match self {
            TrendCategory::Critical => event.severity == Severity::Critical,
            TrendCategory::Cyber => contains_any(&event.content(), &["cyber", "hack"]),
            TrendCategory::Military => contains_any(&event.content(), &["military", "conflict"]),
            TrendCategory::Economic => contains_any(&event.content(), &["economic", "sanction"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendAnalysis {
    pub category: String,
    pub trend: TrendDirection,
    /// Unsigned percent change; the sign lives in `trend`.
    pub change_rate: f64,
    pub prediction: String,
    pub confidence: f64,
}

/// Signed percent change from `previous` to `current`.
pub fn change_rate(current: usize, previous: usize) -> f64 {
    if previous > 0 {
        (current as f64 - previous as f64) / previous as f64 * 100.0
    } else if current > 0 {
        100.0
    } else {
        0.0
    }
}

pub fn direction(rate: f64) -> TrendDirection {
    if rate.abs() < STABLE_BAND {
        TrendDirection::Stable
    } else if rate > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    }
}

fn build(category: TrendCategory, current: usize, previous: usize) -> TrendAnalysis {
    let rate = change_rate(current, previous);
    let trend = direction(rate);
    let name = category.name();
    let prediction = match trend {
        TrendDirection::Increasing => format!("{name} events likely to continue rising"),
        TrendDirection::Decreasing => format!("{name} events showing decline"),
        TrendDirection::Stable => format!("{name} events remaining stable"),
    };
    TrendAnalysis {
        category: category.display_name().to_string(),
        trend,
        change_rate: rate.abs(),
        prediction,
        confidence: (60.0 + rate.abs()).min(85.0),
    }
}

/// Compare the last 24 hours against the 24 hours before, per category.
pub fn analyze(events: &[Event], now: DateTime<Utc>) -> Vec<TrendAnalysis> {
    let day = Duration::hours(24);
    let two_days = Duration::hours(48);

    let last: Vec<&Event> = events.iter().filter(|e| now - e.timestamp < day).collect();
    let previous: Vec<&Event> = events
        .iter()
        .filter(|e| {
            let age = now - e.timestamp;
            age >= day && age < two_days
        })
        .collect();

    TrendCategory::ALL
        .iter()
        .map(|&category| {
            let current = last.iter().filter(|e| category.matches(e)).count();
            let prior = previous.iter().filter(|e| category.matches(e)).count();
            build(category, current, prior)
        })
        .collect()
}
