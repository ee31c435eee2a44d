pub mod lexicon;
pub mod predict;
pub mod regional;
pub mod rules;
pub mod score;
pub mod sentiment;
pub mod threat;
pub mod trend;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AlertThresholds;
use crate::core::{Event, RiskLevel, RuleHit, ScoredEvent};
use predict::PredictionModel;
use regional::GeospatialSummary;
use rules::Rule;
use sentiment::{SentimentScore, SentimentSummary};
use threat::ThreatAssessment;
use trend::TrendAnalysis;

/// Everything derived from one event snapshot at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub generated_at: DateTime<Utc>,
    pub event_count: usize,
    pub scored: Vec<ScoredEvent>,
    pub sentiments: Vec<EventSentiment>,
    pub sentiment: SentimentSummary,
    pub threat: ThreatAssessment,
    pub geospatial: GeospatialSummary,
    pub predictions: Vec<PredictionModel>,
    pub trends: Vec<TrendAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSentiment {
    pub event_id: String,
    #[serde(flatten)]
    pub sentiment: SentimentScore,
}

/// The signal engine applies all threat rules and runs every derived analysis.
pub struct SignalEngine {
    rules: Vec<Box<dyn Rule + Send + Sync>>,
    thresholds: AlertThresholds,
}

impl SignalEngine {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self {
            rules: rules::default_rules(),
            thresholds,
        }
    }

    pub fn score(&self, event: &Event, now: DateTime<Utc>) -> ScoredEvent {
        let content = event.content();
        let rule_hits: Vec<RuleHit> = self
            .rules
            .iter()
            .filter(|rule| rule.applies(&content))
            .map(|rule| RuleHit {
                rule_name: rule.name().to_string(),
                multiplier: rule.multiplier(),
            })
            .collect();

        let recency = score::recency_factor(event.age_hours(now));
        let threat_score =
            score::compute_threat_score(event.severity.base_points(), &rule_hits, recency);

        ScoredEvent {
            event: event.clone(),
            threat_score,
            recency_factor: recency,
            rule_hits,
            risk_level: RiskLevel::classify(threat_score, &self.thresholds),
        }
    }

    pub fn score_all(&self, events: &[Event], now: DateTime<Utc>) -> Vec<ScoredEvent> {
        events.iter().map(|e| self.score(e, now)).collect()
    }

    /// Run the full pipeline. Pure in `events` and `now`.
    pub fn analyze(&self, events: &[Event], now: DateTime<Utc>) -> Analysis {
        let scored = self.score_all(events, now);
        let sentiments: Vec<EventSentiment> = events
            .iter()
            .map(|e| EventSentiment {
                event_id: e.id.clone(),
                sentiment: sentiment::analyze_event(e),
            })
            .collect();
        let scores: Vec<SentimentScore> = sentiments.iter().map(|s| s.sentiment).collect();

        Analysis {
            generated_at: now,
            event_count: events.len(),
            sentiment: sentiment::summarize(&scores),
            threat: threat::assess(&scored),
            geospatial: regional::summarize(events),
            predictions: predict::generate(events),
            trends: trend::analyze(events, now),
            sentiments,
            scored,
        }
    }
}

impl Default for SignalEngine {
    fn default() -> Self {
        Self::new(AlertThresholds::default())
    }
}
