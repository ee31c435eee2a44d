use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::lexicon::{self, count_matches};
use super::regional::group_by_country;
use crate::core::{Event, RiskLevel, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionType {
    Escalation,
    Conflict,
    Economic,
    Cyber,
    Stability,
}

/// A heuristic forward-looking risk statement for one country or the globe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionModel {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PredictionType,
    pub confidence: f64,
    pub timeframe: String,
    pub description: String,
    pub indicators: Vec<String>,
    pub region: String,
    pub risk_level: RiskLevel,
}

/// Keyword-hit totals for one country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CountrySignals {
    pub conflict: usize,
    pub cyber: usize,
    pub economic: usize,
    pub critical: usize,
}

impl CountrySignals {
    pub fn from_events(events: &[&Event]) -> Self {
        events.iter().fold(Self::default(), |mut acc, event| {
            let text = event.content();
            acc.conflict += count_matches(&text, lexicon::CONFLICT);
            acc.cyber += count_matches(&text, lexicon::CYBER);
            acc.economic += count_matches(&text, lexicon::ECONOMIC);
            if event.severity == Severity::Critical {
                acc.critical += 1;
            }
            acc
        })
    }
}

fn indicators(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn escalation(country: &str, s: &CountrySignals) -> Option<PredictionModel> {
    if s.conflict <= 2 && s.critical <= 2 {
        return None;
    }
    let confidence = (40.0 + s.conflict as f64 * 10.0 + s.critical as f64 * 15.0).min(85.0);
    Some(PredictionModel {
        id: format!("conflict-{country}"),
        kind: PredictionType::Escalation,
        confidence,
        timeframe: "24-72 hours".into(),
        description: format!("High probability of conflict escalation in {country}"),
        indicators: indicators(&[
            "Multiple military events",
            "Critical severity alerts",
            "Pattern recognition",
        ]),
        region: country.to_string(),
        risk_level: if s.conflict > 4 { RiskLevel::Critical } else { RiskLevel::High },
    })
}

fn cyber(country: &str, s: &CountrySignals) -> Option<PredictionModel> {
    if s.cyber <= 1 {
        return None;
    }
    Some(PredictionModel {
        id: format!("cyber-{country}"),
        kind: PredictionType::Cyber,
        confidence: (30.0 + s.cyber as f64 * 20.0).min(90.0),
        timeframe: "6-24 hours".into(),
        description: format!("Increased cyber activity expected in {country}"),
        indicators: indicators(&[
            "Cyber event clusters",
            "Infrastructure targeting",
            "Attack pattern analysis",
        ]),
        region: country.to_string(),
        risk_level: if s.cyber > 3 { RiskLevel::High } else { RiskLevel::Medium },
    })
}

fn economic(country: &str, s: &CountrySignals) -> Option<PredictionModel> {
    if s.economic <= 1 {
        return None;
    }
    Some(PredictionModel {
        id: format!("economic-{country}"),
        kind: PredictionType::Economic,
        confidence: (25.0 + s.economic as f64 * 15.0).min(75.0),
        timeframe: "1-7 days".into(),
        description: format!("Economic instability indicators in {country}"),
        indicators: indicators(&[
            "Economic event frequency",
            "Market volatility signals",
            "Policy changes",
        ]),
        region: country.to_string(),
        risk_level: if s.economic > 2 { RiskLevel::Medium } else { RiskLevel::Low },
    })
}

fn global_stability(critical: usize) -> Option<PredictionModel> {
    if critical <= 5 {
        return None;
    }
    Some(PredictionModel {
        id: "global-stability".into(),
        kind: PredictionType::Stability,
        confidence: (50.0 + critical as f64 * 5.0).min(80.0),
        timeframe: "48-96 hours".into(),
        description: "Global stability concerns due to multiple critical events".into(),
        indicators: indicators(&[
            "Critical event threshold",
            "Multi-region impact",
            "Cascading effects model",
        ]),
        region: "Global".into(),
        risk_level: if critical > 8 { RiskLevel::Critical } else { RiskLevel::High },
    })
}

/// Generate per-country and global predictions, highest confidence first.
pub fn generate(events: &[Event]) -> Vec<PredictionModel> {
    let mut predictions = Vec::new();

    for (country, group) in group_by_country(events, |e| e.location.country.as_str()) {
        let signals = CountrySignals::from_events(&group);
        predictions.extend(escalation(&country, &signals));
        predictions.extend(cyber(&country, &signals));
        predictions.extend(economic(&country, &signals));
    }

    let global_critical = events
        .iter()
        .filter(|e| e.severity == Severity::Critical)
        .count();
    predictions.extend(global_stability(global_critical));

    predictions.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal));
    predictions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_event;

    fn event(id: &str, severity: Severity, country: &str, title: &str) -> Event {
        let mut e = test_event(id, severity, title, "");
        e.location.country = country.to_string();
        e
    }

    #[test]
    fn global_stability_at_nine_critical() {
        let events: Vec<Event> = (0..9)
            .map(|i| event(&i.to_string(), Severity::Critical, &format!("C{i}"), "quiet day"))
            .collect();
        let predictions = generate(&events);
        let global = predictions.iter().find(|p| p.kind == PredictionType::Stability).unwrap();
        assert_eq!(global.confidence, 80.0);
        assert_eq!(global.risk_level, RiskLevel::Critical);
        assert_eq!(global.region, "Global");
        assert_eq!(global.timeframe, "48-96 hours");
    }

    #[test]
    fn no_global_prediction_at_five() {
        let events: Vec<Event> = (0..5)
            .map(|i| event(&i.to_string(), Severity::Critical, &format!("C{i}"), "quiet day"))
            .collect();
        assert!(generate(&events).iter().all(|p| p.kind != PredictionType::Stability));
    }

    #[test]
    fn six_critical_is_high_risk() {
        let events: Vec<Event> = (0..6)
            .map(|i| event(&i.to_string(), Severity::Critical, &format!("C{i}"), "quiet day"))
            .collect();
        let global = generate(&events).into_iter().find(|p| p.id == "global-stability").unwrap();
        assert_eq!(global.confidence, 80.0);
        assert_eq!(global.risk_level, RiskLevel::High);
    }

    #[test]
    fn escalation_from_conflict_keywords() {
        // "military invasion missile" hits 3 conflict keywords.
        let events = vec![event("1", Severity::Low, "Ukraine", "military invasion missile")];
        let predictions = generate(&events);
        assert_eq!(predictions.len(), 1);
        let p = &predictions[0];
        assert_eq!(p.id, "conflict-Ukraine");
        assert_eq!(p.kind, PredictionType::Escalation);
        assert_eq!(p.confidence, 70.0);
        assert_eq!(p.risk_level, RiskLevel::High);
    }

    #[test]
    fn escalation_from_critical_count_capped() {
        let events: Vec<Event> = (0..3)
            .map(|i| event(&i.to_string(), Severity::Critical, "Russia", "military war attack"))
            .collect();
        let p = generate(&events).into_iter().find(|p| p.id == "conflict-Russia").unwrap();
        // conflict 9, critical 3 → 40 + 90 + 45, capped at 85
        assert_eq!(p.confidence, 85.0);
        assert_eq!(p.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn cyber_and_economic_rules() {
        let events = vec![
            event("1", Severity::Medium, "Germany", "ransomware hack"),
            event("2", Severity::Medium, "Iran", "sanction trade"),
        ];
        let predictions = generate(&events);
        let cyber = predictions.iter().find(|p| p.id == "cyber-Germany").unwrap();
        assert_eq!(cyber.confidence, 70.0);
        assert_eq!(cyber.risk_level, RiskLevel::Medium);
        let econ = predictions.iter().find(|p| p.id == "economic-Iran").unwrap();
        assert_eq!(econ.confidence, 55.0);
        assert_eq!(econ.risk_level, RiskLevel::Low);
        // sorted by confidence
        assert_eq!(predictions[0].id, "cyber-Germany");
    }

    #[test]
    fn single_hits_produce_nothing() {
        let events = vec![event("1", Severity::High, "Chile", "cyber trade summit")];
        assert!(generate(&events).is_empty());
    }

    #[test]
    fn predictions_are_idempotent() {
        let events = vec![
            event("1", Severity::Critical, "Ukraine", "military invasion missile"),
            event("2", Severity::Medium, "Germany", "ransomware hack breach"),
        ];
        assert_eq!(generate(&events), generate(&events));
    }
}
