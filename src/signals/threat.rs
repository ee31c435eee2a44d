use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::lexicon::{
    self, contains_any, FieldKeywords, CYBER_CATEGORY, ECONOMIC_CATEGORY, GEOPOLITICAL_CATEGORY,
};
use super::regional::group_by_country;
use crate::core::ScoredEvent;

/// Per-country display cap. Distinct from the 150 per-event cap.
pub const COUNTRY_RISK_CAP: f64 = 100.0;
const CRITICAL_THREAT_SCORE: f64 = 100.0;
const EMERGING_THREAT_SCORE: f64 = 75.0;
const TOP_REGIONS: usize = 8;
const TOP_THREATS: usize = 5;
const TOP_PRIMARY_THREATS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionalRisk {
    pub region: String,
    pub risk_score: f64,
    pub threat_count: usize,
    pub primary_threats: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatAssessment {
    pub overall_risk: f64,
    /// Events scoring above 100.
    pub critical_threats: usize,
    /// Events scoring in (75, 100].
    pub emerging_threats: usize,
    pub geopolitical_tension: f64,
    pub cyber_security: f64,
    pub economic_risk: f64,
    pub regional_risks: Vec<RegionalRisk>,
    pub highest_threats: Vec<ScoredEvent>,
}

/// Mean threat score of a country's events, capped at 100. Zero when the
/// country has no events.
pub fn country_risk(country: &str, scored: &[ScoredEvent]) -> f64 {
    let scores: Vec<f64> = scored
        .iter()
        .filter(|s| s.event.location.country == country)
        .map(|s| s.threat_score)
        .collect();
    mean_capped(&scores)
}

fn mean_capped(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    (scores.iter().sum::<f64>() / scores.len() as f64).min(COUNTRY_RISK_CAP)
}

/// Mean threat score over the events matching a category. The denominator is
/// floored at 1, so an empty subset reports 0.
pub fn category_risk(scored: &[ScoredEvent], category: &FieldKeywords) -> f64 {
    let matching: Vec<f64> = scored
        .iter()
        .filter(|s| category.matches(&s.event.title, &s.event.description))
        .map(|s| s.threat_score)
        .collect();
    matching.iter().sum::<f64>() / matching.len().max(1) as f64
}

/// Up to three threat labels ordered by how many of the events mention them.
pub fn primary_threats(events: &[&ScoredEvent]) -> Vec<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for scored in events {
        let content = scored.event.content();
        for (label, keywords) in lexicon::PRIMARY_THREATS {
            if !contains_any(&content, keywords) {
                continue;
            }
            match counts.iter_mut().find(|(l, _)| *l == *label) {
                Some((_, n)) => *n += 1,
                None => counts.push((*label, 1)),
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(TOP_PRIMARY_THREATS)
        .map(|(label, _)| label.to_string())
        .collect()
}

pub fn regional_risks(scored: &[ScoredEvent]) -> Vec<RegionalRisk> {
    let mut risks: Vec<RegionalRisk> = group_by_country(scored, |s| s.event.location.country.as_str())
        .into_iter()
        .map(|(country, group)| {
            let scores: Vec<f64> = group.iter().map(|s| s.threat_score).collect();
            RegionalRisk {
                risk_score: mean_capped(&scores),
                threat_count: group.len(),
                primary_threats: primary_threats(&group),
                region: country,
            }
        })
        .collect();
    risks.sort_by(|a, b| b.risk_score.partial_cmp(&a.risk_score).unwrap_or(Ordering::Equal));
    risks
}

pub fn assess(scored: &[ScoredEvent]) -> ThreatAssessment {
    let overall_risk = if scored.is_empty() {
        0.0
    } else {
        scored.iter().map(|s| s.threat_score).sum::<f64>() / scored.len() as f64
    };

    let critical_threats = scored
        .iter()
        .filter(|s| s.threat_score > CRITICAL_THREAT_SCORE)
        .count();
    let emerging_threats = scored
        .iter()
        .filter(|s| s.threat_score > EMERGING_THREAT_SCORE && s.threat_score <= CRITICAL_THREAT_SCORE)
        .count();

    let mut regional = regional_risks(scored);
    regional.truncate(TOP_REGIONS);

    let mut highest = scored.to_vec();
    highest.sort_by(|a, b| b.threat_score.partial_cmp(&a.threat_score).unwrap_or(Ordering::Equal));
    highest.truncate(TOP_THREATS);

    ThreatAssessment {
        overall_risk,
        critical_threats,
        emerging_threats,
        geopolitical_tension: category_risk(scored, &GEOPOLITICAL_CATEGORY),
        cyber_security: category_risk(scored, &CYBER_CATEGORY),
        economic_risk: category_risk(scored, &ECONOMIC_CATEGORY),
        regional_risks: regional,
        highest_threats: highest,
    }
}
