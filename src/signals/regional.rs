use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::{Event, Severity};

const HOTSPOT_COUNT: usize = 5;

/// Group items by country, preserving the order in which countries first appear.
pub fn group_by_country<'a, T>(
    items: &'a [T],
    country: impl Fn(&T) -> &str,
) -> Vec<(String, Vec<&'a T>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<&'a T>)> = Vec::new();
    for item in items {
        let key = country(item);
        match index.get(key) {
            Some(&i) => groups[i].1.push(item),
            None => {
                index.insert(key.to_string(), groups.len());
                groups.push((key.to_string(), vec![item]));
            }
        }
    }
    groups
}

/// Severity-weighted risk for one country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryRisk {
    pub country: String,
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub coordinates: [f64; 2],
    /// `(critical × 3 + high × 2) / total`
    pub risk_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeospatialSummary {
    /// Every country, highest risk first.
    pub countries: Vec<CountryRisk>,
    pub hotspots: Vec<CountryRisk>,
    pub average_hotspot_risk: f64,
}

pub fn country_risks(events: &[Event]) -> Vec<CountryRisk> {
    let mut risks: Vec<CountryRisk> = group_by_country(events, |e| e.location.country.as_str())
        .into_iter()
        .map(|(country, group)| {
            let total = group.len();
            let critical = group.iter().filter(|e| e.severity == Severity::Critical).count();
            let high = group.iter().filter(|e| e.severity == Severity::High).count();
            CountryRisk {
                country,
                total,
                critical,
                high,
                coordinates: group[0].location.coordinates,
                risk_score: (critical * 3 + high * 2) as f64 / total as f64,
            }
        })
        .collect();
    risks.sort_by(|a, b| b.risk_score.partial_cmp(&a.risk_score).unwrap_or(Ordering::Equal));
    risks
}

pub fn summarize(events: &[Event]) -> GeospatialSummary {
    let countries = country_risks(events);
    let hotspots: Vec<CountryRisk> = countries.iter().take(HOTSPOT_COUNT).cloned().collect();
    let average_hotspot_risk = if hotspots.is_empty() {
        0.0
    } else {
        hotspots.iter().map(|h| h.risk_score).sum::<f64>() / hotspots.len() as f64
    };
    GeospatialSummary {
        countries,
        hotspots,
        average_hotspot_risk,
    }
}
