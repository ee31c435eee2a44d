//! Field/operator/value conditions and how they match events.
//!
//! Every non-`count` condition is tested against a single event. `count`
//! conditions are tested against the number of events in a batch that pass all
//! the other conditions (1 when a single event is evaluated on its own).

use serde::{Deserialize, Serialize};

use crate::core::geo::region_of;
use crate::core::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    Severity,
    Region,
    Keyword,
    Source,
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    Contains,
    GreaterThan,
    LessThan,
    In,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl ConditionValue {
    fn as_number(&self) -> Option<f64> {
        match self {
            ConditionValue::Number(n) => Some(*n),
            ConditionValue::Text(s) => s.trim().parse().ok(),
            ConditionValue::List(_) => None,
        }
    }

    /// Lower-cased members for `in`. A text value is read as a comma-separated list.
    fn members(&self) -> Vec<String> {
        match self {
            ConditionValue::List(items) => items.iter().map(|s| s.trim().to_lowercase()).collect(),
            ConditionValue::Text(s) => s.split(',').map(|p| p.trim().to_lowercase()).collect(),
            ConditionValue::Number(n) => vec![n.to_string()],
        }
    }

    fn as_text(&self) -> Option<String> {
        match self {
            ConditionValue::Text(s) => Some(s.trim().to_lowercase()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationCondition {
    #[serde(rename = "type")]
    pub kind: ConditionType,
    pub operator: Operator,
    pub value: ConditionValue,
}

impl AutomationCondition {
    pub fn new(kind: ConditionType, operator: Operator, value: ConditionValue) -> Self {
        Self {
            kind,
            operator,
            value,
        }
    }

    pub fn is_count(&self) -> bool {
        self.kind == ConditionType::Count
    }

    /// Test against one event. A `count` condition sees a count of 1.
    pub fn matches_event(&self, event: &Event) -> bool {
        match self.kind {
            ConditionType::Severity => {
                let severity = event.severity.as_str();
                self.match_fields(&[severity], severity)
            }
            ConditionType::Region => {
                let country = event.location.country.to_lowercase();
                let mut fields = vec![country.as_str()];
                if let Some(region) = region_of(&event.location.country) {
                    fields.push(region.slug());
                }
                self.match_fields(&fields, &country)
            }
            ConditionType::Keyword => self.match_keyword(&event.content()),
            ConditionType::Source => {
                let name = event.source.name.to_lowercase();
                self.match_fields(&[event.source.kind.as_str(), name.as_str()], &name)
            }
            ConditionType::Count => self.matches_count(1),
        }
    }

    /// Test a numeric count. Non-count conditions never match a bare count.
    pub fn matches_count(&self, count: usize) -> bool {
        if !self.is_count() {
            return false;
        }
        let count = count as f64;
        match self.operator {
            Operator::GreaterThan => self.value.as_number().is_some_and(|n| count > n),
            Operator::LessThan => self.value.as_number().is_some_and(|n| count < n),
            Operator::Equals => self.value.as_number().is_some_and(|n| count == n),
            Operator::In => self
                .value
                .members()
                .iter()
                .filter_map(|m| m.parse::<f64>().ok())
                .any(|n| count == n),
            Operator::Contains => false,
        }
    }

    /// `fields` are the lower-cased values `equals`/`in` compare against;
    /// `haystack` is the text `contains` searches.
    fn match_fields(&self, fields: &[&str], haystack: &str) -> bool {
        match self.operator {
            Operator::Equals => self
                .value
                .as_text()
                .is_some_and(|v| fields.iter().any(|f| *f == v)),
            Operator::Contains => self
                .value
                .as_text()
                .is_some_and(|v| !v.is_empty() && haystack.contains(&v)),
            Operator::In => {
                let members = self.value.members();
                fields.iter().any(|f| members.iter().any(|m| m == f))
            }
            Operator::GreaterThan | Operator::LessThan => false,
        }
    }

    fn match_keyword(&self, content: &str) -> bool {
        match self.operator {
            Operator::Equals | Operator::Contains => self
                .value
                .as_text()
                .is_some_and(|v| !v.is_empty() && content.contains(&v)),
            Operator::In => self
                .value
                .members()
                .iter()
                .any(|m| !m.is_empty() && content.contains(m.as_str())),
            Operator::GreaterThan | Operator::LessThan => false,
        }
    }
}

/// Whether a single event satisfies every condition. Empty condition lists never match.
pub fn matches_event(conditions: &[AutomationCondition], event: &Event) -> bool {
    !conditions.is_empty() && conditions.iter().all(|c| c.matches_event(event))
}

/// Evaluate conditions against a batch. Returns the events that satisfy every
/// per-event condition, or nothing when the batch-level `count` conditions fail.
pub fn evaluate_batch<'a>(conditions: &[AutomationCondition], events: &'a [Event]) -> Vec<&'a Event> {
    if conditions.is_empty() {
        return Vec::new();
    }
    let (count_conditions, event_conditions): (Vec<&AutomationCondition>, Vec<&AutomationCondition>) =
        conditions.iter().partition(|c| c.is_count());

    let matched: Vec<&Event> = events
        .iter()
        .filter(|e| event_conditions.iter().all(|c| c.matches_event(e)))
        .collect();

    if matched.is_empty() || !count_conditions.iter().all(|c| c.matches_count(matched.len())) {
        return Vec::new();
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{test_event, Severity, SourceType};

    fn cond(kind: ConditionType, operator: Operator, value: ConditionValue) -> AutomationCondition {
        AutomationCondition::new(kind, operator, value)
    }

    fn text(s: &str) -> ConditionValue {
        ConditionValue::Text(s.to_string())
    }

    fn list(items: &[&str]) -> ConditionValue {
        ConditionValue::List(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn severity_equals_and_in() {
        let event = test_event("1", Severity::Critical, "x", "");
        assert!(cond(ConditionType::Severity, Operator::Equals, text("Critical")).matches_event(&event));
        assert!(!cond(ConditionType::Severity, Operator::Equals, text("high")).matches_event(&event));
        assert!(cond(ConditionType::Severity, Operator::In, list(&["critical", "high"])).matches_event(&event));
        assert!(cond(ConditionType::Severity, Operator::In, text("high, critical")).matches_event(&event));
    }

    #[test]
    fn numeric_operators_reject_text_fields() {
        let event = test_event("1", Severity::Critical, "x", "");
        let c = cond(ConditionType::Severity, Operator::GreaterThan, ConditionValue::Number(1.0));
        assert!(!c.matches_event(&event));
        let c = cond(ConditionType::Keyword, Operator::LessThan, text("x"));
        assert!(!c.matches_event(&event));
    }

    #[test]
    fn region_matches_continent_or_country() {
        let event = test_event("1", Severity::High, "x", ""); // Germany
        assert!(cond(ConditionType::Region, Operator::Equals, text("europe")).matches_event(&event));
        assert!(cond(ConditionType::Region, Operator::Equals, text("Germany")).matches_event(&event));
        assert!(!cond(ConditionType::Region, Operator::Equals, text("asia")).matches_event(&event));
        assert!(cond(ConditionType::Region, Operator::Contains, text("germ")).matches_event(&event));
        assert!(cond(ConditionType::Region, Operator::In, list(&["asia", "europe"])).matches_event(&event));
    }

    #[test]
    fn keyword_is_substring_of_content() {
        let event = test_event("1", Severity::High, "Ransomware hits port", "Systems offline");
        assert!(cond(ConditionType::Keyword, Operator::Contains, text("ransom")).matches_event(&event));
        assert!(cond(ConditionType::Keyword, Operator::Equals, text("OFFLINE")).matches_event(&event));
        assert!(cond(ConditionType::Keyword, Operator::In, list(&["missile", "port"])).matches_event(&event));
        assert!(!cond(ConditionType::Keyword, Operator::In, list(&["missile", ""])).matches_event(&event));
        assert!(!cond(ConditionType::Keyword, Operator::Contains, text("")).matches_event(&event));
    }

    #[test]
    fn source_matches_type_or_name() {
        let mut event = test_event("1", Severity::High, "x", "");
        event.source.kind = SourceType::Government;
        event.source.name = "EU CERT".into();
        assert!(cond(ConditionType::Source, Operator::Equals, text("government")).matches_event(&event));
        assert!(cond(ConditionType::Source, Operator::Equals, text("eu cert")).matches_event(&event));
        assert!(cond(ConditionType::Source, Operator::Contains, text("cert")).matches_event(&event));
        assert!(!cond(ConditionType::Source, Operator::In, list(&["news", "social"])).matches_event(&event));
    }

    #[test]
    fn count_operators() {
        let gt = cond(ConditionType::Count, Operator::GreaterThan, ConditionValue::Number(3.0));
        assert!(!gt.matches_count(3));
        assert!(gt.matches_count(4));
        let lt = cond(ConditionType::Count, Operator::LessThan, text("2"));
        assert!(lt.matches_count(1));
        assert!(!lt.matches_count(2));
        let eq = cond(ConditionType::Count, Operator::Equals, ConditionValue::Number(1.0));
        assert!(eq.matches_event(&test_event("1", Severity::Low, "x", "")));
        let within = cond(ConditionType::Count, Operator::In, list(&["2", "5"]));
        assert!(within.matches_count(5));
        assert!(!cond(ConditionType::Count, Operator::Contains, text("1")).matches_count(1));
    }

    #[test]
    fn empty_conditions_never_match() {
        let event = test_event("1", Severity::Critical, "x", "");
        assert!(!matches_event(&[], &event));
        assert!(evaluate_batch(&[], std::slice::from_ref(&event)).is_empty());
    }

    #[test]
    fn all_conditions_must_hold() {
        let event = test_event("1", Severity::Critical, "Cyber attack", "");
        let conditions = vec![
            cond(ConditionType::Severity, Operator::Equals, text("critical")),
            cond(ConditionType::Keyword, Operator::Contains, text("cyber")),
        ];
        assert!(matches_event(&conditions, &event));
        let conditions = vec![
            cond(ConditionType::Severity, Operator::Equals, text("critical")),
            cond(ConditionType::Keyword, Operator::Contains, text("flood")),
        ];
        assert!(!matches_event(&conditions, &event));
    }

    #[test]
    fn batch_count_gates_on_matched_events() {
        let events: Vec<Event> = (0..4)
            .map(|i| test_event(&i.to_string(), Severity::High, "Border clash", ""))
            .chain(std::iter::once(test_event("q", Severity::Low, "Border clash", "")))
            .collect();
        let conditions = vec![
            cond(ConditionType::Severity, Operator::Equals, text("high")),
            cond(ConditionType::Count, Operator::GreaterThan, ConditionValue::Number(3.0)),
        ];
        let matched = evaluate_batch(&conditions, &events);
        assert_eq!(matched.len(), 4);
        assert!(matched.iter().all(|e| e.severity == Severity::High));

        let stricter = vec![
            cond(ConditionType::Severity, Operator::Equals, text("high")),
            cond(ConditionType::Count, Operator::GreaterThan, ConditionValue::Number(4.0)),
        ];
        assert!(evaluate_batch(&stricter, &events).is_empty());
    }

    #[test]
    fn wire_format() {
        let json = r#"{ "type": "severity", "operator": "in", "value": ["critical", "high"] }"#;
        let c: AutomationCondition = serde_json::from_str(json).unwrap();
        assert_eq!(c.kind, ConditionType::Severity);
        assert_eq!(c.value, list(&["critical", "high"]));

        let json = r#"{ "type": "count", "operator": "greater_than", "value": 3 }"#;
        let c: AutomationCondition = serde_json::from_str(json).unwrap();
        assert_eq!(c.operator, Operator::GreaterThan);
        assert_eq!(c.value, ConditionValue::Number(3.0));
    }
}
