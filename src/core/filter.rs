use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::geo::Region;
use super::{Event, Severity, SourceType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TimeRange {
    #[default]
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "all")]
    All,
}

impl TimeRange {
    /// Maximum event age admitted by this range. `None` admits everything.
    pub fn max_age(self) -> Option<Duration> {
        match self {
            TimeRange::Day => Some(Duration::hours(24)),
            TimeRange::Week => Some(Duration::days(7)),
            TimeRange::Month => Some(Duration::days(30)),
            TimeRange::All => None,
        }
    }

    pub fn admits(self, event: &Event, now: DateTime<Utc>) -> bool {
        match self.max_age() {
            Some(max) => now - event.timestamp <= max,
            None => true,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeRange::Day => "24h",
            TimeRange::Week => "7d",
            TimeRange::Month => "30d",
            TimeRange::All => "all",
        }
    }
}

impl std::str::FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [TimeRange::Day, TimeRange::Week, TimeRange::Month, TimeRange::All]
            .into_iter()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| format!("unknown time range \"{s}\" (expected 24h, 7d, 30d or all)"))
    }
}

/// Analyst query over the event collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterState {
    pub region: Region,
    pub severity: Vec<Severity>,
    pub time_range: TimeRange,
    pub source_types: Vec<SourceType>,
    pub search_query: String,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            region: Region::Global,
            severity: Severity::ALL.to_vec(),
            time_range: TimeRange::Day,
            source_types: SourceType::ALL.to_vec(),
            search_query: String::new(),
        }
    }
}

impl FilterState {
    pub fn matches(&self, event: &Event, now: DateTime<Utc>) -> bool {
        self.severity.contains(&event.severity)
            && self.source_types.contains(&event.source.kind)
            && self.time_range.admits(event, now)
            && self.region.contains_country(&event.location.country)
            && matches_search(event, &self.search_query)
    }

    /// Events passing every filter, in input order.
    pub fn apply(&self, events: &[Event], now: DateTime<Utc>) -> Vec<Event> {
        events
            .iter()
            .filter(|e| self.matches(e, now))
            .cloned()
            .collect()
    }
}

/// Case-insensitive substring search across title, description, country and tags.
pub fn matches_search(event: &Event, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let q = query.to_lowercase();
    event.title.to_lowercase().contains(&q)
        || event.description.to_lowercase().contains(&q)
        || event.location.country.to_lowercase().contains(&q)
        || event.tags.iter().any(|t| t.to_lowercase().contains(&q))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_event;

    #[test]
    fn default_filter_admits_recent_events() {
        let event = test_event("1", Severity::High, "Protest", "");
        let now = event.timestamp;
        assert!(FilterState::default().matches(&event, now));
    }

    #[test]
    fn time_range_excludes_old_events() {
        let mut event = test_event("1", Severity::High, "Protest", "");
        let now = event.timestamp;
        event.timestamp = now - Duration::hours(25);
        let mut filter = FilterState::default();
        assert!(!filter.matches(&event, now));
        filter.time_range = TimeRange::Week;
        assert!(filter.matches(&event, now));
        event.timestamp = now - Duration::days(40);
        filter.time_range = TimeRange::All;
        assert!(filter.matches(&event, now));
    }

    #[test]
    fn time_range_parses_wire_names() {
        assert_eq!("7d".parse::<TimeRange>(), Ok(TimeRange::Week));
        assert_eq!("all".parse::<TimeRange>(), Ok(TimeRange::All));
        assert!("1y".parse::<TimeRange>().is_err());
    }

    #[test]
    fn severity_and_source_subsets() {
        let event = test_event("1", Severity::Low, "Protest", "");
        let now = event.timestamp;
        let filter = FilterState {
            severity: vec![Severity::Critical, Severity::High],
            ..FilterState::default()
        };
        assert!(!filter.matches(&event, now));

        let filter = FilterState {
            source_types: vec![SourceType::Satellite],
            ..FilterState::default()
        };
        assert!(!filter.matches(&event, now));
    }

    #[test]
    fn region_uses_country_table() {
        let event = test_event("1", Severity::Low, "Protest", "");
        let now = event.timestamp;
        let mut filter = FilterState {
            region: Region::Europe,
            ..FilterState::default()
        };
        assert!(filter.matches(&event, now));
        filter.region = Region::Asia;
        assert!(!filter.matches(&event, now));
    }

    #[test]
    fn search_covers_country_and_tags() {
        let mut event = test_event("1", Severity::Low, "Summit", "Leaders met");
        event.tags = vec!["Diplomacy".into()];
        assert!(matches_search(&event, "GERMAN"));
        assert!(matches_search(&event, "diplo"));
        assert!(matches_search(&event, "leaders"));
        assert!(!matches_search(&event, "missile"));
        assert!(matches_search(&event, ""));
    }

    #[test]
    fn filter_state_from_toml() {
        let filter: FilterState = toml::from_str(
            r#"
            region = "europe"
            severity = ["critical"]
            timeRange = "7d"
            searchQuery = "cyber"
            "#,
        )
        .unwrap();
        assert_eq!(filter.region, Region::Europe);
        assert_eq!(filter.severity, vec![Severity::Critical]);
        assert_eq!(filter.time_range, TimeRange::Week);
        assert_eq!(filter.source_types.len(), 4);
    }
}
