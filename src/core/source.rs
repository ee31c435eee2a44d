use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};

use super::{Event, Location, Severity, SourceInfo, SourceType};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read events from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse events from {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Where the event collection comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum EventSource {
    /// Built-in sample set, timestamps relative to the load time.
    Sample,
    /// JSON array of events on disk.
    File(PathBuf),
}

impl EventSource {
    pub fn from_path(path: Option<&str>) -> Self {
        match path {
            Some(p) if !p.is_empty() => EventSource::File(PathBuf::from(p)),
            _ => EventSource::Sample,
        }
    }

    pub fn load(&self, now: DateTime<Utc>) -> Result<Vec<Event>, SourceError> {
        match self {
            EventSource::Sample => Ok(sample_events(now)),
            EventSource::File(path) => load_events_file(path),
        }
    }
}

pub fn load_events_file(path: &Path) -> Result<Vec<Event>, SourceError> {
    let contents = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let events: Vec<Event> = serde_json::from_str(&contents).map_err(|source| SourceError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!("Loaded {} events from {}", events.len(), path.display());
    Ok(events)
}

struct Sample {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    severity: Severity,
    source: (&'static str, SourceType),
    location: (&'static str, &'static str, [f64; 2]),
    minutes_ago: i64,
    tags: &'static [&'static str],
    url: &'static str,
}

const SAMPLES: &[Sample] = &[
    Sample {
        id: "1",
        title: "Military buildup reported near Ukraine border",
        description: "Satellite imagery shows significant movement of Russian troops and equipment near the Ukrainian border, raising concerns...",
        severity: Severity::Critical,
        source: ("CNN", SourceType::News),
        location: ("Russia", "Moscow", [55.7558, 37.6176]),
        minutes_ago: 15,
        tags: &["military", "ukraine", "russia"],
        url: "https://cnn.com/example",
    },
    Sample {
        id: "2",
        title: "Protests erupt in Tehran after economic sanctions",
        description: "Thousands gathered in central Tehran protesting rising food prices and economic hardship following new international sanctions...",
        severity: Severity::High,
        source: ("Reuters", SourceType::News),
        location: ("Iran", "Tehran", [35.6892, 51.3890]),
        minutes_ago: 42,
        tags: &["protests", "economy", "sanctions"],
        url: "https://reuters.com/example",
    },
    Sample {
        id: "3",
        title: "ASEAN summit concludes with trade agreement",
        description: "ASEAN members signed a new regional trade pact aimed at reducing tariffs and improving supply chain resilience in the region...",
        severity: Severity::Medium,
        source: ("BBC", SourceType::News),
        location: ("Indonesia", "Jakarta", [-6.2088, 106.8456]),
        minutes_ago: 60,
        tags: &["trade", "asean", "diplomacy"],
        url: "https://bbc.com/example",
    },
    Sample {
        id: "4",
        title: "Diplomatic meeting between US and China officials",
        description: "Senior US and Chinese officials met in Beijing to discuss climate cooperation and trade relations amid ongoing tensions...",
        severity: Severity::Medium,
        source: ("AP", SourceType::News),
        location: ("China", "Beijing", [39.9042, 116.4074]),
        minutes_ago: 120,
        tags: &["diplomacy", "us-china", "trade"],
        url: "https://apnews.com/example",
    },
    Sample {
        id: "5",
        title: "Cybersecurity breach at European banking consortium",
        description: "A sophisticated cyber attack targeted multiple European banks, potentially compromising customer data and financial records...",
        severity: Severity::Critical,
        source: ("EU CERT", SourceType::Government),
        location: ("Germany", "Frankfurt", [50.1109, 8.6821]),
        minutes_ago: 180,
        tags: &["cybersecurity", "banking", "europe"],
        url: "https://cert.europa.eu/example",
    },
    Sample {
        id: "6",
        title: "Natural disaster response coordinated in Philippines",
        description: "International aid organizations coordinate relief efforts following devastating typhoon that affected millions in the archipelago...",
        severity: Severity::High,
        source: ("UN OCHA", SourceType::Government),
        location: ("Philippines", "Manila", [14.5995, 120.9842]),
        minutes_ago: 240,
        tags: &["disaster", "humanitarian", "typhoon"],
        url: "https://unocha.org/example",
    },
    Sample {
        id: "7",
        title: "Energy crisis discussions in European Parliament",
        description: "EU lawmakers debate emergency measures to address rising energy costs and supply security concerns ahead of winter season...",
        severity: Severity::High,
        source: ("Euronews", SourceType::News),
        location: ("Belgium", "Brussels", [50.8503, 4.3517]),
        minutes_ago: 300,
        tags: &["energy", "europe", "crisis"],
        url: "https://euronews.com/example",
    },
    Sample {
        id: "8",
        title: "Trade route disruption in Red Sea region",
        description: "Commercial shipping reports delays and rerouting due to security concerns in critical maritime trade corridor...",
        severity: Severity::Medium,
        source: ("Lloyd's List", SourceType::News),
        location: ("Egypt", "Suez", [29.9668, 32.5498]),
        minutes_ago: 360,
        tags: &["shipping", "trade", "security"],
        url: "https://lloydslist.com/example",
    },
];

/// The built-in demo dataset, stamped relative to `now`.
pub fn sample_events(now: DateTime<Utc>) -> Vec<Event> {
    SAMPLES
        .iter()
        .map(|s| Event {
            id: s.id.to_string(),
            title: s.title.to_string(),
            description: s.description.to_string(),
            severity: s.severity,
            source: SourceInfo {
                name: s.source.0.to_string(),
                kind: s.source.1,
            },
            location: Location {
                country: s.location.0.to_string(),
                city: Some(s.location.1.to_string()),
                coordinates: s.location.2,
            },
            timestamp: now - Duration::minutes(s.minutes_ago),
            tags: s.tags.iter().map(|t| t.to_string()).collect(),
            url: Some(s.url.to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sample_set_is_recent_and_unique() {
        let now = Utc::now();
        let events = EventSource::Sample.load(now).unwrap();
        assert_eq!(events.len(), 8);
        assert!(events.iter().all(|e| now - e.timestamp <= Duration::hours(6)));
        let mut ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }

    #[test]
    fn file_source_round_trips_sample() {
        let now = Utc::now();
        let events = sample_events(now);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&events).unwrap().as_bytes())
            .unwrap();

        let source = EventSource::from_path(file.path().to_str());
        let loaded = source.load(now).unwrap();
        assert_eq!(loaded, events);
    }

    #[test]
    fn missing_file_is_io_error() {
        let source = EventSource::File(PathBuf::from("/nonexistent/events.json"));
        assert!(matches!(source.load(Utc::now()), Err(SourceError::Io { .. })));
    }

    #[test]
    fn malformed_file_is_json_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[{\"id\": 1}]").unwrap();
        let result = load_events_file(file.path());
        assert!(matches!(result, Err(SourceError::Json { .. })));
    }

    #[test]
    fn empty_path_means_sample() {
        assert_eq!(EventSource::from_path(Some("")), EventSource::Sample);
        assert_eq!(EventSource::from_path(None), EventSource::Sample);
    }
}
