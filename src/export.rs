//! Report export: the analyst's selection of events plus optional analysis
//! sections, written as JSON or CSV.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::filter::{FilterState, TimeRange};
use crate::core::{Event, Severity, SourceType};
use crate::signals::predict::PredictionModel;
use crate::signals::threat::ThreatAssessment;
use crate::signals::trend::TrendAnalysis;
use crate::signals::SignalEngine;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} export is not supported")]
    UnsupportedFormat(ExportFormat),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Csv,
    #[default]
    Json,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportConfig {
    pub format: ExportFormat,
    pub include_analytics: bool,
    pub include_threat_assessment: bool,
    pub include_predictions: bool,
    pub time_range: TimeRange,
    /// Countries to keep. Empty keeps all.
    pub regions: Vec<String>,
    /// Severities to keep. Empty keeps all.
    pub severity_levels: Vec<Severity>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Json,
            include_analytics: true,
            include_threat_assessment: true,
            include_predictions: true,
            time_range: TimeRange::Day,
            regions: Vec::new(),
            severity_levels: vec![Severity::Critical, Severity::High],
        }
    }
}

impl ExportConfig {
    pub fn admits(&self, event: &Event, now: DateTime<Utc>) -> bool {
        let region_ok = self.regions.is_empty()
            || self
                .regions
                .iter()
                .any(|r| r.trim().eq_ignore_ascii_case(event.location.country.trim()));
        let severity_ok =
            self.severity_levels.is_empty() || self.severity_levels.contains(&event.severity);
        region_ok && severity_ok && self.time_range.admits(event, now)
    }

    pub fn select(&self, events: &[Event], now: DateTime<Utc>) -> Vec<Event> {
        events
            .iter()
            .filter(|e| self.admits(e, now))
            .cloned()
            .collect()
    }
}

/// `osint-report-YYYY-MM-DD.{ext}`
pub fn filename(format: ExportFormat, now: DateTime<Utc>) -> String {
    format!("osint-report-{}.{}", now.format("%Y-%m-%d"), format.extension())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub generated: DateTime<Utc>,
    pub format: ExportFormat,
    pub total_events: usize,
    pub time_range: TimeRange,
    pub includes_analytics: bool,
    pub includes_threat_assessment: bool,
    pub includes_predictions: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportAnalytics {
    pub total_events: usize,
    pub critical_events: usize,
    /// Number of distinct countries.
    pub region_distribution: usize,
    pub source_types: Vec<SourceType>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportPredictions {
    pub predictions: Vec<PredictionModel>,
    pub trends: Vec<TrendAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub metadata: ReportMetadata,
    pub events: Vec<Event>,
    pub analytics: Option<ReportAnalytics>,
    pub threat_assessment: Option<ThreatAssessment>,
    pub predictions: Option<ReportPredictions>,
}

pub fn build_report(
    config: &ExportConfig,
    events: &[Event],
    engine: &SignalEngine,
    now: DateTime<Utc>,
) -> Report {
    let events = config.select(events, now);

    let analytics = config.include_analytics.then(|| {
        let countries: BTreeSet<&str> = events.iter().map(|e| e.location.country.as_str()).collect();
        let mut source_types: Vec<SourceType> = Vec::new();
        for event in &events {
            if !source_types.contains(&event.source.kind) {
                source_types.push(event.source.kind);
            }
        }
        ReportAnalytics {
            total_events: events.len(),
            critical_events: events.iter().filter(|e| e.severity == Severity::Critical).count(),
            region_distribution: countries.len(),
            source_types,
        }
    });

    let (threat_assessment, predictions) =
        if config.include_threat_assessment || config.include_predictions {
            let analysis = engine.analyze(&events, now);
            (
                config.include_threat_assessment.then_some(analysis.threat),
                config.include_predictions.then_some(ReportPredictions {
                    predictions: analysis.predictions,
                    trends: analysis.trends,
                }),
            )
        } else {
            (None, None)
        };

    Report {
        metadata: ReportMetadata {
            generated: now,
            format: config.format,
            total_events: events.len(),
            time_range: config.time_range,
            includes_analytics: config.include_analytics,
            includes_threat_assessment: config.include_threat_assessment,
            includes_predictions: config.include_predictions,
        },
        events,
        analytics,
        threat_assessment,
        predictions,
    }
}

const CSV_HEADER: [&str; 12] = [
    "id",
    "title",
    "description",
    "severity",
    "country",
    "city",
    "latitude",
    "longitude",
    "source",
    "source_type",
    "timestamp",
    "tags",
];

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn render_csv(events: &[Event]) -> String {
    let mut out = CSV_HEADER.join(",");
    out.push_str("\r\n");
    for e in events {
        let row = [
            e.id.clone(),
            e.title.clone(),
            e.description.clone(),
            e.severity.to_string(),
            e.location.country.clone(),
            e.location.city.clone().unwrap_or_default(),
            e.location.coordinates[0].to_string(),
            e.location.coordinates[1].to_string(),
            e.source.name.clone(),
            e.source.kind.to_string(),
            e.timestamp.to_rfc3339(),
            e.tags.join(";"),
        ];
        let fields: Vec<String> = row.iter().map(|f| csv_field(f)).collect();
        out.push_str(&fields.join(","));
        out.push_str("\r\n");
    }
    out
}

pub fn render(report: &Report) -> Result<String, ExportError> {
    match report.metadata.format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        ExportFormat::Csv => Ok(render_csv(&report.events)),
        other => Err(ExportError::UnsupportedFormat(other)),
    }
}

/// Build, render and write a report into `dir`. Returns the written path.
pub fn write_export(
    config: &ExportConfig,
    events: &[Event],
    engine: &SignalEngine,
    dir: &Path,
    now: DateTime<Utc>,
) -> Result<PathBuf, ExportError> {
    let report = build_report(config, events, engine, now);
    let body = render(&report)?;

    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(filename(config.format, now));
    std::fs::write(&path, body).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    tracing::info!(
        "Exported {} events to {}",
        report.metadata.total_events,
        path.display()
    );
    Ok(path)
}

/// Export the current view: `filters` narrows the collection the way the
/// dashboard shows it, then `config` selects from what is left.
pub fn export_filtered(
    filters: &FilterState,
    config: &ExportConfig,
    events: &[Event],
    engine: &SignalEngine,
    dir: &Path,
    now: DateTime<Utc>,
) -> Result<PathBuf, ExportError> {
    let visible = filters.apply(events, now);
    tracing::debug!("{} of {} events visible for export", visible.len(), events.len());
    write_export(config, &visible, engine, dir, now)
}
