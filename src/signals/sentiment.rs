use serde::{Deserialize, Serialize};

use super::lexicon::{self, contains_any};
use crate::core::Event;

/// Label boundary on either side of zero.
const LABEL_THRESHOLD: f64 = 0.1;
const MIN_CONFIDENCE: f64 = 0.3;
/// Matches needed for full confidence.
const FULL_CONFIDENCE_MATCHES: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn from_score(score: f64) -> Self {
        if score > LABEL_THRESHOLD {
            SentimentLabel::Positive
        } else if score < -LABEL_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub score: f64,
    pub label: SentimentLabel,
    pub confidence: f64,
}

/// Score free text by counting words that contain negative or positive keywords.
///
/// A word can hit both lexicons; each hit counts independently.
pub fn analyze_text(text: &str) -> SentimentScore {
    let lower = text.to_lowercase();
    let mut raw = 0i64;
    let mut matches = 0u32;

    for word in lower.split_whitespace() {
        if contains_any(word, lexicon::NEGATIVE) {
            raw -= 1;
            matches += 1;
        }
        if contains_any(word, lexicon::POSITIVE) {
            raw += 1;
            matches += 1;
        }
    }

    let score = if matches > 0 {
        raw as f64 / matches as f64
    } else {
        0.0
    };
    let confidence = (matches as f64 / FULL_CONFIDENCE_MATCHES)
        .min(1.0)
        .max(MIN_CONFIDENCE);

    SentimentScore {
        score,
        label: SentimentLabel::from_score(score),
        confidence,
    }
}

pub fn analyze_event(event: &Event) -> SentimentScore {
    analyze_text(&format!("{} {}", event.title, event.description))
}

/// Distribution of sentiment across an event set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentSummary {
    /// Percent of events per label.
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub average_score: f64,
    /// Mean confidence as a percentage.
    pub average_confidence: f64,
    pub trend: SentimentLabel,
}

pub fn summarize(scores: &[SentimentScore]) -> SentimentSummary {
    if scores.is_empty() {
        return SentimentSummary {
            positive: 0.0,
            negative: 0.0,
            neutral: 0.0,
            average_score: 0.0,
            average_confidence: 0.0,
            trend: SentimentLabel::Neutral,
        };
    }

    let total = scores.len() as f64;
    let share = |label: SentimentLabel| {
        scores.iter().filter(|s| s.label == label).count() as f64 / total * 100.0
    };
    let average_score = scores.iter().map(|s| s.score).sum::<f64>() / total;
    let average_confidence = scores.iter().map(|s| s.confidence).sum::<f64>() / total;

    SentimentSummary {
        positive: share(SentimentLabel::Positive),
        negative: share(SentimentLabel::Negative),
        neutral: share(SentimentLabel::Neutral),
        average_score,
        average_confidence: average_confidence * 100.0,
        trend: SentimentLabel::from_score(average_score),
    }
}
