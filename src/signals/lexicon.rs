//! Fixed lower-case keyword tables and the substring helpers every scorer shares.
//!
//! All matching is substring-based: `"cyberattack"` contains both `cyber` and `attack`.

pub const NEGATIVE: &[&str] = &[
    "attack",
    "conflict",
    "war",
    "crisis",
    "threat",
    "violence",
    "terrorism",
    "instability",
    "breach",
    "hack",
    "cyber",
    "sanctions",
    "embargo",
    "riot",
    "protest",
    "unrest",
    "collapse",
    "failure",
    "invasion",
    "missile",
    "bomb",
];

pub const POSITIVE: &[&str] = &[
    "peace",
    "agreement",
    "cooperation",
    "alliance",
    "treaty",
    "diplomatic",
    "resolution",
    "success",
    "growth",
    "stability",
    "progress",
    "development",
    "aid",
    "support",
    "collaboration",
    "partnership",
    "victory",
    "breakthrough",
];

// Prediction keyword families.
pub const CONFLICT: &[&str] = &["conflict", "military", "war", "invasion", "missile", "attack"];
pub const CYBER: &[&str] = &["cyber", "hack", "breach", "malware", "ransomware"];
pub const ECONOMIC: &[&str] = &["economic", "sanction", "trade", "inflation", "crisis"];

/// True when `text` contains any of `keywords`.
pub fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// Number of distinct `keywords` found in `text`.
pub fn count_matches(text: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|k| text.contains(*k)).count()
}

/// A keyword check split by field: some keywords only count in the title,
/// others only in the description.
#[derive(Debug, Clone, Copy)]
pub struct FieldKeywords {
    pub name: &'static str,
    pub title: &'static [&'static str],
    pub description: &'static [&'static str],
}

impl FieldKeywords {
    pub fn matches(&self, title: &str, description: &str) -> bool {
        contains_any(&title.to_lowercase(), self.title)
            || contains_any(&description.to_lowercase(), self.description)
    }
}

/// Category subsets averaged by the threat assessment.
pub const CYBER_CATEGORY: FieldKeywords = FieldKeywords {
    name: "cyber",
    title: &["cyber"],
    description: &["hack", "breach"],
};

pub const GEOPOLITICAL_CATEGORY: FieldKeywords = FieldKeywords {
    name: "geopolitical",
    title: &["militar"],
    description: &["conflict", "tension"],
};

pub const ECONOMIC_CATEGORY: FieldKeywords = FieldKeywords {
    name: "economic",
    title: &["economic"],
    description: &["sanction", "trade"],
};

/// Labels counted per country to name its primary threats, in tie-break order.
pub const PRIMARY_THREATS: &[(&str, &[&str])] = &[
    ("Cyber", &["cyber"]),
    ("Military", &["militar", "conflict"]),
    ("Economic", &["economic"]),
    ("Terrorism", &["terror"]),
];
