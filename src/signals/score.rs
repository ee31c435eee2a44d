use crate::core::RuleHit;

/// Hard ceiling on a single event's threat score.
pub const MAX_THREAT_SCORE: f64 = 150.0;
/// Recency decay window in hours.
const DECAY_HOURS: f64 = 168.0;
const DECAY_FLOOR: f64 = 0.5;

/// Linear decay from 1.0 at age 0 to 0.5 at one week, flat afterwards.
/// Future-dated events count as age 0.
pub fn recency_factor(age_hours: f64) -> f64 {
    (1.0 - age_hours.max(0.0) / DECAY_HOURS).max(DECAY_FLOOR)
}

/// Compute the final threat score (0-150) from the base points, the boosts that
/// fired, and the recency factor.
pub fn compute_threat_score(base: f64, hits: &[RuleHit], recency: f64) -> f64 {
    let boosted = hits.iter().fold(base, |score, hit| score * hit.multiplier);
    (boosted * recency).clamp(0.0, MAX_THREAT_SCORE)
}
