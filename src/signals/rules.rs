use super::lexicon::contains_any;

/// A keyword boost applied on top of an event's severity base score.
/// Every rule whose keywords appear in the event text multiplies the score;
/// boosts stack.
pub trait Rule {
    fn name(&self) -> &str;
    fn multiplier(&self) -> f64;
    fn keywords(&self) -> &[&'static str];

    /// `content` is the lower-cased `"{title} {description}"`.
    fn applies(&self, content: &str) -> bool {
        contains_any(content, self.keywords())
    }
}

/// Return all default rules in application order.
pub fn default_rules() -> Vec<Box<dyn Rule + Send + Sync>> {
    vec![
        Box::new(StrategicWeaponsRule),
        Box::new(CyberRule),
        Box::new(TerrorismRule),
        Box::new(MilitaryRule),
        Box::new(EconomicRule),
        Box::new(HealthRule),
    ]
}

// --- Individual Rules ---

struct StrategicWeaponsRule;
impl Rule for StrategicWeaponsRule {
    fn name(&self) -> &str { "strategic_weapons" }
    fn multiplier(&self) -> f64 { 1.5 }
    fn keywords(&self) -> &[&'static str] { &["nuclear", "missile"] }
}

struct CyberRule;
impl Rule for CyberRule {
    fn name(&self) -> &str { "cyber" }
    fn multiplier(&self) -> f64 { 1.3 }
    fn keywords(&self) -> &[&'static str] { &["cyber", "hack"] }
}

struct TerrorismRule;
impl Rule for TerrorismRule {
    fn name(&self) -> &str { "terrorism" }
    fn multiplier(&self) -> f64 { 1.4 }
    fn keywords(&self) -> &[&'static str] { &["terrorist", "attack"] }
}

struct MilitaryRule;
impl Rule for MilitaryRule {
    fn name(&self) -> &str { "military" }
    fn multiplier(&self) -> f64 { 1.3 }
    fn keywords(&self) -> &[&'static str] { &["military", "invasion"] }
}

struct EconomicRule;
impl Rule for EconomicRule {
    fn name(&self) -> &str { "economic" }
    fn multiplier(&self) -> f64 { 1.2 }
    fn keywords(&self) -> &[&'static str] { &["economic", "sanctions"] }
}

/// Pandemic and public-health events.
struct HealthRule;
impl Rule for HealthRule {
    fn name(&self) -> &str { "health" }
    fn multiplier(&self) -> f64 { 1.25 }
    fn keywords(&self) -> &[&'static str] { &["pandemic", "health"] }
}
