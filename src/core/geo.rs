use serde::{Deserialize, Serialize};

/// Continental region used by the filter surface and `region` automation conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    #[default]
    Global,
    NorthAmerica,
    SouthAmerica,
    Europe,
    Africa,
    Asia,
    Oceania,
}

impl Region {
    pub fn slug(self) -> &'static str {
        match self {
            Region::Global => "global",
            Region::NorthAmerica => "north-america",
            Region::SouthAmerica => "south-america",
            Region::Europe => "europe",
            Region::Africa => "africa",
            Region::Asia => "asia",
            Region::Oceania => "oceania",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Region::Global => "All Regions",
            Region::NorthAmerica => "North America",
            Region::SouthAmerica => "South America",
            Region::Europe => "Europe",
            Region::Africa => "Africa",
            Region::Asia => "Asia",
            Region::Oceania => "Oceania",
        }
    }

    /// Whether an event located in `country` falls inside this region.
    pub fn contains_country(self, country: &str) -> bool {
        match self {
            Region::Global => true,
            region => region_of(country) == Some(region),
        }
    }
}

const COUNTRY_REGIONS: &[(&str, Region)] = &[
    // North America
    ("united states", Region::NorthAmerica),
    ("usa", Region::NorthAmerica),
    ("canada", Region::NorthAmerica),
    ("mexico", Region::NorthAmerica),
    ("cuba", Region::NorthAmerica),
    ("haiti", Region::NorthAmerica),
    ("guatemala", Region::NorthAmerica),
    ("honduras", Region::NorthAmerica),
    ("nicaragua", Region::NorthAmerica),
    ("panama", Region::NorthAmerica),
    // South America
    ("brazil", Region::SouthAmerica),
    ("argentina", Region::SouthAmerica),
    ("chile", Region::SouthAmerica),
    ("colombia", Region::SouthAmerica),
    ("peru", Region::SouthAmerica),
    ("venezuela", Region::SouthAmerica),
    ("ecuador", Region::SouthAmerica),
    ("bolivia", Region::SouthAmerica),
    // Europe
    ("russia", Region::Europe),
    ("ukraine", Region::Europe),
    ("germany", Region::Europe),
    ("france", Region::Europe),
    ("united kingdom", Region::Europe),
    ("uk", Region::Europe),
    ("belgium", Region::Europe),
    ("netherlands", Region::Europe),
    ("poland", Region::Europe),
    ("italy", Region::Europe),
    ("spain", Region::Europe),
    ("sweden", Region::Europe),
    ("finland", Region::Europe),
    ("norway", Region::Europe),
    ("belarus", Region::Europe),
    ("serbia", Region::Europe),
    ("moldova", Region::Europe),
    ("greece", Region::Europe),
    // Africa
    ("egypt", Region::Africa),
    ("nigeria", Region::Africa),
    ("south africa", Region::Africa),
    ("ethiopia", Region::Africa),
    ("kenya", Region::Africa),
    ("sudan", Region::Africa),
    ("libya", Region::Africa),
    ("mali", Region::Africa),
    ("somalia", Region::Africa),
    ("congo", Region::Africa),
    // Asia (incl. Middle East)
    ("china", Region::Asia),
    ("japan", Region::Asia),
    ("india", Region::Asia),
    ("pakistan", Region::Asia),
    ("iran", Region::Asia),
    ("iraq", Region::Asia),
    ("israel", Region::Asia),
    ("syria", Region::Asia),
    ("turkey", Region::Asia),
    ("saudi arabia", Region::Asia),
    ("yemen", Region::Asia),
    ("afghanistan", Region::Asia),
    ("north korea", Region::Asia),
    ("south korea", Region::Asia),
    ("taiwan", Region::Asia),
    ("indonesia", Region::Asia),
    ("philippines", Region::Asia),
    ("vietnam", Region::Asia),
    ("thailand", Region::Asia),
    ("myanmar", Region::Asia),
    // Oceania
    ("australia", Region::Oceania),
    ("new zealand", Region::Oceania),
    ("papua new guinea", Region::Oceania),
    ("fiji", Region::Oceania),
];

/// Continent for a country name, case-insensitive. `None` for countries outside the table.
pub fn region_of(country: &str) -> Option<Region> {
    let needle = country.trim().to_lowercase();
    COUNTRY_REGIONS
        .iter()
        .find(|(name, _)| *name == needle)
        .map(|(_, region)| *region)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(region_of("Germany"), Some(Region::Europe));
        assert_eq!(region_of("  INDONESIA "), Some(Region::Asia));
        assert_eq!(region_of("Atlantis"), None);
    }

    #[test]
    fn global_contains_unknown_countries() {
        assert!(Region::Global.contains_country("Atlantis"));
        assert!(!Region::Europe.contains_country("Atlantis"));
        assert!(Region::Africa.contains_country("Egypt"));
    }

    #[test]
    fn slug_matches_serde_name() {
        let json = serde_json::to_string(&Region::NorthAmerica).unwrap();
        assert_eq!(json, format!("\"{}\"", Region::NorthAmerica.slug()));
    }
}
