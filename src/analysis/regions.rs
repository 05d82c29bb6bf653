//! Geological landslide susceptibility of Indian states.

use crate::model::RiskLevel;

/// A named landslide-prone zone and the states it covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandslideZone {
    pub name: &'static str,
    pub tier: RiskLevel,
    pub states: &'static [&'static str],
}

pub const LANDSLIDE_ZONES: &[LandslideZone] = &[
    LandslideZone {
        name: "Western Ghats",
        tier: RiskLevel::High,
        states: &["Kerala", "Tamil Nadu", "Karnataka", "Maharashtra", "Goa"],
    },
    LandslideZone {
        name: "Himalayas",
        tier: RiskLevel::High,
        states: &["Himachal Pradesh", "Uttarakhand", "Jammu & Kashmir"],
    },
    LandslideZone {
        name: "Northeast Hills",
        tier: RiskLevel::Medium,
        states: &[
            "Assam",
            "Meghalaya",
            "Mizoram",
            "Nagaland",
            "Manipur",
            "Arunachal Pradesh",
            "Tripura",
            "Sikkim",
        ],
    },
    LandslideZone {
        name: "Eastern Ghats",
        tier: RiskLevel::Medium,
        states: &["Odisha", "Andhra Pradesh", "Telangana"],
    },
    LandslideZone {
        name: "Vindhya-Satpura Ranges",
        tier: RiskLevel::Low,
        states: &["Madhya Pradesh", "Chhattisgarh", "Jharkhand"],
    },
];

/// The zone containing `state`, matched case-insensitively.
pub fn zone_for(state: &str) -> Option<&'static LandslideZone> {
    let state = state.trim();
    LANDSLIDE_ZONES
        .iter()
        .find(|zone| zone.states.iter().any(|s| s.eq_ignore_ascii_case(state)))
}

/// Susceptibility tier for `state`. Unmapped states are `Low`.
pub fn susceptibility(state: &str) -> RiskLevel {
    zone_for(state).map_or(RiskLevel::Low, |zone| zone.tier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_known_states() {
        assert_eq!(susceptibility("Kerala"), RiskLevel::High);
        assert_eq!(susceptibility("Jammu & Kashmir"), RiskLevel::High);
        assert_eq!(susceptibility("Sikkim"), RiskLevel::Medium);
        assert_eq!(susceptibility("Telangana"), RiskLevel::Medium);
        assert_eq!(susceptibility("Jharkhand"), RiskLevel::Low);
    }

    #[test]
    fn test_unmapped_state_defaults_low() {
        assert_eq!(susceptibility("Gujarat"), RiskLevel::Low);
        assert_eq!(susceptibility(""), RiskLevel::Low);
        assert!(zone_for("Rajasthan").is_none());
    }

    #[test]
    fn test_lookup_ignores_case_and_padding() {
        assert_eq!(susceptibility("  uttarakhand "), RiskLevel::High);
        assert_eq!(zone_for("GOA").map(|z| z.name), Some("Western Ghats"));
    }

    #[test]
    fn test_no_state_in_two_zones() {
        let mut seen = HashSet::new();
        for zone in LANDSLIDE_ZONES {
            for state in zone.states {
                assert!(seen.insert(*state), "{} listed twice", state);
            }
        }
    }
}
