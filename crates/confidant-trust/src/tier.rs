//! Trust tiers (spec §4.1): a continuous 0.0-1.0 trust score collapses to
//! one of five discrete disclosure tiers. Ordered top-to-bottom by how
//! much of a memory each tier reveals, the same plain ordered-enum style
//! the teacher uses for `MemoryTier` in `crates/memory/src/schema.rs`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Existence,
    Metadata,
    Summary,
    Partial,
    Full,
}

impl Tier {
    /// Lower bound (inclusive) of the trust range mapping to this tier.
    pub fn lower_bound(self) -> f32 {
        match self {
            Tier::Full => 1.0,
            Tier::Partial => 0.75,
            Tier::Summary => 0.5,
            Tier::Metadata => 0.25,
            Tier::Existence => 0.0,
        }
    }

    /// Map a continuous trust score onto its tier. Bounds are inclusive on
    /// the low end of each bracket, so a score landing exactly on a
    /// boundary gets the higher tier (spec §4.1).
    pub fn from_trust(trust: f32) -> Tier {
        if trust >= Tier::Full.lower_bound() {
            Tier::Full
        } else if trust >= Tier::Partial.lower_bound() {
            Tier::Partial
        } else if trust >= Tier::Summary.lower_bound() {
            Tier::Summary
        } else if trust >= Tier::Metadata.lower_bound() {
            Tier::Metadata
        } else {
            Tier::Existence
        }
    }
}

/// A memory is visible to a query/prompt only once the accessor's trust
/// meets or exceeds the memory's own minimum trust requirement.
pub fn is_trust_sufficient(memory_trust: f32, accessor_trust: f32) -> bool {
    accessor_trust >= memory_trust
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_are_inclusive_on_the_low_end() {
        assert_eq!(Tier::from_trust(1.0), Tier::Full);
        assert_eq!(Tier::from_trust(0.99), Tier::Partial);
        assert_eq!(Tier::from_trust(0.75), Tier::Partial);
        assert_eq!(Tier::from_trust(0.5), Tier::Summary);
        assert_eq!(Tier::from_trust(0.25), Tier::Metadata);
        assert_eq!(Tier::from_trust(0.0), Tier::Existence);
    }

    #[test]
    fn ordering_reflects_disclosure_amount() {
        assert!(Tier::Existence < Tier::Metadata);
        assert!(Tier::Metadata < Tier::Summary);
        assert!(Tier::Summary < Tier::Partial);
        assert!(Tier::Partial < Tier::Full);
    }

    #[test]
    fn sufficiency_requires_accessor_at_or_above_memory_trust() {
        assert!(is_trust_sufficient(0.5, 0.5));
        assert!(is_trust_sufficient(0.5, 0.75));
        assert!(!is_trust_sufficient(0.5, 0.49));
    }
}
