//! Segment criticality, graded by how many active hosts a segment exposes.
//!
//! [`CRITICALITY_TIERS`] is the single source of the thresholds. The
//! dashboard receives the same table as JSON so its heat-map cannot drift
//! from the labels in the textual reports.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    None,
    Low,
    Medium,
    High,
    Critical,
}

/// Lower bound (inclusive) of active hosts for a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tier {
    pub level: Criticality,
    pub min_hosts: usize,
}

/// `>20` critical, `11-20` high, `6-10` medium, `1-5` low, `0` none.
///
/// Ordered from the highest tier down; the first tier whose bound is met wins.
pub const CRITICALITY_TIERS: [Tier; 4] = [
    Tier { level: Criticality::Critical, min_hosts: 21 },
    Tier { level: Criticality::High, min_hosts: 11 },
    Tier { level: Criticality::Medium, min_hosts: 6 },
    Tier { level: Criticality::Low, min_hosts: 1 },
];

impl Criticality {
    pub fn for_host_count(hosts: usize) -> Self {
        CRITICALITY_TIERS
            .iter()
            .find(|tier| hosts >= tier.min_hosts)
            .map_or(Criticality::None, |tier| tier.level)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Criticality::None => "NONE",
            Criticality::Low => "LOW",
            Criticality::Medium => "MEDIUM",
            Criticality::High => "HIGH",
            Criticality::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Criticality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
