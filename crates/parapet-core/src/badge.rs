use std::collections::HashMap;

use crate::report::Severity;

/// Observable strength of the per-tab indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BadgeLevel {
    #[default]
    None,
    Secondary,
    Strongest,
}

impl BadgeLevel {
    /// HIGH maps to the strongest marker, MEDIUM to the secondary one,
    /// LOW to no visible marker at all.
    pub fn for_severity(severity: Severity) -> Self {
        match severity {
            Severity::High => BadgeLevel::Strongest,
            Severity::Medium => BadgeLevel::Secondary,
            Severity::Low => BadgeLevel::None,
        }
    }
}

/// The host's per-tab indicator surface. The relay is the only writer;
/// state is last-write-wins with no accumulation.
pub trait BadgeSurface: Send {
    fn set(&mut self, tab_id: i64, level: BadgeLevel);
    fn clear(&mut self, tab_id: i64);
    /// Currently observable level for a tab.
    fn level(&self, tab_id: i64) -> BadgeLevel;
}

/// In-memory badge surface for hosts without a real indicator (and for
/// the replay harness).
#[derive(Debug, Default)]
pub struct InMemoryBadges {
    levels: HashMap<i64, BadgeLevel>,
}

impl InMemoryBadges {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BadgeSurface for InMemoryBadges {
    fn set(&mut self, tab_id: i64, level: BadgeLevel) {
        self.levels.insert(tab_id, level);
    }

    fn clear(&mut self, tab_id: i64) {
        self.levels.remove(&tab_id);
    }

    fn level(&self, tab_id: i64) -> BadgeLevel {
        self.levels.get(&tab_id).copied().unwrap_or_default()
    }
}
