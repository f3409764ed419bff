use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::parser::RosterEntry;
use super::types::TimeSlot;

/// Everything the engine consults before placing a non-pinned participant:
/// per-participant unavailability from the roster, per-day slot blocks set by
/// the resource owner, and per-day quotas (0 or absent = derive an even
/// default at assignment time).
///
/// Owner blocks and quotas may be changed any time before a run; the engine
/// takes the model by shared reference and never mutates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintModel {
    unavailable: HashMap<String, HashMap<NaiveDate, HashSet<TimeSlot>>>,
    blocked: HashMap<NaiveDate, HashSet<TimeSlot>>,
    quotas: HashMap<NaiveDate, u32>,
}

impl ConstraintModel {
    /// Seeds participant unavailability from parsed roster entries.
    pub fn from_roster(entries: &[RosterEntry]) -> Self {
        let unavailable = entries
            .iter()
            .filter(|e| !e.unavailable.is_empty())
            .map(|e| (e.name.clone(), e.unavailable.clone()))
            .collect();
        Self {
            unavailable,
            blocked: HashMap::new(),
            quotas: HashMap::new(),
        }
    }

    /// Marks or clears an owner block on (day, slot).
    pub fn set_blocked(&mut self, day: NaiveDate, slot: TimeSlot, blocked: bool) {
        if blocked {
            self.blocked.entry(day).or_default().insert(slot);
        } else if let Some(set) = self.blocked.get_mut(&day) {
            set.remove(&slot);
        }
    }

    /// Replaces the full blocked-slot set for a day.
    pub fn set_blocked_slots(&mut self, day: NaiveDate, slots: HashSet<TimeSlot>) {
        if slots.is_empty() {
            self.blocked.remove(&day);
        } else {
            self.blocked.insert(day, slots);
        }
    }

    pub fn set_quota(&mut self, day: NaiveDate, quota: u32) {
        if quota == 0 {
            self.quotas.remove(&day);
        } else {
            self.quotas.insert(day, quota);
        }
    }

    /// The configured quota for a day; 0 means "derive automatically".
    pub fn quota(&self, day: NaiveDate) -> u32 {
        self.quotas.get(&day).copied().unwrap_or(0)
    }

    pub fn is_blocked(&self, day: NaiveDate, slot: TimeSlot) -> bool {
        self.blocked
            .get(&day)
            .map(|set| set.contains(&slot))
            .unwrap_or(false)
    }

    /// False when the slot is in the participant's unavailability for that
    /// day, or owner-blocked for that day. Either condition alone denies.
    pub fn is_available(&self, participant: &str, day: NaiveDate, slot: TimeSlot) -> bool {
        if self.is_blocked(day, slot) {
            return false;
        }
        let unavailable = self
            .unavailable
            .get(participant)
            .and_then(|per_day| per_day.get(&day))
            .map(|set| set.contains(&slot))
            .unwrap_or(false);
        !unavailable
    }

    /// The even-split default for quota-0 days: max(1, unassigned / days),
    /// integer division. Computed once after pin placement and applied
    /// uniformly, never recomputed as the pool drains.
    pub fn even_quota(unassigned_count: usize, day_count: usize) -> u32 {
        if day_count == 0 {
            return 1;
        }
        (unassigned_count / day_count).max(1) as u32
    }

    /// The quota the engine enforces for a day: the configured value when
    /// nonzero, otherwise the shared derived default.
    pub fn working_quota(&self, day: NaiveDate, derived_default: u32) -> u32 {
        match self.quota(day) {
            0 => derived_default,
            configured => configured,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, d).unwrap()
    }

    fn slot(label: &str) -> TimeSlot {
        label.parse().unwrap()
    }

    fn roster_entry(name: &str, d: NaiveDate, labels: &[&str]) -> RosterEntry {
        let mut unavailable = Map::new();
        unavailable.insert(d, labels.iter().map(|l| slot(l)).collect());
        RosterEntry {
            name: name.to_string(),
            class: String::new(),
            unavailable,
        }
    }

    #[test]
    fn participant_unavailability_denies() {
        let entries = vec![roster_entry("Aiko", day(1), &["13:00-13:15"])];
        let model = ConstraintModel::from_roster(&entries);
        assert!(!model.is_available("Aiko", day(1), slot("13:00-13:15")));
        assert!(model.is_available("Aiko", day(1), slot("13:15-13:30")));
        assert!(model.is_available("Aiko", day(2), slot("13:00-13:15")));
    }

    #[test]
    fn owner_block_denies_everyone() {
        let mut model = ConstraintModel::default();
        model.set_blocked(day(1), slot("13:00-13:15"), true);
        assert!(!model.is_available("anyone", day(1), slot("13:00-13:15")));
        assert!(model.is_available("anyone", day(2), slot("13:00-13:15")));
        model.set_blocked(day(1), slot("13:00-13:15"), false);
        assert!(model.is_available("anyone", day(1), slot("13:00-13:15")));
    }

    #[test]
    fn unknown_participant_is_fully_available() {
        let model = ConstraintModel::default();
        assert!(model.is_available("Ghost", day(1), slot("13:00-13:15")));
    }

    #[test]
    fn configured_quota_passes_through() {
        let mut model = ConstraintModel::default();
        model.set_quota(day(1), 7);
        assert_eq!(model.working_quota(day(1), 3), 7);
        assert_eq!(model.working_quota(day(2), 3), 3);
    }

    #[test]
    fn even_quota_is_floor_division_with_min_one() {
        assert_eq!(ConstraintModel::even_quota(3, 2), 1);
        assert_eq!(ConstraintModel::even_quota(10, 3), 3);
        assert_eq!(ConstraintModel::even_quota(0, 4), 1);
        assert_eq!(ConstraintModel::even_quota(1, 5), 1);
    }
}
