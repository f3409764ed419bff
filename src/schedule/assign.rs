use std::collections::HashMap;

use chrono::NaiveDate;
use log::info;

use super::constraints::ConstraintModel;
use super::types::{PinnedAssignments, Schedule, ScheduleError, TimeSlot};

/// Computes a complete schedule over the days x slots grid.
///
/// Two phases: pinned assignments are placed first and unconditionally (no
/// availability, block or quota check, a pin always wins), then the remaining
/// participants are placed greedily in roster order: first chronological day
/// still under its working quota, first generated slot that is empty,
/// participant-available and not owner-blocked. No backtracking; a
/// participant who fits nowhere ends up in `Schedule::unassigned`, which is
/// an expected outcome and not an error.
///
/// Deterministic for identical inputs. The previous schedule, if any, is the
/// caller's to discard; this always builds a fresh one.
pub fn assign(
    participants: &[String],
    pins: &PinnedAssignments,
    model: &ConstraintModel,
    days: &[NaiveDate],
    slots: &[TimeSlot],
) -> Result<Schedule, ScheduleError> {
    // Assignment over an empty grid would look like success while meaning
    // nothing; refuse it up front.
    if days.is_empty() {
        return Err(ScheduleError::EmptyDayRange);
    }
    if slots.is_empty() {
        return Err(ScheduleError::NoSlots);
    }

    let mut schedule = Schedule::empty_grid(days, slots);
    let mut daily_counts: HashMap<NaiveDate, u32> = days.iter().map(|d| (*d, 0)).collect();

    // Pin phase: confirmed placements are authoritative. Pins naming a cell
    // outside the grid are skipped rather than widening it.
    for (participant, day_map) in pins {
        for (day, pinned_slots) in day_map {
            for slot in pinned_slots {
                if let Some(cell) = schedule.cell_mut(*day, *slot) {
                    *cell = Some(participant.clone());
                    if let Some(count) = daily_counts.get_mut(day) {
                        *count += 1;
                    }
                }
            }
        }
    }

    // Greedy phase over everyone without a pin, in roster order.
    let pool: Vec<&String> = participants
        .iter()
        .filter(|name| !pins.contains_key(*name))
        .collect();

    // The even-split default for quota-0 days is resolved once, from the
    // unassigned pool and the full day count, and held for the whole run.
    let derived_default = ConstraintModel::even_quota(pool.len(), days.len());
    let working_quotas: HashMap<NaiveDate, u32> = days
        .iter()
        .map(|d| (*d, model.working_quota(*d, derived_default)))
        .collect();

    for participant in pool {
        let mut placed = false;
        'day_scan: for day in days {
            if daily_counts[day] >= working_quotas[day] {
                continue;
            }
            for slot in slots {
                let free = matches!(schedule.cell(*day, *slot), Some(None));
                if free && model.is_available(participant, *day, *slot) {
                    if let Some(cell) = schedule.cell_mut(*day, *slot) {
                        *cell = Some(participant.clone());
                    }
                    if let Some(count) = daily_counts.get_mut(day) {
                        *count += 1;
                    }
                    placed = true;
                    break 'day_scan;
                }
            }
            // No permitted slot on this day; try the next one.
        }
        if !placed {
            schedule.unassigned.push(participant.clone());
        }
    }

    info!(
        "assigned {} of {} participants across {} days x {} slots ({} pinned, {} unassigned)",
        schedule.filled_count(),
        participants.len(),
        days.len(),
        slots.len(),
        pins.len(),
        schedule.unassigned.len()
    );

    Ok(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet, HashMap};

    use crate::parser::RosterEntry;
    use crate::schedule::slots::generate_slots;
    use chrono::NaiveTime;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, d).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn slot(label: &str) -> TimeSlot {
        label.parse().unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn pin(participant: &str, d: NaiveDate, labels: &[&str]) -> PinnedAssignments {
        let mut pins = PinnedAssignments::new();
        let mut per_day = BTreeMap::new();
        per_day.insert(d, labels.iter().map(|l| slot(l)).collect::<BTreeSet<_>>());
        pins.insert(participant.to_string(), per_day);
        pins
    }

    fn two_by_two() -> (Vec<NaiveDate>, Vec<TimeSlot>) {
        let (slots, _) = generate_slots(t(13, 0), t(13, 30), 15, &[]);
        (vec![day(1), day(2)], slots)
    }

    #[test]
    fn empty_day_range_fails_fast() {
        let (_, slots) = two_by_two();
        let err = assign(
            &names(&["Aiko"]),
            &PinnedAssignments::new(),
            &ConstraintModel::default(),
            &[],
            &slots,
        )
        .unwrap_err();
        assert_eq!(err, ScheduleError::EmptyDayRange);
    }

    #[test]
    fn empty_slot_set_fails_fast() {
        let err = assign(
            &names(&["Aiko"]),
            &PinnedAssignments::new(),
            &ConstraintModel::default(),
            &[day(1)],
            &[],
        )
        .unwrap_err();
        assert_eq!(err, ScheduleError::NoSlots);
    }

    #[test]
    fn grid_is_exhaustive_regardless_of_fill() {
        let (days, slots) = two_by_two();
        let schedule = assign(
            &names(&["Aiko"]),
            &PinnedAssignments::new(),
            &ConstraintModel::default(),
            &days,
            &slots,
        )
        .unwrap();
        assert_eq!(schedule.grid_len(), 4);
    }

    #[test]
    fn greedy_is_first_fit_in_roster_order() {
        let (days, slots) = two_by_two();
        let mut model = ConstraintModel::default();
        model.set_quota(day(1), 2);
        model.set_quota(day(2), 2);
        let schedule = assign(
            &names(&["Aiko", "Ben"]),
            &PinnedAssignments::new(),
            &model,
            &days,
            &slots,
        )
        .unwrap();
        assert_eq!(schedule.occupant(day(1), slots[0]), Some("Aiko"));
        assert_eq!(schedule.occupant(day(1), slots[1]), Some("Ben"));
    }

    #[test]
    fn derived_quota_splits_evenly_and_leaves_remainder_unassigned() {
        // 3 participants, 2 days, quota 0 everywhere: max(1, 3/2) = 1 per
        // day, so exactly one participant stays unassigned.
        let (days, slots) = two_by_two();
        let schedule = assign(
            &names(&["Aiko", "Ben", "Chie"]),
            &PinnedAssignments::new(),
            &ConstraintModel::default(),
            &days,
            &slots,
        )
        .unwrap();
        assert_eq!(schedule.occupant(day(1), slots[0]), Some("Aiko"));
        assert_eq!(schedule.occupant(day(2), slots[0]), Some("Ben"));
        assert_eq!(schedule.unassigned, vec!["Chie".to_string()]);
        assert_eq!(schedule.filled_count(), 2);
    }

    #[test]
    fn configured_quota_is_never_exceeded() {
        let (days, slots) = two_by_two();
        let mut model = ConstraintModel::default();
        model.set_quota(day(1), 1);
        model.set_quota(day(2), 2);
        let schedule = assign(
            &names(&["Aiko", "Ben", "Chie", "Dai"]),
            &PinnedAssignments::new(),
            &model,
            &days,
            &slots,
        )
        .unwrap();
        let filled_day1 = slots
            .iter()
            .filter(|s| schedule.occupant(day(1), **s).is_some())
            .count();
        assert_eq!(filled_day1, 1);
        assert_eq!(schedule.unassigned, vec!["Dai".to_string()]);
    }

    #[test]
    fn unavailable_day_pushes_participant_to_next_day() {
        let (days, slots) = two_by_two();
        let entries = vec![RosterEntry {
            name: "Aiko".to_string(),
            class: String::new(),
            unavailable: HashMap::from([(
                day(1),
                slots.iter().copied().collect(),
            )]),
        }];
        let mut model = ConstraintModel::from_roster(&entries);
        model.set_quota(day(1), 2);
        model.set_quota(day(2), 2);
        let schedule = assign(
            &names(&["Aiko"]),
            &PinnedAssignments::new(),
            &model,
            &days,
            &slots,
        )
        .unwrap();
        assert!(slots.iter().all(|s| schedule.occupant(day(1), *s).is_none()));
        assert_eq!(schedule.occupant(day(2), slots[0]), Some("Aiko"));
    }

    #[test]
    fn owner_block_skipped_in_greedy_phase() {
        let (days, slots) = two_by_two();
        let mut model = ConstraintModel::default();
        model.set_blocked(day(1), slots[0], true);
        let schedule = assign(
            &names(&["Aiko"]),
            &PinnedAssignments::new(),
            &model,
            &days,
            &slots,
        )
        .unwrap();
        assert_eq!(schedule.occupant(day(1), slots[0]), None);
        assert_eq!(schedule.occupant(day(1), slots[1]), Some("Aiko"));
    }

    #[test]
    fn pin_wins_over_block_unavailability_and_quota() {
        let (days, slots) = two_by_two();
        let entries = vec![RosterEntry {
            name: "Aiko".to_string(),
            class: String::new(),
            unavailable: HashMap::from([(day(1), slots.iter().copied().collect())]),
        }];
        let mut model = ConstraintModel::from_roster(&entries);
        model.set_blocked(day(1), slots[0], true);
        model.set_quota(day(1), 0);
        let pins = pin("Aiko", day(1), &["13:00-13:15"]);
        let schedule = assign(&names(&["Aiko"]), &pins, &model, &days, &slots).unwrap();
        assert_eq!(schedule.occupant(day(1), slots[0]), Some("Aiko"));
        assert!(schedule.unassigned.is_empty());
    }

    #[test]
    fn pinned_participant_is_not_scheduled_again() {
        let (days, slots) = two_by_two();
        let pins = pin("Aiko", day(2), &["13:15-13:30"]);
        let schedule = assign(
            &names(&["Aiko", "Ben"]),
            &pins,
            &ConstraintModel::default(),
            &days,
            &slots,
        )
        .unwrap();
        // Aiko appears exactly once, at the pinned cell.
        let aiko_cells = schedule
            .cells
            .values()
            .flat_map(|row| row.values())
            .filter(|c| c.as_deref() == Some("Aiko"))
            .count();
        assert_eq!(aiko_cells, 1);
        assert_eq!(schedule.occupant(day(2), slots[1]), Some("Aiko"));
    }

    #[test]
    fn pins_count_against_the_day_quota() {
        let (days, slots) = two_by_two();
        let mut model = ConstraintModel::default();
        model.set_quota(day(1), 1);
        model.set_quota(day(2), 1);
        let pins = pin("Aiko", day(1), &["13:00-13:15"]);
        let schedule = assign(
            &names(&["Aiko", "Ben"]),
            &pins,
            &model,
            &days,
            &slots,
        )
        .unwrap();
        // Day 1 is full from the pin, so Ben lands on day 2.
        assert_eq!(schedule.occupant(day(2), slots[0]), Some("Ben"));
    }

    #[test]
    fn pin_outside_grid_is_skipped() {
        let (days, slots) = two_by_two();
        let pins = pin("Aiko", day(9), &["13:00-13:15"]);
        let schedule = assign(
            &names(&["Aiko"]),
            &pins,
            &ConstraintModel::default(),
            &days,
            &slots,
        )
        .unwrap();
        assert_eq!(schedule.filled_count(), 0);
        assert_eq!(schedule.grid_len(), 4);
    }

    #[test]
    fn no_participant_is_double_booked() {
        let (days, slots) = two_by_two();
        let mut model = ConstraintModel::default();
        model.set_quota(day(1), 2);
        model.set_quota(day(2), 2);
        let roster = names(&["Aiko", "Ben", "Chie", "Dai"]);
        let schedule = assign(&roster, &PinnedAssignments::new(), &model, &days, &slots).unwrap();
        for name in &roster {
            let held = schedule
                .cells
                .values()
                .flat_map(|row| row.values())
                .filter(|c| c.as_deref() == Some(name.as_str()))
                .count();
            assert!(held <= 1, "{} holds {} cells", name, held);
        }
        assert_eq!(schedule.filled_count(), 4);
    }
}
