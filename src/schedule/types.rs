use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A bookable time window within a day, identified by its "HH:MM-HH:MM" label.
///
/// Slots are value objects: equality and ordering follow the start boundary.
/// The same slot set is reused for every day in the scheduling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeSlot {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeSlot {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    /// The "HH:MM-HH:MM" label used in roster cells and exports.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

impl FromStr for TimeSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("not a slot label: {:?}", s))?;
        let start = NaiveTime::parse_from_str(start.trim(), "%H:%M")
            .map_err(|e| format!("bad slot start {:?}: {}", s, e))?;
        let end = NaiveTime::parse_from_str(end.trim(), "%H:%M")
            .map_err(|e| format!("bad slot end {:?}: {}", s, e))?;
        Ok(Self { start, end })
    }
}

// Serialized as the label string so a slot can key a JSON map in snapshots.
impl Serialize for TimeSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(D::Error::custom)
    }
}

/// Confirmed priority placements: participant -> day -> slots.
///
/// Ordered maps so the pin phase applies them deterministically.
pub type PinnedAssignments = BTreeMap<String, BTreeMap<NaiveDate, BTreeSet<TimeSlot>>>;

/// The complete assignment result: one cell per (day, slot) pair in the
/// days x slots cross product, filled or empty, plus the participants the
/// greedy phase could not place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub cells: BTreeMap<NaiveDate, BTreeMap<TimeSlot, Option<String>>>,
    pub unassigned: Vec<String>,
}

impl Schedule {
    /// Builds the full cross-product grid with every cell empty.
    pub fn empty_grid(days: &[NaiveDate], slots: &[TimeSlot]) -> Self {
        let cells = days
            .iter()
            .map(|day| (*day, slots.iter().map(|slot| (*slot, None)).collect()))
            .collect();
        Self {
            cells,
            unassigned: Vec::new(),
        }
    }

    /// The cell for (day, slot), or None if that pair is outside the grid.
    pub fn cell(&self, day: NaiveDate, slot: TimeSlot) -> Option<&Option<String>> {
        self.cells.get(&day).and_then(|row| row.get(&slot))
    }

    pub fn cell_mut(&mut self, day: NaiveDate, slot: TimeSlot) -> Option<&mut Option<String>> {
        self.cells.get_mut(&day).and_then(|row| row.get_mut(&slot))
    }

    pub fn occupant(&self, day: NaiveDate, slot: TimeSlot) -> Option<&str> {
        self.cell(day, slot).and_then(|c| c.as_deref())
    }

    /// Whether the participant holds any cell in the schedule.
    pub fn contains_participant(&self, name: &str) -> bool {
        self.cells
            .values()
            .flat_map(|row| row.values())
            .any(|cell| cell.as_deref() == Some(name))
    }

    pub fn filled_count(&self) -> usize {
        self.cells
            .values()
            .flat_map(|row| row.values())
            .filter(|cell| cell.is_some())
            .count()
    }

    pub fn grid_len(&self) -> usize {
        self.cells.values().map(|row| row.len()).sum()
    }
}

/// Hard failures of the engine and editor. Parse-level problems are returned
/// as warning strings instead and never surface here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The configured date range contains no days.
    EmptyDayRange,
    /// Slot generation produced no slots (end time at or before start time).
    NoSlots,
    /// Manual reassignment targeted a cell already holding another participant.
    CellOccupied {
        day: NaiveDate,
        slot: TimeSlot,
        occupant: String,
    },
    /// Manual reassignment named a participant already placed elsewhere.
    AlreadyScheduled { participant: String },
    /// Manual reassignment named a (day, slot) pair outside the grid.
    UnknownCell { day: NaiveDate, slot: TimeSlot },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyDayRange => {
                write!(f, "no days in the scheduling window; check the date range")
            }
            Self::NoSlots => write!(
                f,
                "no time slots generated; check the day start/end times and granularity"
            ),
            Self::CellOccupied {
                day,
                slot,
                occupant,
            } => write!(f, "{} {} is already taken by {}", day, slot, occupant),
            Self::AlreadyScheduled { participant } => {
                write!(f, "{} already holds a slot in this schedule", participant)
            }
            Self::UnknownCell { day, slot } => {
                write!(f, "{} {} is not a cell of this schedule", day, slot)
            }
        }
    }
}

impl std::error::Error for ScheduleError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn slot_label_round_trip() {
        let slot = TimeSlot::new(t(13, 0), t(13, 15));
        assert_eq!(slot.label(), "13:00-13:15");
        assert_eq!("13:00-13:15".parse::<TimeSlot>().unwrap(), slot);
    }

    #[test]
    fn slot_label_rejects_garbage() {
        assert!("abc".parse::<TimeSlot>().is_err());
        assert!("13:00".parse::<TimeSlot>().is_err());
        assert!("25:00-25:15".parse::<TimeSlot>().is_err());
    }

    #[test]
    fn slots_order_by_start() {
        let a = TimeSlot::new(t(13, 0), t(13, 15));
        let b = TimeSlot::new(t(13, 15), t(13, 30));
        assert!(a < b);
    }

    #[test]
    fn empty_grid_covers_cross_product() {
        let days = vec![
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 2).unwrap(),
        ];
        let slots = vec![
            TimeSlot::new(t(13, 0), t(13, 15)),
            TimeSlot::new(t(13, 15), t(13, 30)),
        ];
        let schedule = Schedule::empty_grid(&days, &slots);
        assert_eq!(schedule.grid_len(), 4);
        assert_eq!(schedule.filled_count(), 0);
        assert!(schedule.cell(days[0], slots[1]).is_some());
        assert!(schedule
            .cell(NaiveDate::from_ymd_opt(2025, 7, 3).unwrap(), slots[0])
            .is_none());
    }

    #[test]
    fn slot_serializes_as_label() {
        let slot = TimeSlot::new(t(18, 0), t(18, 15));
        assert_eq!(
            serde_json::to_string(&slot).unwrap(),
            "\"18:00-18:15\"".to_string()
        );
        let back: TimeSlot = serde_json::from_str("\"18:00-18:15\"").unwrap();
        assert_eq!(back, slot);
    }
}
