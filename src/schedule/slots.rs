use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::types::TimeSlot;

/// One run's scheduling window: the date range, the daily active hours, the
/// slot granularity and any ad-hoc extra slots. This is the single explicit
/// configuration record everything else is derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub day_start: NaiveTime,
    pub day_end: NaiveTime,
    pub granularity_mins: i64,
    pub extra_slots: Vec<String>,
}

impl ScheduleConfig {
    /// Every day in [start_date, end_date] inclusive, empty if the range is
    /// inverted. Fixed once chosen; assignment and editing never change it.
    pub fn days(&self) -> Vec<NaiveDate> {
        self.start_date
            .iter_days()
            .take_while(|d| *d <= self.end_date)
            .collect()
    }

    /// The slot sequence shared by every day, plus warnings for extra
    /// entries that could not be parsed.
    pub fn slots(&self) -> (Vec<TimeSlot>, Vec<String>) {
        generate_slots(
            self.day_start,
            self.day_end,
            self.granularity_mins,
            &self.extra_slots,
        )
    }
}

/// Walks from `day_start` to `day_end` in `granularity_mins` steps, emitting a
/// slot only when its full window fits at or before the end time, then appends
/// one slot of the same granularity for each parseable "HH:MM" extra entry.
///
/// Malformed extras never abort generation; they come back as warnings.
pub fn generate_slots(
    day_start: NaiveTime,
    day_end: NaiveTime,
    granularity_mins: i64,
    extras: &[String],
) -> (Vec<TimeSlot>, Vec<String>) {
    let mut slots = Vec::new();
    let mut warnings = Vec::new();

    if granularity_mins <= 0 {
        warnings.push(format!(
            "slot granularity must be positive, got {} minutes",
            granularity_mins
        ));
        return (slots, warnings);
    }
    let step = Duration::minutes(granularity_mins);

    let mut cursor = day_start;
    loop {
        // overflowing_add_signed reports midnight wrap-around, which also
        // ends the walk (slots never span midnight).
        let (end, wrapped) = cursor.overflowing_add_signed(step);
        if wrapped != 0 || end > day_end {
            break;
        }
        slots.push(TimeSlot::new(cursor, end));
        cursor = end;
    }

    for raw in extras {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        match NaiveTime::parse_from_str(trimmed, "%H:%M") {
            Ok(start) => {
                let (end, wrapped) = start.overflowing_add_signed(step);
                if wrapped == 0 {
                    slots.push(TimeSlot::new(start, end));
                } else {
                    warnings.push(format!("extra slot {:?} would cross midnight", trimmed));
                }
            }
            Err(_) => warnings.push(format!("skipping unparseable extra slot {:?}", trimmed)),
        }
    }

    (slots, warnings)
}
