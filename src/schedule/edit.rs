use chrono::NaiveDate;

use super::types::{Schedule, ScheduleError, TimeSlot};

/// Manually places an unassigned participant into an empty cell of an
/// existing schedule.
///
/// This is the override channel: availability, owner blocks and quotas are
/// deliberately not re-checked. What IS checked are the structural
/// preconditions, and a violation fails without touching the schedule:
/// the cell must exist in the grid, must not hold a different participant,
/// and the participant must not already hold another cell. Re-applying an
/// identical, already-successful reassignment just re-sets the same value.
pub fn reassign(
    schedule: &mut Schedule,
    day: NaiveDate,
    slot: TimeSlot,
    participant: &str,
) -> Result<(), ScheduleError> {
    match schedule.cell(day, slot) {
        None => return Err(ScheduleError::UnknownCell { day, slot }),
        Some(Some(occupant)) if occupant != participant => {
            return Err(ScheduleError::CellOccupied {
                day,
                slot,
                occupant: occupant.clone(),
            })
        }
        _ => {}
    }

    let held_elsewhere = schedule.cells.iter().any(|(d, row)| {
        row.iter().any(|(s, cell)| {
            cell.as_deref() == Some(participant) && !(*d == day && *s == slot)
        })
    });
    if held_elsewhere {
        return Err(ScheduleError::AlreadyScheduled {
            participant: participant.to_string(),
        });
    }

    if let Some(cell) = schedule.cell_mut(day, slot) {
        *cell = Some(participant.to_string());
    }
    schedule.unassigned.retain(|name| name != participant);
    Ok(())
}
