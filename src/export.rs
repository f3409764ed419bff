use std::collections::HashMap;
use std::io::Write;

use chrono::NaiveDate;

use crate::display::format_participant;
use crate::schedule::{Schedule, TimeSlot};

/// Renders the schedule as a spreadsheet-style CSV grid: header row of slot
/// labels, one row per day, each filled cell showing "name (class)".
///
/// Written to any `io::Write` so the CLI can target a file and the web layer
/// a response body.
pub fn schedule_to_csv<W: Write>(
    writer: W,
    schedule: &Schedule,
    days: &[NaiveDate],
    slots: &[TimeSlot],
    classes: &HashMap<String, String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec!["date\\time".to_string()];
    header.extend(slots.iter().map(|slot| slot.label()));
    csv_writer.write_record(&header)?;

    for day in days {
        let mut row = vec![day.to_string()];
        for slot in slots {
            let cell = match schedule.occupant(*day, *slot) {
                Some(name) => {
                    let class = classes.get(name).map(String::as_str).unwrap_or("");
                    format_participant(name, class)
                }
                None => String::new(),
            };
            row.push(cell);
        }
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;
    Ok(())
}
