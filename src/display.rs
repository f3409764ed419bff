use std::fs::File;
use std::io::Write;

use chrono::NaiveDate;

use crate::schedule::{Schedule, TimeSlot};

/// Formats a participant with their class label, e.g. "Aiko (1-A)".
pub fn format_participant(name: &str, class: &str) -> String {
    if class.is_empty() {
        name.to_string()
    } else {
        format!("{} ({})", name, class)
    }
}

/// Prints the full schedule grid and the unassigned section.
pub fn print_schedule(schedule: &Schedule, days: &[NaiveDate], slots: &[TimeSlot]) {
    println!("\n=== Conference Schedule ===");
    println!("Filled {} of {} cells", schedule.filled_count(), schedule.grid_len());

    if !schedule.unassigned.is_empty() {
        println!("Unassigned participants ({}):", schedule.unassigned.len());
        for name in &schedule.unassigned {
            println!("  - {}", name);
        }
    }

    for day in days {
        println!("\n{}", day);
        for slot in slots {
            match schedule.occupant(*day, *slot) {
                Some(name) => println!("  {} {}", slot, name),
                None => println!("  {} [EMPTY]", slot),
            }
        }
    }
}

/// Writes the schedule as plain text, one day per section, one slot per line.
pub fn write_schedule_to_file(
    schedule: &Schedule,
    days: &[NaiveDate],
    slots: &[TimeSlot],
    filename: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = File::create(filename)?;

    writeln!(file, "** Conference Schedule **")?;
    for day in days {
        writeln!(file, "\n{}", day)?;
        for slot in slots {
            match schedule.occupant(*day, *slot) {
                Some(name) => writeln!(file, "{} {}", slot, name)?,
                None => writeln!(file, "{} [EMPTY]", slot)?,
            }
        }
    }
    if !schedule.unassigned.is_empty() {
        writeln!(file, "\nUnassigned: {}", schedule.unassigned.join(", "))?;
    }

    Ok(())
}
