use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::schedule::TimeSlot;

/// One roster row: a participant, an optional class label (used only at
/// display/export time) and their per-day unavailable slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    pub class: String,
    pub unavailable: HashMap<NaiveDate, HashSet<TimeSlot>>,
}

/// Loads a roster CSV from disk. See `load_roster_from_reader`.
pub fn load_roster<P: AsRef<Path>>(
    csv_path: P,
) -> Result<(Vec<RosterEntry>, Vec<String>), Box<dyn std::error::Error>> {
    let file = File::open(csv_path)?;
    load_roster_from_reader(file)
}

/// Parses roster CSV data.
///
/// Expected columns: a name column (header containing "name", or the first
/// column), an optional class column (header "class" or "group"), then one
/// column per day whose header is an ISO `YYYY-MM-DD` date and whose cells
/// hold comma-separated slot labels ("13:00-13:15, 13:15-13:30") the
/// participant cannot attend. Blank or missing cells mean fully available.
///
/// Spreadsheet-sourced data is messy, so per-cell problems never abort the
/// load: unparseable slot labels are skipped and reported in the returned
/// warnings. A later row with the same name replaces the earlier entry while
/// keeping its original roster position (re-submission).
pub fn load_roster_from_reader<R: Read>(
    reader: R,
) -> Result<(Vec<RosterEntry>, Vec<String>), Box<dyn std::error::Error>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut warnings = Vec::new();

    let name_col = headers
        .iter()
        .position(|h| h.trim().to_lowercase().contains("name"))
        .unwrap_or(0);
    let class_col = headers.iter().position(|h| {
        let h = h.trim().to_lowercase();
        h == "class" || h == "group"
    });

    // Every header that parses as an ISO date is an unavailability column.
    let date_cols: Vec<(usize, NaiveDate)> = headers
        .iter()
        .enumerate()
        .filter_map(|(idx, h)| {
            NaiveDate::parse_from_str(h.trim(), "%Y-%m-%d")
                .ok()
                .map(|d| (idx, d))
        })
        .collect();
    if date_cols.is_empty() {
        warnings.push("roster has no date columns; everyone is fully available".to_string());
    }

    let mut entries: Vec<RosterEntry> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();

    for result in csv_reader.records() {
        let record = result?;
        let name = record.get(name_col).unwrap_or("").trim().to_string();
        if name.is_empty() {
            continue;
        }
        let class = class_col
            .and_then(|col| record.get(col))
            .unwrap_or("")
            .trim()
            .to_string();

        let mut unavailable: HashMap<NaiveDate, HashSet<TimeSlot>> = HashMap::new();
        for (col, day) in &date_cols {
            let raw = record.get(*col).unwrap_or("").trim();
            if raw.is_empty() {
                continue;
            }
            let mut slots = HashSet::new();
            for label in raw.split(',') {
                let label = label.trim();
                if label.is_empty() {
                    continue;
                }
                match label.parse::<TimeSlot>() {
                    Ok(slot) => {
                        slots.insert(slot);
                    }
                    Err(_) => warnings.push(format!(
                        "{}: skipping unparseable slot {:?} on {}",
                        name, label, day
                    )),
                }
            }
            if !slots.is_empty() {
                unavailable.insert(*day, slots);
            }
        }

        let entry = RosterEntry {
            name: name.clone(),
            class,
            unavailable,
        };
        // Re-submissions replace the earlier row in place.
        match position.get(&name) {
            Some(&idx) => entries[idx] = entry,
            None => {
                position.insert(name, entries.len());
                entries.push(entry);
            }
        }
    }

    for warning in &warnings {
        warn!("roster: {}", warning);
    }

    Ok((entries, warnings))
}
