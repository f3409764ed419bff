mod display;
mod export;
mod parser;
mod schedule;
mod session;
mod web;

use std::collections::HashMap;
use std::fs::File;

use chrono::{Duration, Local, NaiveTime};
use log::warn;

use display::{print_schedule, write_schedule_to_file};
use export::schedule_to_csv;
use parser::load_roster;
use schedule::{assign, ConstraintModel, PinnedAssignments, ScheduleConfig};
use session::SessionState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Web mode: `conference-scheduler web [port]`
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && args[1] == "web" {
        let port = args
            .get(2)
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8080);
        let password = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string()); // Default password, change this!

        println!("Starting web server on port {}...", port);
        println!("Access the API at http://localhost:{}", port);

        web::start_server(port, password).await?;
        return Ok(());
    }

    // CLI mode: either a saved session snapshot (full state) or a roster CSV
    // scheduled with the default window.
    let input = args.get(1).map(String::as_str).unwrap_or("data/roster.csv");

    let (roster, config, constraints, pins) = if input.ends_with(".json") {
        let state = SessionState::from_json(&std::fs::read_to_string(input)?)?;
        let config = state
            .config
            .ok_or("saved session has no scheduling window")?;
        (state.roster, config, state.constraints, state.pins)
    } else {
        println!("Loading roster from {}...", input);
        let (roster, warnings) = load_roster(input)?;
        println!(
            "Loaded {} roster entries ({} warnings)",
            roster.len(),
            warnings.len()
        );
        let today = Local::now().date_naive();
        let config = ScheduleConfig {
            start_date: today,
            end_date: today + Duration::days(3),
            day_start: NaiveTime::from_hms_opt(13, 0, 0).ok_or("bad default day start")?,
            day_end: NaiveTime::from_hms_opt(17, 30, 0).ok_or("bad default day end")?,
            granularity_mins: 15,
            extra_slots: Vec::new(),
        };
        let constraints = ConstraintModel::from_roster(&roster);
        (roster, config, constraints, PinnedAssignments::new())
    };

    let days = config.days();
    let (slots, slot_warnings) = config.slots();
    for warning in &slot_warnings {
        warn!("{}", warning);
    }

    let names: Vec<String> = roster.iter().map(|e| e.name.clone()).collect();
    let schedule = assign(&names, &pins, &constraints, &days, &slots)?;

    print_schedule(&schedule, &days, &slots);

    write_schedule_to_file(&schedule, &days, &slots, "schedule.txt")?;
    let classes: HashMap<String, String> = roster
        .iter()
        .map(|e| (e.name.clone(), e.class.clone()))
        .collect();
    schedule_to_csv(
        File::create("schedule_export.csv")?,
        &schedule,
        &days,
        &slots,
        &classes,
    )?;
    println!("\nSchedule written to schedule.txt and schedule_export.csv");

    Ok(())
}
