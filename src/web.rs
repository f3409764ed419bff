use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Mutex;

use actix_session::storage::CookieSessionStore;
use actix_session::{Session, SessionMiddleware};
use actix_web::cookie::Key;
use actix_web::{middleware, web, App, HttpResponse, HttpServer, Result};
use chrono::{NaiveDate, NaiveTime};
use log::info;
use serde::{Deserialize, Serialize};

use crate::display::format_participant;
use crate::export::schedule_to_csv;
use crate::parser::{load_roster_from_reader, RosterEntry};
use crate::schedule::{
    assign, reassign, ConstraintModel, PinnedAssignments, Schedule, ScheduleConfig,
    ScheduleError, TimeSlot,
};
use crate::session::SessionState;

// In-memory storage for one scheduling session (in production, use a database)
pub struct AppState {
    pub roster: Mutex<Vec<RosterEntry>>,
    pub config: Mutex<Option<ScheduleConfig>>,
    pub constraints: Mutex<ConstraintModel>,
    pub pins: Mutex<PinnedAssignments>,
    pub schedule: Mutex<Option<Schedule>>,
    pub admin_password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    password: String,
}

#[derive(Deserialize)]
pub struct ConfigRequest {
    start_date: NaiveDate,
    end_date: NaiveDate,
    day_start: String,
    day_end: String,
    #[serde(default = "default_granularity")]
    granularity_mins: i64,
    #[serde(default)]
    extra_slots: Vec<String>,
}

fn default_granularity() -> i64 {
    15
}

#[derive(Deserialize)]
pub struct OwnerDayRequest {
    day: NaiveDate,
    #[serde(default)]
    quota: u32,
    #[serde(default)]
    blocked_slots: Vec<String>,
}

#[derive(Deserialize)]
pub struct PinRequest {
    participant: String,
    slots: BTreeMap<NaiveDate, Vec<String>>,
}

#[derive(Deserialize)]
pub struct ReassignRequest {
    day: NaiveDate,
    slot: String,
    participant: String,
}

#[derive(Serialize)]
pub struct CellView {
    time: String,
    participant: Option<String>,
    is_empty: bool,
}

#[derive(Serialize)]
pub struct DayView {
    date: NaiveDate,
    slots: Vec<CellView>,
}

#[derive(Serialize)]
pub struct ScheduleResponse {
    days: Vec<DayView>,
    unassigned: Vec<String>,
}

#[derive(Serialize)]
pub struct MatrixCellView {
    time: String,
    available: bool,
}

#[derive(Serialize)]
pub struct MatrixDayView {
    date: NaiveDate,
    slots: Vec<MatrixCellView>,
}

#[derive(Serialize)]
pub struct MatrixResponse {
    participant: String,
    days: Vec<MatrixDayView>,
}

fn is_admin(session: &Session) -> bool {
    session.get::<bool>("admin").ok().flatten().unwrap_or(false)
}

fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().json(serde_json::json!({
        "success": false,
        "error": "Unauthorized"
    }))
}

// Admin login endpoint; a successful login marks the cookie session.
async fn admin_login(
    session: Session,
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if req.password == state.admin_password {
        session
            .insert("admin", true)
            .map_err(actix_web::error::ErrorInternalServerError)?;
        Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
    } else {
        Ok(HttpResponse::Unauthorized()
            .json(serde_json::json!({"success": false, "error": "Invalid password"})))
    }
}

// Roster CSV upload. Replaces the roster and reseeds the constraint model,
// so owner quotas and blocks must be re-entered afterwards.
async fn upload_roster(
    session: Session,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !is_admin(&session) {
        return Ok(unauthorized());
    }

    match load_roster_from_reader(body.as_ref()) {
        Ok((entries, warnings)) => {
            let participants = entries.len();
            info!("roster upload: {} participants", participants);
            *state.constraints.lock().unwrap() = ConstraintModel::from_roster(&entries);
            *state.roster.lock().unwrap() = entries;
            *state.schedule.lock().unwrap() = None;
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "participants": participants,
                "warnings": warnings,
            })))
        }
        Err(e) => Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": format!("Failed to parse roster CSV: {}", e)
        }))),
    }
}

// Scheduling window configuration.
async fn set_config(
    session: Session,
    req: web::Json<ConfigRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !is_admin(&session) {
        return Ok(unauthorized());
    }

    let day_start = match NaiveTime::parse_from_str(req.day_start.trim(), "%H:%M") {
        Ok(t) => t,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "success": false,
                "error": format!("Invalid day_start {:?}, expected HH:MM", req.day_start)
            })))
        }
    };
    let day_end = match NaiveTime::parse_from_str(req.day_end.trim(), "%H:%M") {
        Ok(t) => t,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "success": false,
                "error": format!("Invalid day_end {:?}, expected HH:MM", req.day_end)
            })))
        }
    };

    let config = ScheduleConfig {
        start_date: req.start_date,
        end_date: req.end_date,
        day_start,
        day_end,
        granularity_mins: req.granularity_mins,
        extra_slots: req.extra_slots.clone(),
    };
    let days = config.days().len();
    let (slots, warnings) = config.slots();
    let slot_labels: Vec<String> = slots.iter().map(|s| s.label()).collect();
    *state.config.lock().unwrap() = Some(config);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "days": days,
        "slots": slot_labels,
        "warnings": warnings,
    })))
}

// Per-day owner settings: quota (0 = auto) and the blocked slot labels.
async fn set_owner_day(
    session: Session,
    req: web::Json<OwnerDayRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !is_admin(&session) {
        return Ok(unauthorized());
    }

    let mut warnings = Vec::new();
    let mut blocked = HashSet::new();
    for label in &req.blocked_slots {
        match label.parse::<TimeSlot>() {
            Ok(slot) => {
                blocked.insert(slot);
            }
            Err(_) => warnings.push(format!("skipping unparseable slot {:?}", label)),
        }
    }

    let mut constraints = state.constraints.lock().unwrap();
    constraints.set_quota(req.day, req.quota);
    let blocked_count = blocked.len();
    constraints.set_blocked_slots(req.day, blocked);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "day": req.day,
        "quota": req.quota,
        "blocked": blocked_count,
        "warnings": warnings,
    })))
}

// Confirms one participant's priority placements, replacing any previous
// confirmation for them. An empty slot map clears their pins.
async fn confirm_pins(
    session: Session,
    req: web::Json<PinRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !is_admin(&session) {
        return Ok(unauthorized());
    }

    let mut warnings = Vec::new();
    let mut per_day: BTreeMap<NaiveDate, BTreeSet<TimeSlot>> = BTreeMap::new();
    for (day, labels) in &req.slots {
        let mut slots = BTreeSet::new();
        for label in labels {
            match label.parse::<TimeSlot>() {
                Ok(slot) => {
                    slots.insert(slot);
                }
                Err(_) => warnings.push(format!("skipping unparseable slot {:?}", label)),
            }
        }
        if !slots.is_empty() {
            per_day.insert(*day, slots);
        }
    }

    let mut pins = state.pins.lock().unwrap();
    let pinned_cells: usize = per_day.values().map(|s| s.len()).sum();
    if per_day.is_empty() {
        pins.remove(&req.participant);
    } else {
        pins.insert(req.participant.clone(), per_day);
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "participant": req.participant,
        "pinned_cells": pinned_cells,
        "warnings": warnings,
    })))
}

// Runs the assignment engine, replacing the previous schedule wholesale.
async fn run_assign(session: Session, state: web::Data<AppState>) -> Result<HttpResponse> {
    if !is_admin(&session) {
        return Ok(unauthorized());
    }

    let config = match state.config.lock().unwrap().clone() {
        Some(c) => c,
        None => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "success": false,
                "error": "No scheduling window configured"
            })))
        }
    };
    let names: Vec<String> = state
        .roster
        .lock()
        .unwrap()
        .iter()
        .map(|e| e.name.clone())
        .collect();
    if names.is_empty() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": "No roster uploaded"
        })));
    }

    let days = config.days();
    let (slots, warnings) = config.slots();
    let pins = state.pins.lock().unwrap().clone();
    let constraints = state.constraints.lock().unwrap().clone();

    match assign(&names, &pins, &constraints, &days, &slots) {
        Ok(schedule) => {
            let filled = schedule.filled_count();
            let unassigned = schedule.unassigned.clone();
            *state.schedule.lock().unwrap() = Some(schedule);
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "filled": filled,
                "unassigned": unassigned,
                "warnings": warnings,
            })))
        }
        Err(e) => Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": e.to_string()
        }))),
    }
}

// Current schedule grid.
async fn get_schedule(state: web::Data<AppState>) -> Result<HttpResponse> {
    let schedule = state.schedule.lock().unwrap();
    let schedule = match schedule.as_ref() {
        Some(s) => s,
        None => {
            return Ok(HttpResponse::NotFound()
                .json(serde_json::json!({"error": "Schedule not available"})))
        }
    };
    let classes = class_map(&state.roster.lock().unwrap());

    let days = schedule
        .cells
        .iter()
        .map(|(date, row)| DayView {
            date: *date,
            slots: row
                .iter()
                .map(|(slot, cell)| CellView {
                    time: slot.label(),
                    participant: cell.as_ref().map(|name| {
                        let class = classes.get(name).map(String::as_str).unwrap_or("");
                        format_participant(name, class)
                    }),
                    is_empty: cell.is_none(),
                })
                .collect(),
        })
        .collect();

    Ok(HttpResponse::Ok().json(ScheduleResponse {
        days,
        unassigned: schedule.unassigned.clone(),
    }))
}

// One manual edit on the computed schedule.
async fn reassign_cell(
    session: Session,
    req: web::Json<ReassignRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !is_admin(&session) {
        return Ok(unauthorized());
    }

    let slot = match req.slot.parse::<TimeSlot>() {
        Ok(slot) => slot,
        Err(e) => {
            return Ok(HttpResponse::BadRequest()
                .json(serde_json::json!({"success": false, "error": e})))
        }
    };

    let mut schedule = state.schedule.lock().unwrap();
    let schedule = match schedule.as_mut() {
        Some(s) => s,
        None => {
            return Ok(HttpResponse::NotFound()
                .json(serde_json::json!({"error": "Schedule not available"})))
        }
    };

    match reassign(schedule, req.day, slot, &req.participant) {
        Ok(()) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "day": req.day,
            "slot": slot.label(),
            "participant": req.participant,
        }))),
        Err(e @ ScheduleError::CellOccupied { .. })
        | Err(e @ ScheduleError::AlreadyScheduled { .. }) => Ok(HttpResponse::Conflict()
            .json(serde_json::json!({"success": false, "error": e.to_string()}))),
        Err(e) => Ok(HttpResponse::BadRequest()
            .json(serde_json::json!({"success": false, "error": e.to_string()}))),
    }
}

// Availability matrix for one participant across the configured window.
async fn get_matrix(
    participant: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let participant = participant.into_inner();
    let config = match state.config.lock().unwrap().clone() {
        Some(c) => c,
        None => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "error": "No scheduling window configured"
            })))
        }
    };
    let known = state
        .roster
        .lock()
        .unwrap()
        .iter()
        .any(|e| e.name == participant);
    if !known {
        return Ok(HttpResponse::NotFound()
            .json(serde_json::json!({"error": format!("Unknown participant {:?}", participant)})));
    }

    let (slots, _) = config.slots();
    let constraints = state.constraints.lock().unwrap();
    let days = config
        .days()
        .into_iter()
        .map(|date| MatrixDayView {
            date,
            slots: slots
                .iter()
                .map(|slot| MatrixCellView {
                    time: slot.label(),
                    available: constraints.is_available(&participant, date, *slot),
                })
                .collect(),
        })
        .collect();

    Ok(HttpResponse::Ok().json(MatrixResponse { participant, days }))
}

// Schedule grid as a CSV attachment.
async fn export_csv(state: web::Data<AppState>) -> Result<HttpResponse> {
    let config = match state.config.lock().unwrap().clone() {
        Some(c) => c,
        None => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "error": "No scheduling window configured"
            })))
        }
    };
    let schedule = state.schedule.lock().unwrap();
    let schedule = match schedule.as_ref() {
        Some(s) => s,
        None => {
            return Ok(HttpResponse::NotFound()
                .json(serde_json::json!({"error": "Schedule not available"})))
        }
    };
    let classes = class_map(&state.roster.lock().unwrap());

    let days = config.days();
    let (slots, _) = config.slots();
    let mut body = Vec::new();
    schedule_to_csv(&mut body, schedule, &days, &slots, &classes)
        .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header((
            "Content-Disposition",
            "attachment; filename=\"schedule_export.csv\"",
        ))
        .body(body))
}

// Full session snapshot as one JSON blob.
async fn get_session_snapshot(
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !is_admin(&session) {
        return Ok(unauthorized());
    }

    let snapshot = SessionState {
        config: state.config.lock().unwrap().clone(),
        roster: state.roster.lock().unwrap().clone(),
        constraints: state.constraints.lock().unwrap().clone(),
        pins: state.pins.lock().unwrap().clone(),
        schedule: state.schedule.lock().unwrap().clone(),
    };
    Ok(HttpResponse::Ok().json(snapshot))
}

// Restores a previously downloaded snapshot, replacing all current state.
async fn restore_session_snapshot(
    session: Session,
    snapshot: web::Json<SessionState>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !is_admin(&session) {
        return Ok(unauthorized());
    }

    let snapshot = snapshot.into_inner();
    let participants = snapshot.roster.len();
    *state.config.lock().unwrap() = snapshot.config;
    *state.roster.lock().unwrap() = snapshot.roster;
    *state.constraints.lock().unwrap() = snapshot.constraints;
    *state.pins.lock().unwrap() = snapshot.pins;
    *state.schedule.lock().unwrap() = snapshot.schedule;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "participants": participants,
    })))
}

async fn index() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "service": "conference-scheduler",
        "endpoints": [
            "POST /api/login",
            "POST /api/upload",
            "POST /api/config",
            "POST /api/owner",
            "POST /api/pins",
            "POST /api/assign",
            "GET /api/schedule",
            "POST /api/reassign",
            "GET /api/matrix/{participant}",
            "GET /api/export",
            "GET /api/session",
            "POST /api/session",
        ]
    })))
}

fn class_map(roster: &[RosterEntry]) -> HashMap<String, String> {
    roster
        .iter()
        .map(|e| (e.name.clone(), e.class.clone()))
        .collect()
}

pub async fn start_server(port: u16, admin_password: String) -> std::io::Result<()> {
    let app_state = web::Data::new(AppState {
        roster: Mutex::new(Vec::new()),
        config: Mutex::new(None),
        constraints: Mutex::new(ConstraintModel::default()),
        pins: Mutex::new(PinnedAssignments::new()),
        schedule: Mutex::new(None),
        admin_password,
    });
    let session_key = Key::generate();

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .wrap(SessionMiddleware::new(
                CookieSessionStore::default(),
                session_key.clone(),
            ))
            .route("/", web::get().to(index))
            .route("/api/login", web::post().to(admin_login))
            .route("/api/upload", web::post().to(upload_roster))
            .route("/api/config", web::post().to(set_config))
            .route("/api/owner", web::post().to(set_owner_day))
            .route("/api/pins", web::post().to(confirm_pins))
            .route("/api/assign", web::post().to(run_assign))
            .route("/api/schedule", web::get().to(get_schedule))
            .route("/api/reassign", web::post().to(reassign_cell))
            .route("/api/matrix/{participant}", web::get().to(get_matrix))
            .route("/api/export", web::get().to(export_csv))
            .route("/api/session", web::get().to(get_session_snapshot))
            .route("/api/session", web::post().to(restore_session_snapshot))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
