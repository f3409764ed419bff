use serde::{Deserialize, Serialize};

use crate::parser::RosterEntry;
use crate::schedule::{ConstraintModel, PinnedAssignments, Schedule, ScheduleConfig};

/// Everything a run accumulates, as one plain-data record: the scheduling
/// window, the parsed roster, the constraint model, confirmed pins and the
/// current schedule. No live handles, so the whole session can be saved and
/// restored as a single JSON blob.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub config: Option<ScheduleConfig>,
    pub roster: Vec<RosterEntry>,
    pub constraints: ConstraintModel,
    pub pins: PinnedAssignments,
    pub schedule: Option<Schedule>,
}

impl SessionState {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(blob: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::assign;
    use chrono::{NaiveDate, NaiveTime};
    use std::collections::HashMap;

    #[test]
    fn snapshot_restores_the_whole_session() {
        let config = ScheduleConfig {
            start_date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 7, 2).unwrap(),
            day_start: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
            day_end: NaiveTime::from_hms_opt(13, 30, 0).unwrap(),
            granularity_mins: 15,
            extra_slots: vec!["18:00".to_string()],
        };
        let roster = vec![RosterEntry {
            name: "Aiko".to_string(),
            class: "1-A".to_string(),
            unavailable: HashMap::new(),
        }];
        let mut constraints = ConstraintModel::from_roster(&roster);
        constraints.set_quota(config.start_date, 3);
        let days = config.days();
        let (slots, _) = config.slots();
        let names = vec!["Aiko".to_string()];
        let schedule =
            assign(&names, &PinnedAssignments::new(), &constraints, &days, &slots).unwrap();

        let state = SessionState {
            config: Some(config),
            roster,
            constraints,
            pins: PinnedAssignments::new(),
            schedule: Some(schedule),
        };

        let blob = state.to_json().unwrap();
        let restored = SessionState::from_json(&blob).unwrap();
        assert_eq!(restored.roster, state.roster);
        assert_eq!(restored.constraints, state.constraints);
        assert_eq!(restored.config, state.config);
        assert_eq!(restored.schedule, state.schedule);
    }
}
