use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::error::ScheduleError;
use super::time::to_minutes;

pub type DemandId = u32;
pub type LecturerId = u32;
pub type CourseId = u32;

// ============================================================================
// INPUT RECORDS
// ============================================================================

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Lecturer {
    pub id: LecturerId,
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub semester: u32,
    pub credits: u32,
    #[serde(default)]
    pub nature: Option<String>,
    pub method: String,
}

/// One lecturer teaching one course to one class.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TeachingRecord {
    pub lecturer_id: LecturerId,
    pub course_id: CourseId,
    pub class: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Day {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Room {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PeriodRecord {
    pub id: u32,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceKind {
    /// Lecturer is only available inside the window.
    Time,
    RestrictedDay,
    /// Lecturer avoids the window on the given day.
    RestrictedWindow,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PreferenceRecord {
    pub lecturer_id: LecturerId,
    pub kind: PreferenceKind,
    #[serde(default)]
    pub day: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

// ============================================================================
// DOMAIN TYPES
// ============================================================================

/// A teaching period with its bounds resolved to minutes since midnight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimePeriod {
    pub id: u32,
    pub start: String,
    pub end: String,
    pub start_minute: u32,
    pub end_minute: u32,
}

impl TimePeriod {
    pub fn parse(record: &PeriodRecord) -> Result<Self, ScheduleError> {
        let start_minute = to_minutes(&record.start)?;
        let end_minute = to_minutes(&record.end)?;
        if end_minute <= start_minute {
            return Err(ScheduleError::InvalidRecord(format!(
                "period {} ends ({}) before it starts ({})",
                record.id, record.end, record.start
            )));
        }

        Ok(Self {
            id: record.id,
            start: record.start.clone(),
            end: record.end.clone(),
            start_minute,
            end_minute,
        })
    }
}

/// One immutable (day, room, period) cell of the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    /// 1-based position in the grid.
    pub id: usize,
    pub day: String,
    pub room: String,
    pub start: String,
    pub end: String,
    pub start_minute: u32,
    pub end_minute: u32,
}

impl TimeSlot {
    #[inline]
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start_minute < other.end_minute && other.start_minute < self.end_minute
    }

    pub fn same_day(&self, day: &str) -> bool {
        self.day.eq_ignore_ascii_case(day)
    }
}

/// A (lecturer, course, class) assignment awaiting placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Demand {
    pub id: DemandId,
    pub lecturer_id: LecturerId,
    pub lecturer: String,
    pub course_id: CourseId,
    pub course: String,
    pub class: String,
    /// Number of contiguous slots the demand occupies.
    pub credits: u32,
    pub semester: u32,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferenceRule {
    AvailableWindow { start: u32, end: u32 },
    RestrictedDay { day: String },
    RestrictedWindow { day: String, start: u32, end: u32 },
}

impl PreferenceRule {
    pub fn is_violated_by(&self, slot: &TimeSlot) -> bool {
        match self {
            PreferenceRule::AvailableWindow { start, end } => {
                slot.start_minute < *start || slot.start_minute >= *end
            }
            PreferenceRule::RestrictedDay { day } => slot.same_day(day),
            PreferenceRule::RestrictedWindow { day, start, end } => {
                slot.same_day(day) && slot.start_minute < *end && *start < slot.end_minute
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preference {
    pub lecturer_id: LecturerId,
    pub rule: PreferenceRule,
}

impl TryFrom<&PreferenceRecord> for Preference {
    type Error = ScheduleError;

    fn try_from(record: &PreferenceRecord) -> Result<Self, Self::Error> {
        let missing = |field: &str| {
            ScheduleError::InvalidRecord(format!(
                "{:?} preference for lecturer {} is missing `{}`",
                record.kind, record.lecturer_id, field
            ))
        };
        let minutes = |field: &str, value: &Option<String>| -> Result<u32, ScheduleError> {
            let value = value.as_deref().ok_or_else(|| missing(field))?;
            Ok(to_minutes(value)?)
        };

        let rule = match record.kind {
            PreferenceKind::Time => PreferenceRule::AvailableWindow {
                start: minutes("start", &record.start)?,
                end: minutes("end", &record.end)?,
            },
            PreferenceKind::RestrictedDay => PreferenceRule::RestrictedDay {
                day: record.day.clone().ok_or_else(|| missing("day"))?,
            },
            PreferenceKind::RestrictedWindow => PreferenceRule::RestrictedWindow {
                day: record.day.clone().ok_or_else(|| missing("day"))?,
                start: minutes("start", &record.start)?,
                end: minutes("end", &record.end)?,
            },
        };

        Ok(Preference {
            lecturer_id: record.lecturer_id,
            rule,
        })
    }
}

/// Conflict annotation of an occupied slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotStatus {
    /// Hard conflict.
    pub red: bool,
    /// Preference violation.
    pub yellow: bool,
}

impl SlotStatus {
    pub fn label(&self) -> Option<String> {
        match (self.red, self.yellow) {
            (true, true) => Some("red, yellow".to_string()),
            (true, false) => Some("red".to_string()),
            (false, true) => Some("yellow".to_string()),
            (false, false) => None,
        }
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label().unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupancy {
    pub demand: DemandId,
    pub status: SlotStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Empty,
    Occupied(Occupancy),
}

impl SlotState {
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, SlotState::Empty)
    }

    #[inline]
    pub fn demand(&self) -> Option<DemandId> {
        match self {
            SlotState::Empty => None,
            SlotState::Occupied(occupancy) => Some(occupancy.demand),
        }
    }
}

// ============================================================================
// PARAMETERS & OUTPUT
// ============================================================================

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GwoParameters {
    pub population_size: usize,
    pub max_iterations: usize,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub num_runs: Option<usize>,
}

impl Default for GwoParameters {
    fn default() -> Self {
        Self {
            population_size: 30,
            max_iterations: 30,
            seed: None,
            num_runs: None,
        }
    }
}

impl GwoParameters {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.population_size == 0 {
            return Err(ScheduleError::InvalidParameters(
                "population_size must be at least 1".to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(ScheduleError::InvalidParameters(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.num_runs == Some(0) {
            return Err(ScheduleError::InvalidParameters(
                "num_runs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct OptimizationProgress {
    pub iteration: usize,
    pub elapsed_time: Duration,
    pub best_fitness: f64,
    /// Decaying coefficient `a`, reported but not used by the discrete repair.
    pub convergence: f64,
    pub current_run: Option<usize>,
    pub total_runs: Option<usize>,
    pub is_finished: bool,
}

/// One grid cell in the emitted schedule.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct OptimizedSlot {
    pub slot_id: usize,
    pub day: String,
    pub room: String,
    pub start: String,
    pub end: String,
    pub demand_id: Option<DemandId>,
    pub course_id: Option<CourseId>,
    pub course: Option<String>,
    pub lecturer_id: Option<LecturerId>,
    pub lecturer: Option<String>,
    pub class: Option<String>,
    pub credits: Option<u32>,
    pub semester: Option<u32>,
    pub method: Option<String>,
    pub status: Option<String>,
}

impl OptimizedSlot {
    pub fn new(slot: &TimeSlot, occupant: Option<(&Demand, SlotStatus)>) -> Self {
        let demand = occupant.map(|(d, _)| d);
        Self {
            slot_id: slot.id,
            day: slot.day.clone(),
            room: slot.room.clone(),
            start: slot.start.clone(),
            end: slot.end.clone(),
            demand_id: demand.map(|d| d.id),
            course_id: demand.map(|d| d.course_id),
            course: demand.map(|d| d.course.clone()),
            lecturer_id: demand.map(|d| d.lecturer_id),
            lecturer: demand.map(|d| d.lecturer.clone()),
            class: demand.map(|d| d.class.clone()),
            credits: demand.map(|d| d.credits),
            semester: demand.map(|d| d.semester),
            method: demand.map(|d| d.method.clone()),
            status: occupant.and_then(|(_, status)| status.label()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq, Eq)]
pub struct Coverage {
    pub placed: usize,
    pub total: usize,
}

impl Coverage {
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.placed as f64 / self.total as f64
        }
    }

    pub fn is_complete(&self) -> bool {
        self.placed == self.total
    }
}

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct ConflictSummary {
    pub teacher_conflicts: usize,
    pub room_conflicts: usize,
    pub class_conflicts: usize,
    pub room_consistency_conflicts: usize,
    pub conflict_ids: Vec<DemandId>,
    pub preference_conflict_ids: Vec<DemandId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    pub schedule: Vec<OptimizedSlot>,
    pub best_fitness: f64,
    pub fitness_history: Vec<f64>,
    pub coverage: Coverage,
    pub unplaced: Vec<DemandId>,
    pub conflicts: ConflictSummary,
    pub iterations: usize,
}
