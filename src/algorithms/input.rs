use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::demand::{build_demands, DemandList};
use super::error::ScheduleError;
use super::grid::{generate_grid, Grid};
use super::models::{
    Course, Day, GwoParameters, Lecturer, PeriodRecord, Preference, PreferenceRecord, Room,
    TeachingRecord, TimePeriod,
};
use super::optimizer::GWO;

/// Raw roster and calendar tables supplied by the calling system.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TimetableInput {
    pub lecturers: Vec<Lecturer>,
    pub courses: Vec<Course>,
    pub teaching: Vec<TeachingRecord>,
    pub days: Vec<Day>,
    pub rooms: Vec<Room>,
    pub periods: Vec<PeriodRecord>,
    #[serde(default)]
    pub preferences: Vec<PreferenceRecord>,
}

/// Validated, read-only inputs of an optimization run.
#[derive(Debug, Clone)]
pub struct Problem {
    pub grid: Arc<Grid>,
    pub demands: Arc<DemandList>,
    pub preferences: Vec<Preference>,
}

impl TimetableInput {
    pub fn prepare(&self) -> Result<Problem, ScheduleError> {
        let periods = self
            .periods
            .iter()
            .map(TimePeriod::parse)
            .collect::<Result<Vec<_>, _>>()?;
        let grid = generate_grid(&self.days, &self.rooms, &periods);
        let demands = build_demands(&self.lecturers, &self.courses, &self.teaching)?;
        let preferences = self
            .preferences
            .iter()
            .map(Preference::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Problem {
            grid: Arc::new(grid),
            demands: Arc::new(demands),
            preferences,
        })
    }
}

impl Problem {
    pub fn optimizer(&self, parameters: GwoParameters) -> Result<GWO, ScheduleError> {
        GWO::new(
            self.grid.clone(),
            self.demands.clone(),
            self.preferences.clone(),
            parameters,
        )
    }
}

/// Reads one record table from CSV text with a header row.
pub fn parse_csv<T: DeserializeOwned>(csv: &str) -> Result<Vec<T>, ScheduleError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(csv.as_bytes());
    rdr.deserialize()
        .map(|result| result.map_err(ScheduleError::from))
        .collect()
}
