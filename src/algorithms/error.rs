use thiserror::Error;

/// A time-of-day string that matched neither `HH:MM:SS` nor `HH:MM`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognised time of day `{value}` (expected HH:MM:SS or HH:MM)")]
pub struct FormatError {
    pub value: String,
}

/// Errors surfaced to the caller before or around an optimization run.
///
/// Placement shortfalls are not errors; they are scored and reported in
/// the optimization result instead.
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("Teaching record references unknown lecturer {0}")]
    UnknownLecturer(u32),
    #[error("Teaching record references unknown course {0}")]
    UnknownCourse(u32),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Optimization worker failed: {0}")]
    Worker(String),
}
