/// Types for weekly schedule data as delivered by the academic backend
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Identifier that the backend sends either as a number or as a string.
///
/// The value is normalized to its string form on the way in, so `3`, `3.0`
/// and `"3"` all compare equal. `null` and missing values become `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LooseId(String);

impl LooseId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for LooseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LooseId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for LooseId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for LooseId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        loose_string(deserializer).map(LooseId)
    }
}

/// Scalar shapes accepted wherever the backend is inconsistent about types.
#[derive(Deserialize)]
#[serde(untagged)]
enum LooseScalar {
    Text(String),
    Int(i64),
    Float(f64),
    Flag(bool),
}

/// Deserializes a string, number, bool or null into its string form.
fn loose_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = Option::<LooseScalar>::deserialize(deserializer)?;
    Ok(match raw {
        Some(LooseScalar::Text(s)) => s,
        Some(LooseScalar::Int(n)) => n.to_string(),
        // f64's Display already drops a zero fraction (3.0 -> "3")
        Some(LooseScalar::Float(n)) => n.to_string(),
        Some(LooseScalar::Flag(b)) => b.to_string(),
        None => String::new(),
    })
}

/// One scheduled class occurrence.
///
/// Every field is optional on the wire. Times are kept exactly as received
/// ("HH:MM", 24-hour, no date) and only interpreted through `parse_clock`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoursePeriod {
    #[serde(default, deserialize_with = "loose_string")]
    pub course_name: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub course_code: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub instructor_name: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub block_code: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub room_number: String,
    #[serde(rename = "startTime", default, deserialize_with = "loose_string")]
    pub start_time: String,
    #[serde(rename = "endTime", default, deserialize_with = "loose_string")]
    pub end_time: String,
}

impl CoursePeriod {
    /// Shorthand used by tests and fixtures: a period with only a course code and times.
    pub fn timed(course_code: &str, start_time: &str, end_time: &str) -> Self {
        Self {
            course_code: course_code.to_string(),
            start_time: start_time.to_string(),
            end_time: end_time.to_string(),
            ..Default::default()
        }
    }
}

/// One weekday's periods, in schedule order (not necessarily time order).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    #[serde(default, deserialize_with = "loose_string")]
    pub day_of_week: String,
    #[serde(default)]
    pub courses: Vec<CoursePeriod>,
}

/// A cohort's full week, keyed by department/batch/semester/section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    #[serde(default)]
    pub department_id: LooseId,
    #[serde(default)]
    pub batch: LooseId,
    #[serde(default)]
    pub semester: LooseId,
    #[serde(default)]
    pub section: LooseId,
    #[serde(default)]
    pub days: Vec<DaySchedule>,
}

/// The cohort fields of a signed-in student.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    #[serde(default)]
    pub department_id: LooseId,
    #[serde(default)]
    pub batch: LooseId,
    #[serde(default)]
    pub semester: LooseId,
    #[serde(default)]
    pub section: LooseId,
}

/// A distinct (start, end) pair used by one or more periods.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: String,
    pub end: String,
}

impl TimeSlot {
    /// The "HH:MM-HH:MM" form that slots are ordered by.
    pub fn key(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }
}

/// Everything the student dashboard needs for one day.
#[derive(Debug, Clone, Serialize)]
pub struct DayProjection {
    pub day: String,
    pub time_slots: Vec<TimeSlot>,
    pub today: Vec<CoursePeriod>,
    pub current: Option<CoursePeriod>,
    pub active_index: Option<usize>,
    pub upcoming: Vec<CoursePeriod>,
}

/// Per-day period count for the department dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayLoad {
    pub day: String,
    pub periods: usize,
}

/// Aggregate statistics over one weekly schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleSummary {
    pub scheduled_days: usize,
    pub total_periods: usize,
    pub distinct_courses: usize,
    pub distinct_instructors: usize,
    pub distinct_time_slots: usize,
    pub per_day: Vec<DayLoad>,
}
