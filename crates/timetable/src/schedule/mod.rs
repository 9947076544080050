//! Weekly schedule projection: time-slot bands, today's periods, the ongoing
//! period and what is still ahead today.
//!
//! Everything in this file is a pure function of its inputs. Fetching and
//! caching live in `client` and `cache`.

pub mod cache;
pub mod client;
pub mod clock;
pub mod error;
pub mod store;
mod types;

pub use clock::{parse_clock, parse_clock_strict, Clock};
pub use error::ScheduleError;
pub use types::*;

use chrono::Weekday;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Collects every distinct (start, end) pair in the week.
///
/// Slots are ordered by their "HH:MM-HH:MM" string. Duplicates collapse to
/// one entry no matter how many days or periods use them.
pub fn distinct_time_slots(schedule: &WeeklySchedule) -> Vec<TimeSlot> {
    let mut slots: BTreeMap<String, TimeSlot> = BTreeMap::new();

    for period in schedule.days.iter().flat_map(|d| &d.courses) {
        let slot = TimeSlot {
            start: period.start_time.clone(),
            end: period.end_time.clone(),
        };
        slots.entry(slot.key()).or_insert(slot);
    }

    slots.into_values().collect()
}

/// Returns the periods scheduled on `day_name`, in schedule order.
///
/// An absent day yields an empty slice. Order is never re-sorted here because
/// the dashboard timeline indexes into this slice.
pub fn periods_for_day<'a>(schedule: &'a WeeklySchedule, day_name: &str) -> &'a [CoursePeriod] {
    schedule
        .days
        .iter()
        .find(|d| d.day_of_week == day_name)
        .map(|d| d.courses.as_slice())
        .unwrap_or(&[])
}

/// Finds the period in progress at `now`.
///
/// Both boundaries are inclusive, so a period is still current during its end
/// minute. When periods overlap the first one in array order wins.
pub fn current_period(periods: &[CoursePeriod], now: Clock) -> Option<&CoursePeriod> {
    active_index(periods, now).map(|i| &periods[i])
}

/// Position of `current_period` within `periods`.
pub fn active_index(periods: &[CoursePeriod], now: Clock) -> Option<usize> {
    let now_minutes = now.minutes();
    periods.iter().position(|p| {
        let start = parse_clock(&p.start_time).minutes();
        let end = parse_clock(&p.end_time).minutes();
        start <= now_minutes && now_minutes <= end
    })
}

/// Periods that start strictly after `now`, earliest first.
///
/// Comparison is at minute granularity. The result is sorted by the literal
/// start string, which matches time order for zero-padded 24-hour values; the
/// sort is stable so ties keep schedule order.
pub fn upcoming_periods(periods: &[CoursePeriod], now: Clock) -> Vec<&CoursePeriod> {
    let now_minutes = now.minutes();
    let mut upcoming: Vec<&CoursePeriod> = periods
        .iter()
        .filter(|p| parse_clock(&p.start_time).minutes() > now_minutes)
        .collect();
    upcoming.sort_by(|a, b| a.start_time.cmp(&b.start_time));
    upcoming
}

/// Finds the schedule published for a student's cohort.
///
/// All four of department, batch, semester and section must match; fields are
/// compared in their normalized string form. `None` means the schedule has not
/// been published yet, which callers should present as such.
pub fn match_student_schedule<'a>(
    schedules: &'a [WeeklySchedule],
    profile: &StudentProfile,
) -> Option<&'a WeeklySchedule> {
    let found = schedules.iter().find(|s| {
        s.department_id == profile.department_id
            && s.batch == profile.batch
            && s.semester == profile.semester
            && s.section == profile.section
    });

    if found.is_none() {
        debug!(
            department_id = %profile.department_id,
            batch = %profile.batch,
            semester = %profile.semester,
            section = %profile.section,
            candidates = schedules.len(),
            "No schedule matches student cohort"
        );
    }

    found
}

/// English weekday name as used in `DaySchedule::day_of_week`.
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Builds the full student-dashboard view for one day.
pub fn project_day(schedule: &WeeklySchedule, day_name: &str, now: Clock) -> DayProjection {
    let today = periods_for_day(schedule, day_name);
    let active = active_index(today, now);

    DayProjection {
        day: day_name.to_string(),
        time_slots: distinct_time_slots(schedule),
        today: today.to_vec(),
        current: active.map(|i| today[i].clone()),
        active_index: active,
        upcoming: upcoming_periods(today, now).into_iter().cloned().collect(),
    }
}

/// Computes department-dashboard statistics for a schedule.
///
/// Blank course codes and instructor names are not counted as distinct values.
pub fn summarize(schedule: &WeeklySchedule) -> ScheduleSummary {
    let periods = || schedule.days.iter().flat_map(|d| &d.courses);

    let distinct_courses: HashSet<&str> = periods()
        .map(|p| p.course_code.as_str())
        .filter(|c| !c.trim().is_empty())
        .collect();
    let distinct_instructors: HashSet<&str> = periods()
        .map(|p| p.instructor_name.as_str())
        .filter(|n| !n.trim().is_empty())
        .collect();

    let per_day: Vec<DayLoad> = schedule
        .days
        .iter()
        .map(|d| DayLoad {
            day: d.day_of_week.clone(),
            periods: d.courses.len(),
        })
        .collect();

    ScheduleSummary {
        scheduled_days: per_day.iter().filter(|d| d.periods > 0).count(),
        total_periods: per_day.iter().map(|d| d.periods).sum(),
        distinct_courses: distinct_courses.len(),
        distinct_instructors: distinct_instructors.len(),
        distinct_time_slots: distinct_time_slots(schedule).len(),
        per_day,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(name: &str, courses: Vec<CoursePeriod>) -> DaySchedule {
        DaySchedule {
            day_of_week: name.to_string(),
            courses,
        }
    }

    fn cohort(department: &str, batch: &str, semester: &str, section: &str) -> WeeklySchedule {
        WeeklySchedule {
            department_id: department.into(),
            batch: batch.into(),
            semester: semester.into(),
            section: section.into(),
            days: Vec::new(),
        }
    }

    fn sample_week() -> WeeklySchedule {
        let mut week = cohort("4", "2021", "6", "B");
        week.days = vec![
            day(
                "Monday",
                vec![
                    CoursePeriod::timed("CSE-3101", "10:00", "11:30"),
                    CoursePeriod::timed("CSE-3103", "08:00", "09:30"),
                ],
            ),
            day(
                "Tuesday",
                vec![
                    CoursePeriod::timed("CSE-3105", "08:00", "09:30"),
                    CoursePeriod::timed("CSE-3107", "13:00", "14:30"),
                ],
            ),
        ];
        week
    }

    #[test]
    fn test_distinct_time_slots_sorted_and_unique() {
        let slots = distinct_time_slots(&sample_week());
        let keys: Vec<String> = slots.iter().map(TimeSlot::key).collect();
        assert_eq!(keys, vec!["08:00-09:30", "10:00-11:30", "13:00-14:30"]);
    }

    #[test]
    fn test_distinct_time_slots_same_start_different_end() {
        let mut week = cohort("1", "1", "1", "A");
        week.days = vec![day(
            "Monday",
            vec![
                CoursePeriod::timed("A", "08:00", "10:00"),
                CoursePeriod::timed("B", "08:00", "09:00"),
            ],
        )];
        let keys: Vec<String> = distinct_time_slots(&week).iter().map(TimeSlot::key).collect();
        assert_eq!(keys, vec!["08:00-09:00", "08:00-10:00"]);
    }

    #[test]
    fn test_distinct_time_slots_empty_schedule() {
        assert!(distinct_time_slots(&WeeklySchedule::default()).is_empty());
    }

    #[test]
    fn test_periods_for_day_keeps_order() {
        let week = sample_week();
        let monday = periods_for_day(&week, "Monday");
        assert_eq!(monday.len(), 2);
        assert_eq!(monday[0].course_code, "CSE-3101");
        assert_eq!(monday[1].course_code, "CSE-3103");
    }

    #[test]
    fn test_periods_for_absent_day_is_empty() {
        let week = sample_week();
        assert!(periods_for_day(&week, "Sunday").is_empty());
        assert!(periods_for_day(&week, "monday").is_empty());
    }

    #[test]
    fn test_current_and_upcoming_mid_period() {
        let periods = vec![
            CoursePeriod::timed("A", "08:00", "09:30"),
            CoursePeriod::timed("B", "10:00", "11:30"),
        ];
        let now = Clock::new(8, 30);

        assert_eq!(current_period(&periods, now).map(|p| p.course_code.as_str()), Some("A"));
        let upcoming = upcoming_periods(&periods, now);
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].start_time, "10:00");
    }

    #[test]
    fn test_current_includes_end_minute() {
        let periods = vec![
            CoursePeriod::timed("A", "08:00", "09:30"),
            CoursePeriod::timed("B", "10:00", "11:30"),
        ];
        let current = current_period(&periods, Clock::new(9, 30));
        assert_eq!(current.map(|p| p.course_code.as_str()), Some("A"));
        assert!(current_period(&periods, Clock::new(9, 31)).is_none());
    }

    #[test]
    fn test_current_none_outside_day() {
        let periods = vec![
            CoursePeriod::timed("A", "08:00", "09:30"),
            CoursePeriod::timed("B", "10:00", "11:30"),
        ];
        assert!(current_period(&periods, Clock::new(7, 59)).is_none());
        assert!(current_period(&periods, Clock::new(11, 31)).is_none());
    }

    #[test]
    fn test_current_overlap_takes_first_in_order() {
        let periods = vec![
            CoursePeriod::timed("LATE", "09:00", "11:00"),
            CoursePeriod::timed("EARLY", "08:00", "10:00"),
        ];
        let now = Clock::new(9, 30);
        assert_eq!(current_period(&periods, now).map(|p| p.course_code.as_str()), Some("LATE"));
        assert_eq!(active_index(&periods, now), Some(0));
    }

    #[test]
    fn test_malformed_start_reads_as_midnight() {
        let periods = vec![CoursePeriod::timed("BAD", "", "09:00")];
        let now = Clock::new(8, 0);
        assert_eq!(current_period(&periods, now).map(|p| p.course_code.as_str()), Some("BAD"));
        assert!(upcoming_periods(&periods, now).is_empty());
    }

    #[test]
    fn test_oversized_hour_never_current() {
        let periods = vec![
            CoursePeriod::timed("BAD", "99999999:00", "99999999:30"),
            CoursePeriod::timed("CSE-3101", "10:00", "11:30"),
        ];
        let now = Clock::new(10, 15);
        assert_eq!(current_period(&periods, now).map(|p| p.course_code.as_str()), Some("CSE-3101"));
        assert_eq!(upcoming_periods(&periods, now).len(), 1);
    }

    #[test]
    fn test_upcoming_excludes_period_starting_now() {
        let periods = vec![
            CoursePeriod::timed("NOW", "10:00", "11:00"),
            CoursePeriod::timed("LATER", "11:00", "12:00"),
        ];
        let upcoming = upcoming_periods(&periods, Clock::new(10, 0));
        let codes: Vec<&str> = upcoming.iter().map(|p| p.course_code.as_str()).collect();
        assert_eq!(codes, vec!["LATER"]);
    }

    #[test]
    fn test_upcoming_sorted_by_start() {
        let periods = vec![
            CoursePeriod::timed("C", "14:00", "15:00"),
            CoursePeriod::timed("A", "09:00", "10:00"),
            CoursePeriod::timed("B", "11:00", "12:00"),
            CoursePeriod::timed("D", "07:00", "08:00"),
        ];
        let upcoming = upcoming_periods(&periods, Clock::new(8, 15));
        let codes: Vec<&str> = upcoming.iter().map(|p| p.course_code.as_str()).collect();
        assert_eq!(codes, vec!["A", "B", "C"]);
        assert!(upcoming
            .iter()
            .all(|p| parse_clock(&p.start_time).minutes() > Clock::new(8, 15).minutes()));
    }

    #[test]
    fn test_match_requires_all_four_fields() {
        let schedules = vec![
            cohort("4", "2021", "6", "A"),
            cohort("4", "2021", "5", "B"),
            cohort("4", "2021", "6", "B"),
        ];
        // Numeric ids from the backend still match the string cohort fields
        let profile: StudentProfile = serde_json::from_str(
            r#"{"department_id": 4, "batch": 2021, "semester": "6", "section": "B"}"#,
        )
        .unwrap();

        let matched = match_student_schedule(&schedules, &profile);
        assert!(std::ptr::eq(matched.unwrap(), &schedules[2]));
    }

    #[test]
    fn test_match_none_on_partial_or_empty() {
        let profile = StudentProfile {
            department_id: "4".into(),
            batch: "2021".into(),
            semester: "6".into(),
            section: "C".into(),
        };
        assert!(match_student_schedule(&[], &profile).is_none());
        assert!(match_student_schedule(&[cohort("4", "2021", "6", "B")], &profile).is_none());
    }

    #[test]
    fn test_match_normalizes_wire_types() {
        let schedules: Vec<WeeklySchedule> = serde_json::from_str(
            r#"[{ "department_id": 4, "batch": 2021, "semester": 6, "section": "B", "days": [] }]"#,
        )
        .unwrap();
        let profile: StudentProfile = serde_json::from_str(
            r#"{ "department_id": "4", "batch": "2021", "semester": "6", "section": "B" }"#,
        )
        .unwrap();
        assert!(match_student_schedule(&schedules, &profile).is_some());
    }

    #[test]
    fn test_weekday_name() {
        assert_eq!(weekday_name(Weekday::Mon), "Monday");
        assert_eq!(weekday_name(Weekday::Sun), "Sunday");
    }

    #[test]
    fn test_project_day() {
        let projection = project_day(&sample_week(), "Monday", Clock::new(8, 45));
        assert_eq!(projection.day, "Monday");
        assert_eq!(projection.today.len(), 2);
        assert_eq!(projection.active_index, Some(1));
        assert_eq!(
            projection.current.as_ref().map(|p| p.course_code.as_str()),
            Some("CSE-3103")
        );
        assert_eq!(projection.upcoming.len(), 1);
        assert_eq!(projection.upcoming[0].course_code, "CSE-3101");
        assert_eq!(projection.time_slots.len(), 3);
    }

    #[test]
    fn test_summarize() {
        let mut week = sample_week();
        week.days[0].courses[0].instructor_name = "R. Karim".to_string();
        week.days[1].courses[0].instructor_name = "R. Karim".to_string();
        week.days.push(day("Saturday", Vec::new()));

        let summary = summarize(&week);
        assert_eq!(summary.scheduled_days, 2);
        assert_eq!(summary.total_periods, 4);
        assert_eq!(summary.distinct_courses, 4);
        assert_eq!(summary.distinct_instructors, 1);
        assert_eq!(summary.distinct_time_slots, 3);
        assert_eq!(summary.per_day.len(), 3);
        assert_eq!(summary.per_day[2], DayLoad { day: "Saturday".to_string(), periods: 0 });
    }
}
