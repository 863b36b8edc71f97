use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::{JobId, TechnicianId};

/// Errors raised while building schedule values from wire or stored input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Time was not a 24-hour `HH:mm` value
    InvalidTime(String),

    /// Date was not a `YYYY-MM-DD` calendar day
    InvalidDate(String),

    /// Window start is not strictly before its end
    EmptyWindow { start: TimeOfDay, end: TimeOfDay },

    /// Only some of date, start and end were given
    PartialSchedule,
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::InvalidTime(s) => write!(f, "invalid time {:?}, expected HH:mm", s),
            ScheduleError::InvalidDate(s) => write!(f, "invalid date {:?}, expected YYYY-MM-DD", s),
            ScheduleError::EmptyWindow { start, end } => {
                write!(f, "start time {} must be before end time {}", start, end)
            }
            ScheduleError::PartialSchedule => {
                write!(f, "date, start time and end time must be given together")
            }
        }
    }
}

impl std::error::Error for ScheduleError {}

/// Wall-clock time of day with minute precision, `HH:mm` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    pub fn parse(s: &str) -> Result<Self, ScheduleError> {
        let bytes = s.as_bytes();
        let shaped = bytes.len() == 5
            && bytes[2] == b':'
            && bytes.iter().enumerate().all(|(i, b)| i == 2 || b.is_ascii_digit());
        if !shaped {
            return Err(ScheduleError::InvalidTime(s.to_string()));
        }

        NaiveTime::parse_from_str(s, "%H:%M")
            .map(TimeOfDay)
            .map_err(|_| ScheduleError::InvalidTime(s.to_string()))
    }

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(TimeOfDay)
    }

    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }
}

/// Stored `TIME` values are truncated to the minute.
impl From<NaiveTime> for TimeOfDay {
    fn from(time: NaiveTime) -> Self {
        let time = NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time);
        TimeOfDay(time)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TimeOfDay::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Calendar day of a visit, `YYYY-MM-DD` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceDate(NaiveDate);

impl ServiceDate {
    pub fn parse(s: &str) -> Result<Self, ScheduleError> {
        let bytes = s.as_bytes();
        let shaped = bytes.len() == 10
            && bytes[4] == b'-'
            && bytes[7] == b'-'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
        if !shaped {
            return Err(ScheduleError::InvalidDate(s.to_string()));
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(ServiceDate)
            .map_err(|_| ScheduleError::InvalidDate(s.to_string()))
    }

    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for ServiceDate {
    fn from(date: NaiveDate) -> Self {
        ServiceDate(date)
    }
}

impl fmt::Display for ServiceDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl Serialize for ServiceDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ServiceDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ServiceDate::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Half-open interval `[start, end)` within one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    start: TimeOfDay,
    end: TimeOfDay,
}

impl TimeWindow {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Result<Self, ScheduleError> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(ScheduleError::EmptyWindow { start, end })
        }
    }

    pub fn start(&self) -> TimeOfDay {
        self.start
    }

    pub fn end(&self) -> TimeOfDay {
        self.end
    }

    /// Touching windows (`self.end == other.start`) do not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        intervals_overlap(self.start, self.end, other.start, other.end)
    }
}

fn intervals_overlap(
    start_a: TimeOfDay,
    end_a: TimeOfDay,
    start_b: TimeOfDay,
    end_b: TimeOfDay,
) -> bool {
    start_a < end_b && start_b < end_a
}

/// Scheduling window of an existing job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobWindow {
    pub id: JobId,
    pub technician_id: TechnicianId,
    pub date: ServiceDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
}

/// Window being proposed for a new or edited job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleCandidate {
    pub technician_id: Option<TechnicianId>,
    pub date: Option<ServiceDate>,
    pub start_time: Option<TimeOfDay>,
    pub end_time: Option<TimeOfDay>,
}

/// Outcome of a conflict check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictCheck {
    pub has_conflict: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflicting_job: Option<JobWindow>,
}

impl ConflictCheck {
    pub fn clear() -> Self {
        Self {
            has_conflict: false,
            conflicting_job: None,
        }
    }

    fn with(job: &JobWindow) -> Self {
        Self {
            has_conflict: true,
            conflicting_job: Some(job.clone()),
        }
    }
}

/// Finds the first existing job whose window overlaps the candidate's.
///
/// `existing` must already be narrowed to the candidate's technician and date
/// and to non-terminal jobs. A candidate without both start and end time has
/// nothing to check. `exclude_job_id` drops the job being edited from the
/// comparison set.
pub fn check_time_conflict(
    existing: &[JobWindow],
    candidate: &ScheduleCandidate,
    exclude_job_id: Option<JobId>,
) -> ConflictCheck {
    let (Some(start), Some(end)) = (candidate.start_time, candidate.end_time) else {
        return ConflictCheck::clear();
    };

    existing
        .iter()
        .filter(|job| Some(job.id) != exclude_job_id)
        .find(|job| intervals_overlap(start, end, job.start_time, job.end_time))
        .map(ConflictCheck::with)
        .unwrap_or_else(ConflictCheck::clear)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TimeOfDay {
        TimeOfDay::parse(s).unwrap()
    }

    fn d(s: &str) -> ServiceDate {
        ServiceDate::parse(s).unwrap()
    }

    fn job(id: JobId, start: &str, end: &str) -> JobWindow {
        JobWindow {
            id,
            technician_id: 7,
            date: d("2024-06-01"),
            start_time: t(start),
            end_time: t(end),
        }
    }

    fn candidate(start: &str, end: &str) -> ScheduleCandidate {
        ScheduleCandidate {
            technician_id: Some(7),
            date: Some(d("2024-06-01")),
            start_time: Some(t(start)),
            end_time: Some(t(end)),
        }
    }

    #[test]
    fn test_back_to_back_windows_do_not_conflict() {
        let existing = vec![job(1, "09:00", "10:00")];

        let result = check_time_conflict(&existing, &candidate("10:00", "11:00"), None);
        assert_eq!(result, ConflictCheck::clear());

        let result = check_time_conflict(&existing, &candidate("08:00", "09:00"), None);
        assert!(!result.has_conflict);
    }

    #[test]
    fn test_overlapping_windows_conflict() {
        let existing = vec![job(1, "09:00", "10:00")];

        let result = check_time_conflict(&existing, &candidate("09:30", "10:30"), None);
        assert!(result.has_conflict);
        assert_eq!(result.conflicting_job.map(|j| j.id), Some(1));
    }

    #[test]
    fn test_contained_and_enclosing_windows_conflict() {
        let existing = vec![job(1, "09:00", "12:00")];
        assert!(check_time_conflict(&existing, &candidate("10:00", "11:00"), None).has_conflict);
        assert!(check_time_conflict(&existing, &candidate("08:00", "13:00"), None).has_conflict);
        assert!(check_time_conflict(&existing, &candidate("09:00", "12:00"), None).has_conflict);
    }

    #[test]
    fn test_excluded_job_cannot_conflict_with_itself() {
        let existing = vec![job(1, "09:00", "10:00")];

        let result = check_time_conflict(&existing, &candidate("09:00", "10:00"), Some(1));
        assert!(!result.has_conflict);

        let result = check_time_conflict(&existing, &candidate("09:00", "10:00"), Some(2));
        assert!(result.has_conflict);
    }

    #[test]
    fn test_missing_window_short_circuits() {
        let existing = vec![job(1, "00:00", "23:59")];

        let mut no_start = candidate("09:00", "10:00");
        no_start.start_time = None;
        assert_eq!(check_time_conflict(&existing, &no_start, None), ConflictCheck::clear());

        let mut no_end = candidate("09:00", "10:00");
        no_end.end_time = None;
        assert!(!check_time_conflict(&existing, &no_end, None).has_conflict);

        assert!(!check_time_conflict(&existing, &ScheduleCandidate::default(), None).has_conflict);
    }

    #[test]
    fn test_empty_existing_set_never_conflicts() {
        assert!(!check_time_conflict(&[], &candidate("09:00", "17:00"), None).has_conflict);
    }

    #[test]
    fn test_reports_first_overlap_found() {
        let existing = vec![
            job(1, "07:00", "08:00"),
            job(2, "09:00", "10:00"),
            job(3, "09:30", "11:00"),
        ];

        let result = check_time_conflict(&existing, &candidate("09:45", "10:15"), Some(2));
        assert_eq!(result.conflicting_job.map(|j| j.id), Some(3));
    }

    #[test]
    fn test_afternoon_double_booking_is_reported() {
        let first = JobWindow {
            id: 41,
            technician_id: 3,
            date: d("2024-06-01"),
            start_time: t("13:00"),
            end_time: t("15:00"),
        };
        let proposed = ScheduleCandidate {
            technician_id: Some(3),
            date: Some(d("2024-06-01")),
            start_time: Some(t("14:00")),
            end_time: Some(t("16:00")),
        };

        let result = check_time_conflict(&[first], &proposed, None);
        assert!(result.has_conflict);
        assert_eq!(result.conflicting_job.unwrap().id, 41);
    }

    #[test]
    fn test_time_parsing_is_strict() {
        assert_eq!(t("00:00").to_string(), "00:00");
        assert_eq!(t("23:59").to_string(), "23:59");
        for bad in ["9:00", "09:00:00", "24:00", "12:60", "ab:cd", "", "09-00"] {
            assert_eq!(
                TimeOfDay::parse(bad),
                Err(ScheduleError::InvalidTime(bad.to_string())),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_date_parsing_is_strict() {
        assert_eq!(d("2024-02-29").to_string(), "2024-02-29");
        for bad in [
            "2023-02-29",
            "2024-6-1",
            "01-06-2024",
            "2024/06/01",
            "",
            "+024-06-01",
            "-024-06-01",
            "2024-+6-01",
            " 2024-06-1",
        ] {
            assert!(ServiceDate::parse(bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_window_requires_start_before_end() {
        assert!(TimeWindow::new(t("09:00"), t("09:01")).is_ok());
        assert_eq!(
            TimeWindow::new(t("10:00"), t("10:00")),
            Err(ScheduleError::EmptyWindow {
                start: t("10:00"),
                end: t("10:00")
            })
        );
        assert!(TimeWindow::new(t("11:00"), t("10:00")).is_err());
    }

    #[test]
    fn test_window_overlap_is_half_open() {
        let morning = TimeWindow::new(t("09:00"), t("10:00")).unwrap();
        let next = TimeWindow::new(t("10:00"), t("11:00")).unwrap();
        let straddle = TimeWindow::new(t("09:30"), t("10:30")).unwrap();

        assert!(!morning.overlaps(&next));
        assert!(!next.overlaps(&morning));
        assert!(morning.overlaps(&straddle));
        assert!(straddle.overlaps(&next));
    }

    #[test]
    fn test_stored_time_is_truncated_to_minutes() {
        let stored = NaiveTime::from_hms_opt(9, 15, 42).unwrap();
        assert_eq!(TimeOfDay::from(stored), t("09:15"));
    }

    #[test]
    fn test_wire_values_round_trip_through_json() {
        let window = job(5, "08:05", "09:40");
        let json = serde_json::to_value(&window).unwrap();
        assert_eq!(json["date"], "2024-06-01");
        assert_eq!(json["start_time"], "08:05");
        assert_eq!(json["end_time"], "09:40");

        let back: JobWindow = serde_json::from_value(json).unwrap();
        assert_eq!(back, window);
    }
}
