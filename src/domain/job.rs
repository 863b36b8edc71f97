use chrono::NaiveDateTime;
use serde::Serialize;

use super::schedule::{JobWindow, ScheduleCandidate, ScheduleError, ServiceDate, TimeOfDay, TimeWindow};
use super::status::JobStatus;
use super::{CustomerId, JobId, TechnicianId};

/// Date and time window of a visit; both present or the job is unscheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub date: ServiceDate,
    pub window: TimeWindow,
}

impl Schedule {
    /// Build a schedule from optional parts.
    ///
    /// All absent means unscheduled. Some-but-not-all is rejected, as is a
    /// window whose start is not before its end.
    pub fn from_parts(
        date: Option<ServiceDate>,
        start: Option<TimeOfDay>,
        end: Option<TimeOfDay>,
    ) -> Result<Option<Self>, ScheduleError> {
        match (date, start, end) {
            (None, None, None) => Ok(None),
            (Some(date), Some(start), Some(end)) => Ok(Some(Schedule {
                date,
                window: TimeWindow::new(start, end)?,
            })),
            _ => Err(ScheduleError::PartialSchedule),
        }
    }
}

/// One service visit tracked through its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub customer_id: CustomerId,
    pub technician_id: Option<TechnicianId>,
    pub status: JobStatus,
    pub schedule: Option<Schedule>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Job {
    /// Window used for conflict comparison, present only for an assigned and scheduled job
    pub fn scheduling_window(&self) -> Option<JobWindow> {
        let technician_id = self.technician_id?;
        let schedule = self.schedule?;
        Some(JobWindow {
            id: self.id,
            technician_id,
            date: schedule.date,
            start_time: schedule.window.start(),
            end_time: schedule.window.end(),
        })
    }
}

/// Conflict-check candidate for a proposed assignment and schedule
pub fn candidate_for(technician_id: Option<TechnicianId>, schedule: Option<&Schedule>) -> ScheduleCandidate {
    ScheduleCandidate {
        technician_id,
        date: schedule.map(|s| s.date),
        start_time: schedule.map(|s| s.window.start()),
        end_time: schedule.map(|s| s.window.end()),
    }
}

/// Flat wire view of a job
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub id: JobId,
    pub customer_id: CustomerId,
    pub technician_id: Option<TechnicianId>,
    pub status: JobStatus,
    pub scheduled_date: Option<ServiceDate>,
    pub start_time: Option<TimeOfDay>,
    pub end_time: Option<TimeOfDay>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<&Job> for JobView {
    fn from(job: &Job) -> Self {
        JobView {
            id: job.id,
            customer_id: job.customer_id,
            technician_id: job.technician_id,
            status: job.status,
            scheduled_date: job.schedule.map(|s| s.date),
            start_time: job.schedule.map(|s| s.window.start()),
            end_time: job.schedule.map(|s| s.window.end()),
            notes: job.notes.clone(),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}
