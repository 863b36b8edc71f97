use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::{JobStatus, Schedule, ScheduleError, ServiceDate, TimeOfDay, TimeWindow};

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

fn schedule_error(err: ScheduleError) -> ValidationError {
    let code = match err {
        ScheduleError::PartialSchedule => "partial_schedule",
        ScheduleError::EmptyWindow { .. } => "empty_window",
        ScheduleError::InvalidDate(_) | ScheduleError::InvalidTime(_) => "invalid_schedule",
    };
    let mut error = ValidationError::new(code);
    error.message = Some(err.to_string().into());
    error
}

fn check_schedule_parts(
    date: Option<ServiceDate>,
    start: Option<TimeOfDay>,
    end: Option<TimeOfDay>,
) -> Result<(), ValidationError> {
    Schedule::from_parts(date, start, end)
        .map(|_| ())
        .map_err(schedule_error)
}

/// Request body for creating a job
#[derive(Deserialize, Serialize, Debug, Validate)]
#[validate(schema(function = "validate_create_schedule", skip_on_field_errors = false))]
pub struct CreateJobRequest {
    #[validate(range(min = 1, message = "customer_id must be a positive id"))]
    pub customer_id: i32,

    #[validate(range(min = 1, message = "technician_id must be a positive id"))]
    pub technician_id: Option<i32>,

    pub scheduled_date: Option<ServiceDate>,
    pub start_time: Option<TimeOfDay>,
    pub end_time: Option<TimeOfDay>,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

fn validate_create_schedule(req: &CreateJobRequest) -> Result<(), ValidationError> {
    check_schedule_parts(req.scheduled_date, req.start_time, req.end_time)
}

impl CreateJobRequest {
    pub fn schedule(&self) -> Result<Option<Schedule>, ScheduleError> {
        Schedule::from_parts(self.scheduled_date, self.start_time, self.end_time)
    }
}

/// Request body replacing a job's assignment and schedule
#[derive(Deserialize, Serialize, Debug, Validate)]
#[validate(schema(function = "validate_reschedule", skip_on_field_errors = false))]
pub struct ScheduleJobRequest {
    #[validate(range(min = 1, message = "technician_id must be a positive id"))]
    pub technician_id: Option<i32>,

    pub scheduled_date: Option<ServiceDate>,
    pub start_time: Option<TimeOfDay>,
    pub end_time: Option<TimeOfDay>,
}

fn validate_reschedule(req: &ScheduleJobRequest) -> Result<(), ValidationError> {
    check_schedule_parts(req.scheduled_date, req.start_time, req.end_time)
}

impl ScheduleJobRequest {
    pub fn schedule(&self) -> Result<Option<Schedule>, ScheduleError> {
        Schedule::from_parts(self.scheduled_date, self.start_time, self.end_time)
    }
}

/// Request body for a status change
#[derive(Deserialize, Serialize, Debug, Validate)]
pub struct TransitionRequest {
    pub status: JobStatus,
}

/// Request body for completing a job
#[derive(Deserialize, Serialize, Debug, Default, Validate)]
pub struct CompleteJobRequest {
    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

/// Request body for previewing a technician's conflicts
///
/// Either time may be left out, in which case nothing can conflict.
#[derive(Deserialize, Serialize, Debug, Validate)]
#[validate(schema(function = "validate_preview_window", skip_on_field_errors = false))]
pub struct ConflictCheckRequest {
    #[validate(range(min = 1, message = "technician_id must be a positive id"))]
    pub technician_id: i32,
    pub scheduled_date: ServiceDate,
    pub start_time: Option<TimeOfDay>,
    pub end_time: Option<TimeOfDay>,
    pub exclude_job_id: Option<i32>,
}

fn validate_preview_window(req: &ConflictCheckRequest) -> Result<(), ValidationError> {
    match (req.start_time, req.end_time) {
        (Some(start), Some(end)) => TimeWindow::new(start, end).map(|_| ()).map_err(schedule_error),
        _ => Ok(()),
    }
}

/// Query string for job listing
#[derive(Deserialize, Serialize, Debug, Default, Validate)]
pub struct ListJobsQuery {
    pub status: Option<JobStatus>,

    #[validate(range(min = 1, message = "technician_id must be a positive id"))]
    pub technician_id: Option<i32>,

    pub date: Option<ServiceDate>,

    #[validate(range(min = 1, message = "page starts at 1"))]
    pub page: Option<u32>,

    #[validate(range(min = 1, max = 100, message = "per_page must be between 1 and 100"))]
    pub per_page: Option<u32>,
}

impl ListJobsQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
    }

    /// `(limit, offset)` for the requested page
    pub fn limit_offset(&self) -> (i64, i64) {
        let per_page = i64::from(self.per_page());
        (per_page, (i64::from(self.page()) - 1) * per_page)
    }
}
