use serde::Serialize;

use crate::db::models::ServiceHistoryRow;
use crate::domain::{ConflictCheck, JobView, JobWindow};

/// Non-blocking notice attached to a successful write
#[derive(Debug, Serialize)]
pub struct ScheduleWarning {
    pub kind: &'static str,
    pub message: String,
    pub conflicting_job: JobWindow,
}

impl ScheduleWarning {
    /// Turn a conflict check into a warning; `None` when there is no conflict
    pub fn from_check(check: ConflictCheck) -> Option<Self> {
        let job = check.conflicting_job.filter(|_| check.has_conflict)?;
        Some(ScheduleWarning {
            kind: "scheduling_conflict",
            message: format!(
                "Technician {} already has job {} on {} from {} to {}",
                job.technician_id, job.id, job.date, job.start_time, job.end_time
            ),
            conflicting_job: job,
        })
    }
}

/// Response for single job reads and writes
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub message: String,
    pub job: JobView,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ScheduleWarning>,
}

/// Response for job listing
#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobView>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Response for the completion flow
#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    pub message: String,
    pub job: JobView,
    pub service_history: ServiceHistoryRow,
}
