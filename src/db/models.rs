use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use sqlx::FromRow;
use std::fmt;

use crate::domain::{Job, JobStatus, JobWindow, ParseJobStatusError, Schedule, ScheduleError};

/// Database representation of a job with all fields
#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: i32,
    pub customer_id: i32,
    pub technician_id: Option<i32>,
    pub status: String,
    pub scheduled_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Narrow projection used for conflict checks
#[derive(Debug, Clone, FromRow)]
pub struct JobWindowRow {
    pub id: i32,
    pub technician_id: i32,
    pub scheduled_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Record written when a job is completed
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ServiceHistoryRow {
    pub id: i32,
    pub job_id: i32,
    pub customer_id: i32,
    pub technician_id: Option<i32>,
    pub service_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

/// A stored row that does not satisfy the job invariants
#[derive(Debug)]
pub enum RowError {
    Status(ParseJobStatusError),
    Schedule(i32, ScheduleError),
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowError::Status(e) => write!(f, "corrupt job row: {}", e),
            RowError::Schedule(id, e) => write!(f, "corrupt schedule on job {}: {}", id, e),
        }
    }
}

impl std::error::Error for RowError {}

impl TryFrom<JobRow> for Job {
    type Error = RowError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status: JobStatus = row.status.parse().map_err(RowError::Status)?;
        let schedule = Schedule::from_parts(
            row.scheduled_date.map(Into::into),
            row.start_time.map(Into::into),
            row.end_time.map(Into::into),
        )
        .map_err(|e| RowError::Schedule(row.id, e))?;

        Ok(Job {
            id: row.id,
            customer_id: row.customer_id,
            technician_id: row.technician_id,
            status,
            schedule,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<JobWindowRow> for JobWindow {
    fn from(row: JobWindowRow) -> Self {
        JobWindow {
            id: row.id,
            technician_id: row.technician_id,
            date: row.scheduled_date.into(),
            start_time: row.start_time.into(),
            end_time: row.end_time.into(),
        }
    }
}
