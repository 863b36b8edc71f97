use chrono::NaiveDate;
use sqlx::{Pool, Postgres, QueryBuilder};
use tracing::debug;

use crate::db::models::{JobRow, JobWindowRow};
use crate::domain::{JobStatus, Schedule, ServiceDate};

const JOB_COLUMNS: &str = "id, customer_id, technician_id, status, scheduled_date, start_time, end_time, notes, created_at, updated_at";

/// Values for a job insert; status is always `scheduled`
#[derive(Debug)]
pub struct NewJob<'a> {
    pub customer_id: i32,
    pub technician_id: Option<i32>,
    pub schedule: Option<Schedule>,
    pub notes: Option<&'a str>,
}

/// Filters for job listing, combined with AND
#[derive(Debug, Default, Clone)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub technician_id: Option<i32>,
    pub date: Option<ServiceDate>,
}

fn schedule_columns(
    schedule: Option<&Schedule>,
) -> (Option<NaiveDate>, Option<chrono::NaiveTime>, Option<chrono::NaiveTime>) {
    (
        schedule.map(|s| s.date.as_naive()),
        schedule.map(|s| s.window.start().as_naive()),
        schedule.map(|s| s.window.end().as_naive()),
    )
}

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &JobFilter) {
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(technician_id) = filter.technician_id {
        builder.push(" AND technician_id = ").push_bind(technician_id);
    }
    if let Some(date) = filter.date {
        builder.push(" AND scheduled_date = ").push_bind(date.as_naive());
    }
}

/// Repository for Job database operations
pub struct JobRepository;

impl JobRepository {
    /// Insert a new job in `scheduled` status and return the full record
    pub async fn create(pool: &Pool<Postgres>, job: &NewJob<'_>) -> Result<JobRow, sqlx::Error> {
        debug!(
            "Creating job: customer_id={}, technician_id={:?}",
            job.customer_id, job.technician_id
        );

        let (date, start, end) = schedule_columns(job.schedule.as_ref());
        let query = format!(
            r#"
            INSERT INTO jobs (customer_id, technician_id, status, scheduled_date, start_time, end_time, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {JOB_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(job.customer_id)
            .bind(job.technician_id)
            .bind(JobStatus::Scheduled.as_str())
            .bind(date)
            .bind(start)
            .bind(end)
            .bind(job.notes)
            .fetch_one(pool)
            .await?;

        debug!("Job created with id={}", row.id);
        Ok(row)
    }

    pub async fn find_by_id(pool: &Pool<Postgres>, id: i32) -> Result<Option<JobRow>, sqlx::Error> {
        let query = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// One page of jobs ordered by visit date, start time, then id
    pub async fn list(
        pool: &Pool<Postgres>,
        filter: &JobFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<JobRow>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {JOB_COLUMNS} FROM jobs WHERE TRUE"));
        push_filters(&mut builder, filter);
        builder
            .push(" ORDER BY scheduled_date NULLS LAST, start_time NULLS LAST, id LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        debug!("Listing jobs: filter={:?}, limit={}, offset={}", filter, limit, offset);
        builder.build_query_as::<JobRow>().fetch_all(pool).await
    }

    pub async fn count(pool: &Pool<Postgres>, filter: &JobFilter) -> Result<i64, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM jobs WHERE TRUE");
        push_filters(&mut builder, filter);
        builder.build_query_scalar::<i64>().fetch_one(pool).await
    }

    /// Scheduled windows of a technician's non-terminal jobs on one date
    pub async fn active_windows(
        pool: &Pool<Postgres>,
        technician_id: i32,
        date: ServiceDate,
    ) -> Result<Vec<JobWindowRow>, sqlx::Error> {
        sqlx::query_as::<_, JobWindowRow>(
            r#"
            SELECT id, technician_id, scheduled_date, start_time, end_time
            FROM jobs
            WHERE technician_id = $1
              AND scheduled_date = $2
              AND status NOT IN ('completed', 'cancelled')
              AND start_time IS NOT NULL
              AND end_time IS NOT NULL
            ORDER BY start_time, id
            "#,
        )
        .bind(technician_id)
        .bind(date.as_naive())
        .fetch_all(pool)
        .await
    }

    /// Move a job to `to` only if it is still in `from`.
    ///
    /// Returns `None` when the row is missing or its status changed in between.
    pub async fn update_status(
        pool: &Pool<Postgres>,
        id: i32,
        from: JobStatus,
        to: JobStatus,
    ) -> Result<Option<JobRow>, sqlx::Error> {
        debug!("Updating job {} status: {} -> {}", id, from, to);

        let query = format!(
            r#"
            UPDATE jobs
            SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status = $3
            RETURNING {JOB_COLUMNS}
            "#
        );
        sqlx::query_as::<_, JobRow>(&query)
            .bind(to.as_str())
            .bind(id)
            .bind(from.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Replace assignment and schedule of a non-terminal job
    ///
    /// Returns `None` when the row is missing or already terminal.
    pub async fn update_schedule(
        pool: &Pool<Postgres>,
        id: i32,
        technician_id: Option<i32>,
        schedule: Option<&Schedule>,
    ) -> Result<Option<JobRow>, sqlx::Error> {
        debug!("Updating job {} schedule: technician_id={:?}", id, technician_id);

        let (date, start, end) = schedule_columns(schedule);
        let query = format!(
            r#"
            UPDATE jobs
            SET technician_id = $1, scheduled_date = $2, start_time = $3, end_time = $4, updated_at = NOW()
            WHERE id = $5 AND status NOT IN ('completed', 'cancelled')
            RETURNING {JOB_COLUMNS}
            "#
        );
        sqlx::query_as::<_, JobRow>(&query)
            .bind(technician_id)
            .bind(date)
            .bind(start)
            .bind(end)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
