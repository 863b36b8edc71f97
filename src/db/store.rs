use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::db::audit_repository::{AuditEntry, AuditRepository};
use crate::db::job_repository::{JobFilter, JobRepository, NewJob};
use crate::db::models::{JobRow, JobWindowRow, ServiceHistoryRow};
use crate::db::service_history_repository::ServiceHistoryRepository;
use crate::domain::{Job, JobStatus, Schedule, ServiceDate};

/// Persistence used by the job service.
///
/// Implementations must be `Send + Sync` to be shared across workers.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_job(&self, job: &NewJob<'_>) -> Result<JobRow, sqlx::Error>;

    async fn find_job(&self, id: i32) -> Result<Option<JobRow>, sqlx::Error>;

    async fn list_jobs(&self, filter: &JobFilter, limit: i64, offset: i64) -> Result<Vec<JobRow>, sqlx::Error>;

    async fn count_jobs(&self, filter: &JobFilter) -> Result<i64, sqlx::Error>;

    async fn active_windows(&self, technician_id: i32, date: ServiceDate) -> Result<Vec<JobWindowRow>, sqlx::Error>;

    /// Compare-and-set on the status; `None` when the job is no longer in `from`
    async fn update_status(&self, id: i32, from: JobStatus, to: JobStatus) -> Result<Option<JobRow>, sqlx::Error>;

    /// `None` when the job is missing or terminal
    async fn update_schedule(
        &self,
        id: i32,
        technician_id: Option<i32>,
        schedule: Option<&Schedule>,
    ) -> Result<Option<JobRow>, sqlx::Error>;

    async fn insert_service_history(&self, job: &Job, notes: Option<&str>) -> Result<ServiceHistoryRow, sqlx::Error>;

    async fn record_audit(&self, entry: &AuditEntry<'_>) -> Result<(), sqlx::Error>;
}

/// Postgres-backed store delegating to the repositories
#[derive(Clone)]
pub struct PgJobStore {
    pool: Pool<Postgres>,
}

impl PgJobStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create_job(&self, job: &NewJob<'_>) -> Result<JobRow, sqlx::Error> {
        JobRepository::create(&self.pool, job).await
    }

    async fn find_job(&self, id: i32) -> Result<Option<JobRow>, sqlx::Error> {
        JobRepository::find_by_id(&self.pool, id).await
    }

    async fn list_jobs(&self, filter: &JobFilter, limit: i64, offset: i64) -> Result<Vec<JobRow>, sqlx::Error> {
        JobRepository::list(&self.pool, filter, limit, offset).await
    }

    async fn count_jobs(&self, filter: &JobFilter) -> Result<i64, sqlx::Error> {
        JobRepository::count(&self.pool, filter).await
    }

    async fn active_windows(&self, technician_id: i32, date: ServiceDate) -> Result<Vec<JobWindowRow>, sqlx::Error> {
        JobRepository::active_windows(&self.pool, technician_id, date).await
    }

    async fn update_status(&self, id: i32, from: JobStatus, to: JobStatus) -> Result<Option<JobRow>, sqlx::Error> {
        JobRepository::update_status(&self.pool, id, from, to).await
    }

    async fn update_schedule(
        &self,
        id: i32,
        technician_id: Option<i32>,
        schedule: Option<&Schedule>,
    ) -> Result<Option<JobRow>, sqlx::Error> {
        JobRepository::update_schedule(&self.pool, id, technician_id, schedule).await
    }

    async fn insert_service_history(&self, job: &Job, notes: Option<&str>) -> Result<ServiceHistoryRow, sqlx::Error> {
        ServiceHistoryRepository::insert(&self.pool, job, notes).await
    }

    async fn record_audit(&self, entry: &AuditEntry<'_>) -> Result<(), sqlx::Error> {
        AuditRepository::record(&self.pool, entry).await
    }
}
