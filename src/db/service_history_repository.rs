use sqlx::{Pool, Postgres};
use tracing::debug;

use crate::db::models::ServiceHistoryRow;
use crate::domain::Job;

/// Repository for the per-customer record of completed visits
pub struct ServiceHistoryRepository;

impl ServiceHistoryRepository {
    /// Record a completed visit. The service date falls back to today for unscheduled jobs.
    pub async fn insert(
        pool: &Pool<Postgres>,
        job: &Job,
        notes: Option<&str>,
    ) -> Result<ServiceHistoryRow, sqlx::Error> {
        debug!("Inserting service history for job {}", job.id);

        sqlx::query_as::<_, ServiceHistoryRow>(
            r#"
            INSERT INTO service_history (job_id, customer_id, technician_id, service_date, notes)
            VALUES ($1, $2, $3, COALESCE($4, CURRENT_DATE), $5)
            RETURNING id, job_id, customer_id, technician_id, service_date, notes, created_at
            "#,
        )
        .bind(job.id)
        .bind(job.customer_id)
        .bind(job.technician_id)
        .bind(job.schedule.map(|s| s.date.as_naive()))
        .bind(notes)
        .fetch_one(pool)
        .await
    }
}
