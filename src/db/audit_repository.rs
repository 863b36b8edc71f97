use sqlx::{Pool, Postgres};
use tracing::debug;

use crate::domain::JobStatus;

/// One audit entry for a job mutation
#[derive(Debug)]
pub struct AuditEntry<'a> {
    pub job_id: i32,
    pub actor_id: i32,
    pub actor_role: &'a str,
    pub action: &'a str,
    pub from_status: Option<JobStatus>,
    pub to_status: Option<JobStatus>,
}

pub struct AuditRepository;

impl AuditRepository {
    pub async fn record(pool: &Pool<Postgres>, entry: &AuditEntry<'_>) -> Result<(), sqlx::Error> {
        debug!("Audit: job={} action={} actor={}", entry.job_id, entry.action, entry.actor_id);

        sqlx::query(
            r#"
            INSERT INTO audit_log (job_id, actor_id, actor_role, action, from_status, to_status)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.job_id)
        .bind(entry.actor_id)
        .bind(entry.actor_role)
        .bind(entry.action)
        .bind(entry.from_status.map(|s| s.as_str()))
        .bind(entry.to_status.map(|s| s.as_str()))
        .execute(pool)
        .await?;

        Ok(())
    }
}
