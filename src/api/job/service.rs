use actix_web::{HttpResponse, ResponseError};
use sqlx::{Pool, Postgres};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api::auth::{AuthError, Caller};
use crate::api::validation::ErrorResponse;
use crate::db::audit_repository::AuditEntry;
use crate::db::job_repository::{JobFilter, NewJob};
use crate::db::models::{JobRow, RowError, ServiceHistoryRow};
use crate::db::store::{JobStore, PgJobStore};
use crate::domain::job::candidate_for;
use crate::domain::{
    can_transition, check_time_conflict, ConflictCheck, Job, JobId, JobStatus, JobView, JobWindow,
    Schedule, ScheduleCandidate, ServiceDate, TechnicianId,
};
use crate::notify::{Notification, NotificationKind, NotificationSender};
use super::dto::{CompletionResponse, JobListResponse, JobResponse, ScheduleWarning};
use super::models::{
    CompleteJobRequest, ConflictCheckRequest, CreateJobRequest, ListJobsQuery, ScheduleJobRequest,
};

/// Service-level errors
#[derive(Debug)]
pub enum ServiceError {
    /// Database operation failed
    DatabaseError(sqlx::Error),

    /// Stored row violates job invariants
    CorruptRow(RowError),

    /// Validation failed
    ValidationError(String),

    /// Job not found
    NotFound(JobId),

    /// Caller identity or permission problem
    Auth(AuthError),

    /// Status change not in the transition table
    InvalidTransition { from: JobStatus, to: JobStatus },

    /// Job state does not allow the operation, or changed underneath it
    Conflict(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::DatabaseError(e) => write!(f, "Database error: {}", e),
            ServiceError::CorruptRow(e) => write!(f, "{}", e),
            ServiceError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ServiceError::NotFound(id) => write!(f, "Job not found: {}", id),
            ServiceError::Auth(e) => write!(f, "{}", e),
            ServiceError::InvalidTransition { from, to } => {
                write!(f, "invalid status transition from {} to {}", from, to)
            }
            ServiceError::Conflict(msg) => write!(f, "Conflict: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<AuthError> for ServiceError {
    fn from(e: AuthError) -> Self {
        ServiceError::Auth(e)
    }
}

impl From<RowError> for ServiceError {
    fn from(e: RowError) -> Self {
        ServiceError::CorruptRow(e)
    }
}

impl ResponseError for ServiceError {
    fn error_response(&self) -> HttpResponse {
        match self {
            ServiceError::DatabaseError(e) => {
                error!("Database error: {}", e);
                HttpResponse::InternalServerError().json(ErrorResponse {
                    error: "Failed to process request".to_string(),
                    fields: serde_json::json!({"message": "Database error occurred"}),
                })
            }
            ServiceError::CorruptRow(e) => {
                error!("{}", e);
                HttpResponse::InternalServerError().json(ErrorResponse {
                    error: "Failed to process request".to_string(),
                    fields: serde_json::json!({"message": "Stored job data is invalid"}),
                })
            }
            ServiceError::ValidationError(msg) => {
                warn!("Validation error: {}", msg);
                HttpResponse::BadRequest().json(ErrorResponse {
                    error: "Validation failed".to_string(),
                    fields: serde_json::json!({"message": msg}),
                })
            }
            ServiceError::NotFound(id) => {
                warn!("Job not found: {}", id);
                HttpResponse::NotFound().json(ErrorResponse {
                    error: "Not found".to_string(),
                    fields: serde_json::json!({"message": format!("Job with id {} not found", id)}),
                })
            }
            ServiceError::Auth(e) => e.error_response(),
            ServiceError::InvalidTransition { from, to } => {
                warn!("Rejected status transition {} -> {}", from, to);
                HttpResponse::UnprocessableEntity().json(ErrorResponse {
                    error: "Invalid status transition".to_string(),
                    fields: serde_json::json!({
                        "message": self.to_string(),
                        "from": from,
                        "to": to,
                        "allowed": from.allowed_transitions(),
                    }),
                })
            }
            ServiceError::Conflict(msg) => {
                warn!("Conflict: {}", msg);
                HttpResponse::Conflict().json(ErrorResponse {
                    error: "Conflict".to_string(),
                    fields: serde_json::json!({"message": msg}),
                })
            }
        }
    }
}

/// Reject any status change missing from the transition table, same-status included
pub fn ensure_transition(job: &Job, to: JobStatus) -> Result<(), ServiceError> {
    if can_transition(job.status, to) {
        Ok(())
    } else {
        Err(ServiceError::InvalidTransition { from: job.status, to })
    }
}

/// Technicians only ever see their own jobs, whatever filter they ask for
pub fn scoped_filter(caller: &Caller, query: &ListJobsQuery) -> JobFilter {
    let technician_id = if caller.is_dispatch() {
        query.technician_id
    } else {
        Some(caller.user_id)
    };
    JobFilter {
        status: query.status,
        technician_id,
        date: query.date,
    }
}

/// Foreign key violations on writes point at a customer or technician that does not exist
pub fn write_error(e: sqlx::Error) -> ServiceError {
    match e.as_database_error() {
        Some(db) if db.is_foreign_key_violation() => {
            let reference = match db.constraint() {
                Some(c) if c.contains("customer") => "customer_id",
                Some(c) if c.contains("technician") => "technician_id",
                _ => "customer_id or technician_id",
            };
            ServiceError::ValidationError(format!("{} does not reference an existing record", reference))
        }
        _ => ServiceError::DatabaseError(e),
    }
}

fn notification_kind(to: JobStatus) -> Option<NotificationKind> {
    match to {
        JobStatus::Completed => Some(NotificationKind::JobCompleted),
        JobStatus::Cancelled => Some(NotificationKind::JobCancelled),
        JobStatus::Scheduled | JobStatus::InProgress => None,
    }
}

/// Job service: authorizes callers, loads rows, applies the lifecycle
/// rules and persists the outcome
pub struct JobService {
    store: Arc<dyn JobStore>,
    notifications: NotificationSender,
}

impl JobService {
    /// Create a new JobService instance backed by Postgres
    pub fn new(pool: Pool<Postgres>, notifications: NotificationSender) -> Self {
        Self::with_store(Arc::new(PgJobStore::new(pool)), notifications)
    }

    pub fn with_store(store: Arc<dyn JobStore>, notifications: NotificationSender) -> Self {
        Self { store, notifications }
    }

    async fn load(&self, id: JobId) -> Result<Job, ServiceError> {
        let row = self
            .store
            .find_job(id)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or(ServiceError::NotFound(id))?;
        Ok(Job::try_from(row)?)
    }

    async fn conflict_check(
        &self,
        technician_id: TechnicianId,
        date: ServiceDate,
        candidate: &ScheduleCandidate,
        exclude_job_id: Option<JobId>,
    ) -> Result<ConflictCheck, ServiceError> {
        let existing: Vec<JobWindow> = self
            .store
            .active_windows(technician_id, date)
            .await
            .map_err(ServiceError::DatabaseError)?
            .into_iter()
            .map(JobWindow::from)
            .collect();

        let check = check_time_conflict(&existing, candidate, exclude_job_id);
        if let Some(conflict) = &check.conflicting_job {
            warn!(
                "Service: Scheduling conflict for technician {} on {}: overlaps job {}",
                technician_id, date, conflict.id
            );
        }
        Ok(check)
    }

    /// Conflict warnings for an assigned and scheduled window, empty otherwise
    async fn warnings_for(
        &self,
        technician_id: Option<TechnicianId>,
        schedule: Option<&Schedule>,
        exclude_job_id: Option<JobId>,
    ) -> Result<Vec<ScheduleWarning>, ServiceError> {
        let (Some(technician_id), Some(schedule)) = (technician_id, schedule) else {
            return Ok(Vec::new());
        };
        let candidate = candidate_for(Some(technician_id), Some(schedule));
        let check = self
            .conflict_check(technician_id, schedule.date, &candidate, exclude_job_id)
            .await?;
        Ok(ScheduleWarning::from_check(check).into_iter().collect())
    }

    async fn audit(&self, caller: &Caller, job_id: JobId, action: &str, from: Option<JobStatus>, to: Option<JobStatus>) {
        let entry = AuditEntry {
            job_id,
            actor_id: caller.user_id,
            actor_role: caller.role.as_str(),
            action,
            from_status: from,
            to_status: to,
        };
        if let Err(e) = self.store.record_audit(&entry).await {
            warn!("Service: Failed to write audit record for job {} ({}): {}", job_id, action, e);
        }
    }

    fn notify(&self, kind: NotificationKind, job: &Job) {
        self.notifications.send(Notification {
            kind,
            job_id: job.id,
            customer_id: job.customer_id,
            technician_id: job.technician_id,
        });
    }

    /// Create a job in `scheduled` status
    ///
    /// # Business Logic
    /// - Only dispatchers and admins create jobs
    /// - An overlapping window for the technician is reported as a warning,
    ///   the job is created regardless
    pub async fn create_job(&self, caller: &Caller, req: &CreateJobRequest) -> Result<JobResponse, ServiceError> {
        caller.require_dispatch()?;
        let schedule = req
            .schedule()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        info!(
            "Service: Creating job for customer={} technician={:?}",
            req.customer_id, req.technician_id
        );

        let warnings = self
            .warnings_for(req.technician_id, schedule.as_ref(), None)
            .await?;

        let row = self
            .store
            .create_job(&NewJob {
                customer_id: req.customer_id,
                technician_id: req.technician_id,
                schedule,
                notes: req.notes.as_deref(),
            })
            .await
            .map_err(write_error)?;
        let job = Job::try_from(row)?;

        info!("Service: Job created successfully with id={}", job.id);
        self.audit(caller, job.id, "create", None, Some(job.status)).await;
        if job.schedule.is_some() {
            self.notify(NotificationKind::JobScheduled, &job);
        }

        Ok(JobResponse {
            message: "Job created successfully".to_string(),
            job: JobView::from(&job),
            warnings,
        })
    }

    pub async fn get_job(&self, caller: &Caller, id: JobId) -> Result<JobResponse, ServiceError> {
        let job = self.load(id).await?;
        caller.require_job_access(&job)?;
        Ok(JobResponse {
            message: "Job found".to_string(),
            job: JobView::from(&job),
            warnings: Vec::new(),
        })
    }

    pub async fn list_jobs(&self, caller: &Caller, query: &ListJobsQuery) -> Result<JobListResponse, ServiceError> {
        let filter = scoped_filter(caller, query);
        let (limit, offset) = query.limit_offset();

        let rows = self
            .store
            .list_jobs(&filter, limit, offset)
            .await
            .map_err(ServiceError::DatabaseError)?;
        let total = self
            .store
            .count_jobs(&filter)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let jobs = rows
            .into_iter()
            .map(|row| Job::try_from(row).map(|job| JobView::from(&job)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(JobListResponse {
            jobs,
            page: query.page(),
            per_page: query.per_page(),
            total,
        })
    }

    /// Preview whether a window overlaps the technician's active jobs that day
    pub async fn check_conflicts(&self, caller: &Caller, req: &ConflictCheckRequest) -> Result<ConflictCheck, ServiceError> {
        caller.require_dispatch()?;
        let candidate = ScheduleCandidate {
            technician_id: Some(req.technician_id),
            date: Some(req.scheduled_date),
            start_time: req.start_time,
            end_time: req.end_time,
        };
        self.conflict_check(req.technician_id, req.scheduled_date, &candidate, req.exclude_job_id)
            .await
    }

    /// Replace a job's technician and schedule
    ///
    /// # Business Logic
    /// - Terminal jobs keep their schedule
    /// - The job's own window never counts as a conflict
    pub async fn update_schedule(
        &self,
        caller: &Caller,
        id: JobId,
        req: &ScheduleJobRequest,
    ) -> Result<JobResponse, ServiceError> {
        caller.require_dispatch()?;
        let schedule = req
            .schedule()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let job = self.load(id).await?;
        if job.status.is_terminal() {
            return Err(ServiceError::Conflict(format!(
                "job {} is {} and cannot be rescheduled",
                id, job.status
            )));
        }

        let warnings = self
            .warnings_for(req.technician_id, schedule.as_ref(), Some(id))
            .await?;

        let row: JobRow = self
            .store
            .update_schedule(id, req.technician_id, schedule.as_ref())
            .await
            .map_err(write_error)?
            .ok_or_else(|| ServiceError::Conflict(format!("job {} was closed while rescheduling", id)))?;
        let updated = Job::try_from(row)?;

        info!(
            "Service: Job {} rescheduled: technician={:?}",
            id, updated.technician_id
        );
        self.audit(caller, id, "reschedule", Some(updated.status), Some(updated.status))
            .await;

        let changed = job.technician_id != updated.technician_id || job.schedule != updated.schedule;
        if changed && updated.schedule.is_some() {
            self.notify(NotificationKind::JobScheduled, &updated);
        }

        Ok(JobResponse {
            message: "Job schedule updated".to_string(),
            job: JobView::from(&updated),
            warnings,
        })
    }

    /// Move a job to a new status
    ///
    /// Moving to `completed` goes through [`JobService::complete_job`]'s flow
    /// without notes.
    pub async fn transition_status(
        &self,
        caller: &Caller,
        id: JobId,
        to: JobStatus,
    ) -> Result<JobResponse, ServiceError> {
        let job = self.load(id).await?;
        caller.require_job_access(&job)?;
        ensure_transition(&job, to)?;

        if to == JobStatus::Completed {
            let (completed, _) = self.finish(caller, job, None).await?;
            return Ok(JobResponse {
                message: "Job completed".to_string(),
                job: JobView::from(&completed),
                warnings: Vec::new(),
            });
        }

        let from = job.status;
        let row = self
            .store
            .update_status(id, from, to)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::Conflict(format!("job {} changed status concurrently", id)))?;
        let updated = Job::try_from(row)?;

        info!("Service: Job {} moved {} -> {}", id, from, to);
        self.audit(caller, id, "transition", Some(from), Some(to)).await;
        if let Some(kind) = notification_kind(to) {
            self.notify(kind, &updated);
        }

        Ok(JobResponse {
            message: format!("Job status changed to {}", to),
            job: JobView::from(&updated),
            warnings: Vec::new(),
        })
    }

    /// Complete an in-progress job and record the visit in service history
    pub async fn complete_job(
        &self,
        caller: &Caller,
        id: JobId,
        req: &CompleteJobRequest,
    ) -> Result<CompletionResponse, ServiceError> {
        let job = self.load(id).await?;
        caller.require_job_access(&job)?;
        ensure_transition(&job, JobStatus::Completed)?;

        let (completed, history) = self.finish(caller, job, req.notes.as_deref()).await?;
        Ok(CompletionResponse {
            message: "Job completed".to_string(),
            job: JobView::from(&completed),
            service_history: history,
        })
    }

    /// Completion flow shared by both entry points.
    ///
    /// The status update is undone, best effort, when the service history
    /// insert fails.
    async fn finish(
        &self,
        caller: &Caller,
        job: Job,
        notes: Option<&str>,
    ) -> Result<(Job, ServiceHistoryRow), ServiceError> {
        let from = job.status;
        let row = self
            .store
            .update_status(job.id, from, JobStatus::Completed)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::Conflict(format!("job {} changed status concurrently", job.id)))?;
        let completed = Job::try_from(row)?;

        let history = match self.store.insert_service_history(&completed, notes).await {
            Ok(history) => history,
            Err(e) => {
                error!("Service: Service history insert failed for job {}: {}", job.id, e);
                match self.store.update_status(job.id, JobStatus::Completed, from).await {
                    Ok(Some(_)) => warn!("Service: Rolled job {} back to {}", job.id, from),
                    Ok(None) => error!("Service: Rollback of job {} skipped, status changed again", job.id),
                    Err(rollback) => error!("Service: Rollback of job {} failed: {}", job.id, rollback),
                }
                return Err(ServiceError::DatabaseError(e));
            }
        };

        info!("Service: Job {} completed, service history id={}", job.id, history.id);
        self.audit(caller, job.id, "complete", Some(from), Some(JobStatus::Completed))
            .await;
        self.notify(NotificationKind::JobCompleted, &completed);

        Ok((completed, history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::Role;
    use chrono::NaiveDate;

    fn job(status: JobStatus) -> Job {
        let ts = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        Job {
            id: 77,
            customer_id: 1,
            technician_id: Some(3),
            status,
            schedule: None,
            notes: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn test_forward_moves_pass_and_backward_moves_fail() {
        assert!(ensure_transition(&job(JobStatus::Scheduled), JobStatus::InProgress).is_ok());
        assert!(ensure_transition(&job(JobStatus::InProgress), JobStatus::Completed).is_ok());

        let err = ensure_transition(&job(JobStatus::InProgress), JobStatus::Scheduled).unwrap_err();
        assert_eq!(err.to_string(), "invalid status transition from in_progress to scheduled");
    }

    #[test]
    fn test_same_status_is_rejected() {
        for status in JobStatus::ALL {
            assert!(matches!(
                ensure_transition(&job(status), status),
                Err(ServiceError::InvalidTransition { .. })
            ));
        }
    }

    #[test]
    fn test_invalid_transition_maps_to_unprocessable_entity() {
        use actix_web::http::StatusCode;
        let err = ServiceError::InvalidTransition {
            from: JobStatus::Completed,
            to: JobStatus::Cancelled,
        };
        assert_eq!(err.error_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            ServiceError::Conflict("x".into()).error_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::Auth(AuthError::Forbidden("x".into())).error_response().status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_technician_listing_is_scoped_to_self() {
        let query = ListJobsQuery {
            technician_id: Some(99),
            status: Some(JobStatus::Scheduled),
            ..Default::default()
        };

        let tech = Caller { user_id: 3, role: Role::Technician };
        let filter = scoped_filter(&tech, &query);
        assert_eq!(filter.technician_id, Some(3));
        assert_eq!(filter.status, Some(JobStatus::Scheduled));

        let dispatcher = Caller { user_id: 1, role: Role::Dispatcher };
        assert_eq!(scoped_filter(&dispatcher, &query).technician_id, Some(99));
    }

    #[test]
    fn test_only_terminal_moves_notify() {
        assert_eq!(notification_kind(JobStatus::InProgress), None);
        assert_eq!(notification_kind(JobStatus::Cancelled), Some(NotificationKind::JobCancelled));
        assert_eq!(notification_kind(JobStatus::Completed), Some(NotificationKind::JobCompleted));
    }

    #[derive(Debug)]
    struct ForeignKeyViolation(&'static str);

    impl fmt::Display for ForeignKeyViolation {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "insert or update on table \"jobs\" violates foreign key constraint \"{}\"", self.0)
        }
    }

    impl std::error::Error for ForeignKeyViolation {}

    impl sqlx::error::DatabaseError for ForeignKeyViolation {
        fn message(&self) -> &str {
            "foreign key violation"
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn constraint(&self) -> Option<&str> {
            Some(self.0)
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::ForeignKeyViolation
        }
    }

    #[test]
    fn test_unknown_reference_is_a_bad_request() {
        use actix_web::http::StatusCode;

        let err = write_error(sqlx::Error::Database(Box::new(ForeignKeyViolation("jobs_customer_id_fkey"))));
        assert!(matches!(&err, ServiceError::ValidationError(msg) if msg.starts_with("customer_id")));
        assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);

        let err = write_error(sqlx::Error::Database(Box::new(ForeignKeyViolation("jobs_technician_id_fkey"))));
        assert!(matches!(&err, ServiceError::ValidationError(msg) if msg.starts_with("technician_id")));

        let err = write_error(sqlx::Error::RowNotFound);
        assert_eq!(err.error_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
