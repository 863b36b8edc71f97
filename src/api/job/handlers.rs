use actix_web::{
    HttpResponse, get, post, put,
    web::{Data, Path, ServiceConfig, scope},
};
use actix_web_validator::{Json, Query};
use tracing::debug;

use crate::api::auth::Caller;
use super::models::{
    CompleteJobRequest, ConflictCheckRequest, CreateJobRequest, ListJobsQuery, ScheduleJobRequest,
    TransitionRequest,
};
use super::presentation::list_statuses;
use super::service::{JobService, ServiceError};

#[post("")]
async fn create_job(
    service: Data<JobService>,
    caller: Caller,
    req: Json<CreateJobRequest>,
) -> Result<HttpResponse, ServiceError> {
    let response = service.create_job(&caller, &req).await?;
    Ok(HttpResponse::Created().json(response))
}

#[get("")]
async fn list_jobs(
    service: Data<JobService>,
    caller: Caller,
    query: Query<ListJobsQuery>,
) -> Result<HttpResponse, ServiceError> {
    debug!("Listing jobs for user {} with {:?}", caller.user_id, *query);
    let response = service.list_jobs(&caller, &query).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[post("/conflicts")]
async fn check_conflicts(
    service: Data<JobService>,
    caller: Caller,
    req: Json<ConflictCheckRequest>,
) -> Result<HttpResponse, ServiceError> {
    let check = service.check_conflicts(&caller, &req).await?;
    Ok(HttpResponse::Ok().json(check))
}

#[get("/{id}")]
async fn get_job(
    service: Data<JobService>,
    caller: Caller,
    path: Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let response = service.get_job(&caller, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[put("/{id}/schedule")]
async fn update_schedule(
    service: Data<JobService>,
    caller: Caller,
    path: Path<i32>,
    req: Json<ScheduleJobRequest>,
) -> Result<HttpResponse, ServiceError> {
    let response = service.update_schedule(&caller, path.into_inner(), &req).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[post("/{id}/transition")]
async fn transition_status(
    service: Data<JobService>,
    caller: Caller,
    path: Path<i32>,
    req: Json<TransitionRequest>,
) -> Result<HttpResponse, ServiceError> {
    let response = service
        .transition_status(&caller, path.into_inner(), req.status)
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

#[post("/{id}/complete")]
async fn complete_job(
    service: Data<JobService>,
    caller: Caller,
    path: Path<i32>,
    req: Json<CompleteJobRequest>,
) -> Result<HttpResponse, ServiceError> {
    let response = service.complete_job(&caller, path.into_inner(), &req).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Routes under `/jobs`. Fixed paths are registered before `/{id}`.
pub fn job_config(config: &mut ServiceConfig) {
    config.service(
        scope("jobs")
            .service(list_statuses)
            .service(check_conflicts)
            .service(create_job)
            .service(list_jobs)
            .service(get_job)
            .service(update_schedule)
            .service(transition_status)
            .service(complete_job),
    );
}
