//! Display metadata for job statuses (labels, badge colours, dropdown options).
//!
//! Kept out of `domain::status`; everything here is derived from the
//! transition table there.

use actix_web::{get, HttpResponse, Responder};
use serde::Serialize;

use crate::domain::JobStatus;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatusPresentation {
    pub value: JobStatus,
    pub label: &'static str,
    pub color: &'static str,
    pub next: Vec<JobStatus>,
}

pub fn label(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Scheduled => "Scheduled",
        JobStatus::InProgress => "In Progress",
        JobStatus::Completed => "Completed",
        JobStatus::Cancelled => "Cancelled",
    }
}

pub fn color(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Scheduled => "blue",
        JobStatus::InProgress => "yellow",
        JobStatus::Completed => "green",
        JobStatus::Cancelled => "gray",
    }
}

pub fn status_presentations() -> Vec<StatusPresentation> {
    JobStatus::ALL
        .into_iter()
        .map(|status| StatusPresentation {
            value: status,
            label: label(status),
            color: color(status),
            next: status.allowed_transitions(),
        })
        .collect()
}

#[get("/statuses")]
pub async fn list_statuses() -> impl Responder {
    HttpResponse::Ok().json(status_presentations())
}
