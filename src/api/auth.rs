use actix_web::{dev::Payload, http::header::HeaderMap, FromRequest, HttpRequest, HttpResponse, ResponseError};
use futures_util::future::{ready, Ready};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::api::validation::ErrorResponse;
use crate::domain::Job;

/// Header carrying the authenticated user id, set by the upstream auth proxy
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the authenticated user's role
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Dispatcher,
    Technician,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Dispatcher => "dispatcher",
            Role::Technician => "technician",
        }
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "dispatcher" => Ok(Role::Dispatcher),
            "technician" => Ok(Role::Technician),
            other => Err(AuthError::InvalidIdentity(format!("unknown role {:?}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No identity headers on the request
    MissingIdentity,

    /// Identity headers present but unusable
    InvalidIdentity(String),

    /// Caller is known but may not perform the operation
    Forbidden(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MissingIdentity => write!(f, "Missing caller identity"),
            AuthError::InvalidIdentity(msg) => write!(f, "Invalid caller identity: {}", msg),
            AuthError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

impl ResponseError for AuthError {
    fn error_response(&self) -> HttpResponse {
        warn!("{}", self);
        match self {
            AuthError::MissingIdentity | AuthError::InvalidIdentity(_) => {
                HttpResponse::Unauthorized().json(ErrorResponse {
                    error: "Unauthorized".to_string(),
                    fields: serde_json::json!({"message": self.to_string()}),
                })
            }
            AuthError::Forbidden(msg) => HttpResponse::Forbidden().json(ErrorResponse {
                error: "Forbidden".to_string(),
                fields: serde_json::json!({"message": msg}),
            }),
        }
    }
}

/// Authenticated caller of a job operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i32,
    pub role: Role,
}

impl Caller {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AuthError> {
        let user_id = headers.get(USER_ID_HEADER);
        let role = headers.get(USER_ROLE_HEADER);
        let (Some(user_id), Some(role)) = (user_id, role) else {
            return Err(AuthError::MissingIdentity);
        };

        let user_id = user_id
            .to_str()
            .ok()
            .and_then(|s| s.trim().parse::<i32>().ok())
            .filter(|id| *id > 0)
            .ok_or_else(|| AuthError::InvalidIdentity("user id must be a positive integer".to_string()))?;

        let role = role
            .to_str()
            .map_err(|_| AuthError::InvalidIdentity("role header is not valid text".to_string()))?
            .parse()?;

        Ok(Caller { user_id, role })
    }

    pub fn is_dispatch(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Dispatcher)
    }

    /// Dispatchers and admins act on any job; technicians only on jobs assigned to them
    pub fn can_act_on(&self, job: &Job) -> bool {
        self.is_dispatch() || job.technician_id == Some(self.user_id)
    }

    pub fn require_job_access(&self, job: &Job) -> Result<(), AuthError> {
        if self.can_act_on(job) {
            Ok(())
        } else {
            Err(AuthError::Forbidden(format!(
                "job {} is not assigned to technician {}",
                job.id, self.user_id
            )))
        }
    }

    /// Creating, assigning and rescheduling jobs is reserved for dispatch roles
    pub fn require_dispatch(&self) -> Result<(), AuthError> {
        if self.is_dispatch() {
            Ok(())
        } else {
            Err(AuthError::Forbidden(format!(
                "role {} may not manage the schedule",
                self.role.as_str()
            )))
        }
    }
}

impl FromRequest for Caller {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Caller::from_headers(req.headers()))
    }
}
