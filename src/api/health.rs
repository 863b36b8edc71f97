use actix_web::{HttpResponse, Responder, get, web};
use serde::Serialize;
use sqlx::{Pool, Postgres};
use tracing::error;

use crate::notify::NotificationSender;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub notifications: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

async fn ping(pool: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").fetch_one(pool).await.map(|_| ())
}

fn notification_state(sender: &NotificationSender) -> &'static str {
    if sender.is_closed() { "stopped" } else { "running" }
}

/// General health including database connectivity and the notification worker
#[get("/health")]
async fn health_check(
    pool: web::Data<Pool<Postgres>>,
    notifications: web::Data<NotificationSender>,
) -> impl Responder {
    let notifications = notification_state(&notifications);
    match ping(&pool).await {
        Ok(()) => HttpResponse::Ok().json(HealthResponse {
            status: "healthy",
            database: "connected",
            notifications,
            error: None,
        }),
        Err(e) => {
            error!("Health check failed: {:?}", e);
            HttpResponse::ServiceUnavailable().json(HealthResponse {
                status: "unhealthy",
                database: "disconnected",
                notifications,
                error: Some(format!("Database error: {}", e)),
            })
        }
    }
}

/// Readiness probe: the service can take traffic only while the database answers
#[get("/ready")]
async fn readiness_check(pool: web::Data<Pool<Postgres>>) -> impl Responder {
    match ping(&pool).await {
        Ok(()) => HttpResponse::Ok().json(HealthResponse {
            status: "ready",
            database: "connected",
            notifications: "not_checked",
            error: None,
        }),
        Err(e) => {
            error!("Readiness check failed: database unavailable: {:?}", e);
            HttpResponse::ServiceUnavailable().json(HealthResponse {
                status: "not_ready",
                database: "disconnected",
                notifications: "not_checked",
                error: Some(format!("Database unavailable: {}", e)),
            })
        }
    }
}

/// Liveness probe; checks nothing beyond the process answering
#[get("/live")]
async fn liveness_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "alive",
        database: "not_checked",
        notifications: "not_checked",
        error: None,
    })
}

pub fn health_config(config: &mut web::ServiceConfig) {
    config
        .service(health_check)
        .service(readiness_check)
        .service(liveness_check);
}
