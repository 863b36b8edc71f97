use actix_web::{App, HttpServer, web};
use clap::Parser;
use std::io;
use std::sync::Arc;
use tokio::sync::{Semaphore, watch};
use tracing::info;

use service_jobs::api::{
    health::health_config,
    job::{JobService, handlers::job_config},
    validation,
};
use service_jobs::cli::{Cli, Command};
use service_jobs::config::Config;
use service_jobs::db;
use service_jobs::notify::{LogNotifier, NotificationSender, NotificationWorker};
use service_jobs::shutdown::ShutdownCoordinator;
use service_jobs::telemetry;

#[actix_web::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();

    let Config {
        database_url,
        max_payload_size,
        max_db_connections,
        bind_host,
        bind_port,
        log_dir,
        notification_queue_size,
        max_concurrent_notifications,
    } = Config::from_env().map_err(io::Error::other)?;

    telemetry::init(&log_dir)?;

    let pool = db::connection::get_connection(&database_url, max_db_connections)
        .await
        .map_err(io::Error::other)?;
    info!("Database connection pool established");

    db::migrations::run_migrations(&pool)
        .await
        .map_err(io::Error::other)?;

    if cli.command() == &Command::Migrate {
        pool.close().await;
        return Ok(());
    }

    info!("Starting service-jobs");
    info!("  - Max payload size: {} bytes", max_payload_size);
    info!("  - Max database connections: {}", max_db_connections);
    info!("  - Notification queue size: {}", notification_queue_size);
    info!("  - Concurrent notifications: {}", max_concurrent_notifications);

    // watch channel so the worker sees the same shutdown flag the coordinator flips
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (notifications, notification_rx) = NotificationSender::channel(notification_queue_size);

    let semaphore = Arc::new(Semaphore::new(max_concurrent_notifications));
    let notification_worker = tokio::spawn(
        NotificationWorker::new(LogNotifier, notification_rx).run(semaphore, shutdown_rx),
    );

    let server_pool = pool.clone();

    let server = HttpServer::new(move || {
        let job_service = web::Data::new(JobService::new(server_pool.clone(), notifications.clone()));

        let payload_config = web::PayloadConfig::default()
            .limit(max_payload_size);

        App::new()
            .app_data(web::Data::new(server_pool.clone()))
            .app_data(web::Data::new(notifications.clone()))
            .app_data(job_service)
            .app_data(payload_config)
            .app_data(validation::json_config().limit(max_payload_size))
            .app_data(validation::query_config())
            .configure(health_config)
            .configure(job_config)
    });

    info!("Server starting on http://{}:{}", bind_host, bind_port);

    let server = server
        .bind((bind_host.as_str(), bind_port))?
        .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    ShutdownCoordinator::new(
        server_handle,
        server_task,
        notification_worker,
        shutdown_tx,
        pool,
    )
    .wait_for_shutdown()
    .await
}
