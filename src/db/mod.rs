pub mod audit_repository;
pub mod connection;
pub mod job_repository;
pub mod migrations;
pub mod models;
pub mod service_history_repository;
pub mod store;
