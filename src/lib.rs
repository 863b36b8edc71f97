//! Field-service job lifecycle API: status transitions and technician
//! scheduling conflicts for a carpet-cleaning dispatch board.

pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod notify;
pub mod shutdown;
pub mod telemetry;
