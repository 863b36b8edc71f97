pub mod dto;
pub mod handlers;
pub mod models;
pub mod presentation;
pub mod service;

// Re-export commonly used types
pub use service::{JobService, ServiceError};
