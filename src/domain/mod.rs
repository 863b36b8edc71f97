//! Job lifecycle rules: status transitions and technician scheduling conflicts.
//!
//! Everything here is pure. Loading rows, authorization and persistence live in
//! the `api` and `db` modules.

pub mod job;
pub mod schedule;
pub mod status;

pub type JobId = i32;
pub type TechnicianId = i32;
pub type CustomerId = i32;

pub use job::{Job, JobView, Schedule};
pub use schedule::{
    check_time_conflict, ConflictCheck, JobWindow, ScheduleCandidate, ScheduleError, ServiceDate,
    TimeOfDay, TimeWindow,
};
pub use status::{can_transition, JobStatus, ParseJobStatusError};
