use service_jobs::api::job::service::ensure_transition;
use service_jobs::db::models::JobRow;
use service_jobs::domain::{
    can_transition, check_time_conflict, Job, JobStatus, JobWindow, ScheduleCandidate, ServiceDate,
    TimeOfDay,
};

fn t(s: &str) -> TimeOfDay {
    TimeOfDay::parse(s).unwrap()
}

fn stored_job(id: i32, status: &str, start: &str, end: &str) -> Job {
    let date = ServiceDate::parse("2024-06-01").unwrap().as_naive();
    let ts = date.and_hms_opt(7, 0, 0).unwrap();
    Job::try_from(JobRow {
        id,
        customer_id: 10,
        technician_id: Some(4),
        status: status.to_string(),
        scheduled_date: Some(date),
        start_time: Some(t(start).as_naive()),
        end_time: Some(t(end).as_naive()),
        notes: None,
        created_at: ts,
        updated_at: ts,
    })
    .unwrap()
}

#[test]
fn double_booking_warns_then_job_still_moves_forward_only() {
    let existing = stored_job(1, "scheduled", "13:00", "15:00");
    let active: Vec<JobWindow> = existing.scheduling_window().into_iter().collect();

    let proposed = ScheduleCandidate {
        technician_id: Some(4),
        date: Some(ServiceDate::parse("2024-06-01").unwrap()),
        start_time: Some(t("14:00")),
        end_time: Some(t("16:00")),
    };
    let check = check_time_conflict(&active, &proposed, None);
    assert!(check.has_conflict);
    assert_eq!(check.conflicting_job.as_ref().map(|j| j.id), Some(1));

    // The dispatcher proceeds anyway; the new job starts in `scheduled`.
    let mut new_job = stored_job(2, "scheduled", "14:00", "16:00");
    assert!(can_transition(new_job.status, JobStatus::InProgress));
    assert!(ensure_transition(&new_job, JobStatus::InProgress).is_ok());
    new_job.status = JobStatus::InProgress;

    assert!(!can_transition(new_job.status, JobStatus::Scheduled));
    let err = ensure_transition(&new_job, JobStatus::Scheduled).unwrap_err();
    assert_eq!(err.to_string(), "invalid status transition from in_progress to scheduled");
}

#[test]
fn editing_a_job_ignores_its_own_window() {
    let job = stored_job(5, "in_progress", "09:00", "10:00");
    let active: Vec<JobWindow> = job.scheduling_window().into_iter().collect();

    let same_slot = ScheduleCandidate {
        technician_id: job.technician_id,
        date: job.schedule.map(|s| s.date),
        start_time: Some(t("09:00")),
        end_time: Some(t("10:00")),
    };
    assert!(!check_time_conflict(&active, &same_slot, Some(job.id)).has_conflict);
    assert!(check_time_conflict(&active, &same_slot, None).has_conflict);
}

#[test]
fn back_to_back_visits_are_allowed() {
    let morning = stored_job(6, "scheduled", "09:00", "10:00");
    let active: Vec<JobWindow> = morning.scheduling_window().into_iter().collect();

    let next = ScheduleCandidate {
        technician_id: Some(4),
        date: ServiceDate::parse("2024-06-01").ok(),
        start_time: Some(t("10:00")),
        end_time: Some(t("11:00")),
    };
    assert!(!check_time_conflict(&active, &next, None).has_conflict);
}
