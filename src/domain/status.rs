use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a job
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

/// Every legal `(from, to)` edge of the job lifecycle.
///
/// Terminal statuses have no outgoing edges and no status has an edge to itself.
pub const TRANSITIONS: &[(JobStatus, JobStatus)] = &[
    (JobStatus::Scheduled, JobStatus::InProgress),
    (JobStatus::Scheduled, JobStatus::Cancelled),
    (JobStatus::InProgress, JobStatus::Completed),
    (JobStatus::InProgress, JobStatus::Cancelled),
];

/// Returns `true` if a job may move from `from` to `to`.
pub fn can_transition(from: JobStatus, to: JobStatus) -> bool {
    TRANSITIONS.iter().any(|&(f, t)| f == from && t == to)
}

impl JobStatus {
    /// All statuses in lifecycle order
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Scheduled,
        JobStatus::InProgress,
        JobStatus::Completed,
        JobStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Scheduled => "scheduled",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled)
    }

    /// Statuses reachable in one step from this one, in table order
    pub fn allowed_transitions(&self) -> Vec<JobStatus> {
        TRANSITIONS
            .iter()
            .filter(|&&(from, _)| from == *self)
            .map(|&(_, to)| to)
            .collect()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored or submitted status string is not one of the four statuses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseJobStatusError(pub String);

impl fmt::Display for ParseJobStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown job status: {:?}", self.0)
    }
}

impl std::error::Error for ParseJobStatusError {}

impl FromStr for JobStatus {
    type Err = ParseJobStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseJobStatusError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use JobStatus::*;

    #[test]
    fn test_transition_table_matches_every_pair() {
        let expected = |from: JobStatus, to: JobStatus| {
            matches!(
                (from, to),
                (Scheduled, InProgress)
                    | (Scheduled, Cancelled)
                    | (InProgress, Completed)
                    | (InProgress, Cancelled)
            )
        };

        let mut checked = 0;
        for from in JobStatus::ALL {
            for to in JobStatus::ALL {
                assert_eq!(
                    can_transition(from, to),
                    expected(from, to),
                    "{} -> {}",
                    from,
                    to
                );
                checked += 1;
            }
        }
        assert_eq!(checked, 16);
    }

    #[test]
    fn test_self_transition_is_never_allowed() {
        for status in JobStatus::ALL {
            assert!(!can_transition(status, status), "{} -> itself", status);
        }
    }

    #[test]
    fn test_terminal_statuses_have_no_exits() {
        for to in JobStatus::ALL {
            assert!(!can_transition(Completed, to));
            assert!(!can_transition(Cancelled, to));
        }
        assert!(!can_transition(Completed, Cancelled));
        assert!(!can_transition(Cancelled, Completed));
        assert!(!can_transition(Completed, InProgress));
    }

    #[test]
    fn test_allowed_transitions_agree_with_table() {
        for from in JobStatus::ALL {
            for to in JobStatus::ALL {
                assert_eq!(from.allowed_transitions().contains(&to), can_transition(from, to));
            }
            assert_eq!(from.is_terminal(), from.allowed_transitions().is_empty());
        }
        assert_eq!(Scheduled.allowed_transitions(), vec![InProgress, Cancelled]);
        assert_eq!(InProgress.allowed_transitions(), vec![Completed, Cancelled]);
    }

    #[test]
    fn test_wire_format() {
        assert_eq!(InProgress.to_string(), "in_progress");
        assert_eq!("cancelled".parse::<JobStatus>(), Ok(Cancelled));
        assert_eq!(
            serde_json::to_string(&InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(
            serde_json::from_str::<JobStatus>("\"scheduled\"").unwrap(),
            Scheduled
        );
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        assert!("done".parse::<JobStatus>().is_err());
        assert!("InProgress".parse::<JobStatus>().is_err());
        assert!(serde_json::from_str::<JobStatus>("\"paused\"").is_err());
    }
}
