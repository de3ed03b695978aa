//! Job identification and status types.

/// Unique identifier for a job.
///
/// Ids are handed out in strictly increasing order and never reused within
/// a session, so ordering by id is ordering by creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(JobId)
    }
}

/// Lifecycle state of a job.
///
/// `Created → RunningForeground ⇄ RunningBackground → {Completed, Failed, Cancelled}`.
/// A job can also go straight to `RunningBackground` when launched with the
/// background flag. Terminal states never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Created,
    RunningForeground,
    RunningBackground,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// True once the job has finished, one way or another.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// True while the job is running in either mode.
    pub fn is_running(self) -> bool {
        matches!(
            self,
            JobStatus::RunningForeground | JobStatus::RunningBackground
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Created => write!(f, "Created"),
            JobStatus::RunningForeground => write!(f, "Running (foreground)"),
            JobStatus::RunningBackground => write!(f, "Running"),
            JobStatus::Completed => write!(f, "Done"),
            JobStatus::Failed => write!(f, "Failed"),
            JobStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Information about a job for listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    /// Job ID.
    pub id: JobId,
    /// Command line that started the job.
    pub command: String,
    /// Current status.
    pub status: JobStatus,
}
