//! Scheduler module for shellac: async jobs and their lifecycle.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      JobManager                             │
//! │  jobs: BTreeMap<JobId, Job>          (creation order)       │
//! │  - start(command, background, f) → JobId                    │
//! │  - foreground(JobId, interrupt) → Delivered | Backgrounded  │
//! │  - request_background / request_cancel                      │
//! │  - status_of / list / len / most_recent / abort_all         │
//! └─────────────────────────────────────────────────────────────┘
//!          │ tokio::spawn                    ▲ watch<JobStatus>
//!          ▼                                 │
//!   handler future ── Cancellation ──────────┘
//! ```
//!
//! All jobs run on the caller's tokio runtime. The REPL uses a
//! current-thread runtime, so handler bodies never run in parallel; they
//! interleave only at their own `.await` points.

mod job;

pub use job::{Cancellation, Foreground, JobError, JobManager, JobOutcome};
pub use shellac_types::{JobId, JobInfo, JobStatus};
