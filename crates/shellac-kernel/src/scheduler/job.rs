//! Job management for shellac.
//!
//! Provides the `JobManager`, which owns every async command execution from
//! start until its result is delivered.
//!
//! The job table sits behind a short-lived `std::sync::Mutex`. Every status
//! transition, and every check that decides between two transitions, happens
//! inside one critical section, so a backgrounding request can never
//! interleave with a job finishing.

use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

use shellac_types::{JobId, JobInfo, JobStatus, Value};

use crate::handler::CommandError;

/// Job-control failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("Could not find a running job for {0}")]
    NotFound(JobId),

    #[error("No running jobs found")]
    NoJobs,

    #[error("job {0} is already in the foreground")]
    ForegroundBusy(JobId),

    #[error("job {0} is not in the foreground")]
    NotInForeground(JobId),

    #[error("job {0} has already finished")]
    AlreadyFinished(JobId),
}

/// How a job ended.
#[derive(Debug)]
pub enum JobOutcome {
    Completed(Value),
    Failed(CommandError),
    Cancelled,
}

impl JobOutcome {
    /// The terminal status matching this outcome.
    pub fn status(&self) -> JobStatus {
        match self {
            JobOutcome::Completed(_) => JobStatus::Completed,
            JobOutcome::Failed(_) => JobStatus::Failed,
            JobOutcome::Cancelled => JobStatus::Cancelled,
        }
    }
}

/// Result of waiting on a job in the foreground.
#[derive(Debug)]
pub enum Foreground {
    /// The job finished; it has been removed from the table.
    Delivered(JobOutcome),
    /// The wait was interrupted; the job keeps running in the background.
    Backgrounded(JobId),
}

/// Cooperative cancellation handed to a running job.
///
/// The manager only ever sets the token. Whether the job stops is up to the
/// handler, and it only counts as cancelled once the handler has looked.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    token: CancellationToken,
    observed: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Poll for a cancellation request without suspending.
    pub fn is_cancelled(&self) -> bool {
        let cancelled = self.token.is_cancelled();
        if cancelled {
            self.observed.store(true, Ordering::SeqCst);
        }
        cancelled
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
        self.observed.store(true, Ordering::SeqCst);
    }

    /// Yield to the scheduler, then report a pending cancellation.
    pub async fn checkpoint(&self) -> Result<(), CommandError> {
        tokio::task::yield_now().await;
        if self.is_cancelled() {
            Err(CommandError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleep, waking early on cancellation.
    pub async fn sleep(&self, duration: Duration) -> Result<(), CommandError> {
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(CommandError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    /// True once the handler has seen the request.
    pub fn was_observed(&self) -> bool {
        self.observed.load(Ordering::SeqCst)
    }

    fn request(&self) {
        self.token.cancel();
    }
}

/// One resident job.
struct Job {
    command: String,
    status: watch::Sender<JobStatus>,
    cancel: Cancellation,
    outcome: Option<JobOutcome>,
    abort: Option<AbortHandle>,
}

impl Job {
    fn status(&self) -> JobStatus {
        *self.status.borrow()
    }

    fn set_status(&self, id: JobId, status: JobStatus) {
        let previous = self.status.send_replace(status);
        tracing::debug!(job = %id, from = %previous, to = %status, "job status");
    }
}

type JobTable = BTreeMap<JobId, Job>;

fn lock(jobs: &Mutex<JobTable>) -> MutexGuard<'_, JobTable> {
    jobs.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Manager for async jobs.
pub struct JobManager {
    /// Counter for generating unique job IDs.
    next_id: AtomicU64,
    /// Resident jobs, in creation order.
    jobs: Arc<Mutex<JobTable>>,
}

impl JobManager {
    /// Create a new job manager.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            jobs: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Start a job.
    ///
    /// `f` receives the new job's id and its cancellation handle and returns
    /// the handler future, which is spawned onto the current tokio runtime.
    /// Returns as soon as the job is scheduled; use [`foreground`] to wait.
    ///
    /// Fails with `ForegroundBusy` when asked to start in the foreground
    /// while another job holds it.
    ///
    /// `f` runs while the job table is locked, so it must only build the
    /// future and not call back into the manager.
    ///
    /// [`foreground`]: JobManager::foreground
    pub fn start<F, Fut>(
        &self,
        command: impl Into<String>,
        background: bool,
        f: F,
    ) -> Result<JobId, JobError>
    where
        F: FnOnce(JobId, Cancellation) -> Fut,
        Fut: Future<Output = Result<Value, CommandError>> + Send + 'static,
    {
        let command = command.into();
        let mut jobs = lock(&self.jobs);

        if !background {
            if let Some(holder) = foreground_holder(&jobs) {
                return Err(JobError::ForegroundBusy(holder));
            }
        }

        let id = JobId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let cancel = Cancellation::new();
        let (status, _) = watch::channel(JobStatus::Created);
        let mut job = Job {
            command: command.clone(),
            status,
            cancel: cancel.clone(),
            outcome: None,
            abort: None,
        };
        tracing::debug!(job = %id, command = %command, background, "job created");
        job.set_status(
            id,
            if background {
                JobStatus::RunningBackground
            } else {
                JobStatus::RunningForeground
            },
        );

        let future = f(id, cancel.clone());
        let table = Arc::clone(&self.jobs);
        let handle = tokio::spawn(async move {
            let result = AssertUnwindSafe(future).catch_unwind().await;
            let outcome = match result {
                Ok(_) if cancel.was_observed() => JobOutcome::Cancelled,
                Ok(Err(CommandError::Cancelled)) => JobOutcome::Cancelled,
                Ok(Ok(value)) => JobOutcome::Completed(value),
                Ok(Err(err)) => {
                    if err.is_unexpected() {
                        tracing::warn!(job = %id, "job failed unexpectedly: {:#}", err);
                    }
                    JobOutcome::Failed(err)
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    tracing::warn!(job = %id, "job panicked: {}", message);
                    JobOutcome::Failed(CommandError::Unexpected(anyhow::anyhow!(
                        "handler panicked: {}",
                        message
                    )))
                }
            };
            finish(&table, id, outcome);
        });

        job.abort = Some(handle.abort_handle());
        jobs.insert(id, job);
        Ok(id)
    }

    /// Wait for a job in the foreground.
    ///
    /// A job that already finished is delivered at once. Otherwise the job
    /// takes the foreground slot and this waits until it finishes or
    /// `interrupt` resolves, whichever comes first. On interrupt the job is
    /// moved to the background and keeps running.
    ///
    /// Delivery removes the job; a second call for the same id fails with
    /// `NotFound`.
    ///
    /// Dropping the returned future before it resolves leaves the job running
    /// in the background, the same as an interrupt.
    pub async fn foreground<I>(&self, id: JobId, interrupt: I) -> Result<Foreground, JobError>
    where
        I: Future,
    {
        let mut changes = {
            let mut jobs = lock(&self.jobs);
            if let Some(outcome) = take_finished(&mut jobs, id)? {
                return Ok(Foreground::Delivered(outcome));
            }
            if let Some(holder) = foreground_holder(&jobs).filter(|h| *h != id) {
                return Err(JobError::ForegroundBusy(holder));
            }
            let job = jobs.get(&id).ok_or(JobError::NotFound(id))?;
            if job.status() != JobStatus::RunningForeground {
                job.set_status(id, JobStatus::RunningForeground);
            }
            job.status.subscribe()
        };
        let _slot = ForegroundSlot { jobs: &self.jobs, id };

        let interrupt = interrupt.fuse();
        tokio::pin!(interrupt);

        loop {
            tokio::select! {
                changed = changes.changed() => {
                    let mut jobs = lock(&self.jobs);
                    if let Some(outcome) = take_finished(&mut jobs, id)? {
                        return Ok(Foreground::Delivered(outcome));
                    }
                    if jobs.get(&id).map(Job::status) == Some(JobStatus::RunningBackground) {
                        return Ok(Foreground::Backgrounded(id));
                    }
                    if changed.is_err() {
                        return Err(JobError::NotFound(id));
                    }
                }
                _ = &mut interrupt => {
                    let mut jobs = lock(&self.jobs);
                    if let Some(outcome) = take_finished(&mut jobs, id)? {
                        return Ok(Foreground::Delivered(outcome));
                    }
                    background_locked(&jobs, id)?;
                    return Ok(Foreground::Backgrounded(id));
                }
            }
        }
    }

    /// Move a foreground job to the background without interrupting it.
    pub fn request_background(&self, id: JobId) -> Result<(), JobError> {
        let jobs = lock(&self.jobs);
        background_locked(&jobs, id)
    }

    /// Ask a job to stop at its next suspension point.
    ///
    /// A job that never looks keeps running and finishes normally.
    pub fn request_cancel(&self, id: JobId) -> Result<(), JobError> {
        let jobs = lock(&self.jobs);
        let job = jobs.get(&id).ok_or(JobError::NotFound(id))?;
        if !job.status().is_running() {
            return Err(JobError::AlreadyFinished(id));
        }
        tracing::debug!(job = %id, "cancellation requested");
        job.cancel.request();
        Ok(())
    }

    /// Current status of a resident job.
    pub fn status_of(&self, id: JobId) -> Option<JobStatus> {
        lock(&self.jobs).get(&id).map(Job::status)
    }

    /// All resident jobs, oldest first.
    pub fn list(&self) -> Vec<JobInfo> {
        lock(&self.jobs)
            .iter()
            .map(|(id, job)| JobInfo {
                id: *id,
                command: job.command.clone(),
                status: job.status(),
            })
            .collect()
    }

    /// Number of resident jobs.
    pub fn len(&self) -> usize {
        lock(&self.jobs).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.jobs).is_empty()
    }

    /// Check if a specific job is resident.
    pub fn exists(&self, id: JobId) -> bool {
        lock(&self.jobs).contains_key(&id)
    }

    /// The newest resident job.
    pub fn most_recent(&self) -> Option<JobId> {
        lock(&self.jobs).keys().next_back().copied()
    }

    /// Cancel and abort every resident job and drop them from the table.
    ///
    /// Unlike `request_cancel`, this does not wait for handlers to notice.
    /// Returns how many jobs were dropped.
    pub fn abort_all(&self) -> usize {
        let drained = std::mem::take(&mut *lock(&self.jobs));
        for (id, job) in &drained {
            job.cancel.request();
            if let Some(abort) = &job.abort {
                abort.abort();
            }
            tracing::debug!(job = %id, "job aborted");
        }
        drained.len()
    }
}

impl Default for JobManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Held while `foreground` waits. Gives the slot up if the wait is abandoned.
struct ForegroundSlot<'a> {
    jobs: &'a Mutex<JobTable>,
    id: JobId,
}

impl Drop for ForegroundSlot<'_> {
    fn drop(&mut self) {
        let jobs = lock(self.jobs);
        if let Some(job) = jobs.get(&self.id) {
            if job.status() == JobStatus::RunningForeground {
                tracing::debug!(job = %self.id, "foreground wait abandoned");
                job.set_status(self.id, JobStatus::RunningBackground);
            }
        }
    }
}

fn foreground_holder(jobs: &JobTable) -> Option<JobId> {
    jobs.iter()
        .find(|(_, job)| job.status() == JobStatus::RunningForeground)
        .map(|(id, _)| *id)
}

/// Remove and return a finished job's outcome. `Ok(None)` if still running.
fn take_finished(jobs: &mut JobTable, id: JobId) -> Result<Option<JobOutcome>, JobError> {
    let job = jobs.get(&id).ok_or(JobError::NotFound(id))?;
    if job.outcome.is_none() {
        return Ok(None);
    }
    let outcome = jobs.remove(&id).and_then(|job| job.outcome);
    tracing::debug!(job = %id, "job delivered");
    Ok(outcome)
}

fn background_locked(jobs: &JobTable, id: JobId) -> Result<(), JobError> {
    let job = jobs.get(&id).ok_or(JobError::NotFound(id))?;
    match job.status() {
        JobStatus::RunningForeground => {
            job.set_status(id, JobStatus::RunningBackground);
            Ok(())
        }
        status if status.is_terminal() => Err(JobError::AlreadyFinished(id)),
        _ => Err(JobError::NotInForeground(id)),
    }
}

/// Record a job's outcome. The job stays resident until delivered.
fn finish(jobs: &Mutex<JobTable>, id: JobId, outcome: JobOutcome) {
    let mut jobs = lock(jobs);
    match jobs.get_mut(&id) {
        Some(job) => {
            let status = outcome.status();
            job.outcome = Some(outcome);
            job.abort = None;
            job.set_status(id, status);
        }
        None => tracing::debug!(job = %id, "finished job no longer resident"),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn quick(value: i64) -> impl FnOnce(JobId, Cancellation) -> futures::future::Ready<Result<Value, CommandError>> {
        move |_, _| futures::future::ready(Ok(Value::Int(value)))
    }

    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn ids_increase_and_are_never_reused() {
        let manager = JobManager::new();
        let a = manager.start("a", true, quick(1)).expect("start");
        settle().await;
        manager
            .foreground(a, futures::future::pending::<()>())
            .await
            .expect("deliver");
        let b = manager.start("b", true, quick(2)).expect("start");
        let c = manager.start("c", true, quick(3)).expect("start");
        assert!(a < b && b < c);
        assert_eq!(b, JobId(2));
    }

    #[tokio::test]
    async fn foreground_delivers_once() {
        let manager = JobManager::new();
        let id = manager.start("sum", true, quick(7)).expect("start");
        settle().await;
        assert_eq!(manager.status_of(id), Some(JobStatus::Completed));

        let first = manager
            .foreground(id, futures::future::pending::<()>())
            .await
            .expect("deliver");
        assert!(matches!(first, Foreground::Delivered(JobOutcome::Completed(Value::Int(7)))));
        assert!(!manager.exists(id));

        let second = manager
            .foreground(id, futures::future::pending::<()>())
            .await
            .expect_err("already delivered");
        assert_eq!(second, JobError::NotFound(id));
        assert_eq!(second.to_string(), format!("Could not find a running job for {}", id));
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let manager = JobManager::new();
        let err = manager
            .foreground(JobId(42), futures::future::pending::<()>())
            .await
            .expect_err("no such job");
        assert_eq!(err, JobError::NotFound(JobId(42)));
    }

    #[tokio::test(start_paused = true)]
    async fn foreground_waits_for_completion() {
        let manager = JobManager::new();
        let id = manager
            .start("slow", false, |_, cancel| async move {
                cancel.sleep(Duration::from_secs(5)).await?;
                Ok::<_, CommandError>(Value::from("done"))
            })
            .expect("start");
        assert_eq!(manager.status_of(id), Some(JobStatus::RunningForeground));

        let delivered = manager
            .foreground(id, futures::future::pending::<()>())
            .await
            .expect("deliver");
        assert!(matches!(delivered, Foreground::Delivered(JobOutcome::Completed(_))));
        assert!(manager.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_backgrounds_without_stopping() {
        let manager = JobManager::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let id = manager
            .start("ticker", false, move |_, cancel| async move {
                for _ in 0..3 {
                    cancel.sleep(Duration::from_secs(1)).await?;
                    counter.fetch_add(1, Ordering::SeqCst);
                }
                Ok::<_, CommandError>(Value::Null)
            })
            .expect("start");

        let waited = manager
            .foreground(id, tokio::time::sleep(Duration::from_millis(1500)))
            .await
            .expect("wait");
        assert!(matches!(waited, Foreground::Backgrounded(j) if j == id));
        assert_eq!(manager.status_of(id), Some(JobStatus::RunningBackground));
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert_eq!(manager.status_of(id), Some(JobStatus::Completed));
    }

    #[tokio::test]
    async fn only_one_foreground_job() {
        let manager = JobManager::new();
        let first = manager
            .start("a", false, |_, cancel| async move {
                cancel.cancelled().await;
                Err(CommandError::Cancelled)
            })
            .expect("start");
        let err = manager.start("b", false, quick(1)).expect_err("busy");
        assert_eq!(err, JobError::ForegroundBusy(first));

        manager.request_background(first).expect("background");
        manager.start("b", false, quick(1)).expect("slot is free");
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_wait_frees_the_foreground() {
        let manager = JobManager::new();
        let id = manager
            .start("forever", false, |_, cancel| async move {
                cancel.cancelled().await;
                Err(CommandError::Cancelled)
            })
            .expect("start");

        let waited = tokio::time::timeout(
            Duration::from_secs(1),
            manager.foreground(id, futures::future::pending::<()>()),
        )
        .await;
        assert!(waited.is_err());
        assert_eq!(manager.status_of(id), Some(JobStatus::RunningBackground));

        let next = manager.start("next", false, quick(1)).expect("slot is free");
        let delivered = manager
            .foreground(next, futures::future::pending::<()>())
            .await
            .expect("deliver");
        assert!(matches!(delivered, Foreground::Delivered(JobOutcome::Completed(Value::Int(1)))));
        assert_eq!(manager.status_of(id), Some(JobStatus::RunningBackground));
    }

    #[tokio::test]
    async fn ready_interrupt_still_delivers_a_finished_job() {
        let manager = JobManager::new();
        let id = manager.start("done", true, quick(3)).expect("start");
        settle().await;

        let result = manager
            .foreground(id, futures::future::ready(()))
            .await
            .expect("deliver");
        assert!(matches!(result, Foreground::Delivered(JobOutcome::Completed(Value::Int(3)))));
        assert!(manager.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_racing_completion_resolves_one_way() {
        let manager = JobManager::new();
        let id = manager
            .start("tick", false, |_, cancel| async move {
                cancel.sleep(Duration::from_secs(1)).await?;
                Ok::<_, CommandError>(Value::Int(9))
            })
            .expect("start");

        let result = manager
            .foreground(id, tokio::time::sleep(Duration::from_secs(1)))
            .await
            .expect("wait");
        match result {
            Foreground::Delivered(outcome) => {
                assert!(matches!(outcome, JobOutcome::Completed(Value::Int(9))));
                assert!(!manager.exists(id));
            }
            Foreground::Backgrounded(j) => {
                assert_eq!(j, id);
                settle().await;
                assert_eq!(manager.status_of(id), Some(JobStatus::Completed));
                let later = manager
                    .foreground(id, futures::future::pending::<()>())
                    .await
                    .expect("deliver");
                assert!(matches!(later, Foreground::Delivered(JobOutcome::Completed(Value::Int(9)))));
                assert!(manager.is_empty());
            }
        }
        assert!(manager
            .list()
            .iter()
            .all(|job| job.status != JobStatus::RunningForeground));
    }

    #[tokio::test]
    async fn finished_job_cannot_be_backgrounded() {
        let manager = JobManager::new();
        let id = manager.start("done", false, quick(1)).expect("start");
        settle().await;
        assert_eq!(manager.status_of(id), Some(JobStatus::Completed));
        assert_eq!(manager.request_background(id), Err(JobError::AlreadyFinished(id)));
        assert_eq!(manager.status_of(id), Some(JobStatus::Completed));
    }

    #[tokio::test]
    async fn background_request_needs_foreground() {
        let manager = JobManager::new();
        let id = manager
            .start("bg", true, |_, cancel| async move {
                cancel.cancelled().await;
                Ok(Value::Null)
            })
            .expect("start");
        assert_eq!(manager.request_background(id), Err(JobError::NotInForeground(id)));
        assert_eq!(
            manager.request_background(JobId(99)),
            Err(JobError::NotFound(JobId(99)))
        );
    }

    #[tokio::test]
    async fn observed_cancellation_finishes_cancelled_after_cleanup() {
        let manager = JobManager::new();
        let cleaned = Arc::new(AtomicBool::new(false));
        let flag = cleaned.clone();
        let id = manager
            .start("loop", true, move |_, cancel| async move {
                loop {
                    if cancel.checkpoint().await.is_err() {
                        flag.store(true, Ordering::SeqCst);
                        return Ok(Value::from("partial"));
                    }
                }
            })
            .expect("start");

        settle().await;
        manager.request_cancel(id).expect("cancel");
        settle().await;

        assert!(cleaned.load(Ordering::SeqCst));
        assert_eq!(manager.status_of(id), Some(JobStatus::Cancelled));
        assert_eq!(manager.request_cancel(id), Err(JobError::AlreadyFinished(id)));
    }

    #[tokio::test]
    async fn unobserved_cancellation_runs_to_completion() {
        let manager = JobManager::new();
        let id = manager
            .start("stubborn", true, |_, _cancel| async move {
                let mut total = 0i64;
                for n in 0..1000 {
                    total += n;
                }
                Ok(Value::Int(total))
            })
            .expect("start");
        manager.request_cancel(id).expect("cancel");

        let delivered = manager
            .foreground(id, futures::future::pending::<()>())
            .await
            .expect("deliver");
        assert!(matches!(delivered, Foreground::Delivered(JobOutcome::Completed(Value::Int(499500)))));
    }

    #[tokio::test]
    async fn handler_errors_and_panics_fail_the_job() {
        let manager = JobManager::new();
        let failed = manager
            .start("fails", true, |_, _| async { Err(CommandError::failed("nope")) })
            .expect("start");
        let panicked = manager
            .start("panics", true, |_, _| async {
                if true {
                    panic!("boom");
                }
                Ok(Value::Null)
            })
            .expect("start");
        settle().await;

        assert_eq!(manager.status_of(failed), Some(JobStatus::Failed));
        assert_eq!(manager.status_of(panicked), Some(JobStatus::Failed));

        let Foreground::Delivered(JobOutcome::Failed(err)) = manager
            .foreground(panicked, futures::future::pending::<()>())
            .await
            .expect("deliver")
        else {
            panic!("expected a failed outcome");
        };
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn list_is_in_creation_order() {
        let manager = JobManager::new();
        for name in ["one", "two", "three"] {
            manager
                .start(name, true, |_, cancel| async move {
                    cancel.cancelled().await;
                    Ok(Value::Null)
                })
                .expect("start");
        }
        let names: Vec<_> = manager.list().into_iter().map(|j| j.command).collect();
        assert_eq!(names, vec!["one", "two", "three"]);
        assert_eq!(manager.most_recent(), Some(JobId(3)));
        assert_eq!(manager.len(), 3);
    }

    #[tokio::test]
    async fn abort_all_empties_the_table() {
        let manager = JobManager::new();
        manager
            .start("forever", true, |_, _| futures::future::pending())
            .expect("start");
        assert_eq!(manager.abort_all(), 1);
        assert!(manager.is_empty());
        settle().await;
        assert!(manager.is_empty());
    }
}
