//! The handler contract: what a registered command runs.
//!
//! Handlers come in two flavours. Sync handlers run inline, start to finish,
//! and never create a job. Async handlers run as jobs under the
//! [`JobManager`](crate::scheduler::JobManager) and may suspend, be sent to
//! the background, or be cancelled at their own suspension points.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shellac_types::{JobId, Value};

use crate::builtins::Builtin;
use crate::params::Args;
use crate::scheduler::Cancellation;

/// What a handler returns.
pub type CommandResult = Result<Value, CommandError>;

/// A handler's failure.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Expected failure with a message for the user.
    #[error("{0}")]
    Failed(String),

    /// Anything else that went wrong inside the handler.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),

    /// The handler saw a cancellation request and stopped.
    #[error("cancelled")]
    Cancelled,
}

impl CommandError {
    /// Deliberate failure with a user-facing message.
    pub fn failed(message: impl Into<String>) -> Self {
        CommandError::Failed(message.into())
    }

    /// True for faults the handler did not mean to raise.
    pub fn is_unexpected(&self) -> bool {
        matches!(self, CommandError::Unexpected(_))
    }
}

/// A handler that runs to completion without suspending.
pub trait SyncCommand<C>: Send + Sync {
    fn call(&self, args: Args, app: &C) -> CommandResult;
}

impl<C, F> SyncCommand<C> for F
where
    F: Fn(Args, &C) -> CommandResult + Send + Sync,
{
    fn call(&self, args: Args, app: &C) -> CommandResult {
        self(args, app)
    }
}

/// A handler that runs as a job.
///
/// Implement this for stateful commands; plain async closures can use
/// [`Handler::async_fn`].
#[async_trait]
pub trait AsyncCommand<C: Send + Sync + 'static>: Send + Sync {
    async fn run(&self, args: Args, ctx: JobContext<C>) -> CommandResult;
}

/// Adapter that lets an async closure act as an [`AsyncCommand`].
pub struct AsyncFn<F>(pub F);

#[async_trait]
impl<C, F, Fut> AsyncCommand<C> for AsyncFn<F>
where
    C: Send + Sync + 'static,
    F: Fn(Args, JobContext<C>) -> Fut + Send + Sync,
    Fut: Future<Output = CommandResult> + Send + 'static,
{
    async fn run(&self, args: Args, ctx: JobContext<C>) -> CommandResult {
        (self.0)(args, ctx).await
    }
}

/// The code behind a command.
pub enum Handler<C> {
    Sync(Arc<dyn SyncCommand<C>>),
    Async(Arc<dyn AsyncCommand<C>>),
    /// Shell-level commands that need the job table or registry.
    Builtin(Builtin),
}

impl<C: Send + Sync + 'static> Handler<C> {
    /// Wrap a plain function or closure.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Args, &C) -> CommandResult + Send + Sync + 'static,
    {
        Handler::Sync(Arc::new(f))
    }

    /// Wrap an async closure.
    pub fn async_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Args, JobContext<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandResult> + Send + 'static,
    {
        Handler::Async(Arc::new(AsyncFn(f)))
    }

    /// Wrap an [`AsyncCommand`] implementation.
    pub fn from_async(command: impl AsyncCommand<C> + 'static) -> Self {
        Handler::Async(Arc::new(command))
    }

    /// True for handlers that run as jobs.
    pub fn is_async(&self) -> bool {
        matches!(self, Handler::Async(_))
    }
}

impl<C> Clone for Handler<C> {
    fn clone(&self) -> Self {
        match self {
            Handler::Sync(h) => Handler::Sync(Arc::clone(h)),
            Handler::Async(h) => Handler::Async(Arc::clone(h)),
            Handler::Builtin(b) => Handler::Builtin(*b),
        }
    }
}

impl<C> std::fmt::Debug for Handler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handler::Sync(_) => f.write_str("Handler::Sync"),
            Handler::Async(_) => f.write_str("Handler::Async"),
            Handler::Builtin(b) => write!(f, "Handler::Builtin({:?})", b),
        }
    }
}

/// Everything an async handler gets besides its arguments.
///
/// The application context is shared with every other handler; what may be
/// mutated through it, and how, is up to the application.
pub struct JobContext<C> {
    app: Arc<C>,
    job: JobId,
    cancel: Cancellation,
}

impl<C> Clone for JobContext<C> {
    fn clone(&self) -> Self {
        Self {
            app: Arc::clone(&self.app),
            job: self.job,
            cancel: self.cancel.clone(),
        }
    }
}

impl<C> JobContext<C> {
    pub fn new(app: Arc<C>, job: JobId, cancel: Cancellation) -> Self {
        Self { app, job, cancel }
    }

    /// The shared application context.
    pub fn app(&self) -> &C {
        &self.app
    }

    pub fn job_id(&self) -> JobId {
        self.job
    }

    /// Suspension point. Yields to the scheduler, then reports a pending
    /// cancellation as `Err(CommandError::Cancelled)`.
    pub async fn checkpoint(&self) -> Result<(), CommandError> {
        self.cancel.checkpoint().await
    }

    /// Suspend for `duration`, waking early if the job is cancelled.
    pub async fn sleep(&self, duration: Duration) -> Result<(), CommandError> {
        self.cancel.sleep(duration).await
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Poll for a cancellation request without suspending.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_sync_commands() {
        let handler: Handler<u32> = Handler::sync(|args: Args, base: &u32| {
            let n = args.get_int("n").unwrap_or(0);
            Ok(Value::Int(n + i64::from(*base)))
        });
        let Handler::Sync(h) = handler else {
            panic!("expected a sync handler");
        };
        let mut args = Args::new();
        args.insert("n", Value::Int(2));
        assert_eq!(h.call(args, &40).expect("should succeed"), Value::Int(42));
    }

    #[test]
    fn async_fn_is_async() {
        let handler: Handler<()> = Handler::async_fn(|_args, _ctx| async { Ok(Value::Null) });
        assert!(handler.is_async());
        assert!(!Handler::<()>::sync(|_, _| Ok(Value::Null)).is_async());
    }

    #[test]
    fn anyhow_errors_are_unexpected() {
        fn fails() -> Result<Value, CommandError> {
            let n: i64 = "x".parse().map_err(anyhow::Error::from)?;
            Ok(Value::Int(n))
        }
        let err = fails().expect_err("should fail");
        assert!(err.is_unexpected());
        assert!(!CommandError::failed("nope").is_unexpected());
    }
}
