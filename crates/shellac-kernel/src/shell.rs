//! The Shell: registry, job manager and executor wired together.
//!
//! ```text
//! line ─▶ parser ─▶ [ChainLink] ─▶ run_chain ─▶ Shell::run_link
//!                                                   │
//!                         registry.resolve ◀────────┤
//!                         resolver::resolve ◀───────┤
//!                                                   ▼
//!                              sync handler │ JobManager │ builtin
//! ```

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;

use shellac_types::{ExecResult, JobId, EXIT_FAILURE, EXIT_USAGE};

use crate::builtins::{self, Builtin};
use crate::executor::{self, LinkObserver, LinkRunner};
use crate::handler::{CommandError, Handler, JobContext, SyncCommand};
use crate::params::Args;
use crate::parser::{self, ChainLink, ChainOp};
use crate::registry::{CommandSpec, RegistrationConflict, Registry};
use crate::scheduler::{Foreground, JobManager};

/// Message of the day, fixed or computed when shown.
#[derive(Clone)]
pub enum Motd {
    Text(String),
    Dynamic(Arc<dyn Fn() -> String + Send + Sync>),
}

impl Motd {
    /// The text to print now.
    pub fn render(&self) -> String {
        match self {
            Motd::Text(text) => text.clone(),
            Motd::Dynamic(supplier) => supplier(),
        }
    }
}

impl std::fmt::Debug for Motd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Motd::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Motd::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Configuration for a shell.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Program name, used for the history directory and messages.
    pub program: String,

    /// Prompt shown before each line.
    pub prompt: String,

    /// Message of the day, printed when the REPL starts.
    pub motd: Option<Motd>,

    /// Where to load and save line history. `None` disables history.
    pub history_file: Option<PathBuf>,

    /// Whether non-interactive runs exit with the chain's status code.
    ///
    /// When false, a non-interactive run always exits 0.
    pub propagate_exit_code: bool,

    /// Run this one command with the process arguments instead of a REPL.
    pub single_command: Option<String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: "shellac".to_string(),
            prompt: "> ".to_string(),
            motd: None,
            history_file: None,
            propagate_exit_code: true,
            single_command: None,
        }
    }
}

impl ShellConfig {
    /// A config for the named program.
    pub fn named(program: &str) -> Self {
        Self {
            program: program.to_string(),
            ..Self::default()
        }
    }

    /// A config named after `argv[0]`.
    pub fn from_env_args() -> Self {
        let program = std::env::args()
            .next()
            .and_then(|arg0| {
                PathBuf::from(arg0)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "shellac".to_string());
        Self::named(&program)
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_motd(mut self, motd: impl Into<String>) -> Self {
        self.motd = Some(Motd::Text(motd.into()));
        self
    }

    /// Compute the message of the day each time the REPL starts.
    pub fn with_motd_fn<F>(mut self, supplier: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.motd = Some(Motd::Dynamic(Arc::new(supplier)));
        self
    }

    pub fn with_history_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.history_file = Some(path.into());
        self
    }

    pub fn with_exit_code_propagation(mut self, propagate: bool) -> Self {
        self.propagate_exit_code = propagate;
        self
    }

    pub fn with_single_command(mut self, command: impl Into<String>) -> Self {
        self.single_command = Some(command.into());
        self
    }
}

/// Source of the out-of-band interrupt that backgrounds a foreground job.
///
/// `wait` is called once per foreground wait; the returned future resolves
/// when the user asks to get their prompt back.
pub trait Interrupt: Send + Sync {
    fn wait(&self) -> BoxFuture<'static, ()>;
}

impl<F> Interrupt for F
where
    F: Fn() -> BoxFuture<'static, ()> + Send + Sync,
{
    fn wait(&self) -> BoxFuture<'static, ()> {
        self()
    }
}

/// An interrupt that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInterrupt;

impl Interrupt for NoInterrupt {
    fn wait(&self) -> BoxFuture<'static, ()> {
        futures::future::pending().boxed()
    }
}

/// The notice printed when a job ends up in the background.
pub fn background_notice(id: JobId) -> String {
    format!("Job {} is running in the background", id)
}

/// A command shell over application context `C`.
pub struct Shell<C = ()> {
    registry: Registry<C>,
    start_command: Option<Arc<CommandSpec<C>>>,
    exit_command: Option<Arc<CommandSpec<C>>>,
    jobs: Arc<JobManager>,
    app: Arc<C>,
    config: ShellConfig,
    interrupt: Arc<dyn Interrupt>,
    exit_requested: AtomicBool,
}

impl<C: Send + Sync + 'static> Shell<C> {
    /// Create a shell with the default config.
    pub fn new(app: C) -> Self {
        Self::with_config(app, ShellConfig::default())
    }

    /// Create a shell. Builtins are registered up front.
    pub fn with_config(app: C, config: ShellConfig) -> Self {
        let mut registry = Registry::new();
        for builtin in Builtin::ALL {
            if let Err(e) = registry.register(builtin.spec()) {
                tracing::error!("failed to register builtin {:?}: {}", builtin, e);
            }
        }
        Self {
            registry,
            start_command: None,
            exit_command: None,
            jobs: Arc::new(JobManager::new()),
            app: Arc::new(app),
            config,
            interrupt: Arc::new(NoInterrupt),
            exit_requested: AtomicBool::new(false),
        }
    }

    /// Replace the interrupt source.
    pub fn with_interrupt(mut self, interrupt: impl Interrupt + 'static) -> Self {
        self.interrupt = Arc::new(interrupt);
        self
    }

    /// Register an application command.
    pub fn register(&mut self, spec: CommandSpec<C>) -> Result<(), RegistrationConflict> {
        self.registry.register(spec).map(|_| ())
    }

    /// Set the command run once before the REPL takes input.
    ///
    /// It is not reachable by name. Only one may be set.
    pub fn set_start_command(&mut self, spec: CommandSpec<C>) -> Result<(), RegistrationConflict> {
        if let Some(existing) = &self.start_command {
            return Err(RegistrationConflict::StartCommandDefined(existing.display_name()));
        }
        tracing::debug!(command = %spec.display_name(), "registered start command");
        self.start_command = Some(Arc::new(spec));
        Ok(())
    }

    /// Set the command run once when the program exits.
    ///
    /// It is not reachable by name and should take no arguments. Only one
    /// may be set.
    pub fn set_exit_command(&mut self, spec: CommandSpec<C>) -> Result<(), RegistrationConflict> {
        if let Some(existing) = &self.exit_command {
            return Err(RegistrationConflict::ExitCommandDefined(existing.display_name()));
        }
        tracing::debug!(command = %spec.display_name(), "registered exit command");
        self.exit_command = Some(Arc::new(spec));
        Ok(())
    }

    /// Run the start command, if one is set.
    pub async fn run_start_command(&self, args: Vec<String>) -> Option<ExecResult> {
        let spec = self.start_command.clone()?;
        Some(self.run_spec(&spec, &args, spec.display_name()).await)
    }

    /// Run the exit command, if one is set.
    pub async fn run_exit_command(&self) -> Option<ExecResult> {
        let spec = self.exit_command.clone()?;
        Some(self.run_spec(&spec, &[], spec.display_name()).await)
    }

    pub fn registry(&self) -> &Registry<C> {
        &self.registry
    }

    pub fn jobs(&self) -> &Arc<JobManager> {
        &self.jobs
    }

    /// The shared application context.
    pub fn app(&self) -> &Arc<C> {
        &self.app
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// True once `exit` has run successfully.
    pub fn exit_requested(&self) -> bool {
        self.exit_requested.load(Ordering::SeqCst)
    }

    pub(crate) fn request_exit(&self) {
        self.exit_requested.store(true, Ordering::SeqCst);
    }

    /// Execute one input line.
    pub async fn execute(&self, line: &str) -> ExecResult {
        self.execute_streaming(line, &mut |_, _| {}).await
    }

    /// Execute one input line, reporting each link's result as it finishes.
    ///
    /// A parse error aborts the whole line before anything runs.
    pub async fn execute_streaming(&self, line: &str, observer: &mut LinkObserver<'_>) -> ExecResult {
        let links = match parser::parse(line) {
            Ok(links) => links,
            Err(errors) => {
                let message = errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                return ExecResult::failure(EXIT_USAGE, format!("parse error: {}", message));
            }
        };
        executor::run_chain(self, &links, observer).await
    }

    /// Execute already-split words as a single command, without parsing.
    ///
    /// Used for single-command programs where the words come straight from
    /// the process arguments.
    pub async fn execute_words(&self, words: Vec<String>) -> ExecResult {
        let link = ChainLink {
            words,
            op: ChainOp::None,
            span: (0..0).into(),
        };
        self.run_link(&link).await
    }

    /// Wait for a job in the foreground, honouring the interrupt source.
    pub async fn foreground_job(&self, id: JobId) -> ExecResult {
        match self.jobs.foreground(id, self.interrupt.wait()).await {
            Ok(Foreground::Delivered(outcome)) => executor::outcome_result(outcome),
            Ok(Foreground::Backgrounded(id)) => ExecResult::success(background_notice(id)),
            Err(e) => ExecResult::failure(EXIT_FAILURE, e.to_string()),
        }
    }

    /// Resolve `raw` against `spec` and run it.
    ///
    /// `command` is the text recorded for a job started by this call.
    async fn run_spec(&self, spec: &CommandSpec<C>, raw: &[String], command: String) -> ExecResult {
        let invocation = match spec.resolve_args(raw) {
            Ok(invocation) => invocation,
            Err(e) => return ExecResult::failure(e.exit_code(), e.to_string()),
        };
        if invocation.help {
            return ExecResult::success(builtins::describe(spec));
        }
        let name = spec.display_name();
        tracing::debug!(command = %name, "running");

        match &spec.handler {
            Handler::Sync(handler) => self.run_sync(handler, invocation.args, &name),
            Handler::Builtin(builtin) => builtin.run(invocation.args, self).await,
            Handler::Async(handler) => {
                let background = invocation.background || spec.background;
                let handler = Arc::clone(handler);
                let app = Arc::clone(&self.app);
                let args = invocation.args;
                let started = self.jobs.start(command, background, move |id, cancel| {
                    let ctx = JobContext::new(app, id, cancel);
                    async move { handler.run(args, ctx).await }
                });
                match started {
                    Ok(id) if background => ExecResult::success(background_notice(id)),
                    Ok(id) => self.foreground_job(id).await,
                    Err(e) => ExecResult::failure(EXIT_FAILURE, e.to_string()),
                }
            }
        }
    }

    fn run_sync(&self, handler: &Arc<dyn SyncCommand<C>>, args: Args, name: &str) -> ExecResult {
        let app: &C = &self.app;
        match std::panic::catch_unwind(AssertUnwindSafe(|| handler.call(args, app))) {
            Ok(Ok(value)) => ExecResult::success_data(value),
            Ok(Err(err)) => {
                if err.is_unexpected() {
                    tracing::warn!(command = %name, "command failed unexpectedly: {:#}", err);
                }
                executor::error_result(&err)
            }
            Err(_) => {
                tracing::warn!(command = %name, "command panicked");
                executor::error_result(&CommandError::Unexpected(anyhow::anyhow!(
                    "{} panicked",
                    name
                )))
            }
        }
    }
}

#[async_trait]
impl<C: Send + Sync + 'static> LinkRunner for Shell<C> {
    async fn run_link(&self, link: &ChainLink) -> ExecResult {
        let (spec, consumed) = match self.registry.resolve(&link.words) {
            Ok(found) => found,
            Err(e) => return ExecResult::failure(e.exit_code(), e.to_string()),
        };
        self.run_spec(&spec, &link.words[consumed..], link.display_words())
            .await
    }
}
