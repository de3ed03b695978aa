//! Shell-level commands every shell gets for free.
//!
//! These need the job table, the registry or the exit flag, so they are
//! dispatched by the shell itself rather than through the application's
//! handler contract.

mod exit;
mod fg;
mod help;
mod jobs;
mod kill;

pub(crate) use help::describe;

use shellac_types::{ExecResult, JobId, EXIT_FAILURE, EXIT_USAGE};

use crate::handler::Handler;
use crate::params::Args;
use crate::registry::CommandSpec;
use crate::scheduler::JobError;
use crate::shell::Shell;

/// Help heading for the commands below.
pub const GROUP: &str = "Built-in Commands";

/// Built-in commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Help,
    Exit,
    Fg,
    Jobs,
    Kill,
}

impl Builtin {
    pub const ALL: [Builtin; 5] = [
        Builtin::Help,
        Builtin::Exit,
        Builtin::Fg,
        Builtin::Jobs,
        Builtin::Kill,
    ];

    /// Registration record for this builtin.
    pub fn spec<C: Send + Sync + 'static>(self) -> CommandSpec<C> {
        let spec = match self {
            Builtin::Help => help::spec(),
            Builtin::Exit => exit::spec(),
            Builtin::Fg => fg::spec(),
            Builtin::Jobs => jobs::spec(),
            Builtin::Kill => kill::spec(),
        };
        spec.group(GROUP)
    }

    pub(crate) async fn run<C: Send + Sync + 'static>(self, args: Args, shell: &Shell<C>) -> ExecResult {
        match self {
            Builtin::Help => help::run(args, shell),
            Builtin::Exit => exit::run(args, shell),
            Builtin::Fg => fg::run(args, shell).await,
            Builtin::Jobs => jobs::run(shell),
            Builtin::Kill => kill::run(args, shell),
        }
    }
}

fn command<C: Send + Sync + 'static>(name: &str, builtin: Builtin) -> CommandSpec<C> {
    CommandSpec::new(name, Handler::Builtin(builtin))
}

/// The job named by the `job` argument, or the most recent one.
fn target_job<C: Send + Sync + 'static>(args: &Args, shell: &Shell<C>) -> Result<JobId, ExecResult> {
    match args.get_int("job") {
        Some(n) if n > 0 => Ok(JobId(n as u64)),
        Some(n) => Err(ExecResult::failure(EXIT_USAGE, format!("job: invalid job id {}", n))),
        None => shell
            .jobs()
            .most_recent()
            .ok_or_else(|| ExecResult::failure(EXIT_FAILURE, JobError::NoJobs.to_string())),
    }
}
