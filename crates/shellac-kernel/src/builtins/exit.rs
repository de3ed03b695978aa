//! exit: leave the shell.

use shellac_types::{ExecResult, EXIT_FAILURE};

use crate::params::{Args, ParamSpec};
use crate::registry::CommandSpec;
use crate::shell::Shell;

use super::{command, Builtin};

pub(super) fn spec<C: Send + Sync + 'static>() -> CommandSpec<C> {
    command("exit", Builtin::Exit)
        .alias("quit")
        .alias("q")
        .docs("Exit the shell\n\nRefuses while jobs are still resident unless -abort_jobs is given.")
        .param(ParamSpec::flag("abort_jobs").describe("Cancel all running jobs and exit"))
}

pub(super) fn run<C: Send + Sync + 'static>(args: Args, shell: &Shell<C>) -> ExecResult {
    let jobs = shell.jobs();
    if !jobs.is_empty() {
        if !args.has_flag("abort_jobs") {
            let count = jobs.len();
            return ExecResult::failure(
                EXIT_FAILURE,
                format!(
                    "There {} {} running job{}. Use `exit -abort_jobs` to exit anyway.",
                    if count == 1 { "is" } else { "are" },
                    count,
                    if count == 1 { "" } else { "s" },
                ),
            );
        }
        let aborted = jobs.abort_all();
        tracing::debug!(aborted, "jobs aborted on exit");
    }
    shell.request_exit();
    ExecResult::success("")
}
