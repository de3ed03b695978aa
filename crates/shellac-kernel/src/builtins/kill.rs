//! kill: ask a job to stop.

use shellac_types::{ExecResult, EXIT_FAILURE};

use crate::params::{Args, ParamSpec, Validator};
use crate::registry::CommandSpec;
use crate::shell::Shell;

use super::{command, target_job, Builtin};

pub(super) fn spec<C: Send + Sync + 'static>() -> CommandSpec<C> {
    command("kill", Builtin::Kill)
        .docs(
            "Cancel a running job\n\n\
             The job stops at its next suspension point. \
             Jobs that never suspend run to completion.",
        )
        .param(
            ParamSpec::positional("job", Validator::Int)
                .optional()
                .describe("Job ID (defaults to the most recent job)"),
        )
}

pub(super) fn run<C: Send + Sync + 'static>(args: Args, shell: &Shell<C>) -> ExecResult {
    let id = match target_job(&args, shell) {
        Ok(id) => id,
        Err(result) => return result,
    };
    match shell.jobs().request_cancel(id) {
        Ok(()) => ExecResult::success(format!("Cancellation requested for job {}", id)),
        Err(e) => ExecResult::failure(EXIT_FAILURE, e.to_string()),
    }
}
