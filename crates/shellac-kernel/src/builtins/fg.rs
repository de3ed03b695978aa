//! fg: bring a job to the foreground and deliver its result.

use shellac_types::ExecResult;

use crate::params::{Args, ParamSpec, Validator};
use crate::registry::CommandSpec;
use crate::shell::Shell;

use super::{command, target_job, Builtin};

pub(super) fn spec<C: Send + Sync + 'static>() -> CommandSpec<C> {
    command("fg", Builtin::Fg)
        .docs(
            "Bring a job to the foreground\n\n\
             Waits for the job to finish and shows its result. \
             Press Ctrl-C to send it back to the background.",
        )
        .param(
            ParamSpec::positional("job", Validator::Int)
                .optional()
                .describe("Job ID (defaults to the most recent job)"),
        )
}

pub(super) async fn run<C: Send + Sync + 'static>(args: Args, shell: &Shell<C>) -> ExecResult {
    let id = match target_job(&args, shell) {
        Ok(id) => id,
        Err(result) => return result,
    };
    shell.foreground_job(id).await
}
