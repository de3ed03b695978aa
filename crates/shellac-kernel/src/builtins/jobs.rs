//! jobs: list resident jobs.

use std::fmt::Write;

use shellac_types::{ExecResult, Value};

use crate::registry::CommandSpec;
use crate::shell::Shell;

use super::{command, Builtin};

pub(super) fn spec<C: Send + Sync + 'static>() -> CommandSpec<C> {
    command("jobs", Builtin::Jobs).docs("List jobs that have not been brought to the foreground yet")
}

pub(super) fn run<C: Send + Sync + 'static>(shell: &Shell<C>) -> ExecResult {
    let jobs = shell.jobs().list();
    if jobs.is_empty() {
        return ExecResult::success("No running jobs found");
    }

    let mut out = String::new();
    let mut rows = Vec::with_capacity(jobs.len());
    for job in &jobs {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = write!(out, "[{}] {:<10} {}", job.id, job.status.to_string(), job.command);
        rows.push(serde_json::json!({
            "id": job.id.0,
            "status": job.status.to_string(),
            "command": job.command,
        }));
    }

    ExecResult {
        data: Some(Value::Json(serde_json::Value::Array(rows))),
        ..ExecResult::success(out)
    }
}
