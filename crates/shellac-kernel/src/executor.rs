//! Chain execution: run parsed links in order, honouring `;`, `&&`, `||`.
//!
//! The executor knows nothing about commands. It asks a [`LinkRunner`] to
//! run each link and only looks at whether the result succeeded.
//!
//! Short-circuiting is scoped by `;`. Once a link's status rules out the
//! next `&&`/`||` step, every link up to the next `;` is skipped, and
//! execution resumes after it:
//!
//! ```text
//! fail && a && b ; c     →  fail, c
//! ok || a || b ; c       →  ok, c
//! fail || a || b         →  fail, a
//! ```

use async_trait::async_trait;
use shellac_types::{ExecResult, EXIT_FAILURE};

use crate::handler::CommandError;
use crate::parser::{ChainLink, ChainOp};
use crate::scheduler::JobOutcome;

/// Something that can run one chain link.
#[async_trait]
pub trait LinkRunner: Send + Sync {
    async fn run_link(&self, link: &ChainLink) -> ExecResult;
}

/// Called after each link that actually ran.
pub type LinkObserver<'a> = dyn FnMut(&ChainLink, &ExecResult) + Send + 'a;

/// Run `links` in order and return the combined result.
///
/// The combined result carries the exit code of the last link that ran;
/// an empty chain succeeds with no output.
pub async fn run_chain<R>(runner: &R, links: &[ChainLink], observer: &mut LinkObserver<'_>) -> ExecResult
where
    R: LinkRunner + ?Sized,
{
    let mut total = ExecResult::default();
    let mut skipping = false;

    for link in links {
        if skipping {
            tracing::debug!(command = %link.display_words(), "skipped by short-circuit");
        } else {
            let result = runner.run_link(link).await;
            observer(link, &result);
            let ok = result.ok();
            total.accumulate(result);
            skipping = match link.op {
                ChainOp::And => !ok,
                ChainOp::Or => ok,
                ChainOp::Sequence | ChainOp::None => false,
            };
            continue;
        }

        if matches!(link.op, ChainOp::Sequence | ChainOp::None) {
            skipping = false;
        }
    }

    total
}

/// Turn a handler's error into a failed result.
pub fn error_result(err: &CommandError) -> ExecResult {
    match err {
        CommandError::Cancelled => ExecResult::failure(EXIT_FAILURE, "cancelled"),
        CommandError::Failed(message) => ExecResult::failure(EXIT_FAILURE, message.clone()),
        CommandError::Unexpected(e) => ExecResult::failure(EXIT_FAILURE, format!("{:#}", e)),
    }
}

/// Turn a delivered job outcome into a result.
pub fn outcome_result(outcome: JobOutcome) -> ExecResult {
    match outcome {
        JobOutcome::Completed(value) => ExecResult::success_data(value),
        JobOutcome::Failed(err) => error_result(&err),
        JobOutcome::Cancelled => ExecResult::failure(EXIT_FAILURE, "cancelled"),
    }
}
