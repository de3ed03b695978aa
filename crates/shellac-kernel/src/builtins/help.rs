//! help: list commands, or describe one.

use std::collections::BTreeMap;
use std::fmt::Write;

use shellac_types::{ExecResult, Value};

use crate::params::{Args, ParamSpec};
use crate::registry::CommandSpec;
use crate::resolver::ResolveError;
use crate::shell::Shell;

use super::{command, Builtin, GROUP};

const UNGROUPED: &str = "Available Commands";

pub(super) fn spec<C: Send + Sync + 'static>() -> CommandSpec<C> {
    command("help", Builtin::Help)
        .alias("?")
        .docs("Show available commands, or the details of one command\n\nhelp cake make")
        .param(ParamSpec::remainder("command").describe("Command to describe"))
}

pub(super) fn run<C: Send + Sync + 'static>(args: Args, shell: &Shell<C>) -> ExecResult {
    let words = args.get_list("command");
    if words.is_empty() {
        return ExecResult::success(overview(shell));
    }

    match shell.registry().resolve(&words) {
        Ok((spec, used)) if used == words.len() => ExecResult::success(describe(&spec)),
        Ok(_) => ExecResult::failure(1, format!("unknown command: {}", words.join(" "))),
        Err(ResolveError::Ambiguous { candidates, .. }) => {
            let mut out = format!("\"{}\" could be:", words.join(" "));
            for name in &candidates {
                let _ = write!(out, "\n  {}", name);
            }
            ExecResult {
                data: Some(Value::string_list(candidates)),
                ..ExecResult::success(out)
            }
        }
        Err(e) => ExecResult::failure(e.exit_code(), e.to_string()),
    }
}

/// Every visible command, grouped, builtins last.
fn overview<C: Send + Sync + 'static>(shell: &Shell<C>) -> String {
    let commands = shell.registry().commands();
    let width = commands
        .iter()
        .map(|c| c.display_name().len())
        .max()
        .unwrap_or(0);

    let mut groups: BTreeMap<(u8, String), Vec<_>> = BTreeMap::new();
    for spec in &commands {
        let key = match spec.group.as_deref() {
            None => (0, UNGROUPED.to_string()),
            Some(GROUP) => (2, GROUP.to_string()),
            Some(group) => (1, group.to_string()),
        };
        groups.entry(key).or_default().push(spec);
    }

    let mut out = String::new();
    for ((_, heading), specs) in groups {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "{}:", heading);
        for spec in specs {
            let _ = writeln!(out, "  {:<width$}  {}", spec.display_name(), spec.summary(), width = width);
        }
    }
    out.trim_end().to_string()
}

/// Usage, docs and parameter list for one command.
pub(crate) fn describe<C: Send + Sync + 'static>(spec: &CommandSpec<C>) -> String {
    let mut out = format!("usage: {}", spec.usage());
    if !spec.aliases.is_empty() {
        let aliases: Vec<String> = spec.aliases.iter().map(|a| a.join(" ")).collect();
        let _ = write!(out, "\naliases: {}", aliases.join(", "));
    }
    if !spec.docs.is_empty() {
        let _ = write!(out, "\n\n{}", spec.docs.trim_end());
    }
    if !spec.params.is_empty() {
        out.push_str("\n\nparameters:");
        for param in &spec.params {
            let _ = write!(out, "\n  {:<16} {}", param.usage(), param.description);
            if let Some(default) = param.default.as_ref().filter(|d| !d.is_null()) {
                let _ = write!(out, " (default: {})", default);
            }
            if let Some(choices) = param.current_choices() {
                let _ = write!(out, " [{}]", choices.join(", "));
            }
        }
    }
    out
}
