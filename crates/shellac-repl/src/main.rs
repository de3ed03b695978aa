//! shellac-demo entry point.
//!
//! Usage:
//!   shellac-demo                   # Interactive REPL
//!   shellac-demo -c <command...>   # Execute a command line and exit
//!
//! Linked or copied under a command's name with dashes for spaces
//! (`cake-make`, `deploy-status`), the binary runs just that command with
//! its arguments.

use std::env;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shellac_kernel::ShellConfig;
use shellac_repl::demo::{self, Deploy};
use shellac_repl::{default_history_path, Repl};

const DEMO_NAME: &str = "shellac-demo";

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args: Vec<String> = env::args().collect();
    let config = config();

    if config.single_command.is_some() {
        let repl = build(config)?;
        return Ok(ExitCode::from(repl.run_single(args.get(1..).unwrap_or_default().to_vec())?));
    }

    match args.get(1).map(|s| s.as_str()) {
        None => {
            build(config)?.run()?;
            Ok(ExitCode::SUCCESS)
        }

        Some("--help" | "-h") => {
            print_help();
            Ok(ExitCode::SUCCESS)
        }

        Some("--version" | "-V") => {
            println!(
                "{} {} ({} {}, {})",
                DEMO_NAME,
                env!("CARGO_PKG_VERSION"),
                env!("SHELLAC_GIT_HASH"),
                env!("SHELLAC_BUILD_DATE"),
                env!("SHELLAC_BUILD_PROFILE"),
            );
            Ok(ExitCode::SUCCESS)
        }

        Some("-c") => {
            if args.len() < 3 {
                anyhow::bail!("-c requires a command argument");
            }
            let line = args[2..].join(" ");
            let repl = build(config)?;
            Ok(ExitCode::from(repl.run_command(&line)))
        }

        Some(unknown) => {
            eprintln!("Unknown option: {unknown}");
            eprintln!("Run '{DEMO_NAME} --help' for usage.");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Config for this invocation, named after how the binary was called.
fn config() -> ShellConfig {
    let config = ShellConfig::from_env_args()
        .with_prompt("bakery> ")
        .with_motd(format!(
            "shellac demo v{}\nType `help` for commands, `exit` or Ctrl-D to leave.",
            env!("CARGO_PKG_VERSION")
        ));
    let config = match default_history_path(DEMO_NAME) {
        Some(path) => config.with_history_file(path),
        None => config,
    };

    match command_for_program(&config.program) {
        Some(command) => config.with_single_command(command),
        None => config,
    }
}

/// The demo command a program name stands for, if any.
fn command_for_program(program: &str) -> Option<String> {
    if program == DEMO_NAME {
        return None;
    }
    let words: Vec<String> = program.split('-').map(str::to_string).collect();
    demo::commands(Deploy::default())
        .into_iter()
        .find(|spec| spec.name == words)
        .map(|spec| spec.display_name())
}

fn build(config: ShellConfig) -> Result<Repl<demo::Bakery>> {
    let shell = demo::shell(config, Deploy::default()).context("Failed to register demo commands")?;
    Repl::new(shell)
}

fn print_help() {
    println!(
        r#"shellac demo v{}

Usage:
  {name}                      Interactive REPL
  {name} -c <command...>      Execute a command line and exit

Options:
  -c <command...>             Execute a command line and exit with its status
  -h, --help                  Show this help
  -V, --version               Show version

Examples:
  {name} -c 'cake make -layers 4 -flavor marble && cake show'
  {name} -c deploy production -steps 3
"#,
        env!("CARGO_PKG_VERSION"),
        name = DEMO_NAME,
    );
}
