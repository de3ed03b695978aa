//! shellac REPL: interactive loop and one-shot runner for shellac shells.
//!
//! This crate drives a [`Shell`] from a terminal. It handles:
//! - Line editing and history via rustyline
//! - Ctrl-C during a foreground wait, which backgrounds the job
//! - Non-interactive `-c` and single-command runs with exit code mapping
//! - The shell's start command before anything else, and its exit command
//!   on the way out
//!
//! Everything runs on one current-thread tokio runtime. Line editing blocks,
//! so it lives on its own thread and hands lines back over a channel; jobs
//! left in the background keep advancing while the prompt waits.

pub mod demo;

use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use shellac_kernel::{ExecResult, Interrupt, Shell};

/// Ctrl-C as an interrupt source.
#[derive(Debug, Clone, Copy, Default)]
pub struct CtrlC;

impl Interrupt for CtrlC {
    fn wait(&self) -> BoxFuture<'static, ()> {
        async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                futures::future::pending::<()>().await;
            }
        }
        .boxed()
    }
}

/// Where history lives when the application doesn't say.
///
/// `<data_dir>/<program>/history.txt`, or `None` when there is no home.
pub fn default_history_path(program: &str) -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.data_dir().join(program).join("history.txt"))
}

/// Map a chain result to a process exit code.
///
/// With propagation off every run exits 0. Codes that don't fit in a byte
/// collapse to 1 so a failure never reads as success.
pub fn exit_code(result: &ExecResult, propagate: bool) -> u8 {
    if !propagate || result.ok() {
        return 0;
    }
    u8::try_from(result.code)
        .ok()
        .filter(|code| *code != 0)
        .unwrap_or(1)
}

/// Print one link's output as it finishes.
fn print_result(result: &ExecResult) {
    if !result.out.is_empty() {
        println!("{}", result.out.trim_end_matches('\n'));
    }
    if !result.err.is_empty() {
        eprintln!("{}", result.err.trim_end_matches('\n'));
    }
}

/// A shell bound to the runtime that drives it.
pub struct Repl<C = ()> {
    shell: Shell<C>,
    runtime: Runtime,
}

impl<C: Send + Sync + 'static> Repl<C> {
    /// Wrap a shell. Ctrl-C becomes its interrupt source.
    pub fn new(shell: Shell<C>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create tokio runtime")?;
        Ok(Self {
            shell: shell.with_interrupt(CtrlC),
            runtime,
        })
    }

    pub fn shell(&self) -> &Shell<C> {
        &self.shell
    }

    /// Execute a line, printing each link's output as it arrives.
    pub fn execute(&self, line: &str) -> ExecResult {
        self.runtime
            .block_on(self.shell.execute_streaming(line, &mut |_, r| print_result(r)))
    }

    /// Run the start command. A failed start is returned so the caller can
    /// stop before taking any input.
    fn start(&self) -> Result<(), ExecResult> {
        match self.runtime.block_on(self.shell.run_start_command(Vec::new())) {
            Some(result) => {
                print_result(&result);
                if result.ok() {
                    Ok(())
                } else {
                    tracing::warn!(code = result.code, "start command failed");
                    Err(result)
                }
            }
            None => Ok(()),
        }
    }

    /// Run the exit command, if any.
    fn finish(&self) {
        if let Some(result) = self.runtime.block_on(self.shell.run_exit_command()) {
            print_result(&result);
        }
    }

    /// Run one line non-interactively and return the process exit code.
    pub fn run_command(&self, line: &str) -> u8 {
        let propagate = self.shell.config().propagate_exit_code;
        if let Err(failed) = self.start() {
            return exit_code(&failed, propagate);
        }
        let result = self.execute(line);
        self.finish();
        exit_code(&result, propagate)
    }

    /// Run the configured single command with `args` as its arguments.
    ///
    /// The words skip the line parser entirely, so quoting and operators in
    /// `args` reach the command verbatim.
    pub fn run_single(&self, args: Vec<String>) -> Result<u8> {
        let command = self
            .shell
            .config()
            .single_command
            .clone()
            .context("no single command configured")?;
        let mut words: Vec<String> = command.split_whitespace().map(String::from).collect();
        words.extend(args);

        let propagate = self.shell.config().propagate_exit_code;
        if let Err(failed) = self.start() {
            return Ok(exit_code(&failed, propagate));
        }
        let result = self.runtime.block_on(self.shell.execute_words(words));
        print_result(&result);
        self.finish();
        Ok(exit_code(&result, propagate))
    }

    /// Run the interactive loop until `exit`, Ctrl-D, or a terminal error.
    ///
    /// Fails without prompting if the start command fails. The exit command
    /// runs however the loop ends.
    pub fn run(self) -> Result<()> {
        if let Err(failed) = self.start() {
            anyhow::bail!("start command failed with status {}", failed.code);
        }

        let config = self.shell.config().clone();
        if let Some(motd) = &config.motd {
            println!("{}", motd.render());
        }

        let reader = match LineReader::spawn(config.history_file.clone()) {
            Ok(reader) => reader,
            Err(e) => {
                self.finish();
                return Err(e);
            }
        };
        let reader = self.runtime.block_on(self.interact(reader, &config.prompt));
        reader.close();
        self.finish();
        Ok(())
    }

    async fn interact(&self, mut reader: LineReader, prompt: &str) -> LineReader {
        loop {
            match reader.read_line(prompt).await {
                Input::Line(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    self.shell
                        .execute_streaming(&line, &mut |_, r| print_result(r))
                        .await;
                    if self.shell.exit_requested() {
                        break;
                    }
                }
                Input::Interrupted => {
                    println!("^C");
                }
                Input::Eof => {
                    println!("^D");
                    break;
                }
                Input::Failed(e) => {
                    eprintln!("Error: {}", e);
                    break;
                }
            }
        }
        reader
    }
}

/// What the line editor produced.
#[derive(Debug)]
enum Input {
    Line(String),
    Interrupted,
    Eof,
    Failed(String),
}

/// A rustyline editor on its own thread.
///
/// The thread reads one line per prompt it is sent and saves history when
/// the prompt channel closes.
struct LineReader {
    prompts: std_mpsc::Sender<String>,
    lines: mpsc::UnboundedReceiver<Input>,
    thread: JoinHandle<()>,
}

impl LineReader {
    fn spawn(history_path: Option<PathBuf>) -> Result<Self> {
        let (prompt_tx, prompt_rx) = std_mpsc::channel::<String>();
        let (line_tx, line_rx) = mpsc::unbounded_channel();

        let thread = std::thread::Builder::new()
            .name("shellac-readline".to_string())
            .spawn(move || {
                // The editor never leaves this thread.
                let mut rl: Editor<(), DefaultHistory> = match Editor::new() {
                    Ok(rl) => rl,
                    Err(e) => {
                        let _ = line_tx.send(Input::Failed(format!("Failed to create editor: {}", e)));
                        return;
                    }
                };
                if let Some(path) = &history_path {
                    load_history(&mut rl, path);
                }

                while let Ok(prompt) = prompt_rx.recv() {
                    let input = match rl.readline(&prompt) {
                        Ok(line) => {
                            if let Err(e) = rl.add_history_entry(line.as_str()) {
                                tracing::warn!("Failed to add history entry: {}", e);
                            }
                            Input::Line(line)
                        }
                        Err(ReadlineError::Interrupted) => Input::Interrupted,
                        Err(ReadlineError::Eof) => Input::Eof,
                        Err(e) => Input::Failed(e.to_string()),
                    };
                    if line_tx.send(input).is_err() {
                        break;
                    }
                }
                if let Some(path) = &history_path {
                    save_history(&mut rl, path);
                }
            })
            .context("Failed to spawn line editor thread")?;

        Ok(Self {
            prompts: prompt_tx,
            lines: line_rx,
            thread,
        })
    }

    async fn read_line(&mut self, prompt: &str) -> Input {
        if self.prompts.send(prompt.to_string()).is_err() {
            return Input::Failed("line editor stopped".to_string());
        }
        self.lines
            .recv()
            .await
            .unwrap_or_else(|| Input::Failed("line editor stopped".to_string()))
    }

    /// Stop the editor thread and wait for it to save history.
    fn close(self) {
        let LineReader { prompts, lines, thread } = self;
        drop(prompts);
        drop(lines);
        if thread.join().is_err() {
            tracing::warn!("line editor thread panicked");
        }
    }
}

fn load_history(rl: &mut Editor<(), DefaultHistory>, path: &Path) {
    if let Err(e) = rl.load_history(path) {
        // A missing file is the normal first run.
        let is_not_found = matches!(&e, ReadlineError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound);
        if !is_not_found {
            tracing::warn!("Failed to load history: {}", e);
        }
    }
}

fn save_history(rl: &mut Editor<(), DefaultHistory>, path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create history directory: {}", e);
        }
    }
    if let Err(e) = rl.save_history(path) {
        tracing::warn!("Failed to save history: {}", e);
    }
}
