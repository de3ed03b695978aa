//! shellac-kernel: the core of the shellac command framework.
//!
//! This crate provides:
//!
//! - **Lexer**: Quote-aware tokenizing of command lines using logos
//! - **Parser**: Splits lines into `;` / `&&` / `||` chains using chumsky
//! - **Registry**: Multi-word command names with prefix resolution
//! - **Params / Resolver**: Declared parameters and typed argument binding
//! - **Handler**: Sync and async command contracts
//! - **Scheduler**: Job lifecycle, foreground/background, cancellation
//! - **Executor**: Chain evaluation with short-circuiting
//! - **Builtins**: `help`, `exit`, `fg`, `jobs`, `kill`
//! - **Shell**: Everything above wired together

pub mod builtins;
pub mod executor;
pub mod handler;
pub mod lexer;
pub mod params;
pub mod parser;
pub mod registry;
pub mod resolver;
pub mod scheduler;
pub mod shell;

pub use handler::{AsyncCommand, CommandError, CommandResult, Handler, JobContext, SyncCommand};
pub use params::{Args, ChoiceSet, ParamKind, ParamSpec, Validator};
pub use registry::{CommandSpec, RegistrationConflict, Registry, Visibility};
pub use resolver::ResolveError;
pub use scheduler::{JobError, JobManager};
pub use shell::{Interrupt, Motd, NoInterrupt, Shell, ShellConfig};

// Pure data types, re-exported so applications need only one dependency.
pub use shellac_types::{ExecResult, JobId, JobInfo, JobStatus, Value};
