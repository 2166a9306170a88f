//! A small command-line interpreter that runs pipelines of external programs.
//!
//! Each input line is either a builtin (`cd`, `exit`) or a pipeline such as
//! `ls -l | grep rs | wc -l`. Pipelines are run by the [`Coordinator`]: it
//! allocates one kernel pipe between each pair of adjacent stages, forks one
//! process per stage, wires each stage's stdin/stdout to the right pipe ends,
//! closes every raw pipe descriptor it does not need, and reaps all stage
//! processes before returning their statuses.
//!
//! There is no quoting, globbing, variable expansion, redirection or job
//! control. Stages are split on `|` and arguments on whitespace.

mod builtin;
pub mod command;
pub mod config;
pub mod coordinator;
pub mod env;
pub mod error;
pub mod fabric;
mod interpreter;
pub mod launcher;
pub mod lexer;
pub mod parser;

pub use command::{ExitCode, PipelineStatus, StageStatus};
pub use config::ShellConfig;
pub use coordinator::{Coordinator, Phase};
pub use error::PipelineError;
/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
pub use launcher::Boundary;
