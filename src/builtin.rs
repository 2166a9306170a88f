use crate::command::ExitCode;
use crate::env::Environment;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Directives the interpreter handles itself instead of handing to the coordinator.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "exit" or "cd".
    fn name() -> &'static str;

    /// Executes the command against the interpreter environment.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, env: &mut Environment) -> Result<ExitCode>;
}

/// Parse `args` for builtin `T` and run it.
///
/// Usage messages, `--help` output and execution errors go to `diagnostics`.
pub(crate) fn run<T: BuiltinCommand>(
    args: &[&str],
    diagnostics: &mut dyn Write,
    env: &mut Environment,
) -> Result<ExitCode> {
    let cmd = match T::from_args(&[T::name()], args) {
        Ok(cmd) => cmd,
        Err(EarlyExit { output, status }) => {
            writeln!(diagnostics, "{}", output.trim_end())?;
            return Ok(if status.is_err() { 1 } else { 0 });
        }
    };
    match cmd.execute(env) {
        Ok(code) => Ok(code),
        Err(e) => {
            writeln!(diagnostics, "{:#}", e)?;
            Ok(1)
        }
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory. Defaults to $HOME when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, env: &mut Environment) -> Result<ExitCode> {
        let target = match self.target.filter(|t| !t.is_empty()) {
            Some(t) => PathBuf::from(t),
            None => env
                .get_var("HOME")
                .map(PathBuf::from)
                .context("cd: HOME not set")?,
        };

        // `join` leaves absolute targets untouched.
        let dir = fs::canonicalize(env.current_dir.join(&target))
            .with_context(|| format!("cd: {}", target.display()))?;
        env::set_current_dir(&dir).with_context(|| format!("cd: {}", dir.display()))?;

        tracing::debug!(dir = %dir.display(), "changed directory");
        env.current_dir = dir;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Leave the interpreter.
pub struct Exit {
    #[argh(positional)]
    /// status to exit with; defaults to the status of the last command.
    pub code: Option<ExitCode>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, env: &mut Environment) -> Result<ExitCode> {
        env.should_exit = true;
        Ok(self.code.unwrap_or(env.last_status))
    }
}
