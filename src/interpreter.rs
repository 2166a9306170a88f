use crate::builtin::{self, Cd, Exit};
use crate::command::ExitCode;
use crate::config::ShellConfig;
use crate::coordinator::Coordinator;
use crate::env::Environment;
use crate::parser::Directive;
use anyhow::Context;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, BufRead, IsTerminal, Write};

/// A minimal shell-like interpreter: builtins `cd` and `exit`, and pipelines
/// of external programs.
///
/// Example
/// ```no_run
/// use pipeshell::{Interpreter, ShellConfig};
/// let mut sh = Interpreter::new(ShellConfig::default());
/// let code = sh.execute_line("echo hello | tr a-z A-Z").unwrap();
/// assert_eq!(code, 0);
/// ```
pub struct Interpreter {
    env: Environment,
    config: ShellConfig,
    coordinator: Coordinator,
}

impl Interpreter {
    pub fn new(config: ShellConfig) -> Self {
        Self {
            env: Environment::new(),
            config,
            coordinator: Coordinator::new(),
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Classify and run one input line.
    ///
    /// Returns the line's exit code. Errors mean nothing could be run: the line
    /// was rejected or the pipeline could not be started.
    pub fn execute_line(&mut self, line: &str) -> anyhow::Result<ExitCode> {
        self.config.check_line(line)?;
        match Directive::classify(line) {
            Directive::Empty => Ok(self.env.last_status),
            Directive::Exit(args) => builtin::run::<Exit>(&args, &mut io::stderr(), &mut self.env),
            Directive::ChangeDirectory(args) => {
                builtin::run::<Cd>(&args, &mut io::stderr(), &mut self.env)
            }
            Directive::Pipeline(text) => {
                let status = self
                    .coordinator
                    .run(text)
                    .with_context(|| format!("cannot run '{}'", text))?;
                Ok(status.code())
            }
        }
    }

    /// Run one line the way the read-eval loop does: report errors, record
    /// the status and print the completion report.
    pub fn handle_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        let code = match self.execute_line(line) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("pipeshell: {:#}", e);
                1
            }
        };
        self.env.last_status = code;
        if self.env.should_exit {
            return;
        }
        if self.config.report_status {
            println!("Return status value for '{}': {}", line, code);
        }
    }

    /// Read-Eval-Print Loop.
    ///
    /// Uses line editing when stdin is a terminal; otherwise every line read
    /// is echoed after the prompt so that transcripts stay readable. Returns
    /// the status the interpreter should exit with.
    pub fn repl(&mut self) -> anyhow::Result<ExitCode> {
        let mut input = LineReader::open()?;
        while !self.env.should_exit {
            match input.read_line(&self.config.prompt)? {
                Some(line) => self.handle_line(&line),
                None => break,
            }
        }
        eprintln!("Bye...");
        Ok(self.env.last_status)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(ShellConfig::default())
    }
}

enum LineReader {
    Editor(DefaultEditor),
    Plain(io::StdinLock<'static>),
}

impl LineReader {
    fn open() -> anyhow::Result<Self> {
        if io::stdin().is_terminal() {
            Ok(LineReader::Editor(
                DefaultEditor::new().context("cannot initialise line editor")?,
            ))
        } else {
            Ok(LineReader::Plain(io::stdin().lock()))
        }
    }

    /// Next line without its terminator, or `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        match self {
            LineReader::Editor(rl) => match rl.readline(prompt) {
                Ok(line) => {
                    rl.add_history_entry(line.as_str())?;
                    Ok(Some(line))
                }
                Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
                Err(ReadlineError::Eof) => Ok(None),
                Err(err) => Err(err.into()),
            },
            LineReader::Plain(stdin) => {
                let mut stdout = io::stdout();
                write!(stdout, "{}", prompt)?;
                stdout.flush()?;

                let mut line = String::new();
                if stdin.read_line(&mut line)? == 0 {
                    writeln!(stdout)?;
                    return Ok(None);
                }
                let line = line.trim_end_matches(['\n', '\r']).to_string();
                writeln!(stdout, "{}", line)?;
                stdout.flush()?;
                Ok(Some(line))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> Interpreter {
        Interpreter::new(ShellConfig {
            report_status: false,
            ..ShellConfig::default()
        })
    }

    #[test]
    fn test_exit_stops_the_loop() {
        let mut sh = quiet();
        sh.handle_line("exit 4");
        assert!(sh.env().should_exit);
        assert_eq!(sh.env().last_status, 4);
    }

    #[test]
    fn test_blank_line_keeps_status() {
        let mut sh = quiet();
        sh.handle_line("exit nope");
        assert_eq!(sh.env().last_status, 1);
        sh.handle_line("   ");
        assert_eq!(sh.env().last_status, 1);
        assert!(!sh.env().should_exit);
    }

    #[test]
    fn test_overlong_line_is_rejected() {
        let mut sh = Interpreter::new(ShellConfig {
            max_line: Some(8),
            report_status: false,
            ..ShellConfig::default()
        });
        let err = sh.execute_line("exit 0 0 0 0").unwrap_err();
        assert!(err.to_string().contains("too long"));
        assert!(!sh.env().should_exit);
    }
}
