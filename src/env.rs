use crate::command::ExitCode;
use std::env as stdenv;
use std::path::PathBuf;

/// Mutable, user-level state of the interpreter between input lines.
///
/// The environment contains:
/// - `current_dir`: the working directory stage processes inherit.
/// - `last_status`: status of the most recent line, used by a bare `exit`.
/// - `should_exit`: a flag that the read-eval loop checks to know when to terminate.
///
/// Environment variables are not copied here: stage processes inherit the
/// process environment unchanged.
#[derive(Debug, Clone)]
pub struct Environment {
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
    /// Exit code of the last executed line.
    pub last_status: ExitCode,
    /// When set to true, indicates that the interactive loop should exit.
    pub should_exit: bool,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    pub fn new() -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            current_dir,
            last_status: 0,
            should_exit: false,
        }
    }

    /// Get the value of a process environment variable.
    pub fn get_var(&self, key: &str) -> Option<String> {
        stdenv::var(key).ok()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::env::Environment;

    #[test]
    fn test_env_starts_clean() {
        let env = Environment::new();
        assert_eq!(env.last_status, 0);
        assert!(!env.should_exit);
        assert!(env.current_dir.is_absolute());
    }

    #[test]
    fn test_env_reads_from_process_env() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
        assert_eq!(env.get_var("SOME_RANDOM_ENV_VAR_12345"), None);
    }
}
