use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// A stage could not be set up: malformed command or failed redirection.
pub const EXIT_SETUP_FAILED: ExitCode = 125;
/// The program was found but could not be executed (e.g. permission denied).
pub const EXIT_EXEC_FAILED: ExitCode = 126;
/// The program could not be found on `PATH`.
pub const EXIT_NOT_FOUND: ExitCode = 127;

/// How a single stage process terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Exited(ExitCode),
    Signaled(Signal),
}

impl StageStatus {
    /// Translate a wait status into a termination status.
    ///
    /// Returns `None` for statuses that do not mean the process is gone
    /// (stopped, continued, still alive).
    pub fn from_wait(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(_, code) => Some(StageStatus::Exited(code)),
            WaitStatus::Signaled(_, signal, _) => Some(StageStatus::Signaled(signal)),
            _ => None,
        }
    }

    /// Shell-style exit code: signals map to `128 + signal`.
    pub fn code(&self) -> ExitCode {
        match self {
            StageStatus::Exited(code) => *code,
            StageStatus::Signaled(signal) => 128 + *signal as i32,
        }
    }

    pub fn success(&self) -> bool {
        self.code() == 0
    }
}

/// Termination statuses of every stage of a completed pipeline, in stage order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStatus {
    stages: Vec<StageStatus>,
}

impl PipelineStatus {
    pub fn new(stages: Vec<StageStatus>) -> Self {
        assert!(!stages.is_empty(), "a pipeline has at least one stage");
        Self { stages }
    }

    pub fn stages(&self) -> &[StageStatus] {
        &self.stages
    }

    /// Status of the pipeline as a whole: the status of its last stage.
    pub fn code(&self) -> ExitCode {
        self.stages.last().map_or(0, StageStatus::code)
    }

    pub fn success(&self) -> bool {
        self.code() == 0
    }
}
