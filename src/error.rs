use nix::errno::Errno;
use nix::unistd::Pid;
use thiserror::Error;

/// Failures that stop a pipeline from being built or completed.
///
/// These are raised in the coordinator process only. Problems inside a stage
/// process (bad command, missing program) surface as that stage's exit status.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipe: {0}")]
    PipeAllocation(#[source] Errno),
    #[error("fork (stage {stage}): {source}")]
    Fork { stage: usize, source: Errno },
    #[error("dup: saving standard output: {0}")]
    SaveStdout(#[source] Errno),
    #[error("dup2: restoring standard output: {0}")]
    RestoreStdout(#[source] Errno),
    #[error("wait (pid {pid}): {source}")]
    Wait { pid: Pid, source: Errno },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
