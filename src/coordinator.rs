//! Orchestration of one pipeline run: pipes, forks, descriptor cleanup, reaping.

use crate::command::{PipelineStatus, StageStatus};
use crate::error::{PipelineError, Result};
use crate::fabric::PipeFabric;
use crate::launcher::{self, Boundary, ForkFn};
use crate::parser::Pipeline;
use nix::fcntl::{FcntlArg, fcntl};
use nix::sys::wait::waitpid;
use nix::unistd::{self, Pid};
use std::io::Write;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

/// Where the coordinator is in the lifecycle of the current pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    PipesAllocated,
    Forking(usize),
    ParentDescriptorsClosed,
    Waiting,
    Complete,
    /// The pipeline could not be built; see the returned error.
    Aborted,
}

/// Runs pipelines to completion, one at a time.
///
/// Example
/// ```no_run
/// use pipeshell::Coordinator;
/// let mut coordinator = Coordinator::new();
/// let status = coordinator.run("echo hello | tr a-z A-Z").unwrap();
/// assert!(status.success());
/// ```
#[derive(Debug)]
pub struct Coordinator {
    phase: Phase,
    fork: ForkFn,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    pub fn new() -> Self {
        Self::with_fork(launcher::system_fork)
    }

    /// A coordinator that creates stage processes through `fork`.
    pub fn with_fork(fork: ForkFn) -> Self {
        Self {
            phase: Phase::Idle,
            fork,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Run a pipeline line with the coordinator's own stdin and stdout at its ends.
    pub fn run(&mut self, line: &str) -> Result<PipelineStatus> {
        self.run_with(line, Boundary::inherit())
    }

    /// Run a pipeline line with custom descriptors at its ends.
    pub fn run_with(&mut self, line: &str, boundary: Boundary<'_>) -> Result<PipelineStatus> {
        let pipeline = Pipeline::parse(line);
        self.execute(&pipeline, &boundary)
    }

    /// Run an already parsed pipeline.
    ///
    /// Returns once every stage process has been reaped. An `Err` means the
    /// pipeline could not be started; failures inside individual stages only
    /// show up in their statuses.
    pub fn execute(
        &mut self,
        pipeline: &Pipeline,
        boundary: &Boundary<'_>,
    ) -> Result<PipelineStatus> {
        let _span = tracing::debug_span!("pipeline", stages = pipeline.len()).entered();
        self.enter(Phase::Idle);
        let result = self.drive(pipeline, boundary);
        match &result {
            Ok(status) => tracing::debug!(code = status.code(), "pipeline finished"),
            Err(e) => {
                tracing::debug!(error = %e, "pipeline aborted");
                self.enter(Phase::Aborted);
            }
        }
        result
    }

    fn drive(&mut self, pipeline: &Pipeline, boundary: &Boundary<'_>) -> Result<PipelineStatus> {
        let fabric = PipeFabric::allocate(pipeline.len())?;
        self.enter(Phase::PipesAllocated);

        let saved = SavedStdout::save()?;

        let mut children = Vec::with_capacity(pipeline.len());
        let mut fork_error = None;
        for stage in pipeline.stages() {
            self.enter(Phase::Forking(stage.index()));
            match launcher::launch_with(stage, &fabric, boundary, self.fork) {
                Ok(pid) => children.push(pid),
                Err(e) => {
                    fork_error = Some(e);
                    break;
                }
            }
        }

        fabric.close();
        self.enter(Phase::ParentDescriptorsClosed);
        let restored = saved.restore();

        // Reap whatever was started even when the launch failed part way,
        // so no stage is left behind as a zombie.
        self.enter(Phase::Waiting);
        let statuses = reap(&children);

        if let Some(e) = fork_error {
            return Err(e);
        }
        restored?;
        let statuses = statuses?;
        self.enter(Phase::Complete);
        Ok(PipelineStatus::new(statuses))
    }

    fn enter(&mut self, phase: Phase) {
        tracing::trace!(from = ?self.phase, to = ?phase, "phase");
        self.phase = phase;
    }
}

/// Close-on-exec duplicate of the coordinator's stdout, taken before forking.
struct SavedStdout(OwnedFd);

impl SavedStdout {
    fn save() -> Result<Self> {
        // Anything still buffered would otherwise be written after the
        // pipeline's own output. A failed flush only loses coordinator
        // output, the stages write to the descriptor directly.
        if let Err(e) = std::io::stdout().flush() {
            tracing::debug!(error = %e, "flushing stdout before fork failed");
        }
        let raw = fcntl(libc::STDOUT_FILENO, FcntlArg::F_DUPFD_CLOEXEC(0))
            .map_err(PipelineError::SaveStdout)?;
        // SAFETY: `raw` was just returned by fcntl and is owned by nobody else.
        Ok(Self(unsafe { OwnedFd::from_raw_fd(raw) }))
    }

    /// Put the saved descriptor back on stdout and release the duplicate.
    fn restore(self) -> Result<()> {
        unistd::dup2(self.0.as_raw_fd(), libc::STDOUT_FILENO)
            .map_err(PipelineError::RestoreStdout)?;
        Ok(())
    }
}

/// Wait for every child, in launch order, collecting one status each.
fn reap(children: &[Pid]) -> Result<Vec<StageStatus>> {
    let mut statuses = Vec::with_capacity(children.len());
    let mut failure = None;
    for &pid in children {
        match wait_for(pid) {
            Ok(status) => statuses.push(status),
            Err(e) => {
                if failure.is_none() {
                    failure = Some(e);
                }
            }
        }
    }
    match failure {
        Some(e) => Err(e),
        None => Ok(statuses),
    }
}

fn wait_for(pid: Pid) -> Result<StageStatus> {
    loop {
        match syscall(|| waitpid(pid, None)) {
            Ok(status) => {
                if let Some(status) = StageStatus::from_wait(status) {
                    tracing::debug!(%pid, code = status.code(), "reaped stage");
                    return Ok(status);
                }
            }
            Err(source) => return Err(PipelineError::Wait { pid, source }),
        }
    }
}

/// Retry a system call interrupted by a signal.
fn syscall<F, T>(f: F) -> nix::Result<T>
where
    F: Fn() -> nix::Result<T>,
{
    loop {
        match f() {
            Err(nix::Error::EINTR) => (),
            result => return result,
        }
    }
}
