//! The set of kernel pipes connecting adjacent stages.

use crate::error::{PipelineError, Result};
use nix::unistd;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

/// One kernel pipe.
#[derive(Debug)]
struct Pipe {
    read: OwnedFd,
    write: OwnedFd,
}

/// Descriptors a stage process keeps as its standard input/output.
///
/// `None` means the stage keeps whatever it inherited from the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageEnds {
    pub stdin: Option<RawFd>,
    pub stdout: Option<RawFd>,
}

/// N-1 pipes for an N-stage pipeline, owned by the coordinator.
///
/// Pipe `i` connects stage `i` (writer) to stage `i + 1` (reader). Descriptors
/// are plain inheritable ones: every process that inherits them across `fork`
/// must close them, which is what [`PipeFabric::raw_descriptors`] is for.
/// Dropping the fabric closes everything still held by this process.
#[derive(Debug, Default)]
pub struct PipeFabric {
    pipes: Vec<Pipe>,
}

impl PipeFabric {
    /// Allocate all the pipes an N-stage pipeline needs, before any fork.
    pub fn allocate(stage_count: usize) -> Result<Self> {
        Self::allocate_with(stage_count, unistd::pipe)
    }

    /// Same as [`PipeFabric::allocate`] with a custom pipe primitive.
    ///
    /// On failure the pipes created so far are dropped, and so closed.
    pub fn allocate_with<F>(stage_count: usize, mut make_pipe: F) -> Result<Self>
    where
        F: FnMut() -> nix::Result<(OwnedFd, OwnedFd)>,
    {
        let wanted = stage_count.saturating_sub(1);
        let mut pipes = Vec::with_capacity(wanted);
        for i in 0..wanted {
            let (read, write) = make_pipe().map_err(|errno| {
                tracing::debug!(pipe = i, %errno, "pipe allocation failed");
                PipelineError::PipeAllocation(errno)
            })?;
            tracing::trace!(pipe = i, read = read.as_raw_fd(), write = write.as_raw_fd(), "pipe");
            pipes.push(Pipe { read, write });
        }
        Ok(Self { pipes })
    }

    pub fn pipe_count(&self) -> usize {
        self.pipes.len()
    }

    /// Ownership table: which pipe ends stage `index` wires to stdin/stdout.
    pub fn ends_for(&self, index: usize) -> StageEnds {
        let stdin = index
            .checked_sub(1)
            .and_then(|i| self.pipes.get(i))
            .map(|p| p.read.as_raw_fd());
        let stdout = self.pipes.get(index).map(|p| p.write.as_raw_fd());
        StageEnds { stdin, stdout }
    }

    /// Every descriptor in the fabric, read end before write end, pipe by pipe.
    pub fn raw_descriptors(&self) -> Vec<RawFd> {
        self.pipes
            .iter()
            .flat_map(|p| [p.read.as_raw_fd(), p.write.as_raw_fd()])
            .collect()
    }

    /// Close every descriptor held by this process.
    pub fn close(self) {
        tracing::trace!(pipes = self.pipes.len(), "closing pipe fabric");
        drop(self);
    }
}
