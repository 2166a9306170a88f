//! Forking and wiring of one stage process.
//!
//! Everything the child needs (argument pointers, diagnostic prefixes, the
//! descriptor table) is prepared in the coordinator before `fork`. After the
//! fork the child only calls `sigaction`, `dup2`, `close`, `write`, `execvp`
//! and `_exit`, so launching stays sound when the coordinator has other
//! threads running.

use crate::command::{EXIT_EXEC_FAILED, EXIT_NOT_FOUND, EXIT_SETUP_FAILED, ExitCode};
use crate::error::{PipelineError, Result};
use crate::fabric::{PipeFabric, StageEnds};
use crate::parser::Stage;
use nix::errno::Errno;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::unistd::{self, ForkResult, Pid};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};

/// Optional descriptors for the two ends of the whole pipeline.
///
/// `input` becomes the first stage's stdin and `output` the last stage's
/// stdout; unset ends are inherited from the coordinator. Both should be
/// close-on-exec (as every `std::fs::File` is) so that middle stages do not
/// keep them open.
#[derive(Debug, Clone, Copy, Default)]
pub struct Boundary<'a> {
    pub input: Option<BorrowedFd<'a>>,
    pub output: Option<BorrowedFd<'a>>,
}

impl<'a> Boundary<'a> {
    /// Both ends inherited from the coordinator.
    pub fn inherit() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, fd: &'a impl AsFd) -> Self {
        self.input = Some(fd.as_fd());
        self
    }

    pub fn with_output(mut self, fd: &'a impl AsFd) -> Self {
        self.output = Some(fd.as_fd());
        self
    }
}

/// Process-creation primitive, called with the index of the stage being launched.
///
/// `ForkResult::Child` hands the calling process over to the stage: it never
/// returns from [`launch_with`].
pub type ForkFn = fn(usize) -> nix::Result<ForkResult>;

/// The real `fork(2)`.
pub(crate) fn system_fork(_stage: usize) -> nix::Result<ForkResult> {
    // SAFETY: the child branch of `launch_with` only performs async-signal-safe
    // calls on data allocated before the fork, and never returns into Rust
    // code that could observe state left inconsistent by other threads.
    unsafe { unistd::fork() }
}

/// What the child will execute, or the message it will die with.
enum Program {
    Exec {
        argv: Vec<*const libc::c_char>,
        prefix: Vec<u8>,
    },
    Malformed(Vec<u8>),
}

/// Fork the process for `stage` and start its program.
///
/// Returns the child's pid in the coordinator. The child never returns from
/// this function: it either becomes the stage program or exits with
/// [`EXIT_SETUP_FAILED`], [`EXIT_EXEC_FAILED`] or [`EXIT_NOT_FOUND`].
pub fn launch(stage: &Stage, fabric: &PipeFabric, boundary: &Boundary<'_>) -> Result<Pid> {
    launch_with(stage, fabric, boundary, system_fork)
}

/// [`launch`] with a custom process-creation primitive.
pub fn launch_with(
    stage: &Stage,
    fabric: &PipeFabric,
    boundary: &Boundary<'_>,
    fork: ForkFn,
) -> Result<Pid> {
    let mut ends = fabric.ends_for(stage.index());
    if !stage.reads_upstream() {
        ends.stdin = boundary.input.map(|fd| fd.as_raw_fd());
    }
    if !stage.writes_downstream() {
        ends.stdout = boundary.output.map(|fd| fd.as_raw_fd());
    }
    let inherited = fabric.raw_descriptors();

    let program = match stage.argv() {
        Ok(argv) => Program::Exec {
            argv: argv.to_exec_array(),
            prefix: format!("{}: ", argv.program().to_string_lossy()).into_bytes(),
        },
        Err(e) => Program::Malformed(
            format!("pipeshell: stage {}: {}\n", stage.index() + 1, e.describe()).into_bytes(),
        ),
    };

    match fork(stage.index()) {
        Ok(ForkResult::Parent { child }) => {
            tracing::debug!(stage = stage.index(), pid = %child, ?ends, "forked stage");
            Ok(child)
        }
        Ok(ForkResult::Child) => run_stage(&program, ends, &inherited),
        Err(errno) => Err(PipelineError::Fork {
            stage: stage.index(),
            source: errno,
        }),
    }
}

/// Body of the stage process.
fn run_stage(program: &Program, ends: StageEnds, inherited: &[RawFd]) -> ! {
    // The Rust runtime ignores SIGPIPE and an ignored disposition survives
    // exec; stage programs must die on a closed pipe like under any shell.
    // SAFETY: installs the default disposition, no handler code involved.
    if let Err(errno) = unsafe { signal::signal(Signal::SIGPIPE, SigHandler::SigDfl) } {
        report(&[&b"pipeshell: sigaction: "[..], errno.desc().as_bytes(), &b"\n"[..]]);
        exit(EXIT_SETUP_FAILED);
    }

    let (argv, prefix) = match program {
        Program::Exec { argv, prefix } => (argv, prefix),
        Program::Malformed(message) => {
            report(&[message.as_slice()]);
            exit(EXIT_SETUP_FAILED);
        }
    };

    if let Some(fd) = ends.stdin {
        redirect(fd, libc::STDIN_FILENO);
    }
    if let Some(fd) = ends.stdout {
        redirect(fd, libc::STDOUT_FILENO);
    }

    // The duplicates on 0/1 keep the pipes alive; the raw copies must go or
    // readers downstream never see end-of-file. All of them come from the
    // fabric and are open here, so close cannot fail with EBADF.
    for &fd in inherited {
        let _ = unistd::close(fd);
    }

    // SAFETY: `argv` is a null-terminated array of pointers into C strings
    // owned by the stage, which outlives this call.
    unsafe { libc::execvp(argv[0], argv.as_ptr()) };

    let errno = Errno::last();
    report(&[prefix.as_slice(), errno.desc().as_bytes(), &b"\n"[..]]);
    exit(match errno {
        Errno::ENOENT | Errno::ENOTDIR => EXIT_NOT_FOUND,
        _ => EXIT_EXEC_FAILED,
    })
}

fn redirect(from: RawFd, onto: RawFd) {
    if let Err(errno) = unistd::dup2(from, onto) {
        report(&[&b"pipeshell: dup2: "[..], errno.desc().as_bytes(), &b"\n"[..]]);
        exit(EXIT_SETUP_FAILED);
    }
}

/// Write a diagnostic to stderr without allocating or taking locks.
fn report(parts: &[&[u8]]) {
    let stderr = std::io::stderr();
    for part in parts {
        let _ = unistd::write(&stderr, part);
    }
}

fn exit(code: ExitCode) -> ! {
    // SAFETY: `_exit` skips atexit handlers and stdio flushing, both of which
    // belong to the coordinator and must not run twice.
    unsafe { libc::_exit(code) }
}
