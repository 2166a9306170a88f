//! Tokenization of a single pipeline stage into an argument vector.
//!
//! There is no quoting, escaping or substitution: a stage is split on runs of
//! whitespace and every piece becomes one argument.

use std::ffi::{CStr, CString};

/// Reasons a stage cannot be turned into a runnable argument vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexingError {
    /// The stage contained no words at all (e.g. the middle of `ls || wc`).
    EmptyCommand,
    /// A word contained an interior NUL byte and cannot be passed to `exec`.
    InteriorNul,
}

impl LexingError {
    /// Static description, usable from a forked child without allocating.
    pub fn describe(self) -> &'static str {
        match self {
            LexingError::EmptyCommand => "empty command",
            LexingError::InteriorNul => "invalid command (contains NUL byte)",
        }
    }
}

/// Split a stage string on whitespace runs.
pub fn split_words(stage: &str) -> Vec<&str> {
    stage.split_whitespace().collect()
}

/// Argument vector of one stage: program name first, then its arguments.
///
/// Words are stored as NUL-terminated C strings so the vector can be handed
/// to `execvp` as-is; the end of the slice is the terminator the exec
/// primitive consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argv {
    words: Vec<CString>,
}

impl Argv {
    /// Tokenize a raw stage string.
    pub fn parse(stage: &str) -> Result<Self, LexingError> {
        let words = split_words(stage)
            .into_iter()
            .map(|w| CString::new(w).map_err(|_| LexingError::InteriorNul))
            .collect::<Result<Vec<_>, _>>()?;
        if words.is_empty() {
            return Err(LexingError::EmptyCommand);
        }
        Ok(Self { words })
    }

    /// The program to resolve through `PATH`.
    pub fn program(&self) -> &CStr {
        &self.words[0]
    }

    /// The full vector, program included.
    pub fn as_slice(&self) -> &[CString] {
        &self.words
    }

    /// Pointer array for `execvp`, terminated by a null pointer.
    ///
    /// The pointers borrow from `self` and are valid for as long as it lives.
    pub fn to_exec_array(&self) -> Vec<*const libc::c_char> {
        self.words
            .iter()
            .map(|w| w.as_ptr())
            .chain(std::iter::once(std::ptr::null()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(argv: &Argv) -> Vec<&str> {
        argv.as_slice().iter().map(|w| w.to_str().unwrap()).collect()
    }

    #[test]
    fn test_simple_command() {
        let argv = Argv::parse("echo hello").unwrap();
        assert_eq!(words(&argv), vec!["echo", "hello"]);
        assert_eq!(argv.program().to_str().unwrap(), "echo");
    }

    #[test]
    fn test_whitespace_runs_collapse() {
        let argv = Argv::parse("  tr \t a-z   A-Z \n").unwrap();
        assert_eq!(words(&argv), vec!["tr", "a-z", "A-Z"]);
        assert_eq!(argv.len(), 3);
    }

    #[test]
    fn test_quotes_are_not_special() {
        let argv = Argv::parse("echo \"a b\"").unwrap();
        assert_eq!(words(&argv), vec!["echo", "\"a", "b\""]);
    }

    #[test]
    fn test_exec_array_is_null_terminated() {
        let argv = Argv::parse("ls -l /").unwrap();
        let ptrs = argv.to_exec_array();
        assert_eq!(ptrs.len(), 4);
        assert!(ptrs[3].is_null());
        assert_eq!(ptrs[0], argv.program().as_ptr());
    }

    #[test]
    fn test_empty_and_blank_stage() {
        assert_eq!(Argv::parse(""), Err(LexingError::EmptyCommand));
        assert_eq!(Argv::parse("   \t "), Err(LexingError::EmptyCommand));
    }

    #[test]
    fn test_interior_nul_is_rejected() {
        assert_eq!(Argv::parse("echo a\0b"), Err(LexingError::InteriorNul));
    }
}
