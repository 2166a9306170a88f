//! Line classification and pipeline stage splitting.

use crate::lexer::{Argv, LexingError};

/// The literal stage separator. There is no escaping.
pub const PIPE: char = '|';

/// What a single input line asks the interpreter to do.
///
/// Builtins are recognised only on lines without a `|`; everything else is a
/// pipeline and is handed to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive<'a> {
    /// Blank line: nothing to run.
    Empty,
    /// `exit [code]`, with the words after `exit`.
    Exit(Vec<&'a str>),
    /// `cd [dir]`, with the words after `cd`.
    ChangeDirectory(Vec<&'a str>),
    /// A pipeline of one or more external programs, trimmed.
    Pipeline(&'a str),
}

impl<'a> Directive<'a> {
    pub fn classify(line: &'a str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Directive::Empty;
        }
        if !line.contains(PIPE) {
            let mut words = line.split_whitespace();
            match words.next() {
                Some("exit") => return Directive::Exit(words.collect()),
                Some("cd") => return Directive::ChangeDirectory(words.collect()),
                _ => {}
            }
        }
        Directive::Pipeline(line)
    }
}

/// Number of stages in a pipeline string: one more than the number of pipes.
pub fn count_stages(line: &str) -> usize {
    line.matches(PIPE).count() + 1
}

/// Split a pipeline string into at most `stage_count` raw stage strings.
///
/// Empty segments are preserved so that `ls || wc` yields three stages; the
/// blank one is rejected later, by the process that would have run it.
pub fn split_stages(line: &str, stage_count: usize) -> Vec<&str> {
    line.splitn(stage_count, PIPE).collect()
}

/// One program invocation within a pipeline.
#[derive(Debug, Clone)]
pub struct Stage {
    index: usize,
    text: String,
    argv: Result<Argv, LexingError>,
    last: bool,
}

impl Stage {
    pub fn index(&self) -> usize {
        self.index
    }

    /// The raw text of this stage, as split from the line.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The tokenized argument vector, or why the stage cannot be run.
    pub fn argv(&self) -> Result<&Argv, LexingError> {
        self.argv.as_ref().map_err(|e| *e)
    }

    pub fn reads_upstream(&self) -> bool {
        self.index > 0
    }

    pub fn writes_downstream(&self) -> bool {
        !self.last
    }
}

/// An ordered, non-empty sequence of stages built from one input line.
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let count = count_stages(line);
        let stages = split_stages(line, count)
            .into_iter()
            .enumerate()
            .map(|(index, text)| Stage {
                index,
                text: text.to_string(),
                argv: Argv::parse(text),
                last: index + 1 == count,
            })
            .collect();
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always false: splitting yields at least one stage.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Number of pipes needed to connect the stages.
    pub fn pipe_count(&self) -> usize {
        self.stages.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_stages() {
        assert_eq!(count_stages("ls"), 1);
        assert_eq!(count_stages("ls | wc"), 2);
        assert_eq!(count_stages("a|b|c"), 3);
        assert_eq!(count_stages("ls ||  wc"), 3);
        assert_eq!(count_stages(""), 1);
    }

    #[test]
    fn test_split_keeps_empty_segments() {
        assert_eq!(split_stages("ls ||  wc", 3), vec!["ls ", "", "  wc"]);
        assert_eq!(split_stages("ls |", 2), vec!["ls ", ""]);
    }

    #[test]
    fn test_split_is_bounded() {
        assert_eq!(split_stages("a|b|c", 2), vec!["a", "b|c"]);
    }

    #[test]
    fn test_pipeline_stages() {
        let pipeline = Pipeline::parse("echo hello | tr a-z A-Z\n");
        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.pipe_count(), 1);

        let first = &pipeline.stages()[0];
        assert!(!first.reads_upstream());
        assert!(first.writes_downstream());
        assert_eq!(first.argv().unwrap().len(), 2);

        let second = &pipeline.stages()[1];
        assert!(second.reads_upstream());
        assert!(!second.writes_downstream());
        assert_eq!(second.text(), " tr a-z A-Z");
    }

    #[test]
    fn test_single_stage_needs_no_pipe() {
        let pipeline = Pipeline::parse("echo hello");
        assert_eq!(pipeline.len(), 1);
        assert_eq!(pipeline.pipe_count(), 0);
        let only = &pipeline.stages()[0];
        assert!(!only.reads_upstream());
        assert!(!only.writes_downstream());
    }

    #[test]
    fn test_blank_segment_is_malformed() {
        let pipeline = Pipeline::parse("ls ||  wc");
        assert_eq!(pipeline.len(), 3);
        assert!(pipeline.stages()[0].argv().is_ok());
        assert_eq!(
            pipeline.stages()[1].argv().unwrap_err(),
            LexingError::EmptyCommand
        );
        assert!(pipeline.stages()[2].argv().is_ok());
    }

    #[test]
    fn test_classify_builtins() {
        assert_eq!(Directive::classify("   "), Directive::Empty);
        assert_eq!(Directive::classify("exit"), Directive::Exit(vec![]));
        assert_eq!(Directive::classify("exit 3"), Directive::Exit(vec!["3"]));
        assert_eq!(
            Directive::classify("  cd /tmp "),
            Directive::ChangeDirectory(vec!["/tmp"])
        );
        assert_eq!(Directive::classify("cd"), Directive::ChangeDirectory(vec![]));
    }

    #[test]
    fn test_classify_pipelines() {
        assert_eq!(Directive::classify("ls -l\n"), Directive::Pipeline("ls -l"));
        assert_eq!(Directive::classify("exits"), Directive::Pipeline("exits"));
        assert_eq!(
            Directive::classify("cd /tmp | cat"),
            Directive::Pipeline("cd /tmp | cat")
        );
    }
}
