/// Default prompt printed before each line.
pub const DEFAULT_PROMPT: &str = "sshell$ ";
/// Default ceiling on the length of one input line, in bytes.
pub const DEFAULT_MAX_LINE: usize = 512;

/// Interpreter settings, usually filled from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    /// Text printed before reading each line.
    pub prompt: String,
    /// Lines longer than this many bytes are rejected; `None` disables the check.
    pub max_line: Option<usize>,
    /// Print `Return status value for '<line>': <code>` after each line.
    pub report_status: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            max_line: Some(DEFAULT_MAX_LINE),
            report_status: true,
        }
    }
}

impl ShellConfig {
    /// Check a line against the configured length ceiling.
    pub fn check_line(&self, line: &str) -> anyhow::Result<()> {
        match self.max_line {
            Some(max) if line.len() > max => Err(anyhow::anyhow!(
                "input line too long ({} bytes, limit is {})",
                line.len(),
                max
            )),
            _ => Ok(()),
        }
    }
}
