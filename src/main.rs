use argh::FromArgs;
use pipeshell::config::{DEFAULT_MAX_LINE, DEFAULT_PROMPT};
use pipeshell::{Interpreter, ShellConfig};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(FromArgs)]
/// Read lines from stdin and run them as pipelines of external programs.
struct Args {
    #[argh(option, short = 'c')]
    /// run a single line and exit with its status.
    command: Option<String>,

    #[argh(option, default = "DEFAULT_PROMPT.to_string()")]
    /// text printed before each line.
    prompt: String,

    #[argh(option, default = "DEFAULT_MAX_LINE")]
    /// longest accepted input line in bytes; 0 disables the limit.
    max_line: usize,

    #[argh(switch, short = 'q')]
    /// do not print the status report after each line.
    quiet: bool,

    #[argh(option, default = "String::from(\"warn\")")]
    /// log filter used when RUST_LOG is not set (e.g. "debug", "pipeshell=trace").
    log_level: String,
}

impl Args {
    fn config(&self) -> ShellConfig {
        ShellConfig {
            prompt: self.prompt.clone(),
            max_line: (self.max_line > 0).then_some(self.max_line),
            report_status: !self.quiet,
        }
    }
}

fn main() -> ExitCode {
    let args: Args = argh::from_env();

    // Diagnostics go to stderr so they never mix with pipeline output.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut sh = Interpreter::new(args.config());
    let code = match &args.command {
        Some(line) => {
            sh.handle_line(line);
            Ok(sh.env().last_status)
        }
        None => sh.repl(),
    };

    match code {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}
