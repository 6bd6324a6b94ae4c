//! `codediag` command line: run the bundled sample or diagnose a saved
//! backtrace against the sources under the current directory.

mod demo;
pub mod error;

use clap::Parser;
use clap::Subcommand;
use codediag::ChatGpt;
use codediag::ChatGptConfig;
use codediag::Diagnostic;
use codediag::Failure;
use codediag::SessionConfig;
use error::CliError;
use error::Result;
use std::hint::black_box;
use std::path::Path;
use std::path::PathBuf;
use tracing::Level;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::FmtSubscriber;

const DEFAULT_WEB_PORT: &str = "8888";

/// Stack-aware panic diagnosis through a chat model
#[derive(Parser, Debug)]
#[command(name = "codediag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Ask for the answer in Chinese
    #[arg(long, global = true, env = "CODEDIAG_CHINESE")]
    pub chinese: bool,

    /// Serve the dashboard on PORT instead of printing to the console
    #[arg(
        long,
        global = true,
        value_name = "PORT",
        num_args = 0..=1,
        default_missing_value = DEFAULT_WEB_PORT,
        env = "CODEDIAG_WEB_PORT"
    )]
    pub web: Option<u16>,

    /// Maximum number of frames walked when capturing
    #[arg(long, global = true, default_value_t = 1024)]
    pub max_depth: usize,

    /// Verbosity level
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Panic inside a bundled sample and diagnose it
    Demo,
    /// Diagnose a saved `RUST_BACKTRACE=1` panic report
    Trace {
        /// File holding the panic output
        file: PathBuf,

        /// Error text; read from the report when omitted
        #[arg(short, long)]
        message: Option<String>,
    },
}

impl Cli {
    pub fn session(&self) -> SessionConfig {
        let session = SessionConfig::default()
            .with_chinese_output(self.chinese)
            .with_max_stack_depth(self.max_depth);
        match self.web {
            Some(port) => session.with_web_mode(port),
            None => session,
        }
    }
}

/// Install the fmt subscriber; `RUST_LOG` overrides the verbosity flag
pub fn init_tracing(verbose: u8) -> std::result::Result<(), SetGlobalDefaultError> {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = ChatGptConfig::from_env()?;
    let chat = ChatGpt::from_config(&config);
    tracing::info!(model = chat.model(), endpoint = %chat.endpoint(), "chat backend ready");

    let diag = Diagnostic::new(chat, cli.session())?;
    let failure = match cli.command {
        Command::Demo => match diag.catch(|| demo::share(black_box(100), black_box(&[0, -1]))) {
            Ok(share) => {
                println!("share: {share}");
                return Ok(());
            }
            Err(failure) => failure,
        },
        Command::Trace { file, message } => load_trace(&diag, &file, message)?,
    };

    diag.diagnose(failure).await?;
    Ok(())
}

fn load_trace(diag: &Diagnostic, file: &Path, message: Option<String>) -> Result<Failure> {
    let text = std::fs::read_to_string(file).map_err(|source| CliError::ReadTrace {
        path: file.to_path_buf(),
        source,
    })?;
    if text.trim().is_empty() {
        return Err(CliError::EmptyTrace(file.to_path_buf()));
    }

    let message = message.unwrap_or_else(|| panic_message(&text));
    let stack = match text.find("stack backtrace:") {
        Some(start) => &text[start..],
        None => text.as_str(),
    };
    Ok(Failure::from_trace(message, stack, diag.context()))
}

/// The message of a `thread '..' panicked at ..` report, or its first line
fn panic_message(report: &str) -> String {
    let mut lines = report.lines().map(str::trim).filter(|line| !line.is_empty());
    let Some(first) = lines.next() else {
        return String::new();
    };
    let Some((_, location)) = first.split_once(" panicked at ") else {
        return first.to_string();
    };
    // Older toolchains quote the message before the location
    if let Some((message, _)) = location
        .strip_prefix('\'')
        .and_then(|quoted| quoted.rsplit_once("', "))
    {
        return message.to_string();
    }
    lines.next().unwrap_or(first).to_string()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("codediag").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_structure() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_to_console_mode() {
        let cli = parse(&["demo"]);
        assert_eq!(cli.command, Command::Demo);
        assert_eq!(cli.web, None);

        let session = cli.session();
        assert!(!session.use_web_mode);
        assert!(!session.use_chinese_output);
        assert_eq!(session.max_stack_depth, 1024);
    }

    #[test]
    fn test_web_flag_with_and_without_port() {
        let session = parse(&["demo", "--web"]).session();
        assert!(session.use_web_mode);
        assert_eq!(session.web_port, 8888);

        let session = parse(&["--web", "9000", "demo"]).session();
        assert!(session.use_web_mode);
        assert_eq!(session.web_port, 9000);
    }

    #[test]
    fn test_trace_subcommand() {
        let cli = parse(&["trace", "panic.txt", "-m", "boom", "--chinese", "--max-depth", "64"]);
        assert_eq!(
            cli.command,
            Command::Trace {
                file: PathBuf::from("panic.txt"),
                message: Some("boom".to_string()),
            }
        );
        let session = cli.session();
        assert!(session.use_chinese_output);
        assert_eq!(session.max_stack_depth, 64);
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["codediag"]).is_err());
    }

    #[test]
    fn test_panic_message_from_report() {
        let report = "thread 'main' panicked at src/main.rs:4:5:\nattempt to divide by zero\nnote: run with `RUST_BACKTRACE=1`\n";
        assert_eq!(panic_message(report), "attempt to divide by zero");

        let legacy = "thread 'main' panicked at 'index out of bounds', src/main.rs:3:5\n";
        assert_eq!(panic_message(legacy), "index out of bounds");

        assert_eq!(panic_message("\n  custom failure\nmore"), "custom failure");
        assert_eq!(panic_message(""), "");
    }
}
