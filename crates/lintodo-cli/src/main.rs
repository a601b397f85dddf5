#![forbid(unsafe_code)]

mod cmd;
mod env_opts;
mod output;

use clap::{Parser, Subcommand};
use output::OutputMode;
use std::env;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "lintodo: freeze existing lint violations as decaying todos",
    long_about = None
)]
struct Cli {
    /// Output format (text or json).
    #[arg(long, value_enum, global = true)]
    format: Option<OutputMode>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Directory holding `.lint-todo` and the todo configuration.
    #[arg(long, global = true, value_name = "DIR")]
    base_dir: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        OutputMode::from_cli(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Reconcile analyzer output against the todo store",
        long_about = "Read analyzer results (a JSON array of file reports), suppress violations that have todos, \
                      decay old todos to warnings or errors, and report what remains.",
        after_help = "EXAMPLES:\n    # Check results piped from the analyzer\n    eslint -f json . | lintodo check\n\n    # Create todos for every current error\n    UPDATE_TODO=1 lintodo check results.json\n\n    # Emit machine-readable output\n    lintodo check results.json --json"
    )]
    Check(cmd::check::CheckArgs),

    #[command(
        about = "Compact the todo store",
        long_about = "Rewrite .lint-todo keeping only live todos.",
        after_help = "EXAMPLES:\n    # Drop cancelled add/remove pairs\n    lintodo compact"
    )]
    Compact(cmd::compact::CompactArgs),

    #[command(
        about = "List live todos",
        long_about = "List the todos currently recorded in .lint-todo.",
        after_help = "EXAMPLES:\n    # List every todo\n    lintodo list\n\n    # Only one engine's todos, as JSON\n    lintodo list --engine eslint --json"
    )]
    List(cmd::list::ListArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("LINT_TODO_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "lintodo=debug,lintodo_core=debug,info"
        } else {
            "lintodo=info,lintodo_core=info,warn"
        })
    });

    let format = env::var("LINT_TODO_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    init_tracing();

    let cli = Cli::parse();
    let output = cli.output_mode();
    let base_dir = match cli.base_dir.clone() {
        Some(dir) => dir,
        None => env::current_dir()?,
    };

    match cli.command {
        Commands::Check(ref args) => cmd::check::run_check(args, output, &base_dir),
        Commands::Compact(ref args) => {
            cmd::compact::run_compact(args, output, &base_dir).map(|()| ExitCode::SUCCESS)
        }
        Commands::List(ref args) => {
            cmd::list::run_list(args, output, &base_dir).map(|()| ExitCode::SUCCESS)
        }
    }
}
