//! CLI for stagecoach
//!
//! Provides the commands that wrap the pipeline core:
//! - `run`: Execute a pipeline descriptor end to end
//! - `check`: Validate a descriptor without running it
//! - `explain`: Show the execution plan and deploy decision
//! - `completions`: Generate shell completions

pub mod check;
pub mod completions;
pub mod explain;
pub mod run;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::pipeline::EventType;

/// CLI arguments for stagecoach
#[derive(Parser, Debug)]
#[command(name = "stagecoach")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a pipeline descriptor
    Run {
        /// Descriptor file (YAML)
        file: PathBuf,
        /// Repository slug, e.g. owner/name
        #[arg(long, default_value = "local/local")]
        repo: String,
        /// Branch the run is for
        #[arg(long, default_value = "main")]
        branch: String,
        /// Tag, for tagged builds
        #[arg(long)]
        tag: Option<String>,
        /// Triggering event
        #[arg(long, value_enum, default_value_t = EventArg::Push)]
        event: EventArg,
        /// Working directory for step execution
        #[arg(long)]
        workdir: Option<PathBuf>,
        /// Cache store root
        #[arg(long)]
        cache_dir: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
        /// Show the plan without executing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate a descriptor without running it
    Check {
        /// Descriptor file to validate
        file: PathBuf,
    },

    /// Show the execution plan and the deploy decision
    Explain {
        /// Descriptor file to explain
        file: PathBuf,
        /// Repository slug, e.g. owner/name
        #[arg(long, default_value = "local/local")]
        repo: String,
        /// Branch the run is for
        #[arg(long, default_value = "main")]
        branch: String,
        /// Tag, for tagged builds
        #[arg(long)]
        tag: Option<String>,
        /// Triggering event
        #[arg(long, value_enum, default_value_t = EventArg::Push)]
        event: EventArg,
    },

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: ShellArg,
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum EventArg {
    Push,
    PullRequest,
    Cron,
    Api,
}

impl From<EventArg> for EventType {
    fn from(arg: EventArg) -> Self {
        match arg {
            EventArg::Push => Self::Push,
            EventArg::PullRequest => Self::PullRequest,
            EventArg::Cron => Self::Cron,
            EventArg::Api => Self::Api,
        }
    }
}

/// Output format for run reports
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ShellArg {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Build the CLI command for completion generation
#[must_use]
pub fn build_cli() -> clap::Command {
    Args::command()
}

/// Parse and execute CLI arguments, returning the process exit code.
///
/// `run` exits zero only when the whole pipeline, publication included,
/// succeeded; everything else is a non-zero exit.
///
/// # Errors
///
/// Returns an error when a command fails before producing a report, e.g. an
/// unreadable descriptor or an unwritable output file.
pub fn run() -> Result<ExitCode> {
    let args = Args::parse();

    match args.command {
        Command::Run {
            file,
            repo,
            branch,
            tag,
            event,
            workdir,
            cache_dir,
            format,
            dry_run,
        } => {
            let options = run::RunOptions {
                repo,
                branch,
                tag,
                event: event.into(),
                workdir,
                cache_dir,
                format,
                dry_run,
            };
            let succeeded = run::run_pipeline(&file, &options)?;
            Ok(if succeeded { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Command::Check { file } => {
            check::check_descriptor(&file)?;
            println!("{}: ok", file.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Explain { file, repo, branch, tag, event } => {
            let meta = explain::metadata(repo, branch, tag, event.into());
            let plan = explain::explain_descriptor(&file, &meta)?;
            println!("{plan}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Completions { shell, output } => {
            use clap_complete::Shell;

            let shell_enum = match shell {
                ShellArg::Bash => Shell::Bash,
                ShellArg::Zsh => Shell::Zsh,
                ShellArg::Fish => Shell::Fish,
                ShellArg::PowerShell => Shell::PowerShell,
            };

            let completions = completions::generate_completions(shell_enum)?;

            if let Some(output_path) = output {
                completions::save_completions(&completions, &output_path)?;
            } else {
                println!("{completions}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
