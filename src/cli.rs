use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Obsession CLI options.
#[derive(Debug, Parser)]
#[command(
    name = "obsession",
    version,
    about = "Lint Ruby code for call-ordered method layout",
    args_conflicts_with_subcommands = true,
    subcommand_precedence_over_arg = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub lint: LintArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Lint files or directories.
    Lint(LintArgs),

    /// List available cops.
    ListRules,

    /// Explain a cop.
    Explain {
        /// Cop name.
        rule: String,
    },
}

#[derive(Debug, Clone, ClapArgs)]
pub struct LintArgs {
    /// Files/directories to lint. Defaults to stdin when absent.
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,

    /// Only run these cops (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Skip these cops (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Exit with code 1 if any diagnostics are emitted.
    #[arg(long)]
    pub deny_warnings: bool,

    /// Config file path. Defaults to searching for obsession.toml upward
    /// from the linted paths.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Apply auto-corrections to files.
    #[arg(long)]
    pub fix: bool,

    /// Show corrections as a diff without writing files.
    #[arg(long)]
    pub fix_dry_run: bool,

    /// Also apply corrections marked as potentially incorrect.
    #[arg(long)]
    pub unsafe_fixes: bool,

    /// Skip writing .bak backup files when fixing.
    #[arg(long)]
    pub no_backup: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
    Github,
}
