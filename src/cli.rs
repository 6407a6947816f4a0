use anyhow::Result;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::privilege::PrivilegeMethod;
use crate::source::DEFAULT_MOUNT_ROOT;

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mount the installation source defined in the profile
    Setup(SetupArgs),

    /// Unmount the installation source
    Teardown(TeardownArgs),

    /// Show the state of the installation source
    Status(StatusArgs),

    /// Validate the source section of the given YAML profile
    Validate(ValidateArgs),

    /// Write the source address back into the profile
    Export(ExportArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Options shared by every command that builds a source from a profile.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Path to the YAML installer profile
    #[arg(short, long, default_value = "profile.yaml")]
    pub file: Utf8PathBuf,

    /// Mount point to use instead of allocating one under the mount root
    #[arg(long)]
    pub mount_point: Option<Utf8PathBuf>,

    /// Directory under which mount points are allocated
    #[arg(long, default_value = DEFAULT_MOUNT_ROOT)]
    pub mount_root: Utf8PathBuf,

    /// Set the log level
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Args, Debug)]
pub struct SetupArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Run mount commands through sudo or doas
    #[arg(long)]
    pub privilege: Option<PrivilegeMethod>,

    /// Number of attempts before giving up
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub retries: u32,

    /// Seconds to wait between attempts
    #[arg(long, default_value_t = 0)]
    pub retry_delay: u64,

    /// Do not run, just show what would be done
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct TeardownArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Run umount through sudo or doas
    #[arg(long)]
    pub privilege: Option<PrivilegeMethod>,

    /// Number of attempts before giving up
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub retries: u32,

    /// Seconds to wait between attempts
    #[arg(long, default_value_t = 0)]
    pub retry_delay: u64,

    /// Do not run, just show what would be done
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the YAML installer profile to validate
    #[arg(short, long, default_value = "profile.yaml")]
    pub file: Utf8PathBuf,

    /// Set the log level
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Path to the YAML installer profile to read
    #[arg(short, long, default_value = "profile.yaml")]
    pub file: Utf8PathBuf,

    /// Write the updated profile here instead of standard output
    #[arg(short, long)]
    pub output: Option<Utf8PathBuf>,

    /// Set the log level
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Verbosity of the log output, mapped onto `tracing` levels.
///
/// `--log-level debug` also shows configuration changes; `info` shows each
/// mount and unmount together with the output of the commands.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Commands {
    /// Returns the log level requested for this command.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Commands::Setup(opts) => opts.source.log_level,
            Commands::Teardown(opts) => opts.source.log_level,
            Commands::Status(opts) => opts.source.log_level,
            Commands::Validate(opts) => opts.log_level,
            Commands::Export(opts) => opts.log_level,
            Commands::Completions(_) => LogLevel::Warn,
        }
    }
}

pub fn parse_args() -> Result<Cli> {
    Ok(Cli::parse())
}
