pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod privilege;
pub mod probe;
pub mod profile;
pub mod repo;
pub mod runner;
pub mod source;
pub mod task;

#[cfg(test)]
mod testing;

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::CommandFactory;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{FmtSubscriber, filter::LevelFilter};

pub use error::SourceError;

use crate::config::Profile;
use crate::profile::ProfileAdapter;
use crate::repo::RepoConfiguration;
use crate::runner::{RetryPolicy, TaskRunner};
use crate::source::{
    HardDrive, HardDriveSource, HasMountPoint, InstallationSource, Nfs, NfsSource,
    ProducesRepoDescriptor, SourceState, SourceType,
};
use crate::task::MountContext;

pub fn init_logging(log_level: cli::LogLevel) -> Result<()> {
    let filter = match log_level {
        cli::LogLevel::Trace => LevelFilter::TRACE,
        cli::LogLevel::Debug => LevelFilter::DEBUG,
        cli::LogLevel::Info => LevelFilter::INFO,
        cli::LogLevel::Warn => LevelFilter::WARN,
        cli::LogLevel::Error => LevelFilter::ERROR,
    };

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(filter)
            .with_writer(io::stderr)
            .finish(),
    )
    .context("failed to set global default tracing subscriber")
}

/// Builds the source configured by `profile` and imports its address.
///
/// Without an explicit mount point, one is allocated under `args.mount_root`.
/// Allocation numbers restart in every process, so separate `setup` and
/// `teardown` invocations with the same profile agree on the mount point.
pub fn build_source(
    profile: &Profile,
    args: &cli::SourceArgs,
    ctx: MountContext,
) -> Result<Box<dyn InstallationSource>> {
    let mut source: Box<dyn InstallationSource> = match profile.source_type()? {
        SourceType::Nfs => match &args.mount_point {
            Some(mount_point) => Box::new(NfsSource::new(mount_point.clone(), ctx)),
            None => Box::new(NfsSource::allocate(&args.mount_root, ctx)),
        },
        SourceType::HardDrive => match &args.mount_point {
            Some(mount_point) => Box::new(HardDriveSource::new(mount_point.clone(), ctx)),
            None => Box::new(HardDriveSource::allocate(&args.mount_root, ctx)),
        },
    };
    source
        .import_profile(profile)
        .context("failed to import installation source from profile")?;
    Ok(source)
}

fn load_source(args: &cli::SourceArgs, ctx: MountContext) -> Result<Box<dyn InstallationSource>> {
    let profile = config::load_profile(&args.file)
        .with_context(|| format!("failed to load profile from {}", args.file))?;
    build_source(&profile, args, ctx)
}

/// Mounts the source and returns the repository descriptor for it.
pub fn run_setup(opts: &cli::SetupArgs, ctx: MountContext) -> Result<RepoConfiguration> {
    let dry_run = ctx.dry_run();
    let source = load_source(&opts.source, ctx.with_privilege(opts.privilege))?;
    info!("setting up {} on {}", source.description(), source.mount_point());

    let runner = TaskRunner::new(RetryPolicy::new(
        opts.retries,
        Duration::from_secs(opts.retry_delay),
    ));
    runner
        .set_up(source.as_ref())
        .with_context(|| format!("failed to set up {}", source))?;

    if source.state() != SourceState::Ready {
        if dry_run {
            info!("dry run: {} was not mounted", source.mount_point());
        } else {
            warn!("{} is not mounted after set-up", source.mount_point());
        }
    }
    Ok(source.generate_repo_configuration())
}

/// Unmounts the source. Succeeds if nothing is mounted.
pub fn run_teardown(opts: &cli::TeardownArgs, ctx: MountContext) -> Result<()> {
    let source = load_source(&opts.source, ctx.with_privilege(opts.privilege))?;
    info!("tearing down {} on {}", source.description(), source.mount_point());

    let runner = TaskRunner::new(RetryPolicy::new(
        opts.retries,
        Duration::from_secs(opts.retry_delay),
    ));
    runner
        .tear_down(source.as_ref())
        .with_context(|| format!("failed to tear down {}", source))
}

/// Snapshot of a source printed by the `status` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    #[serde(rename = "type")]
    pub source_type: String,
    pub description: String,
    pub address: String,
    pub mount_point: Utf8PathBuf,
    pub network_required: bool,
    pub state: String,
}

pub fn run_status(opts: &cli::StatusArgs, ctx: MountContext) -> Result<StatusReport> {
    let source = load_source(&opts.source, ctx)?;
    Ok(StatusReport {
        source_type: source.source_type().to_string(),
        description: source.description(),
        address: source.configuration().to_string(),
        mount_point: source.mount_point().to_owned(),
        network_required: source.network_required(),
        state: source.state().to_string(),
    })
}

/// Checks the profile's source section and returns the address it yields.
pub fn run_validate(opts: &cli::ValidateArgs) -> Result<String> {
    let profile = config::load_profile(&opts.file)
        .with_context(|| format!("failed to load profile from {}", opts.file))?;
    let address = match profile.source_type()? {
        SourceType::Nfs => Nfs::decompose(&profile),
        SourceType::HardDrive => HardDrive::decompose(&profile),
    }
    .context("profile validation failed")?;
    info!("validation successful: {}", address);
    Ok(address)
}

/// Imports the source from the profile and exports it back.
///
/// The result has the source section normalized and marked as seen; all
/// other keys are kept. It is written to `opts.output` when given.
pub fn run_export(opts: &cli::ExportArgs) -> Result<Profile> {
    let mut profile = config::load_profile(&opts.file)
        .with_context(|| format!("failed to load profile from {}", opts.file))?;
    let args = cli::SourceArgs {
        file: opts.file.clone(),
        mount_point: None,
        mount_root: Utf8PathBuf::from(source::DEFAULT_MOUNT_ROOT),
        log_level: opts.log_level,
    };
    let source = build_source(&profile, &args, MountContext::system(true))?;
    source
        .export_profile(&mut profile)
        .context("failed to export installation source")?;

    if let Some(output) = &opts.output {
        config::save_profile(output, &profile)
            .with_context(|| format!("failed to write profile to {}", output))?;
        info!("profile written to {}", output);
    }
    Ok(profile)
}

/// Writes shell completions for `opts.shell` to `out`.
pub fn run_completions(opts: &cli::CompletionsArgs, out: &mut dyn io::Write) {
    let mut cmd = cli::Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(opts.shell, &mut cmd, name, out);
}
