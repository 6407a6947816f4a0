use std::io::{self, Write};
use std::process;

use anyhow::{Context, Result};
use tracing::error;

use instsource::cli::{self, Commands};
use instsource::task::MountContext;

fn print_yaml<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_yaml::to_string(value).context("failed to serialize output")?;
    io::stdout()
        .write_all(text.as_bytes())
        .context("failed to write to stdout")
}

fn run(command: &Commands) -> Result<()> {
    match command {
        Commands::Setup(opts) => {
            let repo = instsource::run_setup(opts, MountContext::system(opts.dry_run))?;
            print_yaml(&repo)
        }
        Commands::Teardown(opts) => {
            instsource::run_teardown(opts, MountContext::system(opts.dry_run))
        }
        Commands::Status(opts) => {
            let report = instsource::run_status(opts, MountContext::system(true))?;
            print_yaml(&report)
        }
        Commands::Validate(opts) => {
            let address = instsource::run_validate(opts)?;
            println!("{}", address);
            Ok(())
        }
        Commands::Export(opts) => {
            let profile = instsource::run_export(opts)?;
            if opts.output.is_none() {
                print_yaml(&profile)?;
            }
            Ok(())
        }
        Commands::Completions(opts) => {
            instsource::run_completions(opts, &mut io::stdout());
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let args = cli::parse_args()?;
    instsource::init_logging(args.command.log_level())?;

    if let Err(e) = run(&args.command) {
        error!("{:#}", e);
        process::exit(1);
    }

    Ok(())
}
