use std::process;
use std::sync::Arc;

use anyhow::Result;
use hydroform::cli::{self, Commands};
use hydroform::executor::{CommandExecutor, RealCommandExecutor};
use tracing::error;

fn main() -> Result<()> {
    let args = cli::parse_args()?;
    hydroform::init_logging(args.command.log_level())?;

    let executor: Arc<dyn CommandExecutor> = Arc::new(RealCommandExecutor {
        dry_run: args.command.dry_run(),
    });
    let result = match &args.command {
        Commands::Provision(opts) => hydroform::run_provision(opts, executor),
        Commands::Deprovision(opts) => hydroform::run_deprovision(opts, executor),
        Commands::Status(opts) => hydroform::run_status(opts, executor),
        Commands::Credentials(opts) => hydroform::run_credentials(opts, executor),
        Commands::Validate(opts) => hydroform::run_validate(opts),
        Commands::CheckInstallation(opts) => hydroform::run_check_installation(opts, executor),
        Commands::Completions(opts) => hydroform::run_completions(opts),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        process::exit(1);
    }

    Ok(())
}
