use spinepipe::cli::commands::{CliArgs, Commands};
use spinepipe::cli::handlers::{handle_config, handle_health, handle_run};
use spinepipe::util::logging::{config_for_flags, init_logging};
use spinepipe::VERSION;

use clap::Parser;
use tracing::debug;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging(config_for_flags(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
    ));

    debug!("spinepipe v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Run(run_args) => handle_run(run_args, args.quiet).await,
        Commands::Health(health_args) => handle_health(health_args).await,
        Commands::Config(config_args) => handle_config(config_args),
    };

    std::process::exit(exit_code);
}
