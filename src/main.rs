//! Loadgate CLI entry point.

use clap::Parser;

use loadgate::cli::{handle_error, Cli, Commands};
use loadgate::infrastructure::config::ConfigLoader;
use loadgate::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };

    let _logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Evaluate(args) => {
            loadgate::cli::commands::evaluate::execute(args, &config, cli.json).await
        }
        Commands::Profiles(args) => {
            loadgate::cli::commands::profiles::execute(args, &config, cli.json)
        }
        Commands::Audit(args) => loadgate::cli::commands::audit::execute(args, cli.json),
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
