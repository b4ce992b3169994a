//! carenest: command-line front end for search and realtime updates.

mod cli;
mod commands;

use std::process::ExitCode;

use carenest_config::schema::CareConfig;
use carenest_common::ConfigError;
use tracing_subscriber::EnvFilter;

use crate::cli::Command;

fn load_config(args: &cli::Args) -> Result<CareConfig, ConfigError> {
    match &args.config {
        Some(path) => carenest_config::load_config_from(path),
        None => carenest_config::load_config(),
    }
}

fn init_logging(directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        directive
            .parse::<tracing_subscriber::filter::Directive>()
            .map(|d| EnvFilter::default().add_directive(d))
            .unwrap_or_else(|_| EnvFilter::new("carenest=info"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    let config = load_config(&args);
    let directive = match (&args.log_level, &config) {
        (Some(level), _) if level.contains('=') => level.clone(),
        (Some(level), _) => format!("carenest={level}"),
        (None, Ok(config)) => config.logging.level.as_directive().to_string(),
        (None, Err(_)) => "carenest=info".to_string(),
    };
    init_logging(&directive);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Config load failed: {e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!("CareNest v{} starting", env!("CARGO_PKG_VERSION"));

    let result = match args.command {
        Command::Search {
            child,
            limit,
            json,
            query,
        } => commands::search::run(&config, child.into(), limit, json, query).await,
        Command::Watch {
            child,
            user,
            name,
            quiet,
        } => {
            let opts = commands::watch::WatchOptions {
                child: child.into(),
                user,
                name,
                quiet,
            };
            commands::watch::run(&config, opts).await
        }
        Command::Config => {
            println!("{}", carenest_config::config_to_json(&config));
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
