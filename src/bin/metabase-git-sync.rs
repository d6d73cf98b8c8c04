//! metabase-git-sync binary
//!
//! Loads configuration, runs one sync, prints the report.

use clap::Parser;
use metabase_git_sync::cli::{
    exit_code, format_report, format_validation_errors, map_error, Cli, ReportFormat,
};
use metabase_git_sync::client::HttpMetabaseClient;
use metabase_git_sync::config::{ConfigLoader, SyncConfig};
use metabase_git_sync::error::SyncError;
use metabase_git_sync::logging::{init_logging, LoggingConfig};
use metabase_git_sync::sync::SyncPipeline;
use std::path::Path;
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(e) => {
            eprintln!("Cannot determine working directory: {}", e);
            process::exit(1);
        }
    };
    let workspace = cli.workspace_root(&cwd);

    let config = match load_config(&cli, &workspace) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", map_error(&e));
            process::exit(exit_code(&e));
        }
    };

    let logging_config = build_logging_config(&cli, &config);
    if let Err(e) = init_logging(&logging_config) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    if cli.show_config {
        match config.to_redacted_toml() {
            Ok(text) => {
                println!("{}", text);
                return;
            }
            Err(e) => {
                eprintln!("Failed to render configuration: {}", e);
                process::exit(1);
            }
        }
    }

    if let Err(errors) = config.validate() {
        eprintln!("{}", format_validation_errors(&errors));
        process::exit(2);
    }

    info!(url = %config.metabase.url, "metabase-git-sync starting");

    match run(&config, &workspace, cli.format) {
        Ok(output) => {
            info!("Sync completed");
            println!("{}", output);
        }
        Err(e) => {
            error!("Sync failed: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(exit_code(&e));
        }
    }
}

fn run(config: &SyncConfig, workspace: &Path, format: ReportFormat) -> Result<String, SyncError> {
    let client = HttpMetabaseClient::new(&config.metabase)?;
    let root = config.repo.resolved_path(workspace);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| SyncError::Config(format!("Failed to create async runtime: {}", e)))?;
    let report = rt.block_on(SyncPipeline::new(config, &client, root).run())?;

    format_report(&report, format)
}

/// Config file (or layered sources), then CLI overrides.
fn load_config(cli: &Cli, workspace: &Path) -> Result<SyncConfig, SyncError> {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load(workspace)?,
    };
    if let Some(path) = &cli.repo_path {
        config.repo.path = path.clone();
    }
    if cli.archive {
        config.repo.archive = true;
    }
    Ok(config)
}

/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli, config: &SyncConfig) -> LoggingConfig {
    let mut logging = config.logging.clone();

    if cli.quiet {
        logging.level = "off".to_string();
    }
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    if let Some(level) = &cli.log_level {
        logging.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        logging.format = format.clone();
    }
    if let Some(output) = &cli.log_output {
        logging.output = output.clone();
    }
    if let Some(file) = &cli.log_file {
        logging.file = Some(file.clone());
    }

    logging
}
