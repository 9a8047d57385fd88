//! mutation-host - demo and inspection CLI
//!
//! CLI entry point for running the dispatch demo and showing configuration.

use std::fs;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use mutation_host::cli::{Cli, Command, OutputFormat, get_log_path};
use mutation_host::config::{Config, DemoConfig};
use mutation_host::demo::{DemoReport, run_demo};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Demo {
            observers,
            mutations,
            rounds,
            format,
        }) => {
            debug!(?observers, ?mutations, ?rounds, ?format, "main: matched Demo command");
            let demo = DemoConfig {
                observers: observers.unwrap_or(config.demo.observers),
                mutations_per_round: mutations.unwrap_or(config.demo.mutations_per_round),
                rounds: rounds.unwrap_or(config.demo.rounds),
            };
            cmd_demo(&config, &demo, format).await
        }
        Some(Command::Config) => {
            debug!("main: matched Config command");
            cmd_config(&config)
        }
        None => {
            debug!("main: no command specified, running demo with config defaults");
            cmd_demo(&config, &config.demo, OutputFormat::Text).await
        }
    }
}

/// Run the demo and print its report
async fn cmd_demo(config: &Config, demo: &DemoConfig, format: OutputFormat) -> Result<()> {
    debug!(?demo, ?format, "cmd_demo: called");
    let report = run_demo(demo, &config.event_loop).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => print_report(&report),
    }
    Ok(())
}

fn print_report(report: &DemoReport) {
    println!("{}", "Mutation dispatch demo".bold());
    println!(
        "  {} rounds x {} mutations: {} scheduled, {} coalesced",
        report.rounds,
        report.mutations_per_round,
        report.scheduled.to_string().green(),
        report.coalesced.to_string().yellow()
    );
    println!(
        "  passes: {}  notifications: {}  aborted: {}",
        report.dispatch.passes, report.dispatch.notifications, report.dispatch.aborted_passes
    );
    for observer in &report.observers {
        println!(
            "  {:<12} deliveries: {}  records: {}",
            observer.name.cyan(),
            observer.deliveries,
            observer.records
        );
    }
    println!(
        "  event loop '{}': {} tasks ({} failed), {} actions ({} failed)",
        report.event_loop_name,
        report.event_loop.tasks_run,
        report.event_loop.tasks_failed,
        report.event_loop.actions_run,
        report.event_loop.actions_failed
    );
}

/// Print the effective configuration
fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
    print!("{}", yaml);
    Ok(())
}
