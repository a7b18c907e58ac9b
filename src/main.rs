mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use calbridge_core::CalendarConfig;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "calbridge")]
#[command(about = "Aggregate calendar sources and render them as iCal, JSON or FullCalendar")]
struct Cli {
    /// Config file (defaults to ~/.config/calbridge/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log resolution details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a calendar and print it in the requested format
    Convert {
        /// Calendar name, as configured under `calendar.calendars` or ad hoc
        calendar: String,

        /// Output format: ical, json or fullcalendar
        #[arg(short, long, default_value = "ical")]
        format: String,

        /// Extra configured source to attach (repeatable)
        #[arg(short, long = "source")]
        sources: Vec<String>,

        /// Converter option as KEY=VALUE; VALUE is read as JSON when it parses
        #[arg(short, long = "option", value_parser = commands::convert::parse_option)]
        options: Vec<(String, Value)>,
    },
    /// List configured calendars and sources
    Sources,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let path = match cli.config {
        Some(path) => path,
        None => CalendarConfig::default_path()?,
    };
    tracing::debug!(path = %path.display(), "Loading config");
    let config = CalendarConfig::load(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    match cli.command {
        Commands::Convert {
            calendar,
            format,
            sources,
            options,
        } => commands::convert::run(config, &calendar, &format, &sources, options),
        Commands::Sources => commands::sources::run(&config),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
