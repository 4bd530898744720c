//! Command-line entry point.
//!
//! # Responsibility
//! - Format single size strings for quick checks.
//! - Run the batch normalizer over a JSON document snapshot.
//!
//! # Invariants
//! - Reports go to stdout as JSON; diagnostics go to stderr.
//! - Any failure exits non-zero without panicking.

use clap::{Parser, Subcommand};
use log::info;
use mepsize_core::{
    core_version, default_log_level, init_logging, BatchService, CoreConfig, DocumentSnapshot,
    InMemoryDocument, SizeFormatter,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "mepsize")]
#[command(about = "Normalize MEP pipe and duct size strings")]
struct Cli {
    /// Absolute directory for rolling log files; logging is off without it
    #[arg(long, global = true)]
    log_dir: Option<String>,

    /// Log level (off|error|warn|info|debug|trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Format one raw size string
    Format {
        /// Raw size as entered, e.g. "200x100" or "DN 12.7mm"
        raw: String,

        /// Category name used as the round/rectangular hint
        #[arg(long)]
        category: Option<String>,

        /// JSON config file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Normalize every entity of a JSON document snapshot
    Batch {
        /// Snapshot file to process
        snapshot: PathBuf,

        /// JSON config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the updated snapshot here
        #[arg(long)]
        write: Option<PathBuf>,
    },

    /// Print the core version
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = init_logging(level, log_dir) {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    }

    let result = match cli.command {
        Command::Format {
            raw,
            category,
            config,
        } => format_one(&raw, category.as_deref(), config.as_deref()),
        Command::Batch {
            snapshot,
            config,
            write,
        } => run_batch(&snapshot, config.as_deref(), write.as_deref()),
        Command::Version => {
            println!("mepsize {}", core_version());
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<CoreConfig, String> {
    match path {
        Some(path) => CoreConfig::from_path(path).map_err(|err| err.to_string()),
        None => Ok(CoreConfig::default()),
    }
}

fn format_one(raw: &str, category: Option<&str>, config: Option<&Path>) -> Result<(), String> {
    let config = load_config(config)?;
    let formatter = SizeFormatter::new(config.formatter);
    println!("{}", formatter.format(raw, category));
    Ok(())
}

fn run_batch(snapshot: &Path, config: Option<&Path>, write: Option<&Path>) -> Result<(), String> {
    let config = load_config(config)?;
    let text = std::fs::read_to_string(snapshot)
        .map_err(|err| format!("failed to read snapshot `{}`: {err}", snapshot.display()))?;
    let parsed: DocumentSnapshot = serde_json::from_str(&text)
        .map_err(|err| format!("invalid snapshot `{}`: {err}", snapshot.display()))?;
    let mut doc = InMemoryDocument::from_snapshot(parsed).map_err(|err| err.to_string())?;

    let mut service = BatchService::new(&config);
    let entities = doc.entity_ids();
    let report = service.run(&mut doc, &entities);

    let rendered = serde_json::to_string_pretty(&report)
        .map_err(|err| format!("failed to encode report: {err}"))?;
    println!("{rendered}");

    if let Some(output) = write {
        let updated = serde_json::to_string_pretty(&doc.snapshot())
            .map_err(|err| format!("failed to encode snapshot: {err}"))?;
        std::fs::write(output, updated)
            .map_err(|err| format!("failed to write `{}`: {err}", output.display()))?;
        info!(
            "event=snapshot_write module=cli status=ok entities={} writes={}",
            entities.len(),
            doc.writes()
        );
    }
    Ok(())
}
