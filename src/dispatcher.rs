//! Command dispatcher that routes parsed clap commands to their handlers.

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, Utc};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::{formatters, Commands, HistoryCommands};
use kryptopit::config::Config;
use kryptopit::importers::{self, fields::parse_decimal};
use kryptopit::models::ParsedBatch;
use kryptopit::tax::TaxEngine;
use kryptopit::ui::progress::ProgressEvent;
use kryptopit::db;

/// Route a parsed command to its handler
pub async fn dispatch_command(command: Commands, config: &Config, json_output: bool) -> Result<()> {
    match command {
        Commands::Import { files } => dispatch_import(&files, config, json_output),
        Commands::Calculate {
            files,
            carry_forward,
            name,
            save,
        } => {
            let carry_forward = parse_decimal(&carry_forward, "carry-forward")
                .map_err(|e| anyhow!("Invalid --carry-forward: {}", e))?;
            if carry_forward.is_sign_negative() {
                return Err(anyhow!("--carry-forward cannot be negative"));
            }
            dispatch_calculate(&files, carry_forward, name, save, config, json_output).await
        }
        Commands::History { action } => dispatch_history(action, json_output),
        Commands::Rates { currency, date } => {
            dispatch_rates(&currency, &date, config, json_output).await
        }
    }
}

/// Ingest every file; a file that fails is reported and skipped
fn import_batches(files: &[PathBuf], config: &Config) -> Result<Vec<ParsedBatch>> {
    let mut batches = Vec::new();
    for path in files {
        match importers::ingest_path(path, config.max_file_size_bytes) {
            Ok(batch) => batches.push(batch),
            Err(e) => {
                warn!("Skipping {}: {:#}", path.display(), e);
                eprintln!("{} {:#}", "✗".red().bold(), e);
            }
        }
    }

    if batches.is_empty() {
        return Err(anyhow!("No file could be imported"));
    }
    Ok(batches)
}

fn dispatch_import(files: &[PathBuf], config: &Config, json_output: bool) -> Result<()> {
    let batches = import_batches(files, config)?;

    if json_output {
        println!("{}", formatters::format_json(&batches));
        return Ok(());
    }

    for batch in &batches {
        print!("{}", formatters::format_batch(batch));
    }
    Ok(())
}

async fn dispatch_calculate(
    files: &[PathBuf],
    carry_forward: Decimal,
    name: Option<String>,
    save: bool,
    config: &Config,
    json_output: bool,
) -> Result<()> {
    let batches = import_batches(files, config)?;
    let name = name.unwrap_or_else(|| format!("PIT-38 {}", Utc::now().format("%Y-%m-%d %H:%M")));

    let engine = TaxEngine::new(config.rate_resolver()?);
    info!("Running calculation '{}'", name);

    let spinner = (!json_output).then(new_spinner);
    let mut calc = engine
        .calculate_with_progress(batches, carry_forward, &name, |event| {
            if let Some(pb) = &spinner {
                match event {
                    ProgressEvent::Line { text, persist: true } => pb.println(text),
                    other => pb.set_message(other.message()),
                }
            }
        })
        .await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    if save {
        let conn = db::init_database(None)?;
        db::save_calculation(&conn, &mut calc)?;
    }

    if json_output {
        println!("{}", formatters::format_json(&calc));
        return Ok(());
    }

    print!("{}", formatters::format_calculation(&calc));
    if save {
        println!("{} Saved as {}", "✓".green().bold(), calc.id.bold());
    }
    Ok(())
}

fn dispatch_history(action: HistoryCommands, json_output: bool) -> Result<()> {
    let conn = db::init_database(None)?;

    match action {
        HistoryCommands::List => {
            let summaries = db::list_calculations(&conn)?;
            if json_output {
                println!("{}", formatters::format_json(&summaries));
            } else {
                print!("{}", formatters::format_history(&summaries));
            }
        }
        HistoryCommands::Show { id } => {
            let calc = db::load_calculation(&conn, &id)?
                .ok_or_else(|| anyhow!("No saved calculation with id {}", id))?;
            if json_output {
                println!("{}", formatters::format_json(&calc));
            } else {
                print!("{}", formatters::format_calculation(&calc));
            }
        }
        HistoryCommands::Delete { id } => {
            if !db::delete_calculation(&conn, &id)? {
                return Err(anyhow!("No saved calculation with id {}", id));
            }
            if json_output {
                println!("{}", serde_json::json!({ "deleted": id }));
            } else {
                println!("{} Deleted {}", "✓".green().bold(), id);
            }
        }
    }
    Ok(())
}

async fn dispatch_rates(
    currency: &str,
    date: &str,
    config: &Config,
    json_output: bool,
) -> Result<()> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", date))?;

    let resolver = config.rate_resolver()?;
    let rate = resolver.resolve(currency, date).await;

    if json_output {
        println!("{}", formatters::format_json(&rate));
    } else {
        print!("{}", formatters::format_rate(&rate));
    }
    Ok(())
}

fn new_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
