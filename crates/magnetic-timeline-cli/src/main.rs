//! `magnet`: inspect, repair and edit magnetic day timelines.
//!
//! A day is a JSON array of time blocks, read from `--input` or stdin.
//! Every command prints its result as JSON on stdout; logs go to stderr.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use clap::{Parser, Subcommand};
use magnetic_timeline::{
    advance, apply_edits, coverage_report, create_default_day, delete_block, format_minute,
    insert_at_position, manual_reflow, minute_of_day, move_block, resize_block, split_block,
    validate_blocks, Edit, ReflowConfig, TimeBlock, MINUTES_PER_DAY,
};
use serde::Serialize;
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "magnet",
    version,
    about = "Validate, reflow and edit magnetic day timelines"
)]
struct Cli {
    /// Engine configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Floor for automatic shrinking, in minutes (overrides --config)
    #[arg(long, global = true)]
    min_duration: Option<i64>,

    /// Day file (JSON array of blocks); stdin when omitted
    #[arg(short, long, global = true)]
    input: Option<PathBuf>,

    /// Log engine decisions to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a fresh day made of one open block
    New {
        #[arg(long)]
        id: String,
    },
    /// Report gaps, overlaps and overrun; exits 1 unless the day tiles exactly
    Validate,
    /// Repair the day and report what was wrong with it
    Reflow,
    /// Insert a block (JSON) at a minute or HH:MM
    Insert {
        #[arg(long)]
        block: String,
        #[arg(long, value_parser = parse_minute)]
        at: i64,
    },
    /// Move a block to start near a minute or HH:MM
    Move {
        #[arg(long)]
        id: String,
        #[arg(long, value_parser = parse_minute)]
        to: i64,
    },
    /// Change a block's duration in minutes
    Resize {
        #[arg(long)]
        id: String,
        #[arg(long)]
        duration: i64,
    },
    /// Split a block in two at a minute or HH:MM
    Split {
        #[arg(long)]
        id: String,
        #[arg(long, value_parser = parse_minute)]
        at: i64,
        /// Id for the second half (defaults to a placeholder)
        #[arg(long)]
        new_id: Option<String>,
    },
    /// Remove a block and close the hole
    Delete {
        #[arg(long)]
        id: String,
    },
    /// Apply a JSON array of edits, all or nothing
    Apply {
        #[arg(long)]
        edits: PathBuf,
    },
    /// Freeze every block that has ended by the given HH:MM
    Advance {
        #[arg(long, value_parser = parse_clock)]
        now: NaiveTime,
    },
    /// Print the day as a readable schedule
    Show,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_deref(), cli.min_duration)?;
    debug!(min_duration = config.min_duration_minutes, "loaded config");

    match &cli.command {
        Command::New { id } => print_json(&create_default_day(id.as_str()))?,
        Command::Validate => {
            let day = read_day(cli.input.as_deref())?;
            let report = coverage_report(&day)?;
            let valid = report.is_valid();
            print_json(&json!({
                "valid": valid,
                "gaps": report.gaps,
                "overlaps": report.overlaps,
                "overrun_minutes": report.overrun_minutes,
            }))?;
            if !valid {
                return Ok(ExitCode::from(1));
            }
        }
        Command::Reflow => {
            let day = read_day(cli.input.as_deref())?;
            print_json(&manual_reflow(&day, &config).context("reflow rejected")?)?;
        }
        Command::Insert { block, at } => {
            let day = read_day(cli.input.as_deref())?;
            let block: TimeBlock =
                serde_json::from_str(block).context("--block is not a valid block")?;
            print_json(&insert_at_position(&day, block, *at, &config).context("insert rejected")?)?;
        }
        Command::Move { id, to } => {
            let day = read_day(cli.input.as_deref())?;
            print_json(&move_block(&day, id, *to, &config).context("move rejected")?)?;
        }
        Command::Resize { id, duration } => {
            let day = read_day(cli.input.as_deref())?;
            print_json(&resize_block(&day, id, *duration, &config).context("resize rejected")?)?;
        }
        Command::Split { id, at, new_id } => {
            let day = read_day(cli.input.as_deref())?;
            print_json(&split_block(&day, id, *at, new_id.as_deref()).context("split rejected")?)?;
        }
        Command::Delete { id } => {
            let day = read_day(cli.input.as_deref())?;
            print_json(&delete_block(&day, id, &config).context("delete rejected")?)?;
        }
        Command::Apply { edits } => {
            let day = read_day(cli.input.as_deref())?;
            let raw = fs::read_to_string(edits)
                .with_context(|| format!("reading edits from {}", edits.display()))?;
            let edits: Vec<Edit> =
                serde_json::from_str(&raw).context("edits file is not a JSON array of edits")?;
            print_json(&apply_edits(&day, &edits, &config).context("edit batch rejected")?)?;
        }
        Command::Advance { now } => {
            let day = read_day(cli.input.as_deref())?;
            print_json(&advance(&day, *now)?)?;
        }
        Command::Show => {
            let day = read_day(cli.input.as_deref())?;
            validate_blocks(&day)?;
            print!("{}", render_schedule(&day));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn load_config(path: Option<&Path>, min_duration: Option<i64>) -> Result<ReflowConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading config from {}", path.display()))?;
            ReflowConfig::from_json(&raw)?
        }
        None => ReflowConfig::default(),
    };
    if let Some(minutes) = min_duration {
        config.min_duration_minutes = minutes;
    }
    config.validate()?;
    Ok(config)
}

fn read_day(path: Option<&Path>) -> Result<Vec<TimeBlock>> {
    let raw = match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("reading day from {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("reading day from stdin")?;
            buf
        }
    };
    serde_json::from_str(&raw).context("day is not a JSON array of blocks")
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_schedule(day: &[TimeBlock]) -> String {
    let mut sorted: Vec<&TimeBlock> = day.iter().collect();
    sorted.sort_by_key(|b| b.start_offset_minutes);
    sorted
        .iter()
        .map(|b| {
            let title = if b.title.is_empty() { "-" } else { b.title.as_str() };
            let lock = if b.is_locked { "  [locked]" } else { "" };
            format!(
                "{}-{}  {} ({}){}\n",
                format_minute(b.start_offset_minutes),
                format_minute(b.end_offset_minutes()),
                title,
                b.id,
                lock
            )
        })
        .collect()
}

/// A day offset given as whole minutes (`540`) or wall-clock time (`09:00`, `24:00`).
fn parse_minute(s: &str) -> std::result::Result<i64, String> {
    if s.contains(':') {
        if s == "24:00" {
            return Ok(MINUTES_PER_DAY);
        }
        return parse_clock(s).map(minute_of_day);
    }
    s.parse::<i64>()
        .map_err(|e| format!("'{s}' is neither minutes nor HH:MM: {e}"))
}

fn parse_clock(s: &str) -> std::result::Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| format!("'{s}' is not HH:MM: {e}"))
}
