use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand, ValueHint};
use serde::de::DeserializeOwned;
use serde::Serialize;

use sheetdash::data::filter::Filter;
use sheetdash::report::{RegistrySelection, SensorSelection, TOP_N_RANGE};
use sheetdash::{CellValue, PipelineConfig, RegistryConfig, SensorConfig, Session};

#[derive(Parser, Debug)]
#[command(author, version, about = "Clean, filter and summarise spreadsheet exports", long_about = None)]
struct Cli {
    /// JSON file overriding the cleaning configuration
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Accreditation registry: counts per material and standard
    Registry(RegistryArgs),
    /// Humidity logger export: date/time window and statistics
    Sensor(SensorArgs),
}

#[derive(Parser, Debug)]
struct RegistryArgs {
    /// Uploaded file (.csv, .txt, .xlsx, .xls)
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Material to keep; repeat for several (default: all)
    #[arg(long = "material")]
    materials: Vec<String>,

    /// Keep only this standard (default: all)
    #[arg(long)]
    standard: Option<String>,

    /// Number of standards in the top-N ranking
    #[arg(long, default_value_t = 10)]
    top_n: usize,
}

#[derive(Parser, Debug)]
struct SensorArgs {
    /// Uploaded file (.csv, .txt, .xlsx, .xls)
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// First date to keep, YYYY-MM-DD (default: earliest date present)
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// Last date to keep, YYYY-MM-DD (default: latest date present)
    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// Daily window start, HH:MM[:SS]
    #[arg(long, value_parser = parse_clock, default_value = "00:00:00")]
    start_time: NaiveTime,

    /// Daily window end, HH:MM[:SS]
    #[arg(long, value_parser = parse_clock, default_value = "23:59:59")]
    end_time: NaiveTime,

    /// Positions in the filtered rows to compute statistics over
    #[arg(long, value_delimiter = ',')]
    rows: Vec<usize>,
}

fn parse_clock(s: &str) -> std::result::Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|e| format!("invalid time '{s}': {e}"))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Registry(args) => {
            let config: RegistryConfig = read_config(cli.config.as_deref())?;
            let session = open(PipelineConfig::Registry(config), &args.input)?;

            let top_n = args.top_n.clamp(*TOP_N_RANGE.start(), *TOP_N_RANGE.end());
            if top_n != args.top_n {
                log::warn!("--top-n {} outside {:?}, using {top_n}", args.top_n, TOP_N_RANGE);
            }
            let selection = RegistrySelection {
                materials: (!args.materials.is_empty())
                    .then(|| args.materials.into_iter().map(CellValue::from).collect::<BTreeSet<_>>()),
                standard: args
                    .standard
                    .map_or(Filter::Any, |s| Filter::Exactly(CellValue::from(s))),
                top_n,
            };
            print_json(&session.registry_report(&selection)?)
        }
        Command::Sensor(args) => {
            let config: SensorConfig = read_config(cli.config.as_deref())?;
            let session = open(PipelineConfig::Sensor(config), &args.input)?;

            let selection = SensorSelection {
                start_date: args.start_date,
                end_date: args.end_date,
                times: (args.start_time, args.end_time),
                selected_rows: Some(args.rows),
            };
            print_json(&session.sensor_report(&selection)?)
        }
    }
}

fn read_config<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    let Some(path) = path else {
        return Ok(T::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

fn open(config: PipelineConfig, input: &Path) -> Result<Session> {
    let bytes = fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    let filename = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut session = Session::new(config);
    if !session.upload(&bytes, &filename) {
        bail!(session
            .status_message
            .unwrap_or_else(|| format!("failed to load {}", input.display())));
    }
    Ok(session)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
