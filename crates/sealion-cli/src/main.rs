use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};
use log::{info, LevelFilter};

use sealion_dots::{ChunkMode, CountTable, SeaLionConfig, SeaLionData, SeaLionError};

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Pipeline(#[from] SeaLionError),
    #[cfg(not(feature = "tracing"))]
    #[error(transparent)]
    Logger(#[from] log::SetLoggerError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid log level {0:?}")]
    InvalidLogLevel(String),
}

#[derive(Parser, Debug)]
#[command(
    name = "sealion",
    version,
    about = "Extract sea lion dot annotations and build training chunks"
)]
struct Cli {
    /// JSON config file; defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// off, error, warn, info, debug or trace. Overrides `SEALION_LOG`;
    /// `info` when neither is set.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct IdSelection {
    /// Comma-separated training image ids.
    #[arg(long, value_delimiter = ',')]
    ids: Vec<u32>,

    /// Use the short list of training ids.
    #[arg(long, conflicts_with = "ids")]
    short: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the default configuration as JSON.
    InitConfig {
        out: PathBuf,
        /// Place every default path under this directory.
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Extract dot and background coordinates and save them.
    Coords {
        #[command(flatten)]
        ids: IdSelection,
    },
    /// Cut training chunks around the saved coordinates.
    Chunks {
        /// Tighten chunks to the animal's bounding box.
        #[arg(long)]
        cropped: bool,
    },
    /// Compare detected dot counts with the ground-truth table.
    Count {
        #[command(flatten)]
        ids: IdSelection,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn parse_level(level: &str) -> Result<LevelFilter, CliError> {
    LevelFilter::from_str(level).map_err(|_| CliError::InvalidLogLevel(level.to_string()))
}

fn init_logging(flag: Option<&str>) -> Result<(), CliError> {
    let explicit = flag.map(parse_level).transpose()?;

    #[cfg(feature = "tracing")]
    sealion_core::init_tracing(false, explicit);
    #[cfg(not(feature = "tracing"))]
    sealion_core::init_with_level(
        explicit.unwrap_or_else(|| sealion_core::level_from_env(LevelFilter::Info)),
    )?;

    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    init_logging(cli.log_level.as_deref())?;

    let config = match &cli.config {
        Some(path) => {
            info!("using config {}", path.display());
            SeaLionConfig::load_json(path)?
        }
        None => SeaLionConfig::default(),
    };

    match cli.command {
        Command::InitConfig { out, root } => {
            let cfg = root
                .map(|dir| SeaLionConfig::rooted(&dir))
                .unwrap_or_default();
            cfg.write_json(&out)?;
            println!("wrote config to {}", out.display());
        }
        Command::Coords { ids } => {
            let data = SeaLionData::new(config);
            let ids = select_ids(&data, &ids);
            let truth = load_truth(&data);
            let summary = data.save_coords(&ids, truth.as_ref())?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Chunks { cropped } => {
            let data = SeaLionData::new(config);
            let mode = if cropped {
                ChunkMode::Cropped
            } else {
                ChunkMode::Fixed
            };
            let points = data.load_coords()?;
            let summary = data.save_chunks(&points, mode)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Count { ids } => {
            let data = SeaLionData::new(config);
            let ids = select_ids(&data, &ids);
            let truth = CountTable::load(&data.config().counts_path)?;
            let (_, summary) = data.collect_coords(&ids, Some(&truth))?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}

fn select_ids(data: &SeaLionData, sel: &IdSelection) -> Vec<u32> {
    if !sel.ids.is_empty() {
        sel.ids.clone()
    } else if sel.short {
        data.train_short_ids()
    } else {
        data.train_ids()
    }
}

/// Counts are only used for reporting during extraction, so a missing table
/// is not fatal here.
fn load_truth(data: &SeaLionData) -> Option<CountTable> {
    match CountTable::load(&data.config().counts_path) {
        Ok(t) => Some(t),
        Err(e) => {
            log::warn!("count comparison disabled: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_implement_std_error() {
        fn assert_error<E: std::error::Error + Send + Sync + 'static>() {}
        assert_error::<log::SetLoggerError>();
        assert_error::<CliError>();
    }

    #[test]
    fn parses_level_names() {
        assert_eq!(parse_level("debug").unwrap(), LevelFilter::Debug);
        assert_eq!(parse_level("OFF").unwrap(), LevelFilter::Off);
        assert!(matches!(
            parse_level("loud"),
            Err(CliError::InvalidLogLevel(l)) if l == "loud"
        ));
    }
}
