//! hexreco CLI: Shower positions and tracks from calorimeter hit files.
//!
//! Reads binary or CSV hit files, reconstructs one impact point per layer and
//! a track per event, and writes the results as CSV.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use hexreco_algorithms::{
    reconstruct_events, ConsiderationMethod, ReconstructionConfig, ReconstructionStatistics,
    TrackFittingMethod, WeightingMethod,
};
use hexreco_core::HexagonalGeometry;
use hexreco_io::{group_events, load_config, read_hit_records, DataFileWriter, HitRecord};
use log::info;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    HexrecoIo(#[from] hexreco_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] hexreco_core::Error),
}

/// Neighbour selection for the layer centroid.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Consideration {
    /// Every hit of the layer
    All,
    /// The 7 hits nearest the reference hit
    Seven,
    /// The 19 hits nearest the reference hit
    Nineteen,
    /// Cluster-based selection (uses every hit)
    Clusters,
}

/// Weighting of hit intensities.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Weighting {
    /// Intensity squared
    Squared,
    /// Intensity
    Linear,
    /// Logarithmic, a = 5.0, b = 1.0
    #[value(name = "log-50-10")]
    Log5010,
    /// Logarithmic, a = 5.0, b = 0.5
    #[value(name = "log-50-05")]
    Log5005,
    /// Logarithmic, a = 7.0, b = 1.0
    #[value(name = "log-70-10")]
    Log7010,
}

/// Polynomial used for the track.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Fit {
    /// Straight line
    Line,
    /// Second order polynomial
    Pol2,
    /// Third order polynomial
    Pol3,
    /// No fit
    Default,
}

impl From<Consideration> for ConsiderationMethod {
    fn from(value: Consideration) -> Self {
        match value {
            Consideration::All => Self::ConsiderAll,
            Consideration::Seven => Self::ConsiderSeven,
            Consideration::Nineteen => Self::ConsiderNineteen,
            Consideration::Clusters => Self::ConsiderClusters,
        }
    }
}

impl From<Weighting> for WeightingMethod {
    fn from(value: Weighting) -> Self {
        match value {
            Weighting::Squared => Self::Squared,
            Weighting::Linear => Self::Linear,
            Weighting::Log5010 => Self::Log50_10,
            Weighting::Log5005 => Self::Log50_05,
            Weighting::Log7010 => Self::Log70_10,
        }
    }
}

impl From<Fit> for TrackFittingMethod {
    fn from(value: Fit) -> Self {
        match value {
            Fit::Line => Self::LineFit,
            Fit::Pol2 => Self::Pol2,
            Fit::Pol3 => Self::Pol3,
            Fit::Default => Self::DefaultFitting,
        }
    }
}

/// Shower position and track reconstruction for hexagonal calorimeters.
#[derive(Parser)]
#[command(name = "hexreco")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct layer positions and tracks
    Reconstruct {
        /// Input hit file (.csv or binary)
        input: PathBuf,

        /// Output CSV of layer positions
        #[arg(short, long)]
        positions: PathBuf,

        /// Output CSV of track positions at the probe depths
        #[arg(short, long)]
        tracks: Option<PathBuf>,

        /// Output JSON of run statistics
        #[arg(long)]
        stats: Option<PathBuf>,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Neighbour selection (overrides the configuration)
        #[arg(long, value_enum)]
        consideration: Option<Consideration>,

        /// Intensity weighting (overrides the configuration)
        #[arg(long, value_enum)]
        weighting: Option<Weighting>,

        /// Track polynomial (overrides the configuration)
        #[arg(long, value_enum)]
        fit: Option<Fit>,

        /// Depths at which tracks are reported, comma separated
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        probe_z: Vec<f64>,

        /// Depth step between layers without an explicit depth
        #[arg(long)]
        layer_pitch: Option<f64>,

        /// Process events on a single thread
        #[arg(long)]
        sequential: bool,
    },

    /// Show information about a hit file
    Info {
        /// Input hit file (.csv or binary)
        input: PathBuf,
    },

    /// Convert a hit file between CSV and binary, by output extension
    Convert {
        /// Input hit file (.csv or binary)
        input: PathBuf,

        /// Output hit file (.csv or binary)
        output: PathBuf,
    },
}

/// Command-line values that take precedence over the configuration file.
struct Overrides {
    consideration: Option<Consideration>,
    weighting: Option<Weighting>,
    fit: Option<Fit>,
    probe_z: Vec<f64>,
    layer_pitch: Option<f64>,
    sequential: bool,
}

impl Overrides {
    fn apply(self, mut config: ReconstructionConfig) -> ReconstructionConfig {
        if let Some(method) = self.consideration {
            config.consideration = method.into();
        }
        if let Some(method) = self.weighting {
            config.weighting = method.into();
        }
        if let Some(method) = self.fit {
            config.fitting = method.into();
        }
        if !self.probe_z.is_empty() {
            config.probe_z = self.probe_z;
        }
        if let Some(pitch) = self.layer_pitch {
            config.layer_pitch = pitch;
        }
        if self.sequential {
            config.parallel = false;
        }
        config
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Reconstruct {
            input,
            positions,
            tracks,
            stats,
            config,
            consideration,
            weighting,
            fit,
            probe_z,
            layer_pitch,
            sequential,
        } => {
            let base = match &config {
                Some(path) => load_config(path)?,
                None => ReconstructionConfig::default(),
            };
            let config = Overrides {
                consideration,
                weighting,
                fit,
                probe_z,
                layer_pitch,
                sequential,
            }
            .apply(base);
            config.validate()?;
            info!(
                "consideration {}, weighting {}, fit {}, parallel {}",
                config.consideration, config.weighting, config.fitting, config.parallel
            );

            let start = Instant::now();
            let records = read_hit_records(&input)?;
            let events = group_events(records);
            info!("{} events read from {}", events.len(), input.display());

            let results = reconstruct_events(&events, &HexagonalGeometry::new(), &config)?;

            DataFileWriter::create(&positions)?.write_positions_csv(&results)?;
            if let Some(path) = &tracks {
                DataFileWriter::create(path)?.write_tracks_csv(&results, &config.probe_z)?;
            }

            let summary = ReconstructionStatistics::from_results(&results);
            if let Some(path) = &stats {
                DataFileWriter::create(path)?.write_statistics_json(&summary)?;
            }

            println!(
                "Reconstructed {} events in {:.2}s",
                summary.events,
                start.elapsed().as_secs_f64()
            );
            println!("Layer positions: {}", summary.layers);
            println!("Hits used: {}", summary.hits_used);
            println!("Hits outside layout: {}", summary.hits_dropped);
            println!("Fit fallbacks: {}", summary.fit_fallbacks);
        }

        Commands::Info { input } => {
            let records = read_hit_records(&input)?;
            let file_size = std::fs::metadata(&input)?.len();

            println!("File: {}", input.display());
            println!(
                "Size: {} bytes ({:.2} MB)",
                file_size,
                file_size as f64 / 1_000_000.0
            );
            println!("Hits: {}", records.len());

            if let (Some(first), Some(last)) = (
                records.iter().map(|r| r.hit.address.layer).min(),
                records.iter().map(|r| r.hit.address.layer).max(),
            ) {
                println!("Layers: {} - {}", first, last);
                let (min_e, max_e) = energy_range(&records);
                println!("Energy range: {} - {}", min_e, max_e);

                let mut types: BTreeMap<u8, usize> = BTreeMap::new();
                for record in &records {
                    *types.entry(record.hit.cell_type.0).or_default() += 1;
                }
                for (cell_type, count) in types {
                    println!("Cell type {}: {}", cell_type, count);
                }
            }

            let events = group_events(records);
            println!("Events: {}", events.len());
        }

        Commands::Convert { input, output } => {
            let records = read_hit_records(&input)?;
            let mut writer = DataFileWriter::create(&output)?;
            if is_csv(&output) {
                writer.write_hits_csv(&records)?;
            } else {
                writer.write_hits_binary(&records)?;
            }
            println!(
                "Converted {} hits: {} -> {}",
                records.len(),
                input.display(),
                output.display()
            );
        }
    }

    Ok(())
}

fn energy_range(records: &[HitRecord]) -> (f64, f64) {
    records
        .iter()
        .map(|r| r.hit.energy)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), e| {
            (lo.min(e), hi.max(e))
        })
}
