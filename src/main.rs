use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use log::info;
use pcmatch::config::{ConfigOverrides, MatchConfig};
use pcmatch::logging::init_logging;
use pcmatch::trim::{trim_file, BoundingBox, TrimOptions};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pcmatch", version, about = "Match properties to their nearest postcode")]
struct Cli {
    #[arg(long, global = true, default_value = "info", help = "trace|debug|info|warn|error|off")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assign each property its nearest postcode
    Match {
        #[arg(long, help = "TOML run configuration")]
        config: Option<PathBuf>,
        #[arg(long, help = "Property CSV (id, latitude, longitude)")]
        properties: Option<PathBuf>,
        #[arg(long, help = "Postcode CSV (postcode, latitude, longitude)")]
        postcodes: Option<PathBuf>,
        #[arg(long, help = "Output CSV path")]
        output: Option<PathBuf>,
        #[arg(long = "max-distance", help = "Acceptance radius in metres [default: 500]")]
        max_distance: Option<f64>,
        #[arg(long, conflicts_with = "no_parallel", help = "Query on all cores")]
        parallel: bool,
        #[arg(long, help = "Query on one thread, even if the config file enables parallel")]
        no_parallel: bool,
    },
    /// Cut a large CSV down to some columns and, optionally, a region
    Trim {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, value_delimiter = ',', required = true, help = "Columns to keep, comma separated")]
        keep: Vec<String>,
        #[arg(long, value_parser = clap::value_parser!(BoundingBox), help = "min_lat,max_lat,min_lon,max_lon")]
        bbox: Option<BoundingBox>,
        #[arg(long, default_value = "LATITUDE")]
        lat_column: String,
        #[arg(long, default_value = "LONGITUDE")]
        lon_column: String,
    },
}

/// `None` leaves the config file's setting in place.
fn parallel_override(parallel: bool, no_parallel: bool) -> Option<bool> {
    match (parallel, no_parallel) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _logger = init_logging(&cli.log_level).map_err(|e| anyhow!(e))?;

    match cli.command {
        Commands::Match {
            config,
            properties,
            postcodes,
            output,
            max_distance,
            parallel,
            no_parallel,
        } => {
            let overrides = ConfigOverrides {
                properties_path: properties,
                postcodes_path: postcodes,
                output_path: output,
                max_match_distance_m: max_distance,
                parallel: parallel_override(parallel, no_parallel),
            };
            let config = MatchConfig::resolve(config.as_deref(), overrides)
                .context("invalid run configuration")?;
            info!("Matching {} against {}", config.properties_path.display(), config.postcodes_path.display());

            let summary = pcmatch::run(&config).context("postcode matching failed")?;
            println!(
                "Done. Rows: {} (matched {}, rejected {}, dropped {} properties / {} postcodes) -> {}",
                summary.properties,
                summary.matched,
                summary.rejected,
                summary.dropped_properties,
                summary.dropped_postcodes,
                config.output_path.display()
            );
        }
        Commands::Trim {
            input,
            output,
            keep,
            bbox,
            lat_column,
            lon_column,
        } => {
            let options = TrimOptions {
                keep,
                bbox,
                lat_column,
                lon_column,
            };
            let summary = trim_file(&input, &output, &options)
                .with_context(|| format!("failed to trim {}", input.display()))?;
            println!(
                "Done. Kept {} of {} rows -> {}",
                summary.written,
                summary.read,
                output.display()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parallel_flags_override_the_file() {
        assert_eq!(parallel_override(false, false), None);
        assert_eq!(parallel_override(true, false), Some(true));
        assert_eq!(parallel_override(false, true), Some(false));
    }

    #[test]
    fn parallel_flags_conflict() {
        let err = Cli::try_parse_from(["pcmatch", "match", "--parallel", "--no-parallel"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);

        let cli = Cli::try_parse_from(["pcmatch", "match", "--no-parallel"]).unwrap();
        match cli.command {
            Commands::Match { parallel, no_parallel, .. } => assert!(!parallel && no_parallel),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
