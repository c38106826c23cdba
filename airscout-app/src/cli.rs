use airscout_common::OutputFormat;
use airscout_report::GroupBy;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Collect air quality time series for cities and summarise them.
#[derive(Parser, Debug)]
#[command(name = "airscout", version, about, long_about = None)]
pub struct Cli {
    /// YAML configuration file. Defaults to ./airscout.yaml when present.
    #[arg(short, long, global = true, env = "AIRSCOUT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve place names to bounding boxes and print the registry as JSON.
    Geocode {
        /// Place names; the configured `places` list when empty.
        places: Vec<String>,

        /// Two-letter region code biasing the lookup.
        #[arg(long)]
        region: Option<String>,

        /// Write the registry here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Download historical city data from the air quality archive.
    Archive {
        /// City names; the configured `places` list when empty.
        cities: Vec<String>,

        #[command(flatten)]
        dest: DestArgs,

        /// Rename each download to `<city>.csv`.
        #[arg(long)]
        name_after_city: bool,
    },

    /// Download area-averaged satellite series for each place's bounding box.
    Portal {
        /// First day, YYYY-MM-DD.
        #[arg(long)]
        start: String,

        /// Last day, YYYY-MM-DD.
        #[arg(long)]
        end: String,

        /// SO2, NO2 or "Particulate Matter" (PM2.5).
        #[arg(long)]
        pollutant: String,

        /// Place names to geocode; the configured `places` list when empty.
        places: Vec<String>,

        #[arg(long)]
        region: Option<String>,

        /// Reuse a registry written by `geocode` instead of geocoding.
        #[arg(long, conflicts_with = "places")]
        registry: Option<PathBuf>,

        #[command(flatten)]
        dest: DestArgs,
    },

    /// Aggregate downloaded CSV series into tables.
    Report {
        #[command(subcommand)]
        kind: ReportKind,

        #[arg(short, long, value_enum, default_value_t = Format::Json, global = true)]
        format: Format,
    },
}

#[derive(Args, Debug)]
pub struct DestArgs {
    /// Download directory; `downloads.directory` from the config by default.
    #[arg(long)]
    pub dest: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SeriesArgs {
    /// Downloaded CSV file.
    pub input: PathBuf,

    /// Value column; the first column after the date by default.
    #[arg(long)]
    pub column: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ReportKind {
    /// Mean per calendar month.
    Monthly(SeriesArgs),

    /// Monthly means of two series side by side.
    Compare {
        left: PathBuf,
        right: PathBuf,
        #[arg(long)]
        column: Option<String>,
    },

    /// Mean per year and month.
    Seasonal(SeriesArgs),

    /// Box-plot statistics per year or per month.
    Boxplot {
        #[command(flatten)]
        series: SeriesArgs,

        #[arg(long, value_enum, default_value_t = Grouping::Year)]
        by: Grouping,

        /// Years to leave out, e.g. partial first and last years.
        #[arg(long = "exclude-year")]
        exclude_years: Vec<i32>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Format {
    Json,
    Csv,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Json => OutputFormat::Json,
            Format::Csv => OutputFormat::Csv,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Grouping {
    Year,
    Month,
}

impl From<Grouping> for GroupBy {
    fn from(g: Grouping) -> Self {
        match g {
            Grouping::Year => GroupBy::Year,
            Grouping::Month => GroupBy::Month,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_portal_invocation() {
        let cli = Cli::try_parse_from([
            "airscout",
            "--config",
            "custom.yaml",
            "portal",
            "--start",
            "2020-01-01",
            "--end",
            "2020-12-31",
            "--pollutant",
            "PM2.5",
            "Beijing",
            "Shanghai",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.yaml")));
        match cli.command {
            Command::Portal { places, pollutant, registry, .. } => {
                assert_eq!(places, ["Beijing", "Shanghai"]);
                assert_eq!(pollutant, "PM2.5");
                assert!(registry.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_boxplot_with_exclusions() {
        let cli = Cli::try_parse_from([
            "airscout", "report", "--format", "csv", "boxplot", "beijing.csv", "--by", "month",
            "--exclude-year", "2013", "--exclude-year", "2026",
        ])
        .unwrap();
        match cli.command {
            Command::Report {
                kind: ReportKind::Boxplot { by, exclude_years, .. },
                format,
            } => {
                assert!(matches!(by, Grouping::Month));
                assert!(matches!(format, Format::Csv));
                assert_eq!(exclude_years, [2013, 2026]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
