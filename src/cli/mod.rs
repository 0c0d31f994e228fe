//! Command-line parsing for the historical series splicer.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the splicing/capital code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::data::SourceSpec;
use crate::domain::Frequency;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "msplice",
    version,
    about = "Splice historical macro series and build capital stocks (FRED or CSV inputs)"
)]
pub struct Cli {
    /// File holding the FRED API key (otherwise `FRED_API_KEY` / `.env`).
    #[arg(long, global = true, value_name = "PATH")]
    pub api_key_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Splice the segments of a JSON recipe into one continuous series.
    Splice(SpliceArgs),
    /// Build a capital stock from investment and output (perpetual inventory).
    Capital(CapitalArgs),
    /// Fetch one series and print/export it.
    Fetch(FetchArgs),
    /// Apply a transform to one series.
    Transform(TransformArgs),
    /// Divide one series by another on their common dates.
    Ratio(RatioArgs),
    /// Plot a column of a previously exported CSV.
    Plot(PlotArgs),
}

/// Terminal plot size, shared by the commands that print a plot.
#[derive(Debug, Args, Clone)]
pub struct PlotOptions {
    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

/// Rescale a result so its mean over a window hits a target.
#[derive(Debug, Args, Clone)]
pub struct RescaleOptions {
    /// Target mean over `--mean-start..--mean-end`.
    #[arg(long, requires_all = ["mean_start", "mean_end"])]
    pub target: Option<f64>,

    #[arg(long, requires = "target")]
    pub mean_start: Option<NaiveDate>,

    #[arg(long, requires = "target")]
    pub mean_end: Option<NaiveDate>,
}

#[derive(Debug, Parser, Clone)]
pub struct SpliceArgs {
    /// Recipe JSON describing the segments.
    #[arg(long, value_name = "JSON")]
    pub recipe: PathBuf,

    /// Export the spliced series to CSV (overrides the recipe's `output`).
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Also write an SVG chart of the spliced series and its rescaled pieces.
    #[arg(long)]
    pub svg: Option<PathBuf>,

    /// 0/1 recession indicator to shade in the SVG chart (e.g. `USREC`).
    #[arg(long, requires = "svg")]
    pub recessions: Option<SourceSpec>,

    #[command(flatten)]
    pub plot: PlotOptions,
}

#[derive(Debug, Parser, Clone)]
pub struct CapitalArgs {
    /// Investment flow (`fred:ID`, `ID` or `path.csv#column`).
    #[arg(long)]
    pub investment: SourceSpec,

    /// Output (GDP) series.
    #[arg(long)]
    pub output: SourceSpec,

    /// Annual depreciation rate.
    #[arg(long, conflicts_with = "depreciation", required_unless_present = "depreciation")]
    pub delta: Option<f64>,

    /// Depreciation series; the rate is its average ratio to output.
    #[arg(long)]
    pub depreciation: Option<SourceSpec>,

    /// Labor input; when given, the Solow residual is exported too.
    #[arg(long, requires = "alpha")]
    pub labor: Option<SourceSpec>,

    /// Capital share for the Solow residual.
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Sampling frequency of the inputs (inferred from the dates when omitted).
    #[arg(long, value_enum)]
    pub frequency: Option<Frequency>,

    /// Calibration window in years.
    #[arg(long, default_value_t = 10)]
    pub window: usize,

    /// Starting guess for the initial capital stock.
    #[arg(long, default_value_t = 8000.0)]
    pub guess: f64,

    #[arg(long, default_value_t = 1e-6)]
    pub tolerance: f64,

    #[arg(long, default_value_t = 100)]
    pub max_iter: usize,

    /// Flows are quoted at annual rates and are divided by periods per year.
    #[arg(long)]
    pub annualized_flows: bool,

    /// Export capital (and output, TFP) to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    #[arg(long, default_value_t = 4)]
    pub decimals: usize,

    #[command(flatten)]
    pub plot: PlotOptions,
}

#[derive(Debug, Parser, Clone)]
pub struct FetchArgs {
    /// Series to fetch (`fred:ID`, `ID` or `path.csv#column`).
    pub source: SourceSpec,

    /// First date (YYYY-MM-DD).
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last date (YYYY-MM-DD).
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Date format of the export (inferred from the dates when omitted).
    #[arg(long, value_enum)]
    pub frequency: Option<Frequency>,

    #[arg(long)]
    pub export: Option<PathBuf>,

    #[arg(long, default_value_t = 4)]
    pub decimals: usize,

    #[command(flatten)]
    pub plot: PlotOptions,
}

/// Transforms available from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransformOp {
    /// Period-on-period percent change.
    PctChange,
    /// Percent change over one year.
    AnnualPctChange,
    /// Natural logarithm.
    Log,
    /// Linear interpolation of interior missing values.
    Interpolate,
    /// Calendar-year means.
    AnnualMean,
    /// Linear upsampling to monthly.
    Monthly,
    /// Rescale so the mean over `--mean-start..--mean-end` equals `--target`.
    RescaleMean,
}

#[derive(Debug, Parser, Clone)]
pub struct TransformArgs {
    pub source: SourceSpec,

    #[arg(long, value_enum)]
    pub op: TransformOp,

    #[arg(long)]
    pub start: Option<NaiveDate>,

    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Frequency of the input (inferred from the dates when omitted).
    #[arg(long, value_enum)]
    pub frequency: Option<Frequency>,

    #[command(flatten)]
    pub rescale: RescaleOptions,

    #[arg(long)]
    pub export: Option<PathBuf>,

    #[arg(long, default_value_t = 4)]
    pub decimals: usize,

    #[command(flatten)]
    pub plot: PlotOptions,
}

#[derive(Debug, Parser, Clone)]
pub struct RatioArgs {
    #[arg(long)]
    pub numerator: SourceSpec,

    #[arg(long)]
    pub denominator: SourceSpec,

    /// Column name of the result (`num/den` by default).
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub start: Option<NaiveDate>,

    #[arg(long)]
    pub end: Option<NaiveDate>,

    #[command(flatten)]
    pub rescale: RescaleOptions,

    /// Date format of the export (inferred from the dates when omitted).
    #[arg(long, value_enum)]
    pub frequency: Option<Frequency>,

    #[arg(long)]
    pub export: Option<PathBuf>,

    #[arg(long, default_value_t = 4)]
    pub decimals: usize,

    #[command(flatten)]
    pub plot: PlotOptions,
}

/// Options for plotting a saved CSV.
#[derive(Debug, Parser, Clone)]
pub struct PlotArgs {
    /// CSV file produced by `--export`.
    #[arg(long, value_name = "CSV")]
    pub csv: PathBuf,

    /// Column(s) to plot.
    #[arg(long, required = true)]
    pub column: Vec<String>,

    /// Write an SVG chart instead of printing to the terminal.
    #[arg(long)]
    pub svg: Option<PathBuf>,

    /// 0/1 recession indicator to shade in the SVG chart (e.g. `USREC`).
    #[arg(long, requires = "svg")]
    pub recessions: Option<SourceSpec>,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}
