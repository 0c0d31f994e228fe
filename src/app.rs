//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads FRED/CSV series
//! - runs splices, capital calibrations, ratios and transforms
//! - prints reports/plots
//! - writes optional exports

use std::path::Path;

use clap::Parser;

use crate::capital::{CalibrationConfig, CapitalOptions};
use crate::cli::{
    CapitalArgs, Command, FetchArgs, PlotArgs, PlotOptions, RatioArgs, RescaleOptions, SpliceArgs, TransformArgs,
};
use crate::data::{SeriesLoader, SourceSpec};
use crate::domain::{Frequency, TimeSeries};
use crate::error::AppError;

pub mod pipeline;

use pipeline::{CapitalRequest, DepreciationInput, MeanTarget, RatioRequest};

/// Entry point for the `msplice` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    let mut loader = SeriesLoader::new(cli.api_key_file);

    match cli.command {
        Command::Splice(args) => handle_splice(args, &mut loader),
        Command::Capital(args) => handle_capital(args, &mut loader),
        Command::Fetch(args) => handle_fetch(args, &mut loader),
        Command::Transform(args) => handle_transform(args, &mut loader),
        Command::Ratio(args) => handle_ratio(args, &mut loader),
        Command::Plot(args) => handle_plot(args, &mut loader),
    }
}

fn handle_splice(args: SpliceArgs, loader: &mut SeriesLoader) -> Result<(), AppError> {
    let recipe = crate::io::read_recipe(&args.recipe)?;
    let run = pipeline::run_splice(&recipe, loader)?;
    let series = &run.output.series;

    println!("{}", crate::report::format_splice_summary(&run.output, &recipe));
    print_plot(&[series], &args.plot);

    if let Some(path) = args.export.as_ref().or(recipe.output.as_ref()) {
        crate::io::write_series_csv(path, recipe.frequency, &[series], recipe.decimals)?;
    }
    if let Some(path) = &args.svg {
        let mut lines = vec![series];
        lines.extend(run.pieces.iter());
        let recessions = load_recessions(args.recessions.as_ref(), loader)?;
        crate::plot::write_svg_chart(path, &recipe.name, &lines, recessions.as_ref(), (1024, 640))?;
    }
    Ok(())
}

fn handle_capital(args: CapitalArgs, loader: &mut SeriesLoader) -> Result<(), AppError> {
    let request = capital_request_from_args(&args);
    let run = pipeline::run_capital(&request, loader)?;

    println!(
        "{}",
        crate::report::format_capital_summary(&run.stock, &run.options)
    );
    print_plot(&[&run.stock.series], &args.plot);

    if let Some(path) = &args.export {
        let mut columns = vec![&run.stock.series, &run.output];
        columns.extend(run.tfp.as_ref());
        crate::io::write_series_csv(path, run.options.frequency, &columns, args.decimals)?;
    }
    Ok(())
}

pub fn capital_request_from_args(args: &CapitalArgs) -> CapitalRequest {
    let depreciation = match (&args.depreciation, args.delta) {
        (Some(spec), _) => DepreciationInput::Series(spec.clone()),
        (None, delta) => DepreciationInput::Rate(delta.unwrap_or_default()),
    };
    CapitalRequest {
        investment: args.investment.clone(),
        output: args.output.clone(),
        depreciation,
        labor: args.labor.clone().zip(args.alpha),
        frequency: args.frequency,
        options: CapitalOptions {
            delta: args.delta.unwrap_or_default(),
            frequency: args.frequency.unwrap_or(Frequency::Annual),
            calibration: CalibrationConfig {
                window: args.window,
                guess: args.guess,
                tolerance: args.tolerance,
                max_iter: args.max_iter,
            },
            annualized_flows: args.annualized_flows,
        },
    }
}

fn handle_fetch(args: FetchArgs, loader: &mut SeriesLoader) -> Result<(), AppError> {
    let series = pipeline::run_fetch(&args.source, args.start, args.end, loader)?;
    let frequency = resolve_frequency(args.frequency, &series)?;

    print!("{}", crate::report::format_series_summary(&series, frequency));
    print_plot(&[&series], &args.plot);
    export(args.export.as_deref(), frequency, &series, args.decimals)
}

fn handle_transform(args: TransformArgs, loader: &mut SeriesLoader) -> Result<(), AppError> {
    let series = pipeline::run_fetch(&args.source, args.start, args.end, loader)?;
    let frequency = resolve_frequency(args.frequency, &series)?;

    let (out, out_frequency) =
        pipeline::apply_transform(&series, args.op, frequency, mean_target(&args.rescale))?;

    print!("{}", crate::report::format_series_summary(&out, out_frequency));
    print_plot(&[&out], &args.plot);
    export(args.export.as_deref(), out_frequency, &out, args.decimals)
}

fn handle_ratio(args: RatioArgs, loader: &mut SeriesLoader) -> Result<(), AppError> {
    let request = RatioRequest {
        numerator: args.numerator,
        denominator: args.denominator,
        name: args.name,
        start: args.start,
        end: args.end,
        rescale: mean_target(&args.rescale),
    };
    let out = pipeline::run_ratio(&request, loader)?;
    let frequency = resolve_frequency(args.frequency, &out)?;

    print!("{}", crate::report::format_series_summary(&out, frequency));
    print_plot(&[&out], &args.plot);
    export(args.export.as_deref(), frequency, &out, args.decimals)
}

/// clap guarantees all three flags or none.
fn mean_target(options: &RescaleOptions) -> Option<MeanTarget> {
    match (options.target, options.mean_start, options.mean_end) {
        (Some(target), Some(start), Some(end)) => Some(MeanTarget { start, end, target }),
        _ => None,
    }
}

fn load_recessions(spec: Option<&SourceSpec>, loader: &mut SeriesLoader) -> Result<Option<TimeSeries>, AppError> {
    spec.map(|spec| loader.load(spec, None, None)).transpose()
}

fn handle_plot(args: PlotArgs, loader: &mut SeriesLoader) -> Result<(), AppError> {
    let mut series = Vec::with_capacity(args.column.len());
    for column in &args.column {
        let ingested = crate::io::read_series_csv(&args.csv, None, column)?;
        for row in &ingested.row_errors {
            log::warn!("{}:{}: {}", args.csv.display(), row.line, row.message);
        }
        series.push(ingested.series);
    }
    let refs: Vec<&TimeSeries> = series.iter().collect();

    match &args.svg {
        Some(path) => {
            let title = args.csv.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
            let recessions = load_recessions(args.recessions.as_ref(), loader)?;
            crate::plot::write_svg_chart(path, &title, &refs, recessions.as_ref(), (1024, 640))
        }
        None => {
            println!("{}", crate::plot::render_series_plot(&refs, args.width, args.height));
            Ok(())
        }
    }
}

fn resolve_frequency(requested: Option<Frequency>, series: &TimeSeries) -> Result<Frequency, AppError> {
    match requested {
        Some(f) => Ok(f),
        None => pipeline::infer_frequency(series),
    }
}

fn print_plot(series: &[&TimeSeries], options: &PlotOptions) {
    if !options.no_plot {
        println!(
            "{}",
            crate::plot::render_series_plot(series, options.width, options.height)
        );
    }
}

fn export(path: Option<&Path>, frequency: Frequency, series: &TimeSeries, decimals: usize) -> Result<(), AppError> {
    match path {
        Some(path) => crate::io::write_series_csv(path, frequency, &[series], decimals),
        None => Ok(()),
    }
}
