//! Shared workflows behind the CLI commands.
//!
//! Keeping this in one place keeps the core workflow separate from presentation:
//! load sources -> splice / calibrate / transform -> outputs
//!
//! `app` then only has to decide what to print and where to write.

use chrono::NaiveDate;

use crate::capital::{CapitalOptions, CapitalStock, capital_stock, depreciation_rate, solow_residual};
use crate::cli::TransformOp;
use crate::data::{SeriesLoader, SourceSpec};
use crate::domain::{Frequency, TimeSeries, ratio, window_equalize};
use crate::error::AppError;
use crate::io::Recipe;
use crate::splice::{Segment, SpliceOutput, splice_with_report};

/// All computed outputs of a `splice` run.
#[derive(Debug, Clone)]
pub struct SpliceRun {
    pub output: SpliceOutput,
    /// Each segment's retained window after rescaling, for charts.
    pub pieces: Vec<TimeSeries>,
}

/// Load every segment of `recipe` and splice them.
pub fn run_splice(recipe: &Recipe, loader: &mut SeriesLoader) -> Result<SpliceRun, AppError> {
    let mut raw = Vec::with_capacity(recipe.segments.len());
    for seg in &recipe.segments {
        let series =
            loader.load_with_fallback(&seg.source, seg.fallback.as_ref(), Some(seg.start), Some(seg.end))?;
        raw.push(match seg.multiplier {
            Some(m) => series.scale(m),
            None => series,
        });
    }

    let segments: Vec<Segment<'_>> = raw
        .iter()
        .zip(&recipe.segments)
        .map(|(series, seg)| Segment::new(series, seg.start, seg.end))
        .collect();
    let mut output = splice_with_report(recipe.column_name(), &segments)?;

    let multiplier = recipe.multiplier.unwrap_or(1.0);
    if recipe.multiplier.is_some() {
        output.series = output.series.scale(multiplier);
    }

    let pieces = segments
        .iter()
        .zip(&output.scales)
        .filter(|(_, scale)| scale.points > 0)
        .map(|(seg, scale)| {
            seg.series
                .window(seg.start, seg.end)
                .scale(scale.factor * multiplier)
        })
        .collect();

    Ok(SpliceRun { output, pieces })
}

/// Where the depreciation rate of a capital run comes from.
#[derive(Debug, Clone)]
pub enum DepreciationInput {
    Rate(f64),
    Series(SourceSpec),
}

/// Inputs of a `capital` run, already decoupled from clap.
#[derive(Debug, Clone)]
pub struct CapitalRequest {
    pub investment: SourceSpec,
    pub output: SourceSpec,
    pub depreciation: DepreciationInput,
    /// Labor input and capital share for the Solow residual.
    pub labor: Option<(SourceSpec, f64)>,
    /// `None` infers the frequency from the investment dates.
    pub frequency: Option<Frequency>,
    pub options: CapitalOptions,
}

#[derive(Debug, Clone)]
pub struct CapitalRun {
    pub stock: CapitalStock,
    /// Options actually used (with the resolved rate and frequency).
    pub options: CapitalOptions,
    pub output: TimeSeries,
    pub tfp: Option<TimeSeries>,
}

pub fn run_capital(request: &CapitalRequest, loader: &mut SeriesLoader) -> Result<CapitalRun, AppError> {
    let loaded = [
        loader.load(&request.investment, None, None)?,
        loader.load(&request.output, None, None)?,
    ];
    // Stock, output and TFP all cover the span both inputs cover.
    let [investment, output]: [TimeSeries; 2] = window_equalize(&loaded)
        .try_into()
        .map_err(|_| AppError::new(3, "Investment and output could not be aligned.".to_string()))?;

    let frequency = match request.frequency {
        Some(f) => f,
        None => infer_frequency(&investment)?,
    };
    let delta = match &request.depreciation {
        DepreciationInput::Rate(delta) => *delta,
        DepreciationInput::Series(spec) => {
            let depreciation = loader.load(spec, None, None)?;
            let delta = depreciation_rate(&depreciation, &output)?;
            log::info!("depreciation rate from {spec}: {delta:.6}");
            delta
        }
    };

    let options = CapitalOptions {
        delta,
        frequency,
        ..request.options
    };
    let stock = capital_stock(&investment, &output, &options)?;

    let tfp = match &request.labor {
        Some((spec, alpha)) => {
            let labor = loader.load(spec, None, None)?;
            Some(solow_residual(&output, &stock.series, &labor, *alpha)?)
        }
        None => None,
    };

    Ok(CapitalRun {
        stock,
        options,
        output,
        tfp,
    })
}

/// Load one source, bounded to `start..=end` when given.
pub fn run_fetch(
    spec: &SourceSpec,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    loader: &mut SeriesLoader,
) -> Result<TimeSeries, AppError> {
    let series = loader.load(spec, start, end)?;
    let lo = start.unwrap_or(NaiveDate::MIN);
    let hi = end.unwrap_or(NaiveDate::MAX);
    let windowed = series.window(lo, hi);
    if windowed.is_empty() {
        return Err(AppError::new(
            3,
            format!("{spec} has no observations in the requested range."),
        ));
    }
    Ok(windowed)
}

/// Rescale a series so its mean over `start..=end` equals `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanTarget {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub target: f64,
}

/// Apply one CLI transform. Returns the result and its frequency.
pub fn apply_transform(
    series: &TimeSeries,
    op: TransformOp,
    frequency: Frequency,
    rescale: Option<MeanTarget>,
) -> Result<(TimeSeries, Frequency), AppError> {
    let out = match op {
        TransformOp::PctChange => (series.pct_change(1), frequency),
        TransformOp::AnnualPctChange => (series.annual_pct_change(frequency), frequency),
        TransformOp::Log => (series.ln(), frequency),
        TransformOp::Interpolate => (series.interpolate_missing(), frequency),
        TransformOp::AnnualMean => (series.to_annual_mean(), Frequency::Annual),
        TransformOp::Monthly => (series.upsample_monthly_linear(), Frequency::Monthly),
        TransformOp::RescaleMean => {
            let Some(t) = rescale else {
                return Err(AppError::new(
                    2,
                    "rescale-mean needs --target, --mean-start and --mean-end.".to_string(),
                ));
            };
            (series.rescale_mean(t.start, t.end, t.target)?, frequency)
        }
    };
    Ok(out)
}

/// Inputs of a `ratio` run.
#[derive(Debug, Clone)]
pub struct RatioRequest {
    pub numerator: SourceSpec,
    pub denominator: SourceSpec,
    /// Column name of the result (`num/den` when omitted).
    pub name: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub rescale: Option<MeanTarget>,
}

/// `numerator / denominator` on their common dates, optionally rescaled.
pub fn run_ratio(request: &RatioRequest, loader: &mut SeriesLoader) -> Result<TimeSeries, AppError> {
    let num = run_fetch(&request.numerator, request.start, request.end, loader)?;
    let den = run_fetch(&request.denominator, request.start, request.end, loader)?;

    let mut out = ratio(&num, &den);
    if out.is_empty() {
        return Err(AppError::new(
            3,
            format!("{} and {} share no dates.", request.numerator, request.denominator),
        ));
    }
    if let Some(t) = request.rescale {
        out = out.rescale_mean(t.start, t.end, t.target)?;
    }
    if let Some(name) = &request.name {
        out = out.renamed(name.as_str());
    }
    Ok(out)
}

pub fn infer_frequency(series: &TimeSeries) -> Result<Frequency, AppError> {
    let dates: Vec<NaiveDate> = series.dates().collect();
    Frequency::infer(&dates).ok_or_else(|| {
        AppError::new(
            2,
            format!("Cannot infer the frequency of '{}'; pass --frequency.", series.name()),
        )
    })
}
