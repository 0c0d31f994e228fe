//! Perpetual inventory method for the capital stock.
//!
//! - `capital_series`: `k[t+1] = i[t] + (1 - δ) k[t]` from a given `k[0]`
//! - `calibrate_initial_capital`: pick `k[0]` so that the initial capital/output
//!   ratio equals its average over the first `N` periods
//! - `capital_stock`: dated wrapper that also handles sub-annual frequencies
//! - `depreciation_rate`, `solow_residual`: the usual companions

use crate::domain::{Frequency, TimeSeries, inner_join, ratio};
use crate::error::SeriesError;

/// Solver settings for `calibrate_initial_capital`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationConfig {
    /// Number of periods `N` averaged on the right-hand side.
    pub window: usize,
    /// Starting value for `k0`.
    pub guess: f64,
    /// Convergence threshold on `|k0/y0 - mean(k[:N]/y[:N])|`.
    pub tolerance: f64,
    pub max_iter: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            window: 10,
            guess: 8000.0,
            tolerance: 1e-6,
            max_iter: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub k0: f64,
    pub residual: f64,
    pub iterations: usize,
}

/// Capital stock implied by an investment flow.
///
/// Returns `investment.len() + 1` values: `k[0] = k0` followed by one stock per
/// investment period.
pub fn capital_series(investment: &[f64], k0: f64, delta: f64) -> Result<Vec<f64>, SeriesError> {
    check_delta(delta)?;
    if !k0.is_finite() {
        return Err(SeriesError::InvalidParameter(format!("k0 must be finite, got {k0}")));
    }
    let mut k = Vec::with_capacity(investment.len() + 1);
    k.push(k0);
    for (t, &i) in investment.iter().enumerate() {
        k.push(i + (1.0 - delta) * k[t]);
    }
    Ok(k)
}

/// Solve for `k0` such that `k0 / y[0] == mean(k[t] / y[t], t < N)`.
///
/// The residual is affine in `k0`, so the secant method lands on the root in a
/// step or two; the iteration budget only matters for degenerate inputs.
pub fn calibrate_initial_capital(
    investment: &[f64],
    output: &[f64],
    delta: f64,
    config: &CalibrationConfig,
) -> Result<Calibration, SeriesError> {
    check_delta(delta)?;
    let n = config.window;
    if n == 0 {
        return Err(SeriesError::InvalidParameter("calibration window must be >= 1".to_string()));
    }
    if output.len() < n || investment.len() + 1 < n {
        return Err(SeriesError::InvalidParameter(format!(
            "calibration window {n} exceeds the data (output={}, investment={})",
            output.len(),
            investment.len()
        )));
    }
    if let Some(bad) = output[..n].iter().find(|y| !y.is_finite() || **y == 0.0) {
        return Err(SeriesError::InvalidParameter(format!(
            "output must be finite and non-zero within the calibration window, got {bad}"
        )));
    }
    if !(config.guess.is_finite() && config.tolerance > 0.0) {
        return Err(SeriesError::InvalidParameter(
            "calibration guess must be finite and tolerance positive".to_string(),
        ));
    }

    // Only the first N-1 investment values influence k[..N].
    let investment = &investment[..n - 1];
    let output = &output[..n];
    let residual = |k0: f64| -> Result<f64, SeriesError> {
        let k = capital_series(investment, k0, delta)?;
        let mean = k.iter().zip(output).map(|(k, y)| k / y).sum::<f64>() / n as f64;
        Ok(k0 / output[0] - mean)
    };

    let mut x0 = config.guess;
    let mut f0 = residual(x0)?;
    if f0.abs() < config.tolerance {
        return Ok(Calibration {
            k0: x0,
            residual: f0,
            iterations: 0,
        });
    }
    let mut x1 = if x0 == 0.0 { 1.0 } else { x0 * 1.01 };
    let mut f1 = residual(x1)?;

    let mut reached = 0;
    for iteration in 1..=config.max_iter {
        reached = iteration;
        log::debug!("calibration iter {iteration}: k0={x1:.6} residual={f1:.3e}");
        if f1.abs() < config.tolerance {
            return Ok(Calibration {
                k0: x1,
                residual: f1,
                iterations: iteration,
            });
        }
        let slope = f1 - f0;
        if slope == 0.0 || !slope.is_finite() {
            break;
        }
        let x2 = x1 - f1 * (x1 - x0) / slope;
        if !x2.is_finite() {
            break;
        }
        x0 = x1;
        f0 = f1;
        x1 = x2;
        f1 = residual(x1)?;
    }

    Err(SeriesError::CalibrationNotConverged {
        k0: x1,
        residual: f1,
        iterations: reached,
    })
}

/// Options for the dated capital-stock wrapper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapitalOptions {
    /// Annual depreciation rate.
    pub delta: f64,
    pub frequency: Frequency,
    /// Calibration settings; `window` is expressed in years.
    pub calibration: CalibrationConfig,
    /// Investment is quoted at an annual rate (as in the NIPA quarterly tables)
    /// and is divided by the number of periods per year. Output is left as is:
    /// only the capital/output ratio enters the calibration.
    pub annualized_flows: bool,
}

#[derive(Debug, Clone)]
pub struct CapitalStock {
    pub series: TimeSeries,
    pub calibration: Calibration,
    /// Depreciation rate per period actually used in the recursion.
    pub delta_per_period: f64,
}

/// Calibrate and build the capital stock on the dates shared by `investment` and `output`.
///
/// The stock on a date is the stock at the start of that period.
pub fn capital_stock(
    investment: &TimeSeries,
    output: &TimeSeries,
    options: &CapitalOptions,
) -> Result<CapitalStock, SeriesError> {
    let rows = inner_join(investment, output);
    if rows.is_empty() {
        return Err(SeriesError::EmptySeries(format!(
            "{} x {}",
            investment.name(),
            output.name()
        )));
    }

    let per_year = options.frequency.periods_per_year();
    let flow_divisor = if options.annualized_flows { per_year as f64 } else { 1.0 };
    let delta_per_period = options.delta / per_year as f64;

    let inv: Vec<f64> = rows.iter().map(|(_, i, _)| i / flow_divisor).collect();
    let out: Vec<f64> = rows.iter().map(|(_, _, y)| *y).collect();

    let config = CalibrationConfig {
        window: options.calibration.window * per_year,
        ..options.calibration
    };
    let calibration = calibrate_initial_capital(&inv, &out, delta_per_period, &config)?;
    let k = capital_series(&inv, calibration.k0, delta_per_period)?;

    let points = rows.iter().zip(k).map(|((d, _, _), k)| (*d, k)).collect();
    Ok(CapitalStock {
        series: TimeSeries::from_ordered("Capital", points),
        calibration,
        delta_per_period,
    })
}

/// Average ratio of depreciation to output on their common dates.
pub fn depreciation_rate(depreciation: &TimeSeries, output: &TimeSeries) -> Result<f64, SeriesError> {
    let r = ratio(depreciation, output);
    let delta = r
        .mean()
        .ok_or_else(|| SeriesError::EmptySeries(r.name().to_string()))?;
    check_delta(delta)?;
    Ok(delta)
}

/// Total factor productivity `y / (k^α l^(1-α))` on the dates shared by all inputs.
pub fn solow_residual(
    output: &TimeSeries,
    capital: &TimeSeries,
    labor: &TimeSeries,
    alpha: f64,
) -> Result<TimeSeries, SeriesError> {
    if !(alpha.is_finite() && (0.0..=1.0).contains(&alpha)) {
        return Err(SeriesError::InvalidParameter(format!("alpha must be in [0, 1], got {alpha}")));
    }
    let yk = crate::domain::combine(output, capital, "yk", |y, k| y / k.powf(alpha));
    Ok(crate::domain::combine(&yk, labor, "TFP", |v, l| v / l.powf(1.0 - alpha)))
}

fn check_delta(delta: f64) -> Result<(), SeriesError> {
    if (0.0..1.0).contains(&delta) {
        Ok(())
    } else {
        Err(SeriesError::InvalidParameter(format!(
            "depreciation rate must be in [0, 1), got {delta}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn y(year: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, 1, 1).unwrap()
    }

    fn annual(name: &str, values: &[f64], first_year: i32) -> TimeSeries {
        TimeSeries::new(
            name,
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| (y(first_year + i as i32), v))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn steady_state_is_a_fixed_point() {
        let k = capital_series(&[100.0, 100.0, 100.0], 1000.0, 0.1).unwrap();
        assert_eq!(k.len(), 4);
        for v in k {
            assert!((v - 1000.0).abs() < 1e-9);
        }
    }

    #[test]
    fn recursion_is_deterministic() {
        let inv = [120.5, 98.25, 130.0, 77.7, 101.1];
        let a = capital_series(&inv, 950.0, 0.07).unwrap();
        let b = capital_series(&inv, 950.0, 0.07).unwrap();
        assert_eq!(
            a.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            b.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn empty_investment_yields_initial_stock() {
        assert_eq!(capital_series(&[], 42.0, 0.05).unwrap(), vec![42.0]);
    }

    #[test]
    fn rejects_depreciation_outside_unit_interval() {
        assert!(capital_series(&[1.0], 1.0, 1.0).is_err());
        assert!(capital_series(&[1.0], 1.0, -0.1).is_err());
        assert!(capital_series(&[1.0], 1.0, f64::NAN).is_err());
        assert!(capital_series(&[1.0], f64::INFINITY, 0.1).is_err());
    }

    #[test]
    fn calibration_hits_the_fixed_point() {
        let inv: Vec<f64> = (0..30).map(|t| 100.0 * 1.03f64.powi(t)).collect();
        let out: Vec<f64> = (0..30).map(|t| 500.0 * 1.025f64.powi(t)).collect();
        let config = CalibrationConfig::default();
        let cal = calibrate_initial_capital(&inv, &out, 0.06, &config).unwrap();

        let k = capital_series(&inv, cal.k0, 0.06).unwrap();
        let n = config.window;
        let mean = (0..n).map(|t| k[t] / out[t]).sum::<f64>() / n as f64;
        assert!((cal.k0 / out[0] - mean).abs() < config.tolerance);
        assert!(cal.k0 > 0.0);
    }

    #[test]
    fn window_of_one_is_trivially_satisfied() {
        let config = CalibrationConfig {
            window: 1,
            ..CalibrationConfig::default()
        };
        let cal = calibrate_initial_capital(&[1.0], &[2.0], 0.1, &config).unwrap();
        assert_eq!(cal.k0, config.guess);
        assert_eq!(cal.iterations, 0);
    }

    #[test]
    fn exhausted_budget_reports_last_attempt() {
        // residual(k0) = k0/3 here; a zero budget stops before the root.
        let config = CalibrationConfig {
            window: 3,
            guess: 10.0,
            tolerance: 1e-12,
            max_iter: 0,
        };
        let err = calibrate_initial_capital(&[0.0, 0.0], &[1.0, 2.0, 2.0], 0.0, &config).unwrap_err();
        match err {
            SeriesError::CalibrationNotConverged { k0, residual, iterations } => {
                assert_eq!(iterations, 0);
                assert!(k0.is_finite());
                assert!((residual - k0 / 3.0).abs() < 1e-9);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn constant_residual_does_not_converge() {
        // k = [k0, 5 + k0] and y = [1, 1]: residual is -2.5 for every k0.
        let config = CalibrationConfig {
            window: 2,
            ..CalibrationConfig::default()
        };
        let err = calibrate_initial_capital(&[5.0], &[1.0, 1.0], 0.0, &config).unwrap_err();
        // A flat secant step stops the search on the first iteration.
        assert!(matches!(
            err,
            SeriesError::CalibrationNotConverged { residual, iterations: 1, .. } if (residual + 2.5).abs() < 1e-12
        ));
    }

    #[test]
    fn calibration_rejects_short_data_and_zero_output() {
        let config = CalibrationConfig::default();
        assert!(matches!(
            calibrate_initial_capital(&[1.0; 3], &[1.0; 3], 0.1, &config),
            Err(SeriesError::InvalidParameter(_))
        ));
        let small = CalibrationConfig {
            window: 2,
            ..config
        };
        assert!(matches!(
            calibrate_initial_capital(&[1.0; 3], &[0.0, 1.0, 1.0], 0.1, &small),
            Err(SeriesError::InvalidParameter(_))
        ));
    }

    #[test]
    fn quarterly_stock_uses_per_period_rates() {
        let n = 60;
        let inv = annual("I", &vec![400.0; n], 1950);
        let out = annual("Y", &vec![2000.0; n], 1950);
        // Pretend these are quarterly observations at annual rates: 100 per quarter,
        // δ = 0.1/4 per quarter, so the steady state is 100 / 0.025 = 4000.
        let options = CapitalOptions {
            delta: 0.1,
            frequency: Frequency::Quarterly,
            calibration: CalibrationConfig {
                window: 2,
                ..CalibrationConfig::default()
            },
            annualized_flows: true,
        };
        let stock = capital_stock(&inv, &out, &options).unwrap();
        assert_eq!(stock.series.len(), n);
        assert!((stock.delta_per_period - 0.025).abs() < 1e-15);
        assert!((stock.calibration.k0 - 4000.0).abs() < 1e-3);
        assert!(stock.series.values().all(|k| (k - 4000.0).abs() < 1e-3));
    }

    #[test]
    fn depreciation_rate_is_mean_ratio() {
        let dep = annual("D", &[10.0, 20.0], 2000);
        let gdp = annual("Y", &[100.0, 100.0], 2000);
        assert!((depreciation_rate(&dep, &gdp).unwrap() - 0.15).abs() < 1e-12);
    }

    #[test]
    fn solow_residual_with_unit_inputs() {
        let yv = annual("Y", &[8.0, 27.0], 2000);
        let k = annual("K", &[8.0, 27.0], 2000);
        let l = annual("L", &[1.0, 1.0], 2000);
        let tfp = solow_residual(&yv, &k, &l, 1.0 / 3.0).unwrap();
        assert_eq!(tfp.name(), "TFP");
        let v: Vec<f64> = tfp.values().collect();
        assert!((v[0] - 4.0).abs() < 1e-9);
        assert!((v[1] - 9.0).abs() < 1e-9);
        assert!(solow_residual(&yv, &k, &l, 1.5).is_err());
    }
}
