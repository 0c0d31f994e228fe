//! Export series to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets: a header row, one
//! row per date (outer join of all series), the date written per `Frequency`
//! (`1950` for annual data, `1950-04-01` otherwise) and missing values left empty.

use std::path::Path;

use crate::domain::{Frequency, TimeSeries, outer_join};
use crate::error::AppError;

/// Write `series` side by side to a CSV file.
pub fn write_series_csv(
    path: &Path,
    frequency: Frequency,
    series: &[&TimeSeries],
    decimals: usize,
) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    let mut header = vec![frequency.date_header().to_string()];
    header.extend(series.iter().map(|s| s.name().to_string()));
    writer
        .write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    let rows = outer_join(series);
    for (date, values) in &rows {
        let mut record = Vec::with_capacity(values.len() + 1);
        record.push(frequency.format_date(*date));
        record.extend(values.iter().map(|v| format_value(*v, decimals)));
        writer
            .write_record(&record)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    log::info!("wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Fixed-decimal formatting; non-finite values become an empty field.
pub fn format_value(value: f64, decimals: usize) -> String {
    if value.is_finite() {
        format!("{value:.decimals$}")
    } else {
        String::new()
    }
}
