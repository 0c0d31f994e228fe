//! CSV ingest of a single dated series.
//!
//! Design goals:
//! - **Strict schema**: the date and value columns must exist (exit code 2)
//! - **Row-level validation**: rows with an unreadable date are skipped and reported
//! - **Missing values stay missing**: empty, `.`, `NA`, `nan` become `NaN`

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;

use crate::domain::TimeSeries;
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the series plus what was skipped along the way.
#[derive(Debug, Clone)]
pub struct IngestedSeries {
    pub series: TimeSeries,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Read `value_column` of a CSV file, keyed by `date_column` (first column when `None`).
///
/// The series is named after the value column as written in the header.
pub fn read_series_csv(
    path: &Path,
    date_column: Option<&str>,
    value_column: &str,
) -> Result<IngestedSeries, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let date_idx = match date_column {
        Some(name) => column_index(&header_map, name, path)?,
        None => 0,
    };
    let value_idx = column_index(&header_map, value_column, path)?;
    let name = headers
        .get(value_idx)
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .unwrap_or_else(|| value_column.to_string());

    let mut points = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header, and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, date_idx, value_idx) {
            Ok(point) => points.push(point),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    let series = TimeSeries::from_unsorted(name, points)
        .map_err(|e| AppError::new(2, format!("'{}': {e}", path.display())))?;

    if series.is_empty() {
        return Err(AppError::new(
            2,
            format!("No valid rows in '{}' for column `{value_column}`.", path.display()),
        ));
    }
    log::info!(
        "read {} observations of '{}' from {}",
        series.len(),
        series.name(),
        path.display()
    );

    Ok(IngestedSeries {
        series,
        row_errors,
        rows_read,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn column_index(header_map: &HashMap<String, usize>, name: &str, path: &Path) -> Result<usize, AppError> {
    header_map
        .get(&normalize_header_name(name))
        .copied()
        .ok_or_else(|| {
            AppError::new(
                2,
                format!("Missing required column `{name}` in '{}'.", path.display()),
            )
        })
}

fn parse_row(record: &StringRecord, date_idx: usize, value_idx: usize) -> Result<(NaiveDate, f64), String> {
    let raw_date = record
        .get(date_idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "Missing date value.".to_string())?;
    let date = parse_date(raw_date)?;
    let value = parse_value(record.get(value_idx).unwrap_or(""))?;
    Ok((date, value))
}

/// Parse the period date formats found in statistical agency exports.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y", "%Y/%m/%d"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }

    // Year only: "1950".
    if s.len() == 4 {
        if let Ok(year) = s.parse::<i32>() {
            if let Some(d) = NaiveDate::from_ymd_opt(year, 1, 1) {
                return Ok(d);
            }
        }
    }

    // Year and month ("1950-04") or year and quarter ("1950Q2").
    let ym = s.split_once('-').or_else(|| s.split_once(['Q', 'q']));
    if let Some((y, rest)) = ym {
        let quarterly = !s.contains('-');
        if let (Ok(year), Ok(n)) = (y.parse::<i32>(), rest.parse::<u32>()) {
            let month = if quarterly {
                if (1..=4).contains(&n) { Some((n - 1) * 3 + 1) } else { None }
            } else {
                Some(n)
            };
            if let Some(d) = month.and_then(|m| NaiveDate::from_ymd_opt(year, m, 1)) {
                return Ok(d);
            }
        }
    }

    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY, YYYY-MM, YYYYQn, YYYY-MM-DD, MM/DD/YYYY, MM-DD-YYYY, YYYY/MM/DD."
    ))
}

fn parse_value(raw: &str) -> Result<f64, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed.eq_ignore_ascii_case("na")
        || trimmed.eq_ignore_ascii_case("nan")
    {
        return Ok(f64::NAN);
    }
    trimmed
        .replace(',', "")
        .parse::<f64>()
        .map_err(|_| format!("Invalid value '{trimmed}'."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parses_supported_date_formats() {
        assert_eq!(parse_date("1950").unwrap(), d(1950, 1, 1));
        assert_eq!(parse_date("1950-04").unwrap(), d(1950, 4, 1));
        assert_eq!(parse_date("1950Q3").unwrap(), d(1950, 7, 1));
        assert_eq!(parse_date("1950-04-01").unwrap(), d(1950, 4, 1));
        assert_eq!(parse_date("12/01/2000").unwrap(), d(2000, 12, 1));
        assert_eq!(parse_date("01-01-1947").unwrap(), d(1947, 1, 1));
        assert!(parse_date("1950Q5").is_err());
        assert!(parse_date("yesterday").is_err());
    }

    #[test]
    fn missing_tokens_become_nan() {
        assert!(parse_value("").unwrap().is_nan());
        assert!(parse_value(".").unwrap().is_nan());
        assert!(parse_value("NA").unwrap().is_nan());
        assert_eq!(parse_value("1,234.5").unwrap(), 1234.5);
        assert!(parse_value("abc").is_err());
    }

    #[test]
    fn reads_named_columns_and_reports_bad_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            "\u{feff}Year,Help Wanted,Other\n1951,2.0,x\n1950,1.0,y\nbogus,3.0,z\n1952,.,w\n".as_bytes(),
        )
        .unwrap();

        let out = read_series_csv(file.path(), Some("year"), "help wanted").unwrap();
        assert_eq!(out.series.name(), "Help Wanted");
        assert_eq!(out.rows_read, 4);
        assert_eq!(out.row_errors.len(), 1);
        assert_eq!(out.row_errors[0].line, 4);
        assert_eq!(out.series.first(), Some((d(1950, 1, 1), 1.0)));
        assert!(out.series.get(d(1952, 1, 1)).unwrap().is_nan());
    }

    #[test]
    fn missing_column_is_a_usage_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"date,a\n2000-01-01,1\n").unwrap();
        let err = read_series_csv(file.path(), None, "b").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn duplicate_dates_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"date,a\n2000-01-01,1\n2000-01-01,2\n").unwrap();
        assert!(read_series_csv(file.path(), None, "a").is_err());
    }
}
