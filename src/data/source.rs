//! Where a raw series comes from, and how to load it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::fred::FredClient;
use crate::domain::TimeSeries;
use crate::error::AppError;
use crate::io::ingest::read_series_csv;

/// A column of a local CSV file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CsvSource {
    pub path: PathBuf,
    /// Date column; the first column when omitted.
    #[serde(default)]
    pub date_column: Option<String>,
    pub value_column: String,
}

/// A raw series: a FRED series id or a local CSV column.
///
/// On the command line:
/// - `fred:GDPA` or just `GDPA`
/// - `csv:data/file.csv#column` (or `data/file.csv#column`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceSpec {
    Fred(String),
    Csv(CsvSource),
}

impl SourceSpec {
    /// Short label used as the default series name.
    pub fn label(&self) -> String {
        match self {
            SourceSpec::Fred(id) => id.clone(),
            SourceSpec::Csv(csv) => csv.value_column.clone(),
        }
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSpec::Fred(id) => write!(f, "fred:{id}"),
            SourceSpec::Csv(csv) => write!(f, "csv:{}#{}", csv.path.display(), csv.value_column),
        }
    }
}

impl FromStr for SourceSpec {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if let Some(id) = raw.strip_prefix("fred:") {
            return parse_fred_id(id);
        }
        let csv_part = raw.strip_prefix("csv:");
        if csv_part.is_some() || raw.contains('#') {
            let body = csv_part.unwrap_or(raw);
            let (path, column) = body
                .rsplit_once('#')
                .ok_or_else(|| format!("CSV source '{raw}' must name a column as path#column"))?;
            if path.is_empty() || column.is_empty() {
                return Err(format!("CSV source '{raw}' must name a file and a column"));
            }
            return Ok(SourceSpec::Csv(CsvSource {
                path: PathBuf::from(path),
                date_column: None,
                value_column: column.to_string(),
            }));
        }
        parse_fred_id(raw)
    }
}

fn parse_fred_id(id: &str) -> Result<SourceSpec, String> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!("'{id}' is not a valid FRED series id"));
    }
    Ok(SourceSpec::Fred(id.to_string()))
}

/// Loads sources, creating the FRED client only when a FRED source is requested.
pub struct SeriesLoader {
    api_key_file: Option<PathBuf>,
    client: Option<FredClient>,
}

impl SeriesLoader {
    pub fn new(api_key_file: Option<PathBuf>) -> Self {
        Self {
            api_key_file,
            client: None,
        }
    }

    fn client(&mut self) -> Result<&FredClient, AppError> {
        let client = match self.client.take() {
            Some(client) => client,
            None => match &self.api_key_file {
                Some(path) => FredClient::from_key_file(path)?,
                None => FredClient::from_env()?,
            },
        };
        Ok(self.client.insert(client))
    }

    /// Load one source. FRED requests are bounded by `start`/`end`; CSV sources are
    /// read whole (callers window them).
    pub fn load(
        &mut self,
        spec: &SourceSpec,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<TimeSeries, AppError> {
        match spec {
            SourceSpec::Fred(id) => self.client()?.fetch_series(id, start, end),
            SourceSpec::Csv(csv) => load_csv(csv),
        }
    }

    /// Load `primary`; if that fails and a fallback is given, try the fallback once.
    pub fn load_with_fallback(
        &mut self,
        primary: &SourceSpec,
        fallback: Option<&SourceSpec>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<TimeSeries, AppError> {
        match self.load(primary, start, end) {
            Ok(series) => Ok(series),
            Err(err) => match fallback {
                Some(alt) => {
                    log::warn!("{primary} unavailable ({err}); using fallback {alt}");
                    self.load(alt, start, end)
                        .map(|s| s.renamed(primary.label()))
                }
                None => Err(err),
            },
        }
    }
}

fn load_csv(csv: &CsvSource) -> Result<TimeSeries, AppError> {
    let ingested = read_series_csv(
        Path::new(&csv.path),
        csv.date_column.as_deref(),
        &csv.value_column,
    )?;
    for row in &ingested.row_errors {
        log::warn!("{}:{}: {}", csv.path.display(), row.line, row.message);
    }
    Ok(ingested.series)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cli_source_strings() {
        assert_eq!("GDPA".parse::<SourceSpec>().unwrap(), SourceSpec::Fred("GDPA".to_string()));
        assert_eq!(
            "fred:M0892AUSM156SNBR".parse::<SourceSpec>().unwrap(),
            SourceSpec::Fred("M0892AUSM156SNBR".to_string())
        );
        assert_eq!(
            "csv:data/lf.csv#population".parse::<SourceSpec>().unwrap(),
            SourceSpec::Csv(CsvSource {
                path: PathBuf::from("data/lf.csv"),
                date_column: None,
                value_column: "population".to_string(),
            })
        );
        assert!(matches!("data/v.csv#V".parse::<SourceSpec>(), Ok(SourceSpec::Csv(_))));
        assert!("csv:data/v.csv".parse::<SourceSpec>().is_err());
        assert!("bad id".parse::<SourceSpec>().is_err());
    }

    #[test]
    fn json_form_is_externally_tagged() {
        let spec: SourceSpec = serde_json::from_str(r#"{"fred": "JTSJOL"}"#).unwrap();
        assert_eq!(spec, SourceSpec::Fred("JTSJOL".to_string()));
        let spec: SourceSpec =
            serde_json::from_str(r#"{"csv": {"path": "v.csv", "value_column": "V"}}"#).unwrap();
        assert_eq!(spec.label(), "V");
        assert_eq!(spec.to_string(), "csv:v.csv#V");
    }

    #[test]
    fn fallback_is_used_when_primary_fails() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.csv");
        std::fs::write(&good, "date,v\n2000-01-01,1.5\n2001-01-01,2.5\n").unwrap();

        let primary = SourceSpec::Csv(CsvSource {
            path: dir.path().join("missing.csv"),
            date_column: None,
            value_column: "v".to_string(),
        });
        let fallback = SourceSpec::Csv(CsvSource {
            path: good,
            date_column: None,
            value_column: "v".to_string(),
        });

        let mut loader = SeriesLoader::new(None);
        assert!(loader.load_with_fallback(&primary, None, None, None).is_err());
        let s = loader
            .load_with_fallback(&primary, Some(&fallback), None, None)
            .unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.name(), "v");
    }
}
