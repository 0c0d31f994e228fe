//! Splice recipes.
//!
//! A recipe is the JSON description of one spliced variable:
//!
//! ```json
//! {
//!   "name": "Vacancies",
//!   "frequency": "monthly",
//!   "decimals": 3,
//!   "segments": [
//!     { "source": { "fred": "M0882AUSM349NNBR" }, "start": "1929-04-01", "end": "1960-01-01" },
//!     { "source": { "csv": { "path": "hwi.csv", "value_column": "V" } },
//!       "start": "1960-01-01", "end": "2000-12-01" },
//!     { "source": { "fred": "JTSJOL" }, "start": "2000-12-01", "end": "2100-01-01" }
//!   ]
//! }
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::SourceSpec;
use crate::domain::Frequency;
use crate::error::AppError;

fn default_decimals() -> usize {
    4
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Recipe {
    /// Name of the spliced series (and its CSV column unless `column` is set).
    pub name: String,
    pub frequency: Frequency,
    /// CSV column header, e.g. `"Vacancies [thousands]"`.
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default = "default_decimals")]
    pub decimals: usize,
    /// Unit conversion applied to the spliced output.
    #[serde(default)]
    pub multiplier: Option<f64>,
    /// Default export path, relative to the recipe file.
    #[serde(default)]
    pub output: Option<PathBuf>,
    pub segments: Vec<RecipeSegment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeSegment {
    pub source: SourceSpec,
    /// Tried once if `source` cannot be loaded.
    #[serde(default)]
    pub fallback: Option<SourceSpec>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Unit conversion applied to the raw series before splicing.
    #[serde(default)]
    pub multiplier: Option<f64>,
}

impl Recipe {
    pub fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }

    /// Structural checks that don't need any data.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.segments.is_empty() {
            return Err(AppError::new(2, format!("Recipe '{}' has no segments.", self.name)));
        }
        for (idx, seg) in self.segments.iter().enumerate() {
            if seg.start > seg.end {
                return Err(AppError::new(
                    2,
                    format!("Recipe '{}': segment {idx} starts after it ends.", self.name),
                ));
            }
            if let Some(m) = seg.multiplier {
                if !m.is_finite() || m == 0.0 {
                    return Err(AppError::new(
                        2,
                        format!("Recipe '{}': segment {idx} multiplier must be finite and non-zero.", self.name),
                    ));
                }
            }
        }
        for (idx, pair) in self.segments.windows(2).enumerate() {
            if pair[1].start < pair[0].start {
                return Err(AppError::new(
                    2,
                    format!(
                        "Recipe '{}': segments {idx} and {} are not in chronological order.",
                        self.name,
                        idx + 1
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Read and validate a recipe file. Relative CSV paths and `output` are resolved
/// against the recipe's directory.
pub fn read_recipe(path: &Path) -> Result<Recipe, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open recipe '{}': {e}", path.display())))?;
    let mut recipe: Recipe = serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Invalid recipe '{}': {e}", path.display())))?;
    recipe.validate()?;

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    for seg in &mut recipe.segments {
        resolve_source(&mut seg.source, base);
        if let Some(fallback) = seg.fallback.as_mut() {
            resolve_source(fallback, base);
        }
    }
    if let Some(output) = recipe.output.as_mut() {
        if output.is_relative() {
            *output = base.join(&*output);
        }
    }

    log::info!(
        "loaded recipe '{}' ({} segments) from {}",
        recipe.name,
        recipe.segments.len(),
        path.display()
    );
    Ok(recipe)
}

fn resolve_source(spec: &mut SourceSpec, base: &Path) {
    if let SourceSpec::Csv(csv) = spec {
        if csv.path.is_relative() {
            csv.path = base.join(&csv.path);
        }
    }
}
