//! Analysis configuration.
//!
//! Every tunable has a default matching the institution's standard result
//! sheet, so a config file is only needed for unusual layouts. Files are YAML
//! and may specify any subset of fields:
//!
//! ```yaml
//! layout: { header_row: 0, marker_row: 3, first_record_row: 4 }
//! exclusion: per-cell
//! bands:
//!   total:
//!     - { low: 0, high: 20 }
//!     - { low: 20, high: 40 }
//! ```

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    cleaner::ExclusionPolicy,
    distribution::BandSet,
    error::AnalysisError,
    header::Category,
    sheet::SheetLayout,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub layout: SheetLayout,
    pub markers: MarkerTokens,
    pub annotation_chars: Vec<char>,
    pub exclusion: ExclusionPolicy,
    pub bands: BandConfig,
    pub top_n: usize,
    pub high_performer_cpi: f64,
    pub columns: ColumnPatterns,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            layout: SheetLayout::default(),
            markers: MarkerTokens::default(),
            annotation_chars: vec!['*'],
            exclusion: ExclusionPolicy::default(),
            bands: BandConfig::default(),
            top_n: 5,
            high_performer_cpi: 75.0,
            columns: ColumnPatterns::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let config: AnalysisConfig =
            serde_yaml::from_reader(BufReader::new(file)).context("Parsing config YAML")?;
        config
            .validate()
            .with_context(|| format!("Validating config {path:?}"))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        self.layout.validate()?;
        for category in Category::ALL {
            if self.markers.token(category).trim().is_empty() {
                return Err(AnalysisError::InvalidConfig(format!(
                    "marker for {category} is empty"
                )));
            }
        }
        if self.top_n == 0 {
            return Err(AnalysisError::InvalidConfig(
                "top_n must be at least 1".to_string(),
            ));
        }
        self.bands.external.validate()?;
        self.bands.total.validate()?;
        self.columns.compile()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerTokens {
    pub total: String,
    pub internal: String,
    pub external: String,
}

impl Default for MarkerTokens {
    fn default() -> Self {
        Self {
            total: "T".to_string(),
            internal: "I".to_string(),
            external: "E".to_string(),
        }
    }
}

impl MarkerTokens {
    pub fn token(&self, category: Category) -> &str {
        match category {
            Category::Total => &self.total,
            Category::Internal => &self.internal,
            Category::External => &self.external,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandConfig {
    pub external: BandSet,
    pub total: BandSet,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            external: BandSet::external_default(),
            total: BandSet::total_default(),
        }
    }
}

impl BandConfig {
    /// Bands for a binned category; Internal marks are not binned.
    pub fn for_category(&self, category: Category) -> Option<&BandSet> {
        match category {
            Category::External => Some(&self.external),
            Category::Total => Some(&self.total),
            Category::Internal => None,
        }
    }
}

/// Header patterns used to find the metadata columns. The leftmost matching
/// header wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnPatterns {
    pub enrollment: String,
    pub name: String,
    pub remarks: String,
    pub cpi: String,
    pub grand_total: String,
}

impl Default for ColumnPatterns {
    fn default() -> Self {
        Self {
            enrollment: r"(?i)enrol+ment".to_string(),
            name: r"(?i)name".to_string(),
            remarks: r"(?i)remarks".to_string(),
            cpi: r"CPI|CGPA".to_string(),
            grand_total: r"(?i)grand\s*total".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompiledPatterns {
    pub enrollment: Regex,
    pub name: Regex,
    pub remarks: Regex,
    pub cpi: Regex,
    pub grand_total: Regex,
}

impl ColumnPatterns {
    pub fn compile(&self) -> Result<CompiledPatterns, AnalysisError> {
        let build = |label: &str, pattern: &str| {
            Regex::new(pattern).map_err(|err| {
                AnalysisError::InvalidConfig(format!("{label} pattern '{pattern}': {err}"))
            })
        };
        Ok(CompiledPatterns {
            enrollment: build("enrollment", &self.enrollment)?,
            name: build("name", &self.name)?,
            remarks: build("remarks", &self.remarks)?,
            cpi: build("cpi", &self.cpi)?,
            grand_total: build("grand_total", &self.grand_total)?,
        })
    }
}
