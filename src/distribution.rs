//! Score-range distributions for External and Total marks.
//!
//! Bands are inclusive at both ends, so a mark sitting on a shared boundary
//! (`70` with bands `60-70` and `70-80`) is counted in both. Bucket totals per
//! course can therefore exceed the number of students but never fall short.

use serde::{Deserialize, Serialize};

use crate::{cleaner::CleanedTable, error::AnalysisError, header::Category};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub low: f64,
    pub high: f64,
}

impl Band {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, mark: f64) -> bool {
        self.low <= mark && mark <= self.high
    }

    pub fn label(&self) -> String {
        format!("{}-{}", format_bound(self.low), format_bound(self.high))
    }
}

fn format_bound(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BandSet(Vec<Band>);

impl BandSet {
    pub fn new(bands: Vec<Band>) -> Self {
        Self(bands)
    }

    /// Consecutive bands of `width` from zero up to `max`.
    pub fn uniform(width: u32, max: u32) -> Self {
        let bands = (0..max)
            .step_by(width.max(1) as usize)
            .map(|low| Band::new(f64::from(low), f64::from((low + width).min(max))))
            .collect();
        Self(bands)
    }

    pub fn external_default() -> Self {
        Self::uniform(10, 60)
    }

    pub fn total_default() -> Self {
        Self::uniform(10, 100)
    }

    pub fn total_twenty_point() -> Self {
        Self::uniform(20, 100)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn bands(&self) -> &[Band] {
        &self.0
    }

    pub fn labels(&self) -> Vec<String> {
        self.0.iter().map(Band::label).collect()
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.0.is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "band list is empty".to_string(),
            ));
        }
        for band in &self.0 {
            if !(band.low.is_finite() && band.high.is_finite()) || band.low > band.high {
                return Err(AnalysisError::InvalidConfig(format!(
                    "band {} is not a valid range",
                    band.label()
                )));
            }
        }
        if self.0.windows(2).any(|pair| pair[0].low > pair[1].low) {
            return Err(AnalysisError::InvalidConfig(
                "bands must be ordered by lower bound".to_string(),
            ));
        }
        Ok(())
    }
}

/// Range label × course code counts for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionMatrix {
    pub category: Category,
    pub labels: Vec<String>,
    pub courses: Vec<String>,
    /// `counts[range][course]`
    pub counts: Vec<Vec<usize>>,
}

impl DistributionMatrix {
    pub fn count(&self, range_label: &str, course_code: &str) -> Option<usize> {
        let range = self.labels.iter().position(|label| label == range_label)?;
        let course = self.courses.iter().position(|code| code == course_code)?;
        Some(self.counts[range][course])
    }

    pub fn course_total(&self, course_code: &str) -> Option<usize> {
        let course = self.courses.iter().position(|code| code == course_code)?;
        Some(self.counts.iter().map(|row| row[course]).sum())
    }
}

pub fn bin_category(table: &CleanedTable, bands: &BandSet) -> Result<DistributionMatrix, AnalysisError> {
    if !table.has_usable_rows() {
        return Err(AnalysisError::EmptyCategoryDataset {
            category: table.category,
        });
    }
    let columns = (0..table.courses.len())
        .map(|course| table.present_values(course))
        .collect::<Vec<_>>();
    let counts: Vec<Vec<usize>> = bands
        .bands()
        .iter()
        .map(|band| {
            columns
                .iter()
                .map(|marks| marks.iter().filter(|&&mark| band.contains(mark)).count())
                .collect::<Vec<_>>()
        })
        .collect();
    Ok(DistributionMatrix {
        category: table.category,
        labels: bands.labels(),
        courses: table.courses.clone(),
        counts,
    })
}
