//! Report assembly.
//!
//! Stages hand their results over as [`Outcome`]s. The assembler keeps every
//! success and turns every failure into a [`StageIssue`], so one failing stage
//! never hides the output of the others.

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    aggregate::{CategoryAverages, CourseAverage, TotalSource, merge_averages},
    cleaner::CoercionFailure,
    counts::{CategoryCounts, CpiBandCount},
    distribution::DistributionMatrix,
    error::AnalysisError,
    header::Category,
    ranking::{HighPerformer, Rankings, SubjectToppers, TopStudent},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub institution: String,
    pub program: String,
    pub batch: String,
    pub semester: String,
}

impl ReportMetadata {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let fields = [
            ("institution", &self.institution),
            ("program", &self.program),
            ("batch", &self.batch),
            ("semester", &self.semester),
        ];
        let missing = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect::<Vec<_>>();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AnalysisError::InvalidRequest(format!(
                "missing report metadata: {}",
                missing.join(", ")
            )))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    HeaderResolution,
    Cleaning,
    Aggregation,
    Distribution,
    Ranking,
    CategoryCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageIssue {
    pub stage: Stage,
    pub category: Option<Category>,
    pub message: String,
}

#[derive(Debug)]
pub struct Outcome<T> {
    pub stage: Stage,
    pub category: Option<Category>,
    pub result: Result<T, AnalysisError>,
}

impl<T> Outcome<T> {
    pub fn new(stage: Stage, category: Option<Category>, result: Result<T, AnalysisError>) -> Self {
        Self {
            stage,
            category,
            result,
        }
    }

    fn take(self, issues: &mut Vec<StageIssue>) -> Option<T> {
        match self.result {
            Ok(value) => Some(value),
            Err(err) => {
                match self.category {
                    Some(category) => warn!("{:?} stage for {category} skipped: {err}", self.stage),
                    None => warn!("{:?} stage skipped: {err}", self.stage),
                }
                issues.push(StageIssue {
                    stage: self.stage,
                    category: self.category,
                    message: err.to_string(),
                });
                None
            }
        }
    }
}

/// Cleaning statistics for one resolved category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryDiagnostics {
    pub category: Category,
    pub courses: usize,
    pub duplicate_columns_dropped: usize,
    pub records: usize,
    pub admissible_records: usize,
    pub coercion_failures: Vec<CoercionFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseRow {
    pub course_code: String,
    pub internal_avg: Option<f64>,
    pub external_avg: Option<f64>,
    pub total_avg: Option<f64>,
    pub total_source: TotalSource,
    /// Left blank for manual entry.
    pub faculty_name: String,
}

impl From<CourseAverage> for CourseRow {
    fn from(average: CourseAverage) -> Self {
        Self {
            course_code: average.course_code,
            internal_avg: average.internal_avg,
            external_avg: average.external_avg,
            total_avg: average.total_avg,
            total_source: average.total_source,
            faculty_name: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub generated_at: DateTime<Utc>,
    pub records: usize,
    pub courses: Vec<CourseRow>,
    pub distributions: Vec<DistributionMatrix>,
    pub top_students: Option<Vec<TopStudent>>,
    pub subject_toppers: Option<Vec<SubjectToppers>>,
    pub high_performers: Option<Vec<HighPerformer>>,
    pub category_counts: Option<CategoryCounts>,
    pub diagnostics: Vec<CategoryDiagnostics>,
    pub issues: Vec<StageIssue>,
}

impl Report {
    pub fn course(&self, course_code: &str) -> Option<&CourseRow> {
        self.courses.iter().find(|row| row.course_code == course_code)
    }

    pub fn distribution(&self, category: Category) -> Option<&DistributionMatrix> {
        self.distributions
            .iter()
            .find(|matrix| matrix.category == category)
    }

    pub fn is_complete(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Debug)]
pub struct StageResults {
    pub records: usize,
    pub diagnostics: Vec<Outcome<CategoryDiagnostics>>,
    pub averages: Vec<Outcome<CategoryAverages>>,
    pub distributions: Vec<Outcome<DistributionMatrix>>,
    pub rankings: Outcome<Rankings>,
    pub counts: Outcome<CategoryCounts>,
    pub cpi_bands: Outcome<Vec<CpiBandCount>>,
}

pub fn assemble(metadata: ReportMetadata, results: StageResults) -> Report {
    let mut issues = Vec::new();
    let diagnostics = results
        .diagnostics
        .into_iter()
        .filter_map(|outcome| outcome.take(&mut issues))
        .collect::<Vec<_>>();
    let averages = results
        .averages
        .into_iter()
        .filter_map(|outcome| outcome.take(&mut issues))
        .collect::<Vec<_>>();
    let distributions = results
        .distributions
        .into_iter()
        .filter_map(|outcome| outcome.take(&mut issues))
        .collect();
    let rankings = results.rankings.take(&mut issues);
    let category_counts = results.counts.take(&mut issues);
    let cpi_band_counts = results.cpi_bands.take(&mut issues);
    let category_counts = category_counts.map(|counts| CategoryCounts {
        cpi_band_counts,
        ..counts
    });

    let courses = merge_averages(&averages)
        .into_iter()
        .map(CourseRow::from)
        .collect();
    let (top_students, subject_toppers, high_performers) = match rankings {
        Some(rankings) => (
            Some(rankings.top_students),
            Some(rankings.subject_toppers),
            Some(rankings.high_performers),
        ),
        None => (None, None, None),
    };

    Report {
        metadata,
        generated_at: Utc::now(),
        records: results.records,
        courses,
        distributions,
        top_students,
        subject_toppers,
        high_performers,
        category_counts,
        diagnostics,
        issues,
    }
}
