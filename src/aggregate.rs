//! Per-course category averages and the merged course table.

use std::collections::HashMap;

use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use serde::Serialize;

use crate::{cleaner::CleanedTable, error::AnalysisError, header::Category};

/// Rounds half-to-even at two decimal places in decimal arithmetic, so that
/// `71.665` does not drift through its binary representation.
pub fn round2(value: f64) -> f64 {
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseMean {
    pub course_code: String,
    /// `None` when no mark for the course survived cleaning.
    pub average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryAverages {
    pub category: Category,
    pub courses: Vec<CourseMean>,
}

impl CategoryAverages {
    pub fn get(&self, course_code: &str) -> Option<f64> {
        self.courses
            .iter()
            .find(|mean| mean.course_code == course_code)
            .and_then(|mean| mean.average)
    }
}

pub fn category_averages(table: &CleanedTable) -> Result<CategoryAverages, AnalysisError> {
    if !table.has_usable_rows() {
        return Err(AnalysisError::EmptyCategoryDataset {
            category: table.category,
        });
    }
    let courses = table
        .courses
        .iter()
        .enumerate()
        .map(|(index, code)| CourseMean {
            course_code: code.clone(),
            average: mean(&table.averaging_values(index)).map(round2),
        })
        .collect();
    Ok(CategoryAverages {
        category: table.category,
        courses,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalSource {
    /// Averaged from the Total mark columns.
    Direct,
    /// Mean of the Internal and External averages.
    Derived,
    Absent,
}

impl TotalSource {
    pub fn label(self) -> &'static str {
        match self {
            TotalSource::Direct => "direct",
            TotalSource::Derived => "derived",
            TotalSource::Absent => "absent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseAverage {
    pub course_code: String,
    pub internal_avg: Option<f64>,
    pub external_avg: Option<f64>,
    pub total_avg: Option<f64>,
    pub total_source: TotalSource,
}

/// Outer-joins the category tables on course code. Courses appear in the
/// order they are first seen across `parts`.
pub fn merge_averages(parts: &[CategoryAverages]) -> Vec<CourseAverage> {
    let mut order: Vec<String> = Vec::new();
    let mut by_category: HashMap<Category, &CategoryAverages> = HashMap::new();
    for part in parts {
        by_category.insert(part.category, part);
        for mean in &part.courses {
            if !order.contains(&mean.course_code) {
                order.push(mean.course_code.clone());
            }
        }
    }

    let lookup = |category: Category, code: &str| {
        by_category
            .get(&category)
            .and_then(|averages| averages.get(code))
    };

    order
        .into_iter()
        .map(|course_code| {
            let internal_avg = lookup(Category::Internal, &course_code);
            let external_avg = lookup(Category::External, &course_code);
            let (total_avg, total_source) = match lookup(Category::Total, &course_code) {
                Some(direct) => (Some(direct), TotalSource::Direct),
                None => match (internal_avg, external_avg) {
                    (Some(internal), Some(external)) => (
                        Some(round2((internal + external) / 2.0)),
                        TotalSource::Derived,
                    ),
                    _ => (None, TotalSource::Absent),
                },
            };
            CourseAverage {
                course_code,
                internal_avg,
                external_avg,
                total_avg,
                total_source,
            }
        })
        .collect()
}
