//! Mark cleaning and row admissibility.
//!
//! Raw mark cells may carry annotation characters (a trailing `*` marks a
//! grace adjustment) or non-numeric codes such as `AB`. Cleaning strips the
//! annotations and coerces to a number in `[0, 100]`; anything else becomes a
//! missing value and is recorded as a [`CoercionFailure`], never a zero.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::AnalysisError,
    header::{Category, ResolvedSchema},
    sheet::RawSheet,
    students::StudentRoster,
};

pub const MIN_MARK: f64 = 0.0;
pub const MAX_MARK: f64 = 100.0;

/// How missing marks exclude students from category averages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExclusionPolicy {
    /// A student missing any course mark is left out of every average in
    /// the category.
    #[default]
    PerRow,
    /// Each course average uses whichever students have that mark.
    PerCell,
}

pub fn strip_annotations(raw: &str, annotation_chars: &[char]) -> String {
    raw.chars()
        .filter(|ch| !annotation_chars.contains(ch))
        .collect::<String>()
        .trim()
        .to_string()
}

/// `Ok(None)` for a blank cell, `Err` for a cell that holds something other
/// than a mark.
pub fn coerce_mark(raw: &str, annotation_chars: &[char]) -> Result<Option<f64>, AnalysisError> {
    let cleaned = strip_annotations(raw, annotation_chars);
    if cleaned.is_empty() {
        return Ok(None);
    }
    match cleaned.parse::<f64>() {
        Ok(value) if (MIN_MARK..=MAX_MARK).contains(&value) => Ok(Some(value)),
        _ => Err(AnalysisError::NumericCoercion {
            raw: raw.to_string(),
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoercionFailure {
    pub row: usize,
    pub course_code: String,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkRow {
    /// Index into [`StudentRoster::records`].
    pub student: usize,
    pub marks: Vec<Option<f64>>,
}

impl MarkRow {
    pub fn is_complete(&self) -> bool {
        self.marks.iter().all(Option::is_some)
    }
}

/// Cleaned marks for one category: one column per course, one row per
/// record in the complete dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedTable {
    pub category: Category,
    pub courses: Vec<String>,
    pub rows: Vec<MarkRow>,
    pub failures: Vec<CoercionFailure>,
    pub policy: ExclusionPolicy,
}

impl CleanedTable {
    /// Rows that take part in average computation under per-row exclusion.
    pub fn admissible_rows(&self) -> impl Iterator<Item = &MarkRow> {
        self.rows.iter().filter(|row| row.is_complete())
    }

    pub fn admissible_count(&self) -> usize {
        self.admissible_rows().count()
    }

    /// Values that feed the course average, according to the policy.
    pub fn averaging_values(&self, course: usize) -> Vec<f64> {
        match self.policy {
            ExclusionPolicy::PerRow => self
                .admissible_rows()
                .filter_map(|row| row.marks[course])
                .collect(),
            ExclusionPolicy::PerCell => self.present_values(course),
        }
    }

    /// Every non-missing mark for a course, regardless of admissibility.
    pub fn present_values(&self, course: usize) -> Vec<f64> {
        self.rows.iter().filter_map(|row| row.marks[course]).collect()
    }

    pub fn has_usable_rows(&self) -> bool {
        match self.policy {
            ExclusionPolicy::PerRow => self.admissible_rows().next().is_some(),
            ExclusionPolicy::PerCell => self
                .rows
                .iter()
                .any(|row| row.marks.iter().any(Option::is_some)),
        }
    }
}

pub fn clean_category(
    sheet: &RawSheet,
    schema: &ResolvedSchema,
    roster: &StudentRoster,
    annotation_chars: &[char],
    policy: ExclusionPolicy,
) -> Result<CleanedTable, AnalysisError> {
    let category = schema.category();
    let columns = schema.course_columns();
    if columns.is_empty() {
        return Err(AnalysisError::EmptyCategoryDataset { category });
    }

    let mut failures = Vec::new();
    let rows = roster
        .records
        .iter()
        .enumerate()
        .map(|(student, record)| {
            let marks = columns
                .iter()
                .map(|column| {
                    let raw = sheet.cell(record.row, column.index);
                    coerce_mark(raw, annotation_chars).unwrap_or_else(|err| {
                        debug!(
                            "{category} {} row {}: {err}",
                            column.course_code,
                            record.row + 1
                        );
                        failures.push(CoercionFailure {
                            row: record.row,
                            course_code: column.course_code.clone(),
                            raw: raw.to_string(),
                        });
                        None
                    })
                })
                .collect();
            MarkRow { student, marks }
        })
        .collect();

    Ok(CleanedTable {
        category,
        courses: columns.into_iter().map(|column| column.course_code).collect(),
        rows,
        failures,
        policy,
    })
}
