//! CPI rankings, subject toppers and the high-performer list.
//!
//! All three lists order by CPI descending with a stable sort, so students
//! with equal CPI keep their sheet order.

use std::cmp::Ordering;

use itertools::Itertools;
use serde::Serialize;

use crate::{
    cleaner::{CleanedTable, MAX_MARK},
    error::AnalysisError,
    students::{StudentRecord, StudentRoster},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopStudent {
    pub rank: usize,
    pub enrollment_no: Option<String>,
    pub name: String,
    pub max_marks: u32,
    pub obtained_marks: Option<f64>,
    pub cpi: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectTopper {
    pub rank: usize,
    pub enrollment_no: Option<String>,
    pub name: String,
    pub marks_obtained: f64,
    pub cpi: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectToppers {
    pub course_code: String,
    pub max_mark: f64,
    pub toppers: Vec<SubjectTopper>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighPerformer {
    pub rank: usize,
    pub enrollment_no: Option<String>,
    pub name: String,
    pub total_marks: Option<f64>,
    pub max_marks: u32,
    pub cpi: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rankings {
    pub top_students: Vec<TopStudent>,
    pub subject_toppers: Vec<SubjectToppers>,
    pub high_performers: Vec<HighPerformer>,
}

/// Descending CPI, students without a CPI last.
fn by_cpi_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Maximum obtainable marks across the Total course columns.
pub fn max_possible_marks(total: &CleanedTable) -> u32 {
    (total.courses.len() as u32) * (MAX_MARK as u32)
}

fn ranked_by_cpi(roster: &StudentRoster) -> Vec<(&StudentRecord, f64)> {
    roster
        .records
        .iter()
        .filter_map(|record| record.cpi.map(|cpi| (record, cpi)))
        .sorted_by(|a, b| by_cpi_desc(Some(a.1), Some(b.1)))
        .collect()
}

pub fn top_students(
    roster: &StudentRoster,
    total: &CleanedTable,
    limit: usize,
) -> Result<Vec<TopStudent>, AnalysisError> {
    roster.require_cpi()?;
    let max_marks = max_possible_marks(total);
    Ok(ranked_by_cpi(roster)
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(idx, (record, cpi))| TopStudent {
            rank: idx + 1,
            enrollment_no: record.enrollment_no.clone(),
            name: record.name.clone(),
            max_marks,
            obtained_marks: record.grand_total,
            cpi,
        })
        .collect())
}

/// Every student holding a course's maximum mark is a topper; ties are kept
/// and ranked among themselves by CPI.
pub fn subject_toppers(
    roster: &StudentRoster,
    total: &CleanedTable,
) -> Result<Vec<SubjectToppers>, AnalysisError> {
    roster.require_cpi()?;
    let mut result = Vec::new();
    for (course, course_code) in total.courses.iter().enumerate() {
        let Some(max_mark) = total
            .rows
            .iter()
            .filter_map(|row| row.marks[course])
            .max_by(f64::total_cmp)
        else {
            continue;
        };
        let toppers = total
            .rows
            .iter()
            .filter(|row| row.marks[course] == Some(max_mark))
            .map(|row| &roster.records[row.student])
            .sorted_by(|a, b| by_cpi_desc(a.cpi, b.cpi))
            .enumerate()
            .map(|(idx, record)| SubjectTopper {
                rank: idx + 1,
                enrollment_no: record.enrollment_no.clone(),
                name: record.name.clone(),
                marks_obtained: max_mark,
                cpi: record.cpi,
            })
            .collect();
        result.push(SubjectToppers {
            course_code: course_code.clone(),
            max_mark,
            toppers,
        });
    }
    Ok(result)
}

/// Students with CPI strictly above `threshold`, best first. No cap.
pub fn high_performers(
    roster: &StudentRoster,
    total: &CleanedTable,
    threshold: f64,
) -> Result<Vec<HighPerformer>, AnalysisError> {
    roster.require_cpi()?;
    let max_marks = max_possible_marks(total);
    Ok(ranked_by_cpi(roster)
        .into_iter()
        .filter(|(_, cpi)| *cpi > threshold)
        .enumerate()
        .map(|(idx, (record, cpi))| HighPerformer {
            rank: idx + 1,
            enrollment_no: record.enrollment_no.clone(),
            name: record.name.clone(),
            total_marks: record.grand_total,
            max_marks,
            cpi,
        })
        .collect())
}

pub fn rank_students(
    roster: &StudentRoster,
    total: &CleanedTable,
    top_n: usize,
    high_performer_cpi: f64,
) -> Result<Rankings, AnalysisError> {
    Ok(Rankings {
        top_students: top_students(roster, total, top_n)?,
        subject_toppers: subject_toppers(roster, total)?,
        high_performers: high_performers(roster, total, high_performer_cpi)?,
    })
}
