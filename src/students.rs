//! Student identity and metadata columns.
//!
//! Metadata columns are found by header pattern rather than position, since
//! sheets from different departments order their trailing columns
//! differently. The extracted [`StudentRoster`] is the complete dataset: every
//! record row, before any mark-based exclusion.

use log::debug;
use regex::Regex;

use crate::{
    cleaner::strip_annotations,
    config::CompiledPatterns,
    error::AnalysisError,
    sheet::{RawSheet, SheetLayout, is_placeholder_header},
};

pub const FIELD_ENROLLMENT: &str = "Enrollment No.";
pub const FIELD_NAME: &str = "Student Name";
pub const FIELD_REMARKS: &str = "Remarks";
pub const FIELD_CPI: &str = "CPI/CGPA";
pub const FIELD_GRAND_TOTAL: &str = "Grand Total";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudentFields {
    pub enrollment: usize,
    pub name: usize,
    pub remarks: Option<usize>,
    pub cpi: Option<usize>,
    pub grand_total: Option<usize>,
}

impl StudentFields {
    /// Enrollment and name columns are mandatory; without them no record can
    /// be identified and the run cannot proceed.
    pub fn locate(
        sheet: &RawSheet,
        layout: &SheetLayout,
        patterns: &CompiledPatterns,
    ) -> Result<Self, AnalysisError> {
        let find = |pattern: &Regex| {
            (0..sheet.width()).find(|&index| {
                let header = sheet.cell(layout.header_row, index);
                !is_placeholder_header(header) && pattern.is_match(header)
            })
        };
        let enrollment = find(&patterns.enrollment).ok_or_else(|| {
            AnalysisError::SheetStructure(format!("no '{FIELD_ENROLLMENT}' column in header row"))
        })?;
        let name = find(&patterns.name).ok_or_else(|| {
            AnalysisError::SheetStructure(format!("no '{FIELD_NAME}' column in header row"))
        })?;
        let fields = Self {
            enrollment,
            name,
            remarks: find(&patterns.remarks),
            cpi: find(&patterns.cpi),
            grand_total: find(&patterns.grand_total),
        };
        debug!("Located student fields: {fields:?}");
        Ok(fields)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentRecord {
    /// Sheet row the record was read from.
    pub row: usize,
    pub enrollment_no: Option<String>,
    pub name: String,
    pub remarks: Option<String>,
    pub cpi: Option<f64>,
    pub grand_total: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentRoster {
    pub fields: StudentFields,
    pub records: Vec<StudentRecord>,
}

impl StudentRoster {
    pub fn extract(
        sheet: &RawSheet,
        layout: &SheetLayout,
        fields: StudentFields,
        annotation_chars: &[char],
    ) -> Self {
        let text = |row: usize, column: Option<usize>| {
            column
                .map(|column| sheet.cell(row, column).trim())
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        let number = |row: usize, column: Option<usize>| {
            column.and_then(|column| parse_number(sheet.cell(row, column), annotation_chars))
        };
        let records = sheet
            .record_rows(layout)
            .into_iter()
            .map(|row| StudentRecord {
                row,
                enrollment_no: text(row, Some(fields.enrollment)),
                name: text(row, Some(fields.name)).unwrap_or_default(),
                remarks: text(row, fields.remarks),
                cpi: number(row, fields.cpi),
                grand_total: number(row, fields.grand_total),
            })
            .collect();
        Self { fields, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn require_cpi(&self) -> Result<usize, AnalysisError> {
        self.fields
            .cpi
            .ok_or(AnalysisError::RequiredFieldMissing { field: FIELD_CPI })
    }

    pub fn require_remarks(&self) -> Result<usize, AnalysisError> {
        self.fields
            .remarks
            .ok_or(AnalysisError::RequiredFieldMissing {
                field: FIELD_REMARKS,
            })
    }
}

fn parse_number(raw: &str, annotation_chars: &[char]) -> Option<f64> {
    let cleaned = strip_annotations(raw, annotation_chars);
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}
