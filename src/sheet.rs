//! In-memory model of a result sheet.
//!
//! The source sheet is parsed exactly once into a [`RawSheet`]; every
//! category resolution borrows the same rows. [`SheetLayout`] says which row
//! is the nominal header, which is the marker row, and where student records
//! begin.

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetLayout {
    pub header_row: usize,
    pub marker_row: usize,
    pub first_record_row: usize,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            header_row: 0,
            marker_row: 1,
            first_record_row: 2,
        }
    }
}

impl SheetLayout {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.header_row == self.marker_row {
            return Err(AnalysisError::InvalidConfig(format!(
                "header row and marker row are both row {}",
                self.header_row
            )));
        }
        if self.first_record_row <= self.header_row.max(self.marker_row) {
            return Err(AnalysisError::InvalidConfig(format!(
                "records must start after row {} (got {})",
                self.header_row.max(self.marker_row),
                self.first_record_row
            )));
        }
        Ok(())
    }
}

/// Rows of string cells exactly as read from the source. Rows may be ragged;
/// cells beyond a row's end read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSheet {
    rows: Vec<Vec<String>>,
    width: usize,
}

impl RawSheet {
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        Self { rows, width }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    /// Fails when the sheet cannot hold the header and marker rows the
    /// layout asks for.
    pub fn check_layout(&self, layout: &SheetLayout) -> Result<(), AnalysisError> {
        layout
            .validate()
            .map_err(|err| AnalysisError::SheetStructure(err.to_string()))?;
        let needed = layout.header_row.max(layout.marker_row) + 1;
        if self.rows.len() < needed {
            return Err(AnalysisError::SheetStructure(format!(
                "expected at least {needed} leading row(s) for header and markers, found {}",
                self.rows.len()
            )));
        }
        if self.width == 0 {
            return Err(AnalysisError::SheetStructure(
                "sheet has no columns".to_string(),
            ));
        }
        Ok(())
    }

    /// Indices of record rows, skipping rows whose cells are all blank.
    pub fn record_rows(&self, layout: &SheetLayout) -> Vec<usize> {
        (layout.first_record_row..self.rows.len())
            .filter(|&row| self.rows[row].iter().any(|cell| !cell.trim().is_empty()))
            .collect()
    }
}

/// Spreadsheet exports label blank header cells `Unnamed: N`, sometimes
/// behind a merged-cell prefix such as `Level 0 Unnamed: 4`.
pub fn is_placeholder_header(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.to_ascii_lowercase().contains("unnamed")
}
