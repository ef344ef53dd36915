//! Header resolution: recovering course/category identity from the two
//! header rows.
//!
//! The marker row tags mark columns with `T`, `I`, or `E`. Only External
//! columns carry their own course code in the header row; Internal and Total
//! columns sit one and two places to the right of the course code cell
//! respectively, so their code is looked up at a fixed offset.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::AnalysisError,
    sheet::{RawSheet, SheetLayout, is_placeholder_header},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Internal,
    External,
    Total,
}

impl Category {
    /// Report order: Total columns lead the merged course table.
    pub const ALL: [Category; 3] = [Category::Total, Category::Internal, Category::External];

    /// Distance from a marker cell back to the header cell naming the course.
    pub fn code_offset(self) -> usize {
        match self {
            Category::Total => 2,
            Category::Internal => 1,
            Category::External => 0,
        }
    }

    pub fn short_code(self) -> &'static str {
        match self {
            Category::Total => "T",
            Category::Internal => "I",
            Category::External => "E",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Internal => "Internal",
            Category::External => "External",
            Category::Total => "Total",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ColumnRole {
    CourseMark {
        course_code: String,
        category: Category,
    },
    StudentMeta {
        field_name: String,
    },
    Unclassified,
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRole::CourseMark {
                course_code,
                category,
            } => write!(f, "{} mark ({course_code})", category.short_code()),
            ColumnRole::StudentMeta { field_name } => write!(f, "meta ({field_name})"),
            ColumnRole::Unclassified => f.write_str("-"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseColumn {
    pub index: usize,
    pub course_code: String,
}

/// Column roles for one category, index-aligned with the sheet's columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSchema {
    category: Category,
    roles: Vec<ColumnRole>,
}

impl ResolvedSchema {
    pub fn new(category: Category, roles: Vec<ColumnRole>) -> Self {
        Self { category, roles }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn roles(&self) -> &[ColumnRole] {
        &self.roles
    }

    pub fn role(&self, index: usize) -> Option<&ColumnRole> {
        self.roles.get(index)
    }

    /// Course mark columns in sheet order.
    pub fn course_columns(&self) -> Vec<CourseColumn> {
        self.roles
            .iter()
            .enumerate()
            .filter_map(|(index, role)| match role {
                ColumnRole::CourseMark { course_code, .. } => Some(CourseColumn {
                    index,
                    course_code: course_code.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    pub fn meta_columns(&self) -> Vec<(usize, &str)> {
        self.roles
            .iter()
            .enumerate()
            .filter_map(|(index, role)| match role {
                ColumnRole::StudentMeta { field_name } => Some((index, field_name.as_str())),
                _ => None,
            })
            .collect()
    }
}

/// Classifies every column of `sheet` for one category.
///
/// Fails with [`AnalysisError::MissingMarker`] when no marker cell equals
/// `marker`; that only removes this category from the report.
pub fn resolve_category(
    sheet: &RawSheet,
    layout: &SheetLayout,
    category: Category,
    marker: &str,
) -> Result<ResolvedSchema, AnalysisError> {
    let marker = marker.trim();
    let offset = category.code_offset();
    let mut matched = 0usize;
    let mut roles = Vec::with_capacity(sheet.width());

    for index in 0..sheet.width() {
        let header = sheet.cell(layout.header_row, index).trim();
        let tag = sheet.cell(layout.marker_row, index).trim();

        let role = if tag.eq_ignore_ascii_case(marker) {
            matched += 1;
            resolve_course_code(sheet, layout, index, offset)
                .map(|course_code| ColumnRole::CourseMark {
                    course_code,
                    category,
                })
                .unwrap_or(ColumnRole::Unclassified)
        } else if tag.is_empty() && !is_placeholder_header(header) {
            ColumnRole::StudentMeta {
                field_name: header.to_string(),
            }
        } else {
            ColumnRole::Unclassified
        };
        roles.push(role);
    }

    if matched == 0 {
        return Err(AnalysisError::MissingMarker {
            category,
            marker: marker.to_string(),
        });
    }
    Ok(ResolvedSchema::new(category, roles))
}

fn resolve_course_code(
    sheet: &RawSheet,
    layout: &SheetLayout,
    index: usize,
    offset: usize,
) -> Option<String> {
    let Some(source) = index.checked_sub(offset) else {
        debug!("Marker in column {index} has no course cell {offset} place(s) to its left");
        return None;
    };
    let code = sheet.cell(layout.header_row, source).trim();
    if is_placeholder_header(code) {
        debug!("Marker in column {index} points at unnamed header column {source}");
        return None;
    }
    Some(code.to_string())
}
