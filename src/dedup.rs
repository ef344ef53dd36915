//! Collapses repeated course columns within one category.
//!
//! A category marker can appear once per assessment component, so after
//! offset resolution several columns may name the same course. The leftmost
//! column stays canonical; later ones are demoted to
//! [`ColumnRole::Unclassified`] and take no further part in the analysis.

use std::collections::HashSet;

use log::debug;

use crate::header::{ColumnRole, ResolvedSchema};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deduplicated {
    pub schema: ResolvedSchema,
    /// Column indices that lost to an earlier column with the same code.
    pub dropped: Vec<usize>,
}

pub fn deduplicate(schema: &ResolvedSchema) -> Deduplicated {
    let mut seen = HashSet::new();
    let mut dropped = Vec::new();
    let roles = schema
        .roles()
        .iter()
        .enumerate()
        .map(|(index, role)| match role {
            ColumnRole::CourseMark { course_code, .. } if !seen.insert(course_code.clone()) => {
                debug!(
                    "{} column {index} repeats course '{course_code}', keeping the first occurrence",
                    schema.category()
                );
                dropped.push(index);
                ColumnRole::Unclassified
            }
            other => other.clone(),
        })
        .collect();
    Deduplicated {
        schema: ResolvedSchema::new(schema.category(), roles),
        dropped,
    }
}
