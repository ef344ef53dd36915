//! Error taxonomy for the analysis pipeline.
//!
//! Only [`AnalysisError::SheetStructure`] aborts a whole run. Every other
//! variant is scoped to one category or one downstream stage and ends up as
//! a [`crate::report::StageIssue`] in the assembled report.

use thiserror::Error;

use crate::header::Category;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("sheet structure is unusable: {0}")]
    SheetStructure(String),

    #[error("no column carries the '{marker}' marker for {category} marks")]
    MissingMarker { category: Category, marker: String },

    #[error("value '{raw}' is not a valid mark")]
    NumericCoercion { raw: String },

    #[error("required column '{field}' could not be located in the header row")]
    RequiredFieldMissing { field: &'static str },

    #[error("every row was excluded from the {category} dataset")]
    EmptyCategoryDataset { category: Category },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("stage '{0}' panicked")]
    StagePanicked(String),
}
