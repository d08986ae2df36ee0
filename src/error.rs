//! Pipeline error types.

use crate::models::Relation;

/// Fatal conditions that abort an analysis run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{relation} data unavailable at {path}: {source}")]
    DataUnavailable {
        relation: Relation,
        path: String,
        source: csv::Error,
    },

    #[error("{relation} data at {path} is missing required column '{column}'")]
    MissingColumn {
        relation: Relation,
        path: String,
        column: &'static str,
    },
}
