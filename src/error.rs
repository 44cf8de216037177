//! Typed failure modes of the analysis pipeline

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("'{}' not found. Please ensure the file is in the correct directory.", .0.display())]
    InputNotFound(PathBuf),

    #[error("Required column not found: '{0}'")]
    MissingColumn(String),

    #[error("Number of histogram bins must be positive, got {0}")]
    InvalidBins(usize),

    #[error("Nothing to plot for {0}")]
    EmptyGroup(&'static str),
}
