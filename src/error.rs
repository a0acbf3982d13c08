// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for Museum Lens

use thiserror::Error;

/// Result type alias for Museum Lens operations
pub type Result<T> = std::result::Result<T, LensError>;

/// Museum Lens error types
///
/// Transport failures of an analysis request are not represented here: they
/// are classified into a [`crate::classify::ClassifiedFailure`] and stored in
/// the workflow state instead.
#[derive(Error, Debug)]
pub enum LensError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cannot build an analysis request from an empty image collection")]
    EmptyCollection,

    #[error("'{operation}' is not allowed while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: &'static str,
    },

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Analysis error: {0}")]
    Analysis(String),
}
