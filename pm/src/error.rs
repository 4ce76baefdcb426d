//! Translation error types
//!
//! Hard errors abort the current translation unit. Anything recoverable is an
//! [`Untranslatable`](crate::ir::Untranslatable) plus a diagnostic instead.

use thiserror::Error;

/// Errors that abort translation or code generation
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("Dependency on '{activity}' has {count} outcome conditions; only one is supported")]
    AmbiguousDependency { activity: String, count: usize },

    #[error("Could not match expression '{expression}' in activity '{activity}'")]
    UnmatchedExpression { activity: String, expression: String },

    #[error("Could not translate activity '{activity}': {message}")]
    Untranslatable { activity: String, message: String },

    #[error("Dataset '{dataset}' has no usable linked service: {reason}")]
    UnresolvedLinkedService { dataset: String, reason: String },

    #[error("Writing data to '{0}' is not supported")]
    UnsupportedSinkFormat(String),

    #[error("Reading data from '{0}' is not supported")]
    UnsupportedSourceFormat(String),

    #[error("Template '{name}' failed: {message}")]
    Template { name: String, message: String },

    #[error("Invalid pipeline document: {0}")]
    InvalidDocument(String),
}

impl TranslateError {
    /// Errors raised only because strict mode refused a substitution
    pub fn is_strict_violation(&self) -> bool {
        matches!(
            self,
            TranslateError::UnmatchedExpression { .. } | TranslateError::Untranslatable { .. }
        )
    }

    /// Errors that an enclosing branch can contain by substituting a placeholder child
    pub fn is_containable(&self) -> bool {
        match self {
            TranslateError::AmbiguousDependency { .. } => true,
            TranslateError::UnmatchedExpression { .. } => true,
            TranslateError::Untranslatable { .. } => true,
            TranslateError::UnresolvedLinkedService { .. } => true,
            TranslateError::UnsupportedSinkFormat(_) => false,
            TranslateError::UnsupportedSourceFormat(_) => false,
            TranslateError::Template { .. } => false,
            TranslateError::InvalidDocument(_) => false,
        }
    }
}

pub type TranslateResult<T> = Result<T, TranslateError>;
