//! Untranslatable values
//!
//! Translators return [`Untranslatable`] instead of failing when a source value has no
//! faithful counterpart in the target model. Callers decide whether to substitute a
//! placeholder (and record a diagnostic) or escalate to a hard error.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// A source value that could not be translated, with the reason why
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{message}")]
pub struct Untranslatable {
    /// The original, unparsed value
    pub value: Value,
    /// Human-readable reason
    pub message: String,
}

impl Untranslatable {
    pub fn new(value: impl Into<Value>, message: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            message: message.into(),
        }
    }

    /// Rebind to an enclosing value, keeping the reason
    pub fn within(self, value: &Value) -> Self {
        Self {
            value: value.clone(),
            message: self.message,
        }
    }

    /// Prefix the reason with additional context
    pub fn context(self, prefix: impl AsRef<str>) -> Self {
        Self {
            message: format!("{}; {}", prefix.as_ref(), self.message),
            value: self.value,
        }
    }
}

/// Result of a translation that may degrade instead of failing
pub type Translation<T> = Result<T, Untranslatable>;
