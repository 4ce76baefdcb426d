//! Diagnostics collector
//!
//! Every warning raised while translating one activity is tagged with that activity's
//! name and type. The collector is an explicit accumulator owned by a single translation
//! call; nested activities push their own scope so their diagnostics carry the innermost
//! activity.

use serde::Serialize;
use tracing::{debug, warn};

use crate::ir::Untranslatable;

/// One thing that could not be faithfully translated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Source property the diagnostic refers to, e.g. `secure_input` or `parameters.env`
    pub property: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,
}

#[derive(Debug, Clone)]
struct Scope {
    activity_name: Option<String>,
    activity_type: Option<String>,
}

/// Accumulates diagnostics for one translation pass
#[derive(Debug, Default)]
pub struct Diagnostics {
    scopes: Vec<Scope>,
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with diagnostics attributed to the given activity
    pub fn scoped<T>(
        &mut self,
        activity_name: Option<&str>,
        activity_type: Option<&str>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        self.enter(activity_name, activity_type);
        let result = f(self);
        self.exit();
        result
    }

    /// Push an activity scope; every `enter` must be paired with an [`exit`](Self::exit)
    pub fn enter(&mut self, activity_name: Option<&str>, activity_type: Option<&str>) {
        debug!(?activity_name, ?activity_type, "Diagnostics::enter: called");
        self.scopes.push(Scope {
            activity_name: activity_name.map(str::to_string),
            activity_type: activity_type.map(str::to_string),
        });
    }

    pub fn exit(&mut self) {
        self.scopes.pop();
    }

    /// Record a diagnostic against the current scope
    pub fn warn(&mut self, property: impl Into<String>, message: impl Into<String>) {
        let scope = self.scopes.last().cloned();
        let diagnostic = Diagnostic {
            property: property.into(),
            message: message.into(),
            activity_name: scope.as_ref().and_then(|s| s.activity_name.clone()),
            activity_type: scope.and_then(|s| s.activity_type),
        };
        warn!(
            property = %diagnostic.property,
            activity = ?diagnostic.activity_name,
            "{}", diagnostic.message
        );
        self.entries.push(diagnostic);
    }

    /// Record an untranslatable value against the current scope
    pub fn untranslatable(&mut self, property: impl Into<String>, value: &Untranslatable) {
        self.warn(property, value.message.clone());
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }
}
