//! Source pipeline translation
//!
//! Turns a raw pipeline document into the flat IR [`Pipeline`]. One call owns one
//! [`ActivityTranslator`], so diagnostics never leak between pipelines.

pub mod activity;
pub mod branch;
pub mod copy;
pub mod dataset;
pub mod expression;
pub(crate) mod fields;
pub mod format;
pub mod linked_service;
pub mod parameter;
pub mod policy;
pub mod trigger;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{TranslateError, TranslateResult};
use crate::ir::{Pipeline, UNNAMED_WORKFLOW};

pub use activity::{ActivityKind, ActivityTranslator};
pub use dataset::translate_dataset;
pub use linked_service::translate_linked_service;
pub use trigger::translate_trigger;

/// Translation behavior switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateOptions {
    /// Fail instead of substituting a placeholder for untranslatable activities
    pub strict: bool,
}

/// Translate a pipeline document, using its embedded `trigger` if any
pub fn translate_pipeline(document: &Value, options: TranslateOptions) -> TranslateResult<Pipeline> {
    translate_pipeline_with_trigger(document, None, options)
}

/// Translate a pipeline document; an explicit trigger takes precedence over an embedded one
pub fn translate_pipeline_with_trigger(
    document: &Value,
    trigger: Option<&Value>,
    options: TranslateOptions,
) -> TranslateResult<Pipeline> {
    if !document.is_object() {
        return Err(TranslateError::InvalidDocument(
            "pipeline definition must be an object".to_string(),
        ));
    }
    let mut translator = ActivityTranslator::new(options);

    let name = match document.get("name").and_then(Value::as_str).filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => {
            translator.diagnostics_mut().warn(
                "pipeline.name",
                format!("No pipeline name in source definition, setting to {UNNAMED_WORKFLOW}"),
            );
            UNNAMED_WORKFLOW.to_string()
        }
    };
    debug!(%name, strict = options.strict, "translate_pipeline: called");

    let activities = match document.get("activities") {
        None | Some(Value::Null) => &[][..],
        Some(Value::Array(activities)) => activities.as_slice(),
        Some(other) => {
            return Err(TranslateError::InvalidDocument(format!(
                "'activities' must be a list, found {other}"
            )));
        }
    };
    let tasks = translator.translate_activities(activities)?;

    let schedule = match trigger.or_else(|| document.get("trigger").filter(|t| !t.is_null())) {
        Some(trigger) => translate_trigger(trigger, translator.diagnostics_mut()),
        None => None,
    };

    let pipeline = Pipeline {
        name,
        parameters: parameter::translate_parameters(document.get("parameters")),
        schedule,
        tasks,
        tags: parameter::translate_tags(document.get("tags")),
        not_translatable: translator.into_diagnostics().into_entries(),
    };
    info!(
        pipeline = %pipeline.name,
        tasks = pipeline.tasks.len(),
        diagnostics = pipeline.not_translatable.len(),
        "Translated pipeline"
    );
    Ok(pipeline)
}
