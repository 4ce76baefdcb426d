//! Pipeline parameter and tag translation

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use super::fields::scalar_to_string;
use crate::ir::{JobParameter, with_provenance_tag};

/// `{name: {type, default_value}}` to job parameters, in name order
pub fn translate_parameters(parameters: Option<&Value>) -> Vec<JobParameter> {
    let Some(parameters) = parameters.and_then(Value::as_object) else {
        return Vec::new();
    };
    debug!(count = parameters.len(), "translate_parameters: called");
    let mut translated: Vec<JobParameter> = parameters
        .iter()
        .map(|(name, definition)| JobParameter {
            name: name.clone(),
            default: definition
                .get("default_value")
                .map(|v| scalar_to_string(v).replace('\'', "\""))
                .unwrap_or_default(),
        })
        .collect();
    translated.sort_by(|a, b| a.name.cmp(&b.name));
    translated
}

/// User tags plus the provenance tag
pub fn translate_tags(tags: Option<&Value>) -> BTreeMap<String, String> {
    let user_tags = tags
        .and_then(Value::as_object)
        .map(|tags| tags.iter().map(|(k, v)| (k.clone(), scalar_to_string(v))).collect())
        .unwrap_or_default();
    with_provenance_tag(user_tags)
}
