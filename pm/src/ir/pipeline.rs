//! Pipeline IR

use std::collections::BTreeMap;

use serde::Serialize;

use super::activity::Activity;
use crate::diagnostics::Diagnostic;

/// Pipeline name used when the source definition has none
pub const UNNAMED_WORKFLOW: &str = "UNNAMED_WORKFLOW";

/// Tag appended to every generated job and cluster
pub const PROVENANCE_TAG: &str = "CREATED_BY_PIPEMIGRATE";

/// A fully translated pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pipeline {
    pub name: String,
    pub parameters: Vec<JobParameter>,
    pub schedule: Option<Schedule>,
    /// Flattened tasks in translation order
    pub tasks: Vec<Activity>,
    pub tags: BTreeMap<String, String>,
    pub not_translatable: Vec<Diagnostic>,
}

/// Job-level parameter with its default value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobParameter {
    pub name: String,
    pub default: String,
}

/// Cron schedule for a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schedule {
    pub quartz_cron_expression: String,
    pub timezone_id: String,
}

impl Pipeline {
    pub fn task(&self, task_key: &str) -> Option<&Activity> {
        self.tasks.iter().find(|t| t.task_key() == task_key)
    }
}

/// Add the provenance tag, keeping any existing tags
pub fn with_provenance_tag(mut tags: BTreeMap<String, String>) -> BTreeMap<String, String> {
    tags.insert(PROVENANCE_TAG.to_string(), String::new());
    tags
}
