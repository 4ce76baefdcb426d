//! Activity translation engine
//!
//! [`ActivityTranslator`] owns the recursive entry point. It builds the shared task
//! metadata, dispatches on [`ActivityKind`], and substitutes a placeholder task whenever
//! an activity cannot be expressed. Branch activities call back into
//! [`ActivityTranslator::translate`] for their children (see `branch.rs`).

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use tracing::{debug, info};

use super::TranslateOptions;
use super::copy::translate_copy;
use super::fields::{array_field, object_field, scalar_to_string, str_field};
use super::linked_service::translate_cluster_spec;
use super::policy::{PolicyCache, parse_dependencies};
use crate::diagnostics::Diagnostics;
use crate::error::{TranslateError, TranslateResult};
use crate::ir::{
    Activity, ActivityPayload, ClusterSpec, Dependency, NotebookActivity, SparkJarActivity, SparkPythonActivity,
    TaskMetadata, UNNAMED_TASK, Untranslatable,
};

/// Type tag recorded for activities that have none
pub const UNSUPPORTED_TYPE: &str = "Unsupported";

/// Activity types with a target counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Notebook,
    SparkJar,
    SparkPython,
    IfCondition,
    ForEach,
    Copy,
}

impl ActivityKind {
    pub fn from_type_tag(tag: &str) -> Option<Self> {
        match tag {
            "DatabricksNotebook" => Some(Self::Notebook),
            "DatabricksSparkJar" => Some(Self::SparkJar),
            "DatabricksSparkPython" => Some(Self::SparkPython),
            "IfCondition" => Some(Self::IfCondition),
            "ForEach" => Some(Self::ForEach),
            "Copy" => Some(Self::Copy),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Notebook => "DatabricksNotebook",
            Self::SparkJar => "DatabricksSparkJar",
            Self::SparkPython => "DatabricksSparkPython",
            Self::IfCondition => "IfCondition",
            Self::ForEach => "ForEach",
            Self::Copy => "Copy",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a kind translator gave up on an activity
#[derive(Debug)]
pub(crate) struct Rejection {
    property: String,
    reason: Untranslatable,
    expression: bool,
}

impl Rejection {
    pub(crate) fn value(property: impl Into<String>, reason: Untranslatable) -> Self {
        Self {
            property: property.into(),
            reason,
            expression: false,
        }
    }

    /// An expression matched none of the supported patterns
    pub(crate) fn expression(property: impl Into<String>, reason: Untranslatable) -> Self {
        Self {
            property: property.into(),
            reason,
            expression: true,
        }
    }
}

pub(crate) type KindResult = TranslateResult<Result<ActivityPayload, Rejection>>;

/// Translates activities for one pipeline, accumulating diagnostics as it goes
#[derive(Debug)]
pub struct ActivityTranslator {
    options: TranslateOptions,
    policies: PolicyCache,
    diagnostics: Diagnostics,
}

impl ActivityTranslator {
    pub fn new(options: TranslateOptions) -> Self {
        debug!(strict = options.strict, "ActivityTranslator::new: called");
        Self {
            options,
            policies: PolicyCache::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn options(&self) -> &TranslateOptions {
        &self.options
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    /// Translate top-level activities into a flat, pre-ordered task list
    pub fn translate_activities(&mut self, activities: &[Value]) -> TranslateResult<Vec<Activity>> {
        debug!(count = activities.len(), "ActivityTranslator::translate_activities: called");
        let mut tasks = Vec::with_capacity(activities.len());
        for activity in activities {
            tasks.extend(self.translate(activity)?.flatten());
        }
        info!(tasks = tasks.len(), "Translated activities");
        Ok(tasks)
    }

    /// Translate one activity, diagnostics attributed to it
    pub fn translate(&mut self, activity: &Value) -> TranslateResult<Activity> {
        let name = str_field(activity, "name").filter(|n| !n.is_empty());
        let activity_type = str_field(activity, "type").filter(|t| !t.is_empty()).unwrap_or(UNSUPPORTED_TYPE);
        debug!(?name, %activity_type, "ActivityTranslator::translate: called");

        self.diagnostics.enter(name, Some(activity_type));
        let result = self.translate_in_scope(activity, name, activity_type);
        self.diagnostics.exit();
        result
    }

    fn translate_in_scope(&mut self, activity: &Value, name: Option<&str>, activity_type: &str) -> TranslateResult<Activity> {
        let task = self.base_metadata(activity, name, activity_type)?;

        let Some(kind) = ActivityKind::from_type_tag(activity_type) else {
            debug!(%activity_type, "ActivityTranslator::translate_in_scope: no translator, using placeholder");
            self.diagnostics.warn(
                "type",
                format!("Unsupported activity type '{activity_type}', substituting a placeholder task"),
            );
            return Ok(Activity::placeholder(
                task,
                format!("Unsupported activity type '{activity_type}'"),
            ));
        };

        let payload = match kind {
            ActivityKind::Notebook => self.translate_notebook(activity),
            ActivityKind::SparkJar => translate_spark_jar(activity),
            ActivityKind::SparkPython => translate_spark_python(activity),
            ActivityKind::Copy => self.translate_copy_activity(activity)?,
            ActivityKind::IfCondition => self.translate_if_condition(activity, &task.task_key)?,
            ActivityKind::ForEach => self.translate_for_each(activity)?,
        };
        match payload {
            Ok(payload) => Ok(Activity { task, payload }),
            Err(rejection) => self.reject(task, rejection),
        }
    }

    fn base_metadata(&mut self, activity: &Value, name: Option<&str>, activity_type: &str) -> TranslateResult<TaskMetadata> {
        let name = match name {
            Some(name) => name.to_string(),
            None => {
                self.diagnostics.warn(
                    "name",
                    format!("No activity name in source definition, setting to {UNNAMED_TASK}"),
                );
                UNNAMED_TASK.to_string()
            }
        };
        let policy = self
            .policies
            .get_or_parse(&name, activity.get("policy"), &mut self.diagnostics);
        let depends_on = parse_dependencies(activity.get("depends_on"), &mut self.diagnostics)?;
        let new_cluster = self.compute_spec(activity);

        Ok(TaskMetadata {
            task_key: name.clone(),
            name,
            activity_type: activity_type.to_string(),
            description: str_field(activity, "description").map(str::to_string),
            timeout_seconds: policy.timeout_seconds,
            max_retries: policy.max_retries,
            min_retry_interval_millis: policy.min_retry_interval_millis,
            depends_on,
            new_cluster,
        })
    }

    fn compute_spec(&mut self, activity: &Value) -> Option<ClusterSpec> {
        let definition = activity
            .get("linked_service_definition")
            .filter(|d| d.as_object().is_some_and(|o| !o.is_empty()))?;
        match translate_cluster_spec(definition) {
            Ok(spec) => Some(spec),
            Err(reason) => {
                self.diagnostics.untranslatable("linked_service_definition", &reason);
                None
            }
        }
    }

    /// Placeholder in lenient mode, hard error in strict mode
    fn reject(&mut self, task: TaskMetadata, rejection: Rejection) -> TranslateResult<Activity> {
        let Rejection {
            property,
            reason,
            expression,
        } = rejection;
        if self.options.strict {
            return Err(if expression {
                TranslateError::UnmatchedExpression {
                    activity: task.name,
                    expression: scalar_to_string(&reason.value),
                }
            } else {
                TranslateError::Untranslatable {
                    activity: task.name,
                    message: reason.message,
                }
            });
        }
        self.diagnostics.untranslatable(property, &reason);
        Ok(Activity::placeholder(task, reason.message))
    }

    /// Substitute a placeholder for a branch child whose translation failed hard
    pub(crate) fn contain(&mut self, activity: &Value, dependency: Option<Dependency>, error: TranslateError) -> Activity {
        let name = str_field(activity, "name").filter(|n| !n.is_empty()).unwrap_or(UNNAMED_TASK);
        let activity_type = str_field(activity, "type").filter(|t| !t.is_empty()).unwrap_or(UNSUPPORTED_TYPE);
        debug!(%name, %error, "ActivityTranslator::contain: called");

        self.diagnostics.enter(Some(name), Some(activity_type));
        self.diagnostics.warn("activity", error.to_string());
        self.diagnostics.exit();

        let task = TaskMetadata {
            name: name.to_string(),
            task_key: name.to_string(),
            activity_type: activity_type.to_string(),
            description: str_field(activity, "description").map(str::to_string),
            timeout_seconds: None,
            max_retries: None,
            min_retry_interval_millis: None,
            depends_on: dependency.into_iter().collect(),
            new_cluster: None,
        };
        Activity::placeholder(task, error.to_string())
    }

    fn translate_notebook(&mut self, activity: &Value) -> Result<ActivityPayload, Rejection> {
        let notebook_path = required(activity, "notebook_path", ActivityKind::Notebook)?;
        let mut base_parameters = BTreeMap::new();
        if let Some(parameters) = object_field(activity, "base_parameters") {
            for (name, value) in parameters {
                let value = match value {
                    Value::String(value) => value.clone(),
                    _ => {
                        self.diagnostics.warn(
                            format!("parameters.{name}"),
                            format!("Could not resolve default value for parameter {name}, setting to \"\""),
                        );
                        String::new()
                    }
                };
                base_parameters.insert(name.clone(), value);
            }
        }
        Ok(ActivityPayload::Notebook(NotebookActivity {
            notebook_path: notebook_path.to_string(),
            base_parameters,
        }))
    }

    fn translate_copy_activity(&mut self, activity: &Value) -> KindResult {
        let translated = translate_copy(activity, self.options.strict, &mut self.diagnostics)?;
        Ok(translated
            .map(|copy| ActivityPayload::Copy(Box::new(copy)))
            .map_err(|reason| Rejection::value("copy", reason)))
    }
}

fn required<'a>(activity: &'a Value, key: &str, kind: ActivityKind) -> Result<&'a str, Rejection> {
    str_field(activity, key).filter(|v| !v.is_empty()).ok_or_else(|| {
        Rejection::value(
            key,
            Untranslatable::new(
                activity.get(key).cloned().unwrap_or(Value::Null),
                format!("Missing property '{key}' in {kind} activity"),
            ),
        )
    })
}

fn list(activity: &Value, key: &str) -> Vec<Value> {
    array_field(activity, key).cloned().unwrap_or_default()
}

fn translate_spark_jar(activity: &Value) -> Result<ActivityPayload, Rejection> {
    let main_class_name = required(activity, "main_class_name", ActivityKind::SparkJar)?;
    Ok(ActivityPayload::SparkJar(SparkJarActivity {
        main_class_name: main_class_name.to_string(),
        parameters: list(activity, "parameters"),
        libraries: list(activity, "libraries"),
    }))
}

fn translate_spark_python(activity: &Value) -> Result<ActivityPayload, Rejection> {
    let python_file = required(activity, "python_file", ActivityKind::SparkPython)?;
    Ok(ActivityPayload::SparkPython(SparkPythonActivity {
        python_file: python_file.to_string(),
        parameters: list(activity, "parameters"),
    }))
}
