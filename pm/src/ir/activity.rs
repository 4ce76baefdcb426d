//! Activity IR
//!
//! An [`Activity`] is shared task metadata plus one variant-specific payload. IfCondition
//! activities own their translated children until the pipeline flattens them; ForEach
//! activities keep their bodies nested.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::dataset::{ColumnMapping, Dataset, DatasetProperties};
use super::linked_service::ClusterSpec;

/// Notebook path used for activities that have no target counterpart
pub const PLACEHOLDER_NOTEBOOK_PATH: &str = "/UNSUPPORTED_ADF_ACTIVITY";

/// Task key for activities without a name
pub const UNNAMED_TASK: &str = "UNNAMED_TASK";

/// A translated activity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    #[serde(flatten)]
    pub task: TaskMetadata,
    pub payload: ActivityPayload,
}

/// Fields shared by every task
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskMetadata {
    pub name: String,
    pub task_key: String,
    /// Source activity type tag, e.g. `DatabricksNotebook`
    pub activity_type: String,
    pub description: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_retries: Option<u32>,
    pub min_retry_interval_millis: Option<u64>,
    pub depends_on: Vec<Dependency>,
    pub new_cluster: Option<ClusterSpec>,
}

/// Upstream edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub task_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

impl Dependency {
    pub fn on(task_key: impl Into<String>) -> Self {
        Self {
            task_key: task_key.into(),
            outcome: None,
        }
    }

    pub fn on_outcome(task_key: impl Into<String>, outcome: impl Into<String>) -> Self {
        Self {
            task_key: task_key.into(),
            outcome: Some(outcome.into()),
        }
    }
}

/// Variant-specific activity data
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityPayload {
    Notebook(NotebookActivity),
    SparkJar(SparkJarActivity),
    SparkPython(SparkPythonActivity),
    Copy(Box<CopyActivity>),
    IfCondition(IfConditionActivity),
    ForEach(ForEachActivity),
    Placeholder(PlaceholderActivity),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotebookActivity {
    pub notebook_path: String,
    pub base_parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SparkJarActivity {
    pub main_class_name: String,
    pub parameters: Vec<Value>,
    pub libraries: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SparkPythonActivity {
    pub python_file: String,
    pub parameters: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CopyActivity {
    pub source: Dataset,
    pub sink: Dataset,
    pub source_properties: DatasetProperties,
    pub sink_properties: DatasetProperties,
    pub column_mapping: Vec<ColumnMapping>,
}

/// Comparison operator of a condition task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionOp {
    EqualTo,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    NotEqual,
}

impl ConditionOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EqualTo => "EQUAL_TO",
            Self::GreaterThan => "GREATER_THAN",
            Self::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
            Self::LessThan => "LESS_THAN",
            Self::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
            Self::NotEqual => "NOT_EQUAL",
        }
    }
}

impl fmt::Display for ConditionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IfConditionActivity {
    pub op: ConditionOp,
    pub left: String,
    pub right: String,
    /// Translated branch children, drained when the pipeline is flattened
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Activity>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForEachActivity {
    /// JSON list of string items, e.g. `["a","b"]`
    pub items: String,
    pub concurrency: Option<u32>,
    pub activities: Vec<Activity>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceholderActivity {
    pub notebook_path: String,
    pub reason: String,
}

impl Activity {
    pub fn placeholder(task: TaskMetadata, reason: impl Into<String>) -> Self {
        Self {
            task,
            payload: ActivityPayload::Placeholder(PlaceholderActivity {
                notebook_path: PLACEHOLDER_NOTEBOOK_PATH.to_string(),
                reason: reason.into(),
            }),
        }
    }

    pub fn task_key(&self) -> &str {
        &self.task.task_key
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.payload, ActivityPayload::Placeholder(_))
    }

    /// Pre-order flattening: the activity first, then its IfCondition subtree
    pub fn flatten(mut self) -> Vec<Activity> {
        debug!(task_key = %self.task.task_key, "Activity::flatten: called");
        let children = match &mut self.payload {
            ActivityPayload::IfCondition(condition) => std::mem::take(&mut condition.children),
            _ => Vec::new(),
        };
        let mut flattened = vec![self];
        for child in children {
            flattened.extend(child.flatten());
        }
        flattened
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(key: &str) -> TaskMetadata {
        TaskMetadata {
            name: key.to_string(),
            task_key: key.to_string(),
            activity_type: "DatabricksNotebook".to_string(),
            description: None,
            timeout_seconds: None,
            max_retries: None,
            min_retry_interval_millis: None,
            depends_on: Vec::new(),
            new_cluster: None,
        }
    }

    fn notebook(key: &str) -> Activity {
        Activity {
            task: metadata(key),
            payload: ActivityPayload::Notebook(NotebookActivity {
                notebook_path: format!("/{key}"),
                base_parameters: BTreeMap::new(),
            }),
        }
    }

    #[test]
    fn test_flatten_is_preorder() {
        let inner = Activity {
            task: metadata("inner_if"),
            payload: ActivityPayload::IfCondition(IfConditionActivity {
                op: ConditionOp::EqualTo,
                left: "a".to_string(),
                right: "b".to_string(),
                children: vec![notebook("c")],
            }),
        };
        let outer = Activity {
            task: metadata("outer_if"),
            payload: ActivityPayload::IfCondition(IfConditionActivity {
                op: ConditionOp::NotEqual,
                left: "x".to_string(),
                right: "y".to_string(),
                children: vec![notebook("a"), inner, notebook("d")],
            }),
        };

        let keys: Vec<String> = outer.flatten().iter().map(|a| a.task_key().to_string()).collect();
        assert_eq!(keys, vec!["outer_if", "a", "inner_if", "c", "d"]);
    }

    #[test]
    fn test_flatten_drains_children() {
        let parent = Activity {
            task: metadata("parent"),
            payload: ActivityPayload::IfCondition(IfConditionActivity {
                op: ConditionOp::EqualTo,
                left: "1".to_string(),
                right: "1".to_string(),
                children: vec![notebook("child")],
            }),
        };
        let flattened = parent.flatten();
        match &flattened[0].payload {
            ActivityPayload::IfCondition(condition) => assert!(condition.children.is_empty()),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_flatten_keeps_for_each_nested() {
        let for_each = Activity {
            task: metadata("loop"),
            payload: ActivityPayload::ForEach(ForEachActivity {
                items: r#"["1","2"]"#.to_string(),
                concurrency: Some(2),
                activities: vec![notebook("body")],
            }),
        };
        assert_eq!(for_each.flatten().len(), 1);
    }

    #[test]
    fn test_placeholder_uses_sentinel_path() {
        let activity = Activity::placeholder(metadata("x"), "Unsupported activity type 'Wait'");
        assert!(activity.is_placeholder());
        match activity.payload {
            ActivityPayload::Placeholder(p) => assert_eq!(p.notebook_path, PLACEHOLDER_NOTEBOOK_PATH),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_condition_op_serializes_screaming() {
        assert_eq!(
            serde_json::to_value(ConditionOp::GreaterThanOrEqual).unwrap(),
            serde_json::json!("GREATER_THAN_OR_EQUAL")
        );
    }
}
