//! Workflow preparation
//!
//! Consumes a translated [`Pipeline`](crate::ir::Pipeline) and produces everything needed
//! to recreate it as a job: the job settings payload, generated notebook scripts,
//! declarative pipeline instructions for scripts that run as pipelines, and the secrets
//! those scripts read.

pub mod codegen;
pub mod embedded;
pub mod preparer;
pub mod secrets;
pub mod templates;
pub mod type_mapping;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;

use crate::diagnostics::Diagnostic;
use crate::ir::{ClusterSpec, ConditionOp, Dependency, JobParameter, Schedule};

pub use preparer::WorkflowPreparer;
pub use secrets::SecretInstruction;
pub use templates::{TemplateLoader, TemplateSource};

/// Secret scope generated scripts read credentials from
pub const DEFAULT_SECRET_SCOPE: &str = "pipemigrate_credentials_scope";

/// Workspace folder generated copy notebooks are placed under
pub const DEFAULT_NOTEBOOK_ROOT: &str = "/pipemigrate/copy_data_notebooks";

/// Language of every generated script
pub const NOTEBOOK_LANGUAGE: &str = "PYTHON";

/// Preparation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareOptions {
    /// Force (or suppress) the declarative pipeline strategy for Copy activities;
    /// when unset, only delta sinks use it
    pub files_to_delta_sinks: Option<bool>,
    pub secret_scope: String,
    pub notebook_root: String,
    pub templates_dir: Option<PathBuf>,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            files_to_delta_sinks: None,
            secret_scope: DEFAULT_SECRET_SCOPE.to_string(),
            notebook_root: DEFAULT_NOTEBOOK_ROOT.to_string(),
            templates_dir: None,
        }
    }
}

/// Everything produced for one pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedWorkflow {
    pub job: JobSettings,
    pub notebooks: Vec<NotebookArtifact>,
    pub pipelines: Vec<PipelineInstruction>,
    pub secrets: Vec<SecretInstruction>,
    pub not_translatable: Vec<Diagnostic>,
}

/// Job creation payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSettings {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<JobParameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
    pub tags: BTreeMap<String, String>,
    pub tasks: Vec<JobTask>,
}

/// One task of the job payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobTask {
    pub task_key: String,

    /// Source activity type tag
    #[serde(rename = "type")]
    pub task_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub depends_on: Vec<Dependency>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_retry_interval_millis: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_cluster: Option<ClusterSpec>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub libraries: Vec<Value>,

    #[serde(flatten)]
    pub payload: TaskPayload,
}

/// The single payload block of a task, serialized as `{"<kind>_task": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPayload {
    NotebookTask {
        notebook_path: String,
        #[serde(skip_serializing_if = "BTreeMap::is_empty")]
        base_parameters: BTreeMap<String, String>,
    },
    SparkJarTask {
        main_class_name: String,
        parameters: Vec<Value>,
    },
    SparkPythonTask {
        python_file: String,
        parameters: Vec<Value>,
    },
    ConditionTask {
        op: ConditionOp,
        left: String,
        right: String,
    },
    ForEachTask {
        inputs: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        concurrency: Option<u32>,
        task: Box<JobTask>,
    },
    /// Filled in once the pipeline from the matching [`PipelineInstruction`] exists
    PipelineTask { pipeline_id: Option<String> },
}

impl TaskPayload {
    /// Key of the payload block, e.g. `notebook_task`
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotebookTask { .. } => "notebook_task",
            Self::SparkJarTask { .. } => "spark_jar_task",
            Self::SparkPythonTask { .. } => "spark_python_task",
            Self::ConditionTask { .. } => "condition_task",
            Self::ForEachTask { .. } => "for_each_task",
            Self::PipelineTask { .. } => "pipeline_task",
        }
    }
}

/// A generated script to upload to the workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotebookArtifact {
    pub file_path: String,
    pub content: String,
    pub language: String,
}

/// A declarative pipeline to create from a generated script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineInstruction {
    /// Task whose `pipeline_task` must point at the created pipeline
    pub task_key: String,
    pub file_path: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task(payload: TaskPayload) -> JobTask {
        JobTask {
            task_key: "t".to_string(),
            task_type: "DatabricksNotebook".to_string(),
            description: None,
            depends_on: vec![Dependency::on("upstream")],
            timeout_seconds: Some(60),
            max_retries: None,
            min_retry_interval_millis: None,
            new_cluster: None,
            libraries: Vec::new(),
            payload,
        }
    }

    #[test]
    fn test_task_serializes_one_payload_block() {
        let value = serde_json::to_value(task(TaskPayload::NotebookTask {
            notebook_path: "/nb".to_string(),
            base_parameters: BTreeMap::new(),
        }))
        .unwrap();
        assert_eq!(
            value,
            json!({
                "task_key": "t",
                "type": "DatabricksNotebook",
                "depends_on": [{"task_key": "upstream"}],
                "timeout_seconds": 60,
                "notebook_task": {"notebook_path": "/nb"}
            })
        );
    }

    #[test]
    fn test_condition_and_pipeline_blocks() {
        let value = serde_json::to_value(task(TaskPayload::ConditionTask {
            op: ConditionOp::GreaterThan,
            left: "a".to_string(),
            right: "1".to_string(),
        }))
        .unwrap();
        assert_eq!(value["condition_task"]["op"], json!("GREATER_THAN"));

        let value = serde_json::to_value(task(TaskPayload::PipelineTask { pipeline_id: None })).unwrap();
        assert_eq!(value["pipeline_task"], json!({"pipeline_id": null}));
    }

    #[test]
    fn test_default_options() {
        let options = PrepareOptions::default();
        assert_eq!(options.secret_scope, DEFAULT_SECRET_SCOPE);
        assert_eq!(options.notebook_root, DEFAULT_NOTEBOOK_ROOT);
        assert!(options.files_to_delta_sinks.is_none());
    }
}
