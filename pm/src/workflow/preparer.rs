//! Workflow preparer
//!
//! Walks the flattened task list once, turning each activity into a job task and
//! collecting the artifacts Copy activities need along the way.

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::codegen::{CodeGenerator, identifier};
use super::secrets::collect_secrets;
use super::{
    JobSettings, JobTask, NOTEBOOK_LANGUAGE, NotebookArtifact, PipelineInstruction, PrepareOptions, PreparedWorkflow,
    SecretInstruction, TaskPayload, TemplateLoader,
};
use crate::diagnostics::Diagnostics;
use crate::error::{TranslateError, TranslateResult};
use crate::ir::{Activity, ActivityPayload, CopyActivity, DatasetType, Pipeline, TaskMetadata};

/// Artifacts accumulated while preparing one pipeline
#[derive(Debug, Default)]
struct Artifacts {
    notebooks: Vec<NotebookArtifact>,
    pipelines: Vec<PipelineInstruction>,
    secrets: Vec<SecretInstruction>,
    diagnostics: Diagnostics,
}

impl Artifacts {
    fn add_secret(&mut self, secret: SecretInstruction) {
        let exists = self
            .secrets
            .iter()
            .any(|s| s.scope == secret.scope && s.key == secret.key);
        if !exists {
            self.secrets.push(secret);
        }
    }

    /// Store a script, returning the path it was stored under
    ///
    /// Identical scripts share a path; a different script for the same path is stored
    /// under a task-specific path instead.
    fn add_notebook(&mut self, base_path: String, content: String, task_key: &str) -> String {
        let mut file_path = base_path;
        if let Some(existing) = self.notebooks.iter().find(|n| n.file_path == file_path) {
            if existing.content == content {
                return file_path;
            }
            file_path = format!("{file_path}_{}", identifier(task_key));
            if self.notebooks.iter().any(|n| n.file_path == file_path && n.content == content) {
                return file_path;
            }
        }
        debug!(%file_path, "Artifacts::add_notebook: new script");
        self.notebooks.push(NotebookArtifact {
            file_path: file_path.clone(),
            content,
            language: NOTEBOOK_LANGUAGE.to_string(),
        });
        file_path
    }
}

/// Turns translated pipelines into job payloads and artifacts
#[derive(Debug)]
pub struct WorkflowPreparer {
    options: PrepareOptions,
    templates: TemplateLoader,
}

impl WorkflowPreparer {
    pub fn new(options: PrepareOptions) -> Self {
        debug!(?options, "WorkflowPreparer::new: called");
        let templates = TemplateLoader::new(options.templates_dir.as_deref());
        Self { options, templates }
    }

    pub fn with_templates(options: PrepareOptions, templates: TemplateLoader) -> Self {
        Self { options, templates }
    }

    pub fn options(&self) -> &PrepareOptions {
        &self.options
    }

    pub fn templates(&self) -> &TemplateLoader {
        &self.templates
    }

    /// Prepare a translated pipeline; the same pipeline always yields the same output
    pub fn prepare(&self, pipeline: Pipeline) -> TranslateResult<PreparedWorkflow> {
        debug!(pipeline = %pipeline.name, "WorkflowPreparer::prepare: called");
        let mut artifacts = Artifacts::default();
        let tasks = pipeline
            .tasks
            .into_iter()
            .flat_map(Activity::flatten)
            .map(|activity| self.prepare_task(activity, &mut artifacts))
            .collect::<TranslateResult<Vec<_>>>()?;

        let mut not_translatable = pipeline.not_translatable;
        not_translatable.extend(artifacts.diagnostics.into_entries());

        let prepared = PreparedWorkflow {
            job: JobSettings {
                name: pipeline.name,
                parameters: pipeline.parameters,
                schedule: pipeline.schedule,
                tags: pipeline.tags,
                tasks,
            },
            notebooks: artifacts.notebooks,
            pipelines: artifacts.pipelines,
            secrets: artifacts.secrets,
            not_translatable,
        };
        info!(
            job = %prepared.job.name,
            tasks = prepared.job.tasks.len(),
            notebooks = prepared.notebooks.len(),
            pipelines = prepared.pipelines.len(),
            secrets = prepared.secrets.len(),
            "Prepared workflow"
        );
        Ok(prepared)
    }

    fn prepare_task(&self, activity: Activity, artifacts: &mut Artifacts) -> TranslateResult<JobTask> {
        debug!(task_key = %activity.task.task_key, "WorkflowPreparer::prepare_task: called");
        let Activity { task, payload } = activity;
        artifacts
            .diagnostics
            .enter(Some(&task.name), Some(&task.activity_type));
        let result = self.task_payload(&task, payload, artifacts);
        artifacts.diagnostics.exit();
        let (payload, libraries) = result?;

        Ok(JobTask {
            task_key: task.task_key,
            task_type: task.activity_type,
            description: task.description,
            depends_on: task.depends_on,
            timeout_seconds: task.timeout_seconds,
            max_retries: task.max_retries,
            min_retry_interval_millis: task.min_retry_interval_millis,
            new_cluster: task.new_cluster,
            libraries,
            payload,
        })
    }

    fn task_payload(
        &self,
        task: &TaskMetadata,
        payload: ActivityPayload,
        artifacts: &mut Artifacts,
    ) -> TranslateResult<(TaskPayload, Vec<serde_json::Value>)> {
        let prepared = match payload {
            ActivityPayload::Notebook(notebook) => TaskPayload::NotebookTask {
                notebook_path: notebook.notebook_path,
                base_parameters: notebook.base_parameters,
            },
            ActivityPayload::SparkJar(jar) => {
                let payload = TaskPayload::SparkJarTask {
                    main_class_name: jar.main_class_name,
                    parameters: jar.parameters,
                };
                return Ok((payload, jar.libraries));
            }
            ActivityPayload::SparkPython(python) => TaskPayload::SparkPythonTask {
                python_file: python.python_file,
                parameters: python.parameters,
            },
            ActivityPayload::IfCondition(condition) => TaskPayload::ConditionTask {
                op: condition.op,
                left: condition.left,
                right: condition.right,
            },
            ActivityPayload::ForEach(for_each) => {
                let mut inner = for_each.activities.into_iter();
                let Some(first) = inner.next() else {
                    return Err(TranslateError::Untranslatable {
                        activity: task.name.clone(),
                        message: "ForEach activity has no inner activities".to_string(),
                    });
                };
                let body = self.prepare_task(first, artifacts)?;
                // Only one task fits the loop body; the rest still contribute artifacts
                for rest in inner {
                    let skipped = self.prepare_task(rest, artifacts)?;
                    debug!(task_key = %skipped.task_key, "WorkflowPreparer::task_payload: inner task kept for artifacts only");
                }
                TaskPayload::ForEachTask {
                    inputs: for_each.items,
                    concurrency: for_each.concurrency,
                    task: Box::new(body),
                }
            }
            ActivityPayload::Copy(copy) => self.copy_task(task, &copy, artifacts)?,
            ActivityPayload::Placeholder(placeholder) => TaskPayload::NotebookTask {
                notebook_path: placeholder.notebook_path,
                base_parameters: BTreeMap::new(),
            },
        };
        Ok((prepared, Vec::new()))
    }

    fn copy_task(&self, task: &TaskMetadata, copy: &CopyActivity, artifacts: &mut Artifacts) -> TranslateResult<TaskPayload> {
        debug!(task_key = %task.task_key, "WorkflowPreparer::copy_task: called");
        for dataset in [&copy.source, &copy.sink] {
            for secret in collect_secrets(dataset, &self.options.secret_scope) {
                artifacts.add_secret(secret);
            }
        }

        let declarative = self
            .options
            .files_to_delta_sinks
            .unwrap_or(copy.sink.dataset_type() == DatasetType::Delta);
        let generator = CodeGenerator::new(&self.templates, &self.options.secret_scope);
        let content = if declarative {
            generator.dlt_notebook(copy, &mut artifacts.diagnostics)?
        } else {
            generator.copy_notebook(copy, &mut artifacts.diagnostics)?
        };

        let base_path = format!(
            "{}/copy_{}_to_{}",
            self.options.notebook_root.trim_end_matches('/'),
            identifier(copy.source.name()),
            identifier(copy.sink.name())
        );
        let file_path = artifacts.add_notebook(base_path, content, &task.task_key);

        if declarative {
            artifacts.pipelines.push(PipelineInstruction {
                task_key: task.task_key.clone(),
                file_path,
                name: format!("{}_pipeline", task.task_key),
            });
            Ok(TaskPayload::PipelineTask { pipeline_id: None })
        } else {
            Ok(TaskPayload::NotebookTask {
                notebook_path: file_path,
                base_parameters: BTreeMap::new(),
            })
        }
    }
}
