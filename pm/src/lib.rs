//! pipemigrate - Data Factory pipeline to Databricks job translator
//!
//! Translation runs in two pure stages. [`translate`] turns a pipeline document into the
//! flat [`ir::Pipeline`], recording what it could not carry over as diagnostics instead of
//! failing. [`workflow`] then turns that IR into a job payload plus the generated scripts,
//! declarative pipeline instructions and secret instructions the job depends on.
//!
//! # Modules
//!
//! - [`ir`] - Intermediate representation of pipelines, activities and datasets
//! - [`translate`] - Pipeline, activity, dataset, expression and trigger translators
//! - [`workflow`] - Job payload preparation and code generation
//! - [`diagnostics`] - Scoped collector for untranslatable properties
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod ir;
pub mod translate;
pub mod workflow;

// Re-export commonly used types
pub use config::Config;
pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::{TranslateError, TranslateResult};
pub use ir::{Activity, ActivityPayload, Dataset, DatasetType, Pipeline, Translation, Untranslatable};
pub use translate::{ActivityTranslator, TranslateOptions, translate_pipeline, translate_pipeline_with_trigger};
pub use workflow::{
    JobSettings, JobTask, NotebookArtifact, PipelineInstruction, PrepareOptions, PreparedWorkflow, SecretInstruction,
    TaskPayload, WorkflowPreparer,
};
